//! Contains the [GenerateOpt] Trait and the [GenerateArgs] of the `generate` subcommand

use clap::Args;
use std::path::PathBuf;

/// Arguments of the `generate` subcommand, which writes an emulated raw data file.
///
/// The channel layout is taken from the global options (`--envelope`, `--device`, ...).
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    /// Number of events (triggers) to generate
    #[arg(short = 'N', long, default_value_t = 1000)]
    pub events: usize,

    /// Raw data file to write
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Number of ROCs in the emulated token chain, overrides `--chain-length`
    #[arg(long)]
    pub rocs: Option<u8>,

    /// Maximum number of hits per ROC and event
    #[arg(long, default_value_t = 4)]
    pub hits: u8,

    /// Seed of the random generator, the same seed gives the same stream
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

/// Trait for the options of the `generate` subcommand.
pub trait GenerateOpt {
    /// Arguments of `generate` if the subcommand was given.
    fn generate(&self) -> Option<&GenerateArgs>;
}

impl<T> GenerateOpt for &T
where
    T: GenerateOpt,
{
    fn generate(&self) -> Option<&GenerateArgs> {
        (*self).generate()
    }
}

impl<T> GenerateOpt for Box<T>
where
    T: GenerateOpt,
{
    fn generate(&self) -> Option<&GenerateArgs> {
        (**self).generate()
    }
}

impl<T> GenerateOpt for std::sync::Arc<T>
where
    T: GenerateOpt,
{
    fn generate(&self) -> Option<&GenerateArgs> {
        (**self).generate()
    }
}
