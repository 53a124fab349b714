//! Contains the [Cfg] struct that parses and stores the command line arguments
//!
//! [Cfg] uses procedural macros from the `clap` library to implement most of the argument parsing and validation logic.
//! The [Cfg] struct implements several options and subcommands, as well as convenience functions to get various parts of the configuration

use crate::util::*;
use crate::words::device::{DecoderFlags, RocType, TbmType};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

pub mod channels;
pub mod generate;
pub mod inputoutput;
pub mod lib;
pub mod prelude;
pub mod test_util;
pub mod util;
pub mod view;

/// The [CONFIG] static variable is used to store the [Cfg] created from the parsed command line arguments
pub static CONFIG: OnceLock<Cfg> = OnceLock::new();

/// The [Cfg] struct uses procedural macros and implements the [Config] trait, to provide convenient access to the command line arguments.
#[derive(Parser, Debug)]
#[command(name = "dtbpipe - DTB readout pipeline")]
#[command(bin_name = "dtbpipe", version)]
#[command(about = "dtbpipe splits and decodes raw pixel detector data recorded with a DTB.")]
#[command(
    long_about = "\ndtbpipe splits and decodes raw pixel detector data recorded with a DTB.\n\
It reads one raw word stream per DAQ channel, frames it into events,\n\
decodes the pixel hits, and reports decoding errors and statistics.\n\
It can also print the raw records or decoded events, or generate\n\
emulated raw data."
)]
#[command(propagate_version = true)]
#[command(styles = lib::styles())]
pub struct Cfg {
    /// Raw data files, one per DAQ channel (default: stdin)
    #[arg(name = "Raw Data", global = true, value_hint = clap::ValueHint::FilePath)]
    files: Vec<PathBuf>,

    /// Commands such as `View` or `Generate` that change what is done with the data
    #[command(subcommand)]
    cmd: Option<Command>,

    /// Verbosity level 0-4 (Errors, Warnings, Info, Debug, Trace)
    #[arg(short = 'v', long = "verbosity", default_value_t = 1, global = true)]
    verbosity: u8,

    /// Max tolerate decoding errors before exiting, if set to 0 -> no limit to errors
    #[arg(
        short = 'e',
        long = "max-tolerate-errors",
        visible_aliases = ["max-errors", "tolerate-errors"],
        default_value_t = 0,
        global = true
    )]
    max_tolerate_errors: u32,

    /// Set the exit code for if any errors are decoded from the input data (cannot be 0)
    #[arg(
        short = 'E',
        long = "any-errors-exit-code",
        visible_alias = "exit-code",
        global = true
    )]
    any_errors_exit_code: Option<u8>,

    /// Don't show error messages - helpful if there's a large amount of errors and you just want to see the report
    #[arg(short, long, default_value_t = false, global = true)]
    mute_errors: bool,

    /// TBM envelope type of the channels
    #[arg(short = 't', long, value_enum, default_value_t = TbmType::None, global = true)]
    envelope: TbmType,

    /// ROC generation of the channels
    #[arg(
        short = 'r',
        long,
        value_enum,
        default_value_t = RocType::Psi46digv21respin,
        global = true
    )]
    device: RocType,

    /// Number of ROCs in the token chain (default: given by the envelope type)
    #[arg(short = 'n', long, global = true)]
    chain_length: Option<u8>,

    /// ROC id of the first chip in the token chain
    #[arg(short = 'o', long, default_value_t = 0, global = true)]
    chain_offset: u8,

    /// Decoder flag word, decimal or hex (0x0100 dump flawed events, 0x0200 no readback, 0x0400 no event ID check, 0x0800 XOR sums)
    #[arg(short = 'f', long, default_value = "0", global = true)]
    flags: DecoderFlags,

    /// Path to a TOML file describing the layout and input file of each DAQ channel
    #[arg(
        short = 'c',
        long = "channels",
        visible_alias = "channels-file",
        global = true,
        value_hint = clap::ValueHint::FilePath
    )]
    channels_file: Option<PathBuf>,

    /// Output stats (default: none), requires setting a data format option (JSON, TOML)
    #[arg(
        name = "OUTPUT FINAL STATS",
        short = 'S',
        long = "output-stats",
        default_value_t = DataOutputMode::None,
        visible_aliases = ["output-final-stats"],
        global = true,
        requires = "STATS FORMAT",
    )]
    stats_output: DataOutputMode,

    /// Output stats format (JSON/TOML), requires setting a stats output option
    #[arg(
        name = "STATS FORMAT",
        short = 'D',
        long = "stats-format",
        visible_alias = "stats-data-format",
        global = true,
        requires = "OUTPUT FINAL STATS"
    )]
    stats_output_format: Option<DataOutputFormat>,

    /// Generate completion scripts for the specified shell.
    /// Note: The completion script is printed to stdout
    #[arg(
        long = "generate-completions",
        value_hint = clap::ValueHint::Other,
        value_name = "SHELL"
    )]
    pub generate_completions: Option<clap_complete::Shell>,
}

impl Cfg {
    /// Get a reference to the global config
    pub fn global() -> &'static Cfg {
        CONFIG.get().expect("Config is not initialized")
    }

    /// Generate completion scripts for the specified shell.
    pub fn generate_completion_script(shell: Shell) {
        clap_complete::generate(
            shell,
            &mut <Cfg as clap::CommandFactory>::command(),
            "dtbpipe",
            &mut io::stdout(),
        );
    }
}

/// Implementing the config super trait requires implementing all the sub traits
impl Config for Cfg {}

impl ViewOpt for Cfg {
    #[inline]
    fn view(&self) -> Option<ViewCommands> {
        match &self.cmd {
            Some(Command::View(view_sub_cmd)) => Some(view_sub_cmd.cmd),
            Some(Command::Generate(_)) | None => None,
        }
    }
}

impl GenerateOpt for Cfg {
    fn generate(&self) -> Option<&GenerateArgs> {
        match &self.cmd {
            Some(Command::Generate(args)) => Some(args),
            Some(Command::View(_)) | None => None,
        }
    }
}

impl InputOutputOpt for Cfg {
    #[inline]
    fn input_files(&self) -> &[PathBuf] {
        &self.files
    }

    fn stats_output_mode(&self) -> DataOutputMode {
        self.stats_output.clone()
    }

    fn stats_output_format(&self) -> Option<DataOutputFormat> {
        self.stats_output_format
    }
}

impl ChannelOpt for Cfg {
    fn envelope(&self) -> TbmType {
        self.envelope
    }

    fn device(&self) -> RocType {
        self.device
    }

    fn chain_length(&self) -> Option<u8> {
        self.chain_length
    }

    fn chain_offset(&self) -> u8 {
        self.chain_offset
    }

    fn decoder_flags(&self) -> DecoderFlags {
        self.flags
    }

    fn channels_file(&self) -> Option<&Path> {
        self.channels_file.as_deref()
    }
}

impl UtilOpt for Cfg {
    #[inline]
    fn verbosity(&self) -> u8 {
        self.verbosity
    }
    #[inline]
    fn max_tolerate_errors(&self) -> u32 {
        self.max_tolerate_errors
    }
    fn any_errors_exit_code(&self) -> Option<u8> {
        self.any_errors_exit_code
    }
    fn mute_errors(&self) -> bool {
        self.mute_errors
    }
}

/// Holds the [ViewCommands] subcommands
#[derive(Debug, Args, Clone, Copy)]
#[command(args_conflicts_with_subcommands = true)]
#[command(arg_required_else_help = true)]
pub struct ViewArgs {
    #[command(subcommand)]
    cmd: ViewCommands,
}

#[derive(Debug, Subcommand, Clone)]
/// Subcommands to view the data or to generate emulated data instead of decoding it.
pub enum Command {
    /// Enable view mode, requires a `focus` type subcommand e.g. `raw` or `events`
    #[command(arg_required_else_help = true)]
    View(ViewArgs),
    /// Write an emulated raw data file with the layout given by the global options
    #[command(arg_required_else_help = true)]
    Generate(GenerateArgs),
}

/// Get the [config][super::config::Cfg] from the command line arguments and set the static [CONFIG] variable.
pub fn init_config() -> Result<(), String> {
    let cfg = <super::config::Cfg as clap::Parser>::parse();
    cfg.validate_args()?;
    CONFIG
        .set(cfg)
        .map_err(|_| "Config already initialized".to_string())?;
    Ok(())
}
