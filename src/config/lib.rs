//! Contains the [Config] super trait, and all the sub traits required by it
//!
//! Implementing the [Config] super trait is required by configs passed to structs in other modules as part of instantiation.

use super::{
    channels::ChannelOpt,
    generate::GenerateOpt,
    prelude::{InputOutputOpt, ViewOpt},
    util::UtilOpt,
};
use clap::builder::styling::{AnsiColor, Effects, Styles};

/// Super trait for all the traits that needed to be implemented by the config struct
// Generic traits that are required by the config struct
pub trait Config: Send + Sync + std::marker::Sized
where
    // Subtraits that group together related configuration options
    Self: UtilOpt + InputOutputOpt + ChannelOpt + ViewOpt + GenerateOpt,
{
    /// Validate the arguments of the config
    fn validate_args(&self) -> Result<(), String> {
        if self.any_errors_exit_code().is_some_and(|val| val == 0) {
            return Err("Invalid config: Exit code for any errors cannot be 0".to_string());
        }
        if self.channels_file().is_some() && !self.input_files().is_empty() {
            return Err(
                "Invalid config: Input files cannot be combined with a channel file, list them in the channel file instead"
                    .to_string(),
            );
        }
        if let Some(generate) = self.generate() {
            if generate.events == 0 {
                return Err("Invalid config: Cannot generate 0 events".to_string());
            }
            if generate.rocs == Some(0) || self.chain_length() == Some(0) {
                return Err("Invalid config: A token chain needs at least one ROC".to_string());
            }
            if self.view().is_some() {
                return Err("Invalid config: Cannot view and generate at the same time".to_string());
            }
        }
        Ok(())
    }

    /// Returns true if the run ends with the final report, false if stdout is used for other output
    fn report_enabled(&self) -> bool {
        self.view().is_none()
            && self.stats_output_mode() != super::inputoutput::DataOutputMode::Stdout
    }
}

impl<T> Config for &T
where
    T: Config,
{
    fn validate_args(&self) -> Result<(), String> {
        (*self).validate_args()
    }

    fn report_enabled(&self) -> bool {
        (*self).report_enabled()
    }
}

impl<T> Config for Box<T>
where
    T: Config,
{
    fn validate_args(&self) -> Result<(), String> {
        (**self).validate_args()
    }

    fn report_enabled(&self) -> bool {
        (**self).report_enabled()
    }
}

impl<T> Config for std::sync::Arc<T>
where
    T: Config,
{
    fn validate_args(&self) -> Result<(), String> {
        (**self).validate_args()
    }

    fn report_enabled(&self) -> bool {
        (**self).report_enabled()
    }
}

/// Colors of the help output
pub fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}
