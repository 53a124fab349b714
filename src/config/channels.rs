//! Contains the [ChannelOpt] Trait for the readout layout of the DAQ channels, and the loading of channel TOML files
//!
//! A channel file lists one `[[channel]]` table per input file:
//! ```toml
//! [[channel]]
//! file = "ch0.raw"
//! channel = 0
//! envelope = "tbm08b"
//! device = "psi46digv21respin"
//! chain_length = 8
//! chain_offset = 0
//! flags = 0x0100
//! ```
//! Relative file paths are resolved against the directory of the channel file.

use super::inputoutput::InputOutputOpt;
use crate::source::ChannelConfig;
use crate::util::*;
use crate::words::device::{DecoderFlags, RocType, TbmType};
use thiserror::Error;

/// Readout layout options set by a user, applied to every input file unless a channel file is given.
pub trait ChannelOpt {
    /// TBM envelope type
    fn envelope(&self) -> TbmType;
    /// ROC generation
    fn device(&self) -> RocType;
    /// Explicit token-chain length, `None` means the default of the envelope
    fn chain_length(&self) -> Option<u8>;
    /// ROC id of the first chip in the chain
    fn chain_offset(&self) -> u8;
    /// Decoder flag word
    fn decoder_flags(&self) -> DecoderFlags;
    /// Path to a TOML file describing each DAQ channel
    fn channels_file(&self) -> Option<&Path>;
}

impl<T> ChannelOpt for &T
where
    T: ChannelOpt,
{
    fn envelope(&self) -> TbmType {
        (*self).envelope()
    }
    fn device(&self) -> RocType {
        (*self).device()
    }
    fn chain_length(&self) -> Option<u8> {
        (*self).chain_length()
    }
    fn chain_offset(&self) -> u8 {
        (*self).chain_offset()
    }
    fn decoder_flags(&self) -> DecoderFlags {
        (*self).decoder_flags()
    }
    fn channels_file(&self) -> Option<&Path> {
        (*self).channels_file()
    }
}

impl<T> ChannelOpt for Box<T>
where
    T: ChannelOpt,
{
    fn envelope(&self) -> TbmType {
        (**self).envelope()
    }
    fn device(&self) -> RocType {
        (**self).device()
    }
    fn chain_length(&self) -> Option<u8> {
        (**self).chain_length()
    }
    fn chain_offset(&self) -> u8 {
        (**self).chain_offset()
    }
    fn decoder_flags(&self) -> DecoderFlags {
        (**self).decoder_flags()
    }
    fn channels_file(&self) -> Option<&Path> {
        (**self).channels_file()
    }
}

impl<T> ChannelOpt for Arc<T>
where
    T: ChannelOpt,
{
    fn envelope(&self) -> TbmType {
        (**self).envelope()
    }
    fn device(&self) -> RocType {
        (**self).device()
    }
    fn chain_length(&self) -> Option<u8> {
        (**self).chain_length()
    }
    fn chain_offset(&self) -> u8 {
        (**self).chain_offset()
    }
    fn decoder_flags(&self) -> DecoderFlags {
        (**self).decoder_flags()
    }
    fn channels_file(&self) -> Option<&Path> {
        (**self).channels_file()
    }
}

/// Failures while assembling the channel list
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The channel file could not be read
    #[error("Could not read channel file {path:?}: {source}")]
    Io {
        /// Path of the channel file
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// The channel file is not valid TOML or has unknown values
    #[error("Invalid channel file: {0}")]
    Toml(#[from] toml::de::Error),
    /// The channel file has no `[[channel]]` entries
    #[error("Channel file does not list any channel")]
    NoChannels,
    /// Two entries use the same channel index
    #[error("Channel {0} is configured more than once")]
    DuplicateChannel(u8),
    /// More input files than channel indices
    #[error("Too many input files ({0}), at most 256 channels are supported")]
    TooManyChannels(usize),
    /// An input file does not exist
    #[error("Input file {0:?} does not exist")]
    MissingInput(PathBuf),
}

/// One DAQ channel to process
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInput {
    /// Raw data file, `None` reads stdin
    pub file: Option<PathBuf>,
    /// Layout of the channel
    pub config: ChannelConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChannelsFile {
    channel: Vec<ChannelEntry>,
}

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    file: PathBuf,
    #[serde(flatten)]
    config: ChannelConfig,
}

/// Parse the contents of a channel file, resolving relative paths against `base_dir`.
pub fn parse_channels_toml(
    toml_str: &str,
    base_dir: &Path,
) -> Result<Vec<ChannelInput>, ConfigError> {
    let channels_file: ChannelsFile = toml::from_str(toml_str)?;
    if channels_file.channel.is_empty() {
        return Err(ConfigError::NoChannels);
    }
    let mut seen = Vec::with_capacity(channels_file.channel.len());
    channels_file
        .channel
        .into_iter()
        .map(|entry| {
            if seen.contains(&entry.config.channel) {
                return Err(ConfigError::DuplicateChannel(entry.config.channel));
            }
            seen.push(entry.config.channel);
            let file = if entry.file.is_relative() {
                base_dir.join(entry.file)
            } else {
                entry.file
            };
            Ok(ChannelInput {
                file: Some(file),
                config: entry.config,
            })
        })
        .collect()
}

/// Assemble the channels to process from the configuration.
///
/// With a channel file its entries are used as they are. Otherwise every input file becomes one
/// channel, numbered in the order given, with the layout from the command line. Without any input
/// file stdin is read as channel 0.
pub fn channel_inputs<C: ChannelOpt + InputOutputOpt>(
    config: &C,
) -> Result<Vec<ChannelInput>, ConfigError> {
    let inputs = if let Some(path) = config.channels_file() {
        let toml_str = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        parse_channels_toml(&toml_str, base_dir)?
    } else if config.input_files().is_empty() {
        vec![ChannelInput {
            file: None,
            config: channel_config_from_opts(config, 0),
        }]
    } else {
        if config.input_files().len() > usize::from(u8::MAX) + 1 {
            return Err(ConfigError::TooManyChannels(config.input_files().len()));
        }
        config
            .input_files()
            .iter()
            .zip(0..=u8::MAX)
            .map(|(file, channel)| ChannelInput {
                file: Some(file.clone()),
                config: channel_config_from_opts(config, channel),
            })
            .collect()
    };

    if let Some(missing) = inputs
        .iter()
        .filter_map(|input| input.file.as_ref())
        .find(|file| !file.is_file())
    {
        return Err(ConfigError::MissingInput(missing.clone()));
    }
    Ok(inputs)
}

fn channel_config_from_opts<C: ChannelOpt>(config: &C, channel: u8) -> ChannelConfig {
    ChannelConfig {
        channel,
        chain_length: config.chain_length(),
        chain_offset: config.chain_offset(),
        envelope: config.envelope(),
        device: config.device(),
        flags: config.decoder_flags(),
    }
}
