#![allow(missing_docs)]

use crate::util::*;
use crate::words::device::{DecoderFlags, RocType, TbmType};

#[derive(Debug, Clone)]
/// Complete configurable Mock config for testing
pub struct MockConfig {
    pub view: Option<ViewCommands>,
    pub generate: Option<GenerateArgs>,
    pub verbosity: u8,
    pub max_tolerate_errors: u32,
    pub any_errors_exit_code: Option<u8>,
    pub mute_errors: bool,
    pub input_files: Vec<PathBuf>,
    pub stats_output_mode: DataOutputMode,
    pub stats_output_format: Option<DataOutputFormat>,
    pub envelope: TbmType,
    pub device: RocType,
    pub chain_length: Option<u8>,
    pub chain_offset: u8,
    pub decoder_flags: DecoderFlags,
    pub channels_file: Option<PathBuf>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConfig {
    pub fn new() -> Self {
        Self {
            view: None,
            generate: None,
            verbosity: 0,
            max_tolerate_errors: 0,
            any_errors_exit_code: None,
            mute_errors: false,
            input_files: Vec::new(),
            stats_output_mode: DataOutputMode::None,
            stats_output_format: None,
            envelope: TbmType::None,
            device: RocType::Psi46digv21respin,
            chain_length: None,
            chain_offset: 0,
            decoder_flags: DecoderFlags::default(),
            channels_file: None,
        }
    }
}

impl Config for MockConfig {}

impl ViewOpt for MockConfig {
    fn view(&self) -> Option<ViewCommands> {
        self.view
    }
}

impl GenerateOpt for MockConfig {
    fn generate(&self) -> Option<&GenerateArgs> {
        self.generate.as_ref()
    }
}

impl UtilOpt for MockConfig {
    fn verbosity(&self) -> u8 {
        self.verbosity
    }

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

impl InputOutputOpt for MockConfig {
    fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    fn stats_output_mode(&self) -> DataOutputMode {
        self.stats_output_mode.clone()
    }

    fn stats_output_format(&self) -> Option<DataOutputFormat> {
        self.stats_output_format
    }
}

impl ChannelOpt for MockConfig {
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
        self.decoder_flags
    }

    fn channels_file(&self) -> Option<&Path> {
        self.channels_file.as_deref()
    }
}
