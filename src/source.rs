//! Word sources feeding the event splitter
//!
//! A [WordSource] hands out the raw 16-bit readout stream one word at a time and describes the
//! channel it belongs to through a [ChannelConfig].
//!
//! Two implementations exist:
//! - [BufferSource](buffer_source::BufferSource): words are appended explicitly, used for emulation and tests.
//! - [FileSource](file_source::FileSource): words are read in blocks from any [std::io::Read], such as a raw data file or stdin.

use crate::words::device::{DecoderFlags, RocType, TbmType};
use thiserror::Error;

pub mod buffer_source;
pub mod channel;
pub mod file_source;

pub use channel::ChannelConfig;

/// Number of words requested from the underlying transport per block read
pub const DTB_SOURCE_BLOCK_SIZE: usize = 8192;

/// Conditions that stop a pull through the pipeline.
///
/// [PipeError::BufferEmpty] is not a decoding failure, it means no more words are available right now.
#[derive(Debug, Error)]
pub enum PipeError {
    /// No more words available
    #[error("Buffer empty")]
    BufferEmpty,
    /// The source has not been configured
    #[error("Not connected")]
    NotConnected,
    /// Reading from the underlying transport failed
    #[error("Reading raw data failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Pull-based source of raw 16-bit words.
pub trait WordSource {
    /// Read the next word, advancing the stream.
    fn read_next(&mut self) -> Result<u16, PipeError>;

    /// The most recently read word, without advancing.
    fn read_last(&self) -> u16;

    /// Configuration of the channel the words belong to.
    fn config(&self) -> &ChannelConfig;

    /// DAQ channel index
    fn channel(&self) -> u8 {
        self.config().channel
    }

    /// Configured token-chain length
    fn chain_length(&self) -> u8 {
        self.config().chain_length()
    }

    /// ROC id of the first chip in the chain
    fn chain_offset(&self) -> u8 {
        self.config().chain_offset
    }

    /// Token-chain length implied by the envelope type
    fn default_chain_length(&self) -> u8 {
        self.config().default_chain_length()
    }

    /// TBM envelope type
    fn envelope(&self) -> TbmType {
        self.config().envelope
    }

    /// ROC generation
    fn device(&self) -> RocType {
        self.config().device
    }

    /// Decoder flags
    fn flags(&self) -> DecoderFlags {
        self.config().flags
    }
}

impl<T> WordSource for Box<T>
where
    T: WordSource + ?Sized,
{
    fn read_next(&mut self) -> Result<u16, PipeError> {
        (**self).read_next()
    }

    fn read_last(&self) -> u16 {
        (**self).read_last()
    }

    fn config(&self) -> &ChannelConfig {
        (**self).config()
    }
}

impl<T> WordSource for &mut T
where
    T: WordSource + ?Sized,
{
    fn read_next(&mut self) -> Result<u16, PipeError> {
        (**self).read_next()
    }

    fn read_last(&self) -> u16 {
        (**self).read_last()
    }

    fn config(&self) -> &ChannelConfig {
        (**self).config()
    }
}
