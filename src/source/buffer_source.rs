//! Contains the [BufferSource], a word source that is fed explicitly

use super::{ChannelConfig, PipeError, WordSource};
use itertools::Itertools;

/// Word source backed by an in-memory buffer.
///
/// Words are appended with [BufferSource::add_data]/[BufferSource::add_words]. When the buffer is
/// exhausted [WordSource::read_next] returns [PipeError::BufferEmpty] and the buffer is reset,
/// new words can then be appended and reading continues where the stream left off.
#[derive(Debug, Clone)]
pub struct BufferSource {
    config: ChannelConfig,
    connected: bool,
    buffer: Vec<u16>,
    pos: usize,
    last_word: u16,
}

impl BufferSource {
    /// Initial value of the last word, carries the DESER160 end marker so the first read starts a new frame.
    pub const INITIAL_LAST_WORD: u16 = 0x4000;

    /// Create an empty source for the given channel.
    pub fn new(config: ChannelConfig) -> Self {
        log::debug!("New buffer source: {config}");
        Self {
            config,
            connected: true,
            buffer: Vec::new(),
            pos: 0,
            last_word: Self::INITIAL_LAST_WORD,
        }
    }

    /// Create a source that is not configured, every read fails with [PipeError::NotConnected].
    pub fn unconnected() -> Self {
        Self {
            config: ChannelConfig::default(),
            connected: false,
            buffer: Vec::new(),
            pos: 0,
            last_word: Self::INITIAL_LAST_WORD,
        }
    }

    /// Append one word.
    pub fn add_data(&mut self, word: u16) {
        self.buffer.push(word);
        log::trace!("{len} words buffered", len = self.buffer.len());
    }

    /// Append a block of words.
    pub fn add_words(&mut self, words: &[u16]) {
        self.buffer.extend_from_slice(words);
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "Full raw data blob ({len} words buffered): {words}",
                len = self.buffer.len(),
                words = words.iter().map(|w| format!("{w:04X}")).join(" ")
            );
        }
    }

    /// Number of words not yet read
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.pos
    }

    /// Returns true if there is buffered data and the source is configured.
    pub fn is_ready(&self) -> bool {
        self.connected && self.remaining() > 0
    }
}

impl WordSource for BufferSource {
    fn read_next(&mut self) -> Result<u16, PipeError> {
        if !self.connected {
            return Err(PipeError::NotConnected);
        }
        if let Some(&word) = self.buffer.get(self.pos) {
            self.pos += 1;
            self.last_word = word;
            Ok(word)
        } else {
            self.buffer.clear();
            self.pos = 0;
            Err(PipeError::BufferEmpty)
        }
    }

    fn read_last(&self) -> u16 {
        self.last_word
    }

    fn config(&self) -> &ChannelConfig {
        &self.config
    }
}
