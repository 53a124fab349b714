//! Contains the [RawEvent] record that the event splitter fills with the undecoded words of one trigger

use itertools::Itertools;
use std::fmt;

/// Undecoded words of one trigger plus the framing flags set by the splitter.
///
/// The splitter owns one record and clears and refills it on each read.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Raw 16-bit words in stream order
    pub data: Vec<u16>,
    flags: u8,
}

impl RawEvent {
    /// Maximum number of words stored in one record, further words are dropped and [RawEvent::is_overflow] is set.
    pub const MAX_SIZE: usize = 40000;

    const START_ERROR: u8 = 0b001;
    const END_ERROR: u8 = 0b010;
    const OVERFLOW: u8 = 0b100;

    /// Create a record from a list of words, without flags.
    pub fn from_words(words: &[u16]) -> Self {
        Self {
            data: words.to_vec(),
            flags: 0,
        }
    }

    /// Remove all words and flags.
    pub fn clear(&mut self) {
        self.data.clear();
        self.flags = 0;
    }

    /// Append a word.
    #[inline]
    pub fn add(&mut self, word: u16) {
        self.data.push(word);
    }

    /// Number of words in the record
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the record holds no words.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the record is at its maximum size.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.data.len() >= Self::MAX_SIZE
    }

    /// Mark that the frame did not begin with a start marker.
    pub fn set_start_error(&mut self) {
        self.flags |= Self::START_ERROR;
    }

    /// Mark that the frame ended without an end marker.
    pub fn set_end_error(&mut self) {
        self.flags |= Self::END_ERROR;
    }

    /// Mark that words were dropped because the record was full.
    pub fn set_overflow(&mut self) {
        self.flags |= Self::OVERFLOW;
    }

    /// Frame did not begin with a start marker
    pub fn is_start_error(&self) -> bool {
        self.flags & Self::START_ERROR != 0
    }

    /// Frame ended without an end marker
    pub fn is_end_error(&self) -> bool {
        self.flags & Self::END_ERROR != 0
    }

    /// Frame exceeded [RawEvent::MAX_SIZE] words
    pub fn is_overflow(&self) -> bool {
        self.flags & Self::OVERFLOW != 0
    }

    /// Returns true if any of the framing flags are set.
    pub fn has_framing_error(&self) -> bool {
        self.flags != 0
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{words}]",
            words = self.data.iter().map(|w| format!("{w:04X}")).join(" ")
        )?;
        if self.is_start_error() {
            write!(f, " START ERROR")?;
        }
        if self.is_end_error() {
            write!(f, " END ERROR")?;
        }
        if self.is_overflow() {
            write!(f, " OVERFLOW")?;
        }
        Ok(())
    }
}
