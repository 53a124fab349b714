//! The decoding pipeline: [WordSource](crate::source::WordSource) → [splitter] → [decoder]
//!
//! Each stage owns its upstream stage and pulls from it on demand. Every stage reuses one output
//! record that is cleared and refilled per read, so the returned reference is only valid until the next read.
//! A [PipeError::BufferEmpty] from the word source propagates through all stages and means that no
//! complete event is available yet.

use crate::source::{ChannelConfig, PipeError};
use crate::words::{pixel::expand_sign, raw_event::RawEvent};
use itertools::Itertools;

pub mod decoder;
pub mod splitter;

/// Pull-based source of [RawEvent] records.
pub trait RawEventSource {
    /// Frame the next record.
    fn read(&mut self) -> Result<&RawEvent, PipeError>;

    /// Configuration of the channel the records belong to.
    fn config(&self) -> &ChannelConfig;
}

impl<T> RawEventSource for Box<T>
where
    T: RawEventSource + ?Sized,
{
    fn read(&mut self) -> Result<&RawEvent, PipeError> {
        (**self).read()
    }

    fn config(&self) -> &ChannelConfig {
        (**self).config()
    }
}

/// Format raw words for logging, as hex or as sign-expanded ADC samples.
pub fn format_words(words: &[u16], analog: bool) -> String {
    if analog {
        words
            .iter()
            .map(|w| expand_sign(w & 0x0fff).to_string())
            .join(" ")
    } else {
        words.iter().map(|w| format!("{w:04X}")).join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_digital_and_analog() {
        assert_eq!(format_words(&[0xa001, 0x0012], false), "A001 0012");
        assert_eq!(format_words(&[0x8e70, 0x0064], true), "-400 100");
        assert_eq!(format_words(&[], false), "");
    }
}
