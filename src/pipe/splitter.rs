//! Event splitters framing the raw word stream into [RawEvent] records
//!
//! [DtbEventSplitter] implements the three framing protocols of the testboard:
//!
//! | Envelope           | Protocol  | Start                  | End                                   |
//! |--------------------|-----------|------------------------|---------------------------------------|
//! | [TbmType::None]    | DESER160  | `0x8000` bit           | `0x4000` bit (`0xc000` = empty event) |
//! | [TbmType::Emu]     | Soft TBM  | `0xa000` (mask `0xe000`) | `0xc000` (mask `0xef00`)            |
//! | TBM generations    | DESER400  | `0xa000` (mask `0xe000`) | `0xc000` (mask `0xe000`)            |
//!
//! Framing problems never abort a read, they are recorded as flags on the record.

use super::{format_words, RawEventSource};
use crate::source::{ChannelConfig, PipeError, WordSource};
use crate::words::{device::TbmType, raw_event::RawEvent};

/// Framing protocol, chosen from the envelope type of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingProtocol {
    /// Single ROC without TBM, start/end bits
    Deser160,
    /// TBM emulated in firmware
    SoftTbm,
    /// Real TBM read out through the DESER400
    Deser400,
}

impl From<TbmType> for FramingProtocol {
    fn from(envelope: TbmType) -> Self {
        match envelope {
            TbmType::None => FramingProtocol::Deser160,
            TbmType::Emu => FramingProtocol::SoftTbm,
            _ => FramingProtocol::Deser400,
        }
    }
}

/// Splits the word stream of one DAQ channel into per-trigger records.
pub struct DtbEventSplitter<S: WordSource> {
    source: S,
    record: RawEvent,
    protocol: FramingProtocol,
    next_start_detected: bool,
}

impl<S: WordSource> DtbEventSplitter<S> {
    const DESER160_START: u16 = 0x8000;
    const DESER160_END: u16 = 0x4000;
    const DESER160_MARKERS: u16 = 0xc000;
    const TBM_MARKER_MASK: u16 = 0xe000;
    const TBM_HEADER: u16 = 0xa000;
    const TBM_TRAILER: u16 = 0xc000;
    const SOFT_TBM_TRAILER_MASK: u16 = 0xef00;

    /// Create a splitter pulling from `source`, the protocol is fixed by the envelope type of the source.
    pub fn new(source: S) -> Self {
        let protocol = FramingProtocol::from(source.envelope());
        log::debug!(
            "Channel {ch}: splitting with {protocol:?} framing",
            ch = source.channel()
        );
        Self {
            source,
            record: RawEvent::default(),
            protocol,
            next_start_detected: false,
        }
    }

    /// The framing protocol in use
    pub fn protocol(&self) -> FramingProtocol {
        self.protocol
    }

    /// Access the word source, e.g. to append emulated data.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the splitter and return the word source.
    pub fn into_source(self) -> S {
        self.source
    }

    fn split_deser160(&mut self) -> Result<(), PipeError> {
        // The previous frame ended with its end marker, this frame starts with a fresh word
        if self.source.read_last() & Self::DESER160_END != 0 {
            let _ = self.source.read_next()?;
        }

        if self.source.read_last() & Self::DESER160_START == 0 {
            self.record.set_start_error();
            while self.source.read_last() & Self::DESER160_START == 0 {
                let _ = self.source.read_next()?;
            }
        }

        // Start and end marker in the same word: empty event
        if self.source.read_last() & Self::DESER160_MARKERS == Self::DESER160_MARKERS {
            return Ok(());
        }

        loop {
            if self.record.is_full() {
                self.record.set_overflow();
                break;
            }
            self.record.add(self.source.read_last());
            if self.source.read_next()? & Self::DESER160_MARKERS != 0 {
                break;
            }
        }

        if self.source.read_last() & Self::DESER160_END != 0 {
            self.record.add(self.source.read_last());
        } else {
            self.record.set_end_error();
        }
        Ok(())
    }

    fn split_tbm(&mut self, trailer_mask: u16, tag_channel: bool) -> Result<(), PipeError> {
        if !self.next_start_detected {
            let _ = self.source.read_next()?;
        }

        if self.source.read_last() & Self::TBM_MARKER_MASK != Self::TBM_HEADER {
            self.record.set_start_error();
            let _ = self.source.read_next()?;
        }

        let header = if tag_channel {
            // Unused header bits carry the DAQ channel
            self.source.read_last() | ((u16::from(self.source.channel()) & 0x7) << 8)
        } else {
            self.source.read_last()
        };
        self.record.add(header);

        loop {
            let word = self.source.read_next()?;
            if word & trailer_mask == Self::TBM_TRAILER {
                break;
            }
            if word & Self::TBM_MARKER_MASK == Self::TBM_HEADER {
                // Next event started before this one saw its trailer
                self.record.set_end_error();
                self.next_start_detected = true;
                return Ok(());
            }
            if self.record.is_full() {
                self.record.set_overflow();
            } else {
                self.record.add(word);
            }
        }

        self.record.add(self.source.read_last());
        self.next_start_detected = false;
        Ok(())
    }
}

impl<S: WordSource> RawEventSource for DtbEventSplitter<S> {
    fn read(&mut self) -> Result<&RawEvent, PipeError> {
        self.record.clear();

        match self.protocol {
            FramingProtocol::Deser160 => self.split_deser160()?,
            FramingProtocol::SoftTbm => {
                self.split_tbm(Self::SOFT_TBM_TRAILER_MASK, false)?;
            }
            FramingProtocol::Deser400 => self.split_tbm(Self::TBM_MARKER_MASK, true)?,
        }

        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "Channel {ch} split event: {words}",
                ch = self.source.channel(),
                words = format_words(&self.record.data, self.source.device().is_analog())
            );
        }

        Ok(&self.record)
    }

    fn config(&self) -> &ChannelConfig {
        self.source.config()
    }
}

/// Hands out everything the source has buffered as a single record.
pub struct PassthroughSplitter<S: WordSource> {
    source: S,
    record: RawEvent,
}

impl<S: WordSource> PassthroughSplitter<S> {
    /// Create a passthrough splitter pulling from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            record: RawEvent::default(),
        }
    }

    /// Access the word source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: WordSource> RawEventSource for PassthroughSplitter<S> {
    fn read(&mut self) -> Result<&RawEvent, PipeError> {
        self.record.clear();
        loop {
            match self.source.read_next() {
                Ok(word) => self.record.add(word),
                Err(PipeError::BufferEmpty) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(&self.record)
    }

    fn config(&self) -> &ChannelConfig {
        self.source.config()
    }
}
