//! Contains the [DtbEventDecoder] turning [RawEvent] records into [Event]s
//!
//! The decode path is picked per record from the channel configuration:
//! - Analog ROCs are decoded from ADC samples.
//! - Digital ROCs behind a real TBM are decoded from the DESER400 word stream.
//! - Everything else is decoded from the DESER160 word stream.
//!
//! If the channel has a TBM (emulated or real) its header and trailer are checked and stripped first.
//!
//! Problems with single pixel hits are counted and the hit is skipped. Problems that invalidate
//! the whole event abort the decoding internally and yield an empty [Event], the decoder stays usable.

use super::RawEventSource;
use crate::source::{ChannelConfig, PipeError};
use crate::stats::decoding_stats::DecodingStatistics;
use crate::words::device::{DecoderFlags, TbmType};
use crate::words::event::Event;
use crate::words::pixel::{Pixel, PixelDecodeError};
use crate::words::raw_event::RawEvent;
use analog::AnalogLevels;
use deser400_fsm::{BrokenTbmPair, Deser400Fsm, Deser400Word};
use flawed_dump::FlawedEventDump;
use readback::{ReadbackCollector, ReadbackCycle};
use thiserror::Error;

mod analog;
mod deser400_fsm;
mod flawed_dump;
mod readback;

/// Link errors reported by the DESER400 in place of a TBM trailer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Deser400Error {
    /// No data received on the link
    #[error("no data")]
    NoData,
    /// Idle pattern instead of a TBM trailer
    #[error("idle data")]
    IdleData,
    /// Invalid 5-bit code word
    #[error("code error")]
    CodeError,
    /// Frame error
    #[error("frame error")]
    FrameError,
}

// Conditions that invalidate the whole event
#[derive(Debug, Error)]
enum DecodeAbort {
    #[error("{0} words are too few for TBM header and trailer")]
    TooShort(usize),
    #[error("ROC {0} header reports an invalid XOR eye diagram")]
    InvalidXor(i16),
    #[error("DESER400 {0}")]
    Deser400(#[from] Deser400Error),
}

/// Decodes the records of one DAQ channel into events.
pub struct DtbEventDecoder<R: RawEventSource> {
    source: R,
    state: DecoderState,
}

impl<R: RawEventSource> DtbEventDecoder<R> {
    /// Create a decoder pulling records from `source`.
    pub fn new(source: R) -> Self {
        log::debug!("New event decoder for {cfg}", cfg = source.config());
        Self {
            source,
            state: DecoderState::default(),
        }
    }

    /// Decode the next event.
    ///
    /// The returned event stays valid until the next call. Fails only if the upstream stages run out of words.
    pub fn read(&mut self) -> Result<&Event, PipeError> {
        let config = *self.source.config();
        self.state.event.clear();
        let sample = self.source.read()?;
        self.state.decode(sample, &config);
        Ok(&self.state.event)
    }

    /// Hand out the statistics collected since the last call and reset them.
    pub fn get_statistics(&mut self) -> DecodingStatistics {
        let stats = self.state.stats;
        self.state.stats.clear();
        stats
    }

    /// Hand out the readback words per ROC collected since the last call.
    pub fn get_readback(&mut self) -> Vec<Vec<u16>> {
        self.state.readback.take()
    }

    /// Hand out the XOR nibbles of the ROC headers collected since the last call.
    ///
    /// Only collected with [DecoderFlags::ENABLE_XORSUM_LOGGING] on the DESER400 path.
    pub fn get_xor_sum(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.state.xor_sum)
    }

    /// Reset statistics, readback state and the event ID baseline.
    pub fn clear(&mut self) {
        log::debug!("Channel {ch}: clearing decoder", ch = self.source.config().channel);
        self.state.stats.clear();
        self.state.readback.clear();
        self.state.xor_sum.clear();
        self.state.event_id = None;
    }

    /// Event ID expected for the next TBM header, `None` until the first header is seen
    pub fn expected_event_id(&self) -> Option<u8> {
        self.state.event_id
    }

    /// Configuration of the decoded channel
    pub fn config(&self) -> &ChannelConfig {
        self.source.config()
    }

    /// Access the upstream stage.
    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }
}

// Everything the decoder owns apart from its source, so records borrowed from the source can be decoded in place
#[derive(Default)]
struct DecoderState {
    event: Event,
    stats: DecodingStatistics,
    readback: ReadbackCollector,
    xor_sum: Vec<u8>,
    event_id: Option<u8>,
    levels: AnalogLevels,
    fsm: Deser400Fsm,
    flawed: FlawedEventDump,
}

impl DecoderState {
    const ROC_HEADER_XOR_MASK: u16 = 0x0ff0;
    const LINK_ERROR_BIT: u16 = 0x1000;
    const DESER160_ROC_HEADER_MASK: u16 = 0x0ffc;
    const DESER160_ROC_HEADER: u16 = 0x07f8;
    const DUMMY_HIT: u32 = 0x00ff_ffff;

    fn decode(&mut self, sample: &RawEvent, config: &ChannelConfig) {
        let errors_before = self.stats.errors();
        let flawed_before = self.flawed_error_sum();

        if sample.is_start_error() {
            self.stats.errors_event_start += 1;
        }
        if sample.is_end_error() {
            self.stats.errors_event_stop += 1;
        }
        if sample.is_overflow() {
            self.stats.errors_event_overflow += 1;
        }
        self.stats.info_words_read += sample.len() as u64;

        if let Err(abort) = self.decode_payload(&sample.data, config) {
            log::debug!("Channel {ch}: event discarded, {abort}", ch = config.channel);
            self.event.clear_content();
        }

        self.event.error_count = self.stats.errors().saturating_sub(errors_before);

        if config.flags.contains(DecoderFlags::DUMP_FLAWED_EVENTS) {
            let flawed = self.flawed_error_sum() != flawed_before;
            if let Some(events) = self.flawed.record(sample.to_string(), flawed) {
                log::error!(
                    "Channel {ch}: dumping the flawed event +- 3 events:",
                    ch = config.channel
                );
                events.iter().for_each(|ev| log::error!("{ev}"));
            }
        }

        log::debug!("Channel {ch}: {ev}", ch = config.channel, ev = self.event);
    }

    // Pixel decoding problems are excluded, the dump is meant for the more serious ones
    fn flawed_error_sum(&self) -> u32 {
        self.stats.errors_event() + self.stats.errors_tbm() + self.stats.errors_roc()
    }

    fn decode_payload(&mut self, words: &[u16], config: &ChannelConfig) -> Result<(), DecodeAbort> {
        let body = if config.envelope != TbmType::None {
            self.process_tbm(words, config)?
        } else {
            words
        };

        if config.device.is_analog() {
            self.decode_adc(body, config);
        } else if config.envelope.is_deser400() {
            self.decode_deser400(body, config)?;
        } else {
            self.decode_deser160(body, config);
        }
        Ok(())
    }

    /// Check and store TBM header and trailer, returns the words in between.
    fn process_tbm<'a>(
        &mut self,
        words: &'a [u16],
        config: &ChannelConfig,
    ) -> Result<&'a [u16], DecodeAbort> {
        let size = words.len();
        if size < 4 {
            self.stats.errors_tbm_header += 1;
            self.stats.errors_tbm_trailer += 1;
            return Err(DecodeAbort::TooShort(size));
        }

        let (h1, h2) = (words[0], words[1]);
        if h1 & 0xe000 != 0xa000 || h2 & 0xe000 != 0x8000 {
            self.stats.errors_tbm_header += 1;
        }
        self.event.header = pack_tbm_words(h1, h2);
        log::trace!(
            "TBM {ch} header: {summary}",
            ch = config.channel,
            summary = self.event.header_summary()
        );

        let (t1, t2) = (words[size - 2], words[size - 1]);
        if t1 & 0xe000 != 0xe000 || t2 & 0xe000 != 0xc000 {
            self.stats.errors_tbm_trailer += 1;
        }
        let link_error = [t1, t2]
            .into_iter()
            .find(|w| w & Self::LINK_ERROR_BIT != 0);
        if link_error.is_none() {
            self.event.trailer = pack_tbm_words(t1, t2);
            log::trace!(
                "TBM {ch} trailer: {summary}",
                ch = config.channel,
                summary = self.event.trailer_summary()
            );
        }

        self.check_event_id(config);

        if let Some(word) = link_error {
            return Err(self.eval_deser400_error(word, config).into());
        }
        Ok(&words[2..size - 2])
    }

    /// Count the link error flags of a DESER400 error word and return the first one.
    fn eval_deser400_error(&mut self, word: u16, config: &ChannelConfig) -> Deser400Error {
        let mut first = None;
        if word & 0x0100 != 0 {
            self.stats.errors_event_nodata += 1;
            first = first.or(Some(Deser400Error::NoData));
        }
        if word & 0x0200 != 0 {
            self.stats.errors_event_idledata += 1;
            first = first.or(Some(Deser400Error::IdleData));
        }
        if word & 0x0400 != 0 {
            self.stats.errors_event_invalid_words += 1;
            first = first.or(Some(Deser400Error::CodeError));
        }
        if word & 0x0800 != 0 {
            self.stats.errors_event_frame += 1;
            first = first.or(Some(Deser400Error::FrameError));
        }
        // Error word without a reason, treat it as undecodable
        let error = first.unwrap_or_else(|| {
            self.stats.errors_event_invalid_words += 1;
            Deser400Error::CodeError
        });
        log::debug!(
            "Channel {ch}: DESER400 error word {word:#06X}: {error}",
            ch = config.channel
        );
        error
    }

    fn check_event_id(&mut self, config: &ChannelConfig) {
        let tbm_id = self.event.trigger_count();
        let mut expected = *self.event_id.get_or_insert(tbm_id);

        if self.event.has_reset_tbm() {
            log::debug!(
                "Channel {ch}: TBM reset, event ID rebaselined to {tbm_id}",
                ch = config.channel
            );
            expected = tbm_id;
        } else if !config.flags.contains(DecoderFlags::DISABLE_EVENTID_CHECK) && tbm_id != expected
        {
            log::error!(
                "Channel {ch} event ID mismatch: local ID ({expected}) != TBM ID ({tbm_id})",
                ch = config.channel
            );
            self.stats.errors_tbm_eventid_mismatch += 1;
            expected = tbm_id;
        }

        self.event_id = Some(expected.wrapping_add(1));
    }

    fn decode_deser400(&mut self, body: &[u16], config: &ChannelConfig) -> Result<(), DecodeAbort> {
        let mut roc_n: i16 = -1;
        let invert = config.device.inverted_address();
        let linear = config.device.linear_address();
        let mut tbm_word = 0;

        self.fsm.reset_fsm();
        let mut idx = 0;
        while idx < body.len() {
            let word = body[idx];
            let kind = match self.fsm.advance(word) {
                Ok(kind) => kind,
                Err(BrokenTbmPair::Header(kind)) => {
                    self.stats.errors_tbm_header += 1;
                    kind
                }
                Err(BrokenTbmPair::Trailer(kind)) => {
                    self.stats.errors_tbm_trailer += 1;
                    kind
                }
            };

            match kind {
                Deser400Word::RocHeader => {
                    roc_n += 1;
                    if word & Self::ROC_HEADER_XOR_MASK == Self::ROC_HEADER_XOR_MASK {
                        log::error!(
                            "Channel {ch} ROC {roc_n} header reports DESER400 failure",
                            ch = config.channel
                        );
                        self.stats.errors_event_invalid_xor += 1;
                        return Err(DecodeAbort::InvalidXor(roc_n));
                    }
                    if config.flags.contains(DecoderFlags::ENABLE_XORSUM_LOGGING) {
                        self.xor_sum
                            .push(((word & Self::ROC_HEADER_XOR_MASK) >> 4) as u8);
                    }
                    if config.device.has_readback() {
                        self.eval_readback(roc_n as u8, word, config);
                    }
                }
                Deser400Word::Pixel => {
                    if body.len() - idx < 2 {
                        self.stats.errors_pixel_incomplete += 1;
                        break;
                    }
                    idx += 1;
                    let raw = pack_hit(word, body[idx]);
                    if config.envelope >= TbmType::Tbm09 && raw == Self::DUMMY_HIT {
                        log::trace!("Empty hit detected (TBM09 data streams), skipping");
                    } else {
                        let roc_id = (roc_n + i16::from(config.chain_offset)) as u8;
                        self.decode_pixel(raw, roc_id, invert, linear);
                    }
                }
                Deser400Word::TbmHeader | Deser400Word::TbmTrailer => tbm_word = word,
                Deser400Word::TbmHeaderContinuation => {
                    log::trace!(
                        "Channel {ch}: out-of-band TBM header {:04X} {word:04X}",
                        tbm_word,
                        ch = config.channel
                    );
                }
                Deser400Word::TbmTrailerContinuation => {
                    if let Some(error_word) = [tbm_word, word]
                        .into_iter()
                        .find(|w| w & Self::LINK_ERROR_BIT != 0)
                    {
                        return Err(self.eval_deser400_error(error_word, config).into());
                    }
                    // Status of every TBM core counts for the event
                    self.event.trailer |= pack_tbm_words(tbm_word, word);
                }
                Deser400Word::Unknown => {
                    log::trace!("Channel {ch}: skipping word {word:04X}", ch = config.channel);
                }
            }
            idx += 1;
        }

        match self.fsm.pending() {
            Some(BrokenTbmPair::Header(_)) => self.stats.errors_tbm_header += 1,
            Some(BrokenTbmPair::Trailer(_)) => self.stats.errors_tbm_trailer += 1,
            None => (),
        }

        self.check_event_validity(roc_n, config);
        Ok(())
    }

    fn decode_deser160(&mut self, body: &[u16], config: &ChannelConfig) {
        let mut roc_n: i16 = -1;
        let invert = config.device.inverted_address();
        let linear = config.device.linear_address();

        let mut idx = 0;
        while idx < body.len() {
            let word = body[idx];
            if word & Self::DESER160_ROC_HEADER_MASK == Self::DESER160_ROC_HEADER {
                roc_n += 1;
                if config.device.has_readback() {
                    self.eval_readback(roc_n as u8, word & 0x0fff, config);
                }
            } else if roc_n >= 0 {
                if body.len() - idx < 2 {
                    self.stats.errors_pixel_incomplete += 1;
                } else {
                    idx += 1;
                    let raw = pack_hit(word, body[idx]);
                    let roc_id = (roc_n + i16::from(config.chain_offset)) as u8;
                    self.decode_pixel(raw, roc_id, invert, linear);
                }
            }
            idx += 1;
        }

        self.check_event_validity(roc_n, config);
    }

    fn decode_adc(&mut self, body: &[u16], config: &ChannelConfig) {
        let mut roc_n: i16 = -1;

        let mut idx = 0;
        while idx < body.len() {
            let remaining = body.len() - idx;
            // Not even a ROC header left, assume half a pixel hit
            if remaining < 2 {
                self.stats.errors_pixel_incomplete += 1;
                break;
            }

            let (ultrablack, black) = (body[idx], body[idx + 1]);
            // The first two words are always taken as ROC header, they seed the level estimate
            if roc_n < 0 || self.levels.is_roc_header(ultrablack, black) {
                roc_n += 1;
                if let Some(&last_dac) = body.get(idx + 2) {
                    self.eval_last_dac(roc_n as u8, last_dac & 0x0fff, config);
                }
                self.levels.average(ultrablack, black);
                log::trace!(
                    "ROC header: {ub} (avg. {avg_ub}) (UB) {b} (avg. {avg_b}) (B)",
                    ub = crate::words::pixel::expand_sign(ultrablack),
                    avg_ub = self.levels.ultrablack(),
                    b = crate::words::pixel::expand_sign(black),
                    avg_b = self.levels.black()
                );
                idx += 3;
                continue;
            }

            if remaining < 6 {
                self.stats.errors_pixel_incomplete += 1;
                break;
            }
            let mut samples = [0u16; 6];
            samples
                .iter_mut()
                .zip(&body[idx..idx + 6])
                .for_each(|(s, w)| *s = w & 0x0fff);
            let roc_id = (roc_n + i16::from(config.chain_offset)) as u8;
            match Pixel::from_analog(
                &samples,
                roc_id,
                self.levels.ultrablack(),
                self.levels.black(),
            ) {
                Ok(pixel) => {
                    self.event.pixels.push(pixel);
                    self.stats.info_pixels_valid += 1;
                }
                Err(_) => self.stats.errors_pixel_address += 1,
            }
            idx += 6;
        }

        self.check_event_validity(roc_n, config);
    }

    fn decode_pixel(&mut self, raw: u32, roc_id: u8, invert: bool, linear: bool) {
        match Pixel::decode(raw, roc_id, invert, linear) {
            Ok(pixel) => {
                self.event.pixels.push(pixel);
                self.stats.info_pixels_valid += 1;
            }
            Err(PixelDecodeError::InvalidAddress) => self.stats.errors_pixel_address += 1,
            Err(PixelDecodeError::InvalidPulseheight) => self.stats.errors_pixel_pulseheight += 1,
            Err(PixelDecodeError::CorruptBuffer) => self.stats.errors_pixel_buffer_corrupt += 1,
        }
    }

    fn check_event_validity(&mut self, roc_n: i16, config: &ChannelConfig) {
        let rocs_seen = roc_n + 1;
        let chain_length = i16::from(config.chain_length());
        let no_token_pass = self.event.has_no_token_pass();

        if no_token_pass && self.event.has_pkam_reset() {
            log::warn!(
                "Channel {ch}: PKAM reset with NoTokenPass, discarding event",
                ch = config.channel
            );
            self.stats.errors_event_pkam += 1;
            self.invalidate_event();
        } else if no_token_pass && rocs_seen > 0 {
            log::warn!(
                "Channel {ch}: {rocs_seen} ROC header(s) despite NoTokenPass",
                ch = config.channel
            );
            self.stats.errors_event_notokenpass += 1;
            self.invalidate_event();
        } else if !no_token_pass && rocs_seen != chain_length {
            log::error!(
                "Channel {ch} number of ROCs ({rocs_seen}) != token chain length ({chain_length})",
                ch = config.channel
            );
            self.stats.errors_roc_missing += 1;
            self.invalidate_event();
        } else if self.event.pixels.is_empty() {
            self.stats.info_events_empty += 1;
            log::trace!("Event is empty");
        } else {
            self.stats.info_events_valid += 1;
            log::trace!("Event is valid");
        }
    }

    // Broken token passing also breaks the readback bit stream of this cycle
    fn invalidate_event(&mut self) {
        self.readback.mark_dirty();
        self.event.clear_content();
    }

    fn eval_readback(&mut self, roc: u8, value: u16, config: &ChannelConfig) {
        if config
            .flags
            .contains(DecoderFlags::DISABLE_READBACK_COLLECTION)
        {
            return;
        }
        match self.readback.eval(roc, value) {
            ReadbackCycle::Collecting => (),
            ReadbackCycle::Complete(word) => log::debug!(
                "Channel {ch} readback ROC {roc}: {reg} ({reg:#04X}): {val} ({val:#04X})",
                ch = config.channel,
                reg = word >> 8,
                val = word & 0xff
            ),
            ReadbackCycle::Ignored(bits) => log::debug!(
                "Channel {ch} ROC {roc}: first readback marker after {bits} readouts, ignoring error condition",
                ch = config.channel
            ),
            ReadbackCycle::Misaligned(bits) => {
                log::warn!(
                    "Channel {ch} ROC {roc}: readback start marker after {bits} readouts",
                    ch = config.channel
                );
                self.stats.errors_roc_readback += 1;
            }
        }
    }

    fn eval_last_dac(&mut self, roc: u8, value: u16, config: &ChannelConfig) {
        if config
            .flags
            .contains(DecoderFlags::DISABLE_READBACK_COLLECTION)
        {
            return;
        }
        self.readback.push_last_dac(roc, value);
        log::trace!(
            "Channel {ch} readback ROC {roc}: last DAC {dac}",
            ch = config.channel,
            dac = crate::words::pixel::expand_sign(value)
        );
    }
}

/// Pack two TBM words into their 16 payload bits.
fn pack_tbm_words(first: u16, second: u16) -> u16 {
    ((first & 0x00ff) << 8) | (second & 0x00ff)
}

/// Pack the 12 payload bits of the two words of a digital hit.
fn pack_hit(first: u16, second: u16) -> u32 {
    (u32::from(first & 0x0fff) << 12) | u32::from(second & 0x0fff)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::{self, event_words, pixel_words, roc_header, tbm_header, tbm_trailer};
    use crate::pipe::splitter::DtbEventSplitter;
    use crate::source::buffer_source::BufferSource;
    use crate::words::device::RocType;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    fn decoder(
        config: ChannelConfig,
        words: &[u16],
    ) -> DtbEventDecoder<DtbEventSplitter<BufferSource>> {
        let mut source = BufferSource::new(config);
        source.add_words(words);
        DtbEventDecoder::new(DtbEventSplitter::new(source))
    }

    // Hands out prepared records, bypasses the framing of the splitter
    struct Records {
        config: ChannelConfig,
        queue: VecDeque<RawEvent>,
        current: RawEvent,
    }

    impl Records {
        fn new(config: ChannelConfig, records: &[&[u16]]) -> Self {
            Self {
                config,
                queue: records.iter().map(|r| RawEvent::from_words(r)).collect(),
                current: RawEvent::default(),
            }
        }
    }

    impl RawEventSource for Records {
        fn read(&mut self) -> Result<&RawEvent, PipeError> {
            self.current = self.queue.pop_front().ok_or(PipeError::BufferEmpty)?;
            Ok(&self.current)
        }

        fn config(&self) -> &ChannelConfig {
            &self.config
        }
    }

    fn tbm08b(chain_length: u8) -> ChannelConfig {
        ChannelConfig::new(0, TbmType::Tbm08b, RocType::Psi46digv21respin)
            .with_chain_length(chain_length)
    }

    fn deser400_event(trigger: u8, rocs: usize) -> Vec<u16> {
        event_words(&tbm08b(rocs as u8), trigger, &vec![vec![]; rocs], false)
    }

    #[test]
    fn deser400_event_with_hits() {
        let config = tbm08b(2).with_chain_offset(4);
        let hits = vec![
            vec![Pixel::new(4, 10, 20, 90.0)],
            vec![Pixel::new(5, 1, 2, 85.0), Pixel::new(5, 51, 79, 99.0)],
        ];
        let words = event_words(&config, 17, &hits, false);
        let mut dec = decoder(config, &words);

        let event = dec.read().unwrap();
        assert_eq!(event.trigger_count(), 17);
        assert_eq!(event.pixels, hits.concat());
        assert_eq!(event.pixels[2].value(), 99.0);
        assert_eq!(event.error_count, 0);

        let stats = dec.get_statistics();
        assert_eq!(stats.info_events_valid, 1);
        assert_eq!(stats.info_pixels_valid, 3);
        assert_eq!(stats.info_words_read, words.len() as u64);
        assert_eq!(stats.errors(), 0);
    }

    #[test]
    fn event_id_wraps_without_mismatch() {
        let words: Vec<u16> = (0..=256u32)
            .flat_map(|i| deser400_event((i % 256) as u8, 2))
            .collect();
        let mut dec = decoder(tbm08b(2), &words);
        for i in 0..=256u32 {
            assert_eq!(dec.read().unwrap().trigger_count(), (i % 256) as u8);
        }
        assert_eq!(dec.expected_event_id(), Some(1));
        let stats = dec.get_statistics();
        assert_eq!(stats.errors_tbm_eventid_mismatch, 0);
        assert_eq!(stats.info_events_empty, 257);
    }

    #[test]
    fn event_id_glitch_counts_once() {
        let words: Vec<u16> = [0, 1, 2, 6, 7, 8]
            .into_iter()
            .flat_map(|trigger| deser400_event(trigger, 1))
            .collect();
        let mut dec = decoder(tbm08b(1), &words);
        for _ in 0..6 {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.get_statistics().errors_tbm_eventid_mismatch, 1);
        assert_eq!(dec.expected_event_id(), Some(9));
    }

    #[test]
    fn event_id_check_can_be_disabled() {
        let words: Vec<u16> = [0, 5, 9]
            .into_iter()
            .flat_map(|trigger| deser400_event(trigger, 1))
            .collect();
        let config = tbm08b(1).with_flags(DecoderFlags::DISABLE_EVENTID_CHECK);
        let mut dec = decoder(config, &words);
        for _ in 0..3 {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.get_statistics().errors_tbm_eventid_mismatch, 0);
    }

    #[test]
    fn tbm_reset_rebaselines_event_id() {
        let mut words = deser400_event(0, 1);
        words.extend(tbm_header(40));
        words.push(roc_header(TbmType::Tbm08b));
        words.extend(tbm_trailer(false, true, false));
        words.extend(deser400_event(41, 1));
        let mut dec = decoder(tbm08b(1), &words);
        for _ in 0..3 {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.get_statistics().errors_tbm_eventid_mismatch, 0);
    }

    #[test]
    fn missing_rocs_invalidate_the_event() {
        let config = tbm08b(8);
        let hits = vec![vec![Pixel::new(0, 1, 1, 90.0)]; 6];
        let words = event_words(&config, 0, &hits, false);
        let mut dec = decoder(config, &words);

        let event = dec.read().unwrap();
        assert!(event.pixels.is_empty());
        assert_eq!(event.error_count, 1);
        let stats = dec.get_statistics();
        assert_eq!(stats.errors_roc_missing, 1);
        assert_eq!(stats.info_events_valid, 0);
        assert_eq!(stats.info_events_empty, 0);
    }

    #[test]
    fn no_token_pass_and_pkam() {
        let mut words = Vec::from(tbm_header(0));
        words.push(roc_header(TbmType::Tbm08b));
        words.extend(tbm_trailer(true, false, false));
        // PKAM reset reported together with NoTokenPass
        words.extend(tbm_header(1));
        words.extend([0xe080, 0xc042]);
        // NoTokenPass without any ROC is a regular empty event
        words.extend(tbm_header(2));
        words.extend(tbm_trailer(true, false, false));
        let mut dec = decoder(tbm08b(1), &words);
        for _ in 0..3 {
            let _ = dec.read().unwrap();
        }
        let stats = dec.get_statistics();
        assert_eq!(stats.errors_event_notokenpass, 1);
        assert_eq!(stats.errors_event_pkam, 1);
        assert_eq!(stats.errors_roc_missing, 0);
        assert_eq!(stats.info_events_empty, 1);
    }

    #[test]
    fn too_short_event_is_discarded() {
        let records: [&[u16]; 1] = [&[0xa000, 0xc000]];
        let mut dec = DtbEventDecoder::new(Records::new(tbm08b(1), &records));
        let event = dec.read().unwrap();
        assert_eq!(event.header, 0);
        assert_eq!(event.error_count, 2);
        let stats = dec.get_statistics();
        assert_eq!(stats.errors_tbm_header, 1);
        assert_eq!(stats.errors_tbm_trailer, 1);
        assert_eq!(stats.info_events_total(), 0);
    }

    #[test]
    fn link_error_aborts_event() {
        let records: [&[u16]; 2] = [
            &[0xa000, 0x8000, 0x4001, 0x0000, 0x2000, 0xf100, 0xc000],
            &[0xa001, 0x8000, 0x4001, 0xe000, 0xd600],
        ];
        let mut dec = DtbEventDecoder::new(Records::new(tbm08b(1), &records));

        let event = dec.read().unwrap();
        assert!(event.pixels.is_empty());
        assert_eq!(event.trailer, 0);
        let event = dec.read().unwrap();
        assert_eq!(event.error_count, 2);

        let stats = dec.get_statistics();
        assert_eq!(stats.errors_event_nodata, 1);
        assert_eq!(stats.errors_event_idledata, 1);
        assert_eq!(stats.errors_event_invalid_words, 1);
        assert_eq!(stats.info_pixels_valid, 0);
        assert_eq!(stats.errors_tbm_eventid_mismatch, 0);
    }

    #[test]
    fn eval_deser400_error_picks_first_reason() {
        let mut state = DecoderState::default();
        let config = tbm08b(1);
        assert_eq!(
            state.eval_deser400_error(0x1a00, &config),
            Deser400Error::IdleData
        );
        assert_eq!(
            state.eval_deser400_error(0x1800, &config),
            Deser400Error::FrameError
        );
        assert_eq!(
            state.eval_deser400_error(0x1000, &config),
            Deser400Error::CodeError
        );
        assert_eq!(state.stats.errors_event_frame, 2);
        assert_eq!(state.stats.errors_event_idledata, 1);
        assert_eq!(state.stats.errors_event_invalid_words, 1);
    }

    #[test]
    fn invalid_xor_aborts_event() {
        let words = [
            0xa000, 0x8000, 0x4001, 0x4ff0, 0x0000, 0x2000, 0xe000, 0xc000,
        ];
        let mut dec = decoder(tbm08b(2), &words);
        let event = dec.read().unwrap();
        assert!(event.pixels.is_empty());
        let stats = dec.get_statistics();
        assert_eq!(stats.errors_event_invalid_xor, 1);
        assert_eq!(stats.errors_roc_missing, 0);
    }

    #[test]
    fn xor_sum_logging() {
        let words = [0xa000, 0x8000, 0x4011, 0x4a50, 0xe000, 0xc000];
        let config = tbm08b(2).with_flags(DecoderFlags::ENABLE_XORSUM_LOGGING);
        let mut dec = decoder(config, &words);
        let _ = dec.read().unwrap();
        assert_eq!(dec.get_xor_sum(), vec![0x01, 0xa5]);
        assert!(dec.get_xor_sum().is_empty());
    }

    #[test]
    fn dummy_fill_is_skipped_for_tbm09() {
        let config = ChannelConfig::new(0, TbmType::Tbm09, RocType::Psi46digv21respin)
            .with_chain_length(1);
        let hits = vec![vec![Pixel::new(0, 3, 3, 88.0)]];
        let words = event_words(&config, 1, &hits, true);
        let mut dec = decoder(config, &words);
        let event = dec.read().unwrap();
        assert_eq!(event.pixels, hits.concat());
        assert_eq!(dec.get_statistics().errors(), 0);

        // Older TBMs have no fill, the same word pair is a broken hit
        let config = tbm08b(1);
        let words = event_words(&config, 1, &hits, true);
        let mut dec = decoder(config, &words);
        assert_eq!(dec.read().unwrap().pixels.len(), 1);
        assert_eq!(dec.get_statistics().errors_pixel(), 1);
    }

    #[test]
    fn out_of_band_tbm_words() {
        let records: [&[u16]; 2] = [
            // Trailer of a second TBM core in the middle of the data
            &[0xa000, 0x8000, 0x4001, 0xe080, 0xc000, 0x4001, 0xe000, 0xc000],
            // Header without its continuation word
            &[0xa001, 0x8000, 0xa055, 0x4001, 0xe000, 0xc000],
        ];
        let mut dec = DtbEventDecoder::new(Records::new(tbm08b(2), &records));

        let event = dec.read().unwrap();
        // NoTokenPass of the out-of-band trailer with two ROC headers
        assert!(event.pixels.is_empty());
        let stats = dec.get_statistics();
        assert_eq!(stats.errors_event_notokenpass, 1);
        assert_eq!(stats.errors_tbm_trailer, 0);

        let _ = dec.read().unwrap();
        let stats = dec.get_statistics();
        assert_eq!(stats.errors_tbm_header, 1);
        // Only one ROC header left in a chain of two
        assert_eq!(stats.errors_roc_missing, 1);
    }

    #[test]
    fn pending_out_of_band_pair_is_an_error() {
        let records: [&[u16]; 1] = [&[0xa000, 0x8000, 0x4001, 0xe000, 0xe000, 0xc000]];
        let mut dec = DtbEventDecoder::new(Records::new(tbm08b(1), &records));
        let _ = dec.read().unwrap();
        assert_eq!(dec.get_statistics().errors_tbm_trailer, 1);
    }

    #[test]
    fn incomplete_hit() {
        let records: [&[u16]; 1] = [&[0xa000, 0x8000, 0x4001, 0x0123, 0xe000, 0xc000]];
        let mut dec = DtbEventDecoder::new(Records::new(tbm08b(1), &records));
        let event = dec.read().unwrap();
        assert_eq!(event.error_count, 1);
        assert_eq!(dec.get_statistics().errors_pixel_incomplete, 1);
    }

    fn readback_headers(word: u16) -> Vec<u16> {
        // 16 data bits MSB first, the marker comes with the last bit
        (0..16)
            .map(|bit| {
                let data = (word >> (15 - bit)) & 0x1;
                let marker = if bit == 15 { 0x2 } else { 0x0 };
                0x4000 | marker | data
            })
            .collect()
    }

    #[test]
    fn readback_is_reassembled_from_roc_headers() {
        let mut headers = vec![0x4002];
        headers.extend(readback_headers(0x1234));
        headers.extend(readback_headers(0xabcd));

        let mut words = Vec::new();
        for (trigger, header) in headers.iter().enumerate() {
            words.extend(tbm_header(trigger as u8));
            words.push(*header);
            words.extend(tbm_trailer(false, false, false));
        }
        let mut dec = decoder(tbm08b(1), &words);
        for _ in 0..headers.len() {
            let _ = dec.read().unwrap();
        }
        // The first marker arrives after a single bit, inside the grace period
        assert_eq!(dec.get_readback(), vec![vec![0x1234, 0xabcd]]);
        assert!(dec.get_readback().is_empty());
        assert_eq!(dec.get_statistics().errors_roc_readback, 0);
    }

    #[test]
    fn readback_misalignment_is_counted() {
        let mut headers = readback_headers(0x00ff);
        // Misaligned marker after 3 bits
        headers.extend([0x4000, 0x4000, 0x4002]);
        let mut words = Vec::new();
        for (trigger, header) in headers.iter().enumerate() {
            words.extend(tbm_header(trigger as u8));
            words.push(*header);
            words.extend(tbm_trailer(false, false, false));
        }

        let mut dec = decoder(tbm08b(1), &words);
        for _ in 0..headers.len() {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.get_statistics().errors_roc_readback, 1);

        let config = tbm08b(1).with_flags(DecoderFlags::DISABLE_READBACK_COLLECTION);
        let mut dec = decoder(config, &words);
        for _ in 0..headers.len() {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.get_statistics().errors_roc_readback, 0);
        assert!(dec.get_readback().is_empty());
    }

    fn events_with_roc_headers(headers: &[u16], first_trigger: u8) -> Vec<u16> {
        let mut words = Vec::new();
        for (n, header) in headers.iter().enumerate() {
            words.extend(tbm_header(first_trigger.wrapping_add(n as u8)));
            words.push(*header);
            words.extend(tbm_trailer(false, false, false));
        }
        words
    }

    #[test]
    fn short_readback_cycle_after_first_marker_is_counted() {
        // Marker, then 4 plain bits and a marker: a 5 bit cycle without any complete word before it
        let headers = [0x4002, 0x4000, 0x4000, 0x4000, 0x4000, 0x4002];
        let mut dec = decoder(tbm08b(1), &events_with_roc_headers(&headers, 0));
        for _ in 0..headers.len() {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.get_statistics().errors_roc_readback, 1);
        assert!(dec.get_readback()[0].is_empty());
    }

    #[test]
    fn fetching_readback_does_not_restart_grace_period() {
        let mut headers = vec![0x4002];
        headers.extend(readback_headers(0x5a5a));
        let words = events_with_roc_headers(&headers, 0);
        let short_cycle = events_with_roc_headers(&[0x4000, 0x4000, 0x4002], headers.len() as u8);

        let mut source = BufferSource::new(tbm08b(1));
        source.add_words(&words);
        let mut dec = DtbEventDecoder::new(DtbEventSplitter::new(source));
        for _ in 0..headers.len() {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.get_readback(), vec![vec![0x5a5a]]);

        dec.source_mut().source_mut().add_words(&short_cycle);
        for _ in 0..3 {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.get_statistics().errors_roc_readback, 1);
    }

    #[test]
    fn statistics_are_read_and_cleared() {
        let mut dec = decoder(tbm08b(1), &deser400_event(0, 1));
        let _ = dec.read().unwrap();
        let first = dec.get_statistics();
        assert_eq!(first.info_events_empty, 1);
        assert_eq!(dec.get_statistics(), DecodingStatistics::default());
    }

    #[test]
    fn clear_resets_event_id() {
        let mut dec = decoder(tbm08b(1), &deser400_event(42, 1));
        let _ = dec.read().unwrap();
        assert_eq!(dec.expected_event_id(), Some(43));
        dec.clear();
        assert_eq!(dec.expected_event_id(), None);
        dec.source_mut().source_mut().add_words(&deser400_event(7, 1));
        let _ = dec.read().unwrap();
        assert_eq!(dec.get_statistics().errors_tbm_eventid_mismatch, 0);
    }

    #[test]
    fn deser160_events_from_emulator() {
        let config = ChannelConfig::new(0, TbmType::None, RocType::Psi46dig);
        let mut emu = emulator::Emulator::new(config, 4, 7);
        let events: Vec<_> = (0..50).map(|_| emu.next_event()).collect();
        let words: Vec<u16> = events.iter().flat_map(|ev| ev.words.clone()).collect();

        let mut dec = decoder(config, &words);
        for expected in &events {
            assert_eq!(dec.read().unwrap().pixels, expected.pixels);
        }
        let stats = dec.get_statistics();
        assert_eq!(stats.errors(), 0);
        assert_eq!(stats.info_events_total(), 50);
    }

    #[test]
    fn soft_tbm_events_from_emulator() {
        let config =
            ChannelConfig::new(2, TbmType::Emu, RocType::Psi46digv2).with_chain_offset(3);
        let mut emu = emulator::Emulator::new(config, 3, 11);
        let events: Vec<_> = (0..30).map(|_| emu.next_event()).collect();
        let words: Vec<u16> = events.iter().flat_map(|ev| ev.words.clone()).collect();

        let mut dec = decoder(config, &words);
        for expected in &events {
            let event = dec.read().unwrap();
            assert_eq!(event.trigger_count(), expected.trigger);
            assert_eq!(event.pixels, expected.pixels);
            assert!(event.pixels.iter().all(|p| p.roc_id() == 3));
        }
        assert_eq!(dec.get_statistics().errors(), 0);
    }

    #[test]
    fn analog_events_from_emulator() {
        let config = ChannelConfig::new(0, TbmType::Emu, RocType::Psi46v2).with_chain_length(2);
        let mut emu = emulator::Emulator::new(config, 3, 5);
        let events: Vec<_> = (0..20).map(|_| emu.next_event()).collect();
        let words: Vec<u16> = events.iter().flat_map(|ev| ev.words.clone()).collect();

        let mut dec = decoder(config, &words);
        for expected in &events {
            let event = dec.read().unwrap();
            assert_eq!(event.pixels, expected.pixels);
            for (decoded, emulated) in event.pixels.iter().zip(&expected.pixels) {
                assert_eq!(decoded.value(), emulated.value());
            }
        }
        assert_eq!(dec.get_statistics().errors(), 0);
        // Last DAC of both ROCs for every event
        let readback = dec.get_readback();
        assert_eq!(readback.len(), 2);
        assert!(readback.iter().all(|r| r.len() == 20 && r[0] == 0x0123));
    }

    #[test]
    fn flawed_events_are_dumped() {
        let mut words = Vec::new();
        for trigger in 0..10u8 {
            // Event 5 has a missing ROC
            let rocs = if trigger == 5 { 0 } else { 1 };
            words.extend(tbm_header(trigger));
            words.extend(vec![roc_header(TbmType::Tbm08b); rocs]);
            words.extend(tbm_trailer(false, false, false));
        }
        let config = tbm08b(1).with_flags(DecoderFlags::DUMP_FLAWED_EVENTS);
        let mut dec = decoder(config, &words);
        for _ in 0..10 {
            let _ = dec.read().unwrap();
        }
        assert_eq!(dec.state.flawed.dump_count(), 1);
    }

    #[test]
    fn inverted_address_hits() {
        let config = ChannelConfig::new(0, TbmType::Tbm08, RocType::Psi46dig).with_chain_length(1);
        let hit = Pixel::new(0, 20, 30, 70.0);
        let mut words = Vec::from(tbm_header(0));
        words.push(roc_header(TbmType::Tbm08));
        words.extend(pixel_words(&hit, RocType::Psi46dig));
        words.extend(tbm_trailer(false, false, false));
        let mut dec = decoder(config, &words);
        assert_eq!(dec.read().unwrap().pixels, vec![hit]);
    }
}
