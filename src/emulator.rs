//! Generates synthetic readout streams as the testboard would deliver them
//!
//! Every envelope type is supported, the words follow the hardware layout:
//!
//! | Part          | Words                                                          |
//! |---------------|----------------------------------------------------------------|
//! | TBM header    | `0xa000 \| trigger`, `0x8007`                                    |
//! | ROC header    | `0x47f8` (soft TBM), `0x4001` (DESER400), `0x07f8` (no TBM)     |
//! | Digital hit   | `0x0000 \| raw[23:12]`, `0x2000 \| raw[11:0]`                    |
//! | Analog header | ultrablack, black, last DAC                                    |
//! | Analog hit    | six ADC samples                                                |
//! | TBM trailer   | `0xe000 \| NoTokenPass << 7 \| ResetTBM << 6 \| ResetROC << 5`, `0xc002` |
//!
//! Without TBM the first word of an event carries the start marker and the last word the end marker.
//! Streams are reproducible for a given seed.

use crate::source::ChannelConfig;
use crate::words::device::{RocType, TbmType};
use crate::words::pixel::{Pixel, ROC_NUMCOLS, ROC_NUMROWS};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Ultrablack level of emulated analog ROCs
pub const ANALOG_ULTRABLACK: i16 = -400;
/// Black level of emulated analog ROCs
pub const ANALOG_BLACK: i16 = 100;

/// One emulated trigger: the words on the wire and the hits they encode
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatedEvent {
    /// TBM trigger count
    pub trigger: u8,
    /// Hits in readout order
    pub pixels: Vec<Pixel>,
    /// Words as delivered by the testboard
    pub words: Vec<u16>,
}

/// Generator of events for one DAQ channel.
pub struct Emulator {
    config: ChannelConfig,
    max_hits: u8,
    rng: StdRng,
    event: u32,
}

impl Emulator {
    /// Create an emulator producing up to `max_hits` hits per ROC and event.
    pub fn new(config: ChannelConfig, max_hits: u8, seed: u64) -> Self {
        log::debug!("Emulating {config} with up to {max_hits} hits per ROC, seed {seed}");
        Self {
            config,
            max_hits,
            rng: StdRng::seed_from_u64(seed),
            event: 0,
        }
    }

    /// Configuration of the emulated channel
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Produce the next event.
    pub fn next_event(&mut self) -> EmulatedEvent {
        let trigger = (self.event % 256) as u8;
        self.event += 1;

        let rocs = self.config.chain_length();
        let mut hits_per_roc: Vec<Vec<Pixel>> = Vec::with_capacity(usize::from(rocs));
        for roc in 0..rocs {
            let n_hits = self.rng.gen_range(0..=self.max_hits);
            let mut hits = Vec::with_capacity(usize::from(n_hits));
            for _ in 0..n_hits {
                hits.push(self.random_hit(roc + self.config.chain_offset));
            }
            hits_per_roc.push(hits);
        }

        // A single digital ROC without hits has its start and end marker on the same word, which
        // reads as an empty frame. Real chips always answer with at least their header.
        if self.config.envelope == TbmType::None
            && !self.config.device.is_analog()
            && rocs == 1
            && hits_per_roc[0].is_empty()
        {
            let hit = self.random_hit(self.config.chain_offset);
            hits_per_roc[0].push(hit);
        }

        // Fill pairs of the 4-port TBM on every other event
        let fill = self.config.envelope >= TbmType::Tbm09 && trigger % 2 == 1;
        let words = event_words(&self.config, trigger, &hits_per_roc, fill);
        EmulatedEvent {
            trigger,
            pixels: hits_per_roc.into_iter().flatten().collect(),
            words,
        }
    }

    /// Produce `events` events as one continuous stream.
    pub fn generate(&mut self, events: usize) -> Vec<u16> {
        (0..events).flat_map(|_| self.next_event().words).collect()
    }

    fn random_hit(&mut self, roc_id: u8) -> Pixel {
        let column = self.rng.gen_range(0..ROC_NUMCOLS);
        let row = self.rng.gen_range(0..ROC_NUMROWS);
        let value = self.rng.gen_range(80..100);
        Pixel::new(roc_id, column, row, f64::from(value))
    }
}

/// Words of one complete event with the given hits per ROC.
///
/// With `fill` set one dummy all-ones hit is appended after the last ROC, as the 4-port TBM does for idle links.
pub fn event_words(
    config: &ChannelConfig,
    trigger: u8,
    hits_per_roc: &[Vec<Pixel>],
    fill: bool,
) -> Vec<u16> {
    let mut words = Vec::new();
    if config.envelope != TbmType::None {
        words.extend(tbm_header(trigger));
    }

    for hits in hits_per_roc {
        if config.device.is_analog() {
            words.extend(analog_roc_header(0x0123));
            for hit in hits {
                words.extend(analog_pixel_words(hit, ANALOG_ULTRABLACK, ANALOG_BLACK));
            }
        } else {
            words.push(roc_header(config.envelope));
            for hit in hits {
                words.extend(pixel_words(hit, config.device));
            }
        }
    }
    if fill {
        words.extend([0x0fff, 0x2fff]);
    }

    if config.envelope != TbmType::None {
        words.extend(tbm_trailer(hits_per_roc.is_empty(), false, false));
    } else if let Some(first) = words.first_mut() {
        *first = 0x8000 | (*first & 0x0fff);
        if let Some(last) = words.last_mut() {
            *last = 0x4000 | (*last & 0x8fff);
        }
    }
    words
}

/// TBM header word pair
pub fn tbm_header(trigger: u8) -> [u16; 2] {
    [0xa000 | u16::from(trigger), 0x8007]
}

/// TBM trailer word pair
pub fn tbm_trailer(no_token_pass: bool, reset_tbm: bool, reset_roc: bool) -> [u16; 2] {
    [
        0xe000
            | (u16::from(no_token_pass) << 7)
            | (u16::from(reset_tbm) << 6)
            | (u16::from(reset_roc) << 5),
        0xc002,
    ]
}

/// ROC header word of a digital chip
pub fn roc_header(envelope: TbmType) -> u16 {
    match envelope {
        TbmType::Emu => 0x47f8,
        TbmType::None => 0x07f8,
        _ => 0x4001,
    }
}

/// Transport words of a digital hit in the address layout of `device`
pub fn pixel_words(pixel: &Pixel, device: RocType) -> [u16; 2] {
    let raw = if device.linear_address() {
        pixel.encode_linear()
    } else if device.inverted_address() {
        // Row digits are transmitted inverted
        pixel.encode() ^ 0x0003_fe00
    } else {
        pixel.encode()
    };
    [((raw >> 12) & 0x0fff) as u16, 0x2000 | (raw & 0x0fff) as u16]
}

/// Ultrablack, black and last-DAC samples opening the data of an analog chip
pub fn analog_roc_header(last_dac: u16) -> [u16; 3] {
    [
        to_sample(i32::from(ANALOG_ULTRABLACK)),
        to_sample(i32::from(ANALOG_BLACK)),
        last_dac & 0x0fff,
    ]
}

/// Six ADC samples of an analog hit
pub fn analog_pixel_words(pixel: &Pixel, ultrablack: i16, black: i16) -> [u16; 6] {
    let level0 = i32::from(black);
    let level1 = (i32::from(black) - i32::from(ultrablack)) / 4;
    let digit = |d: u32| to_sample(level0 + (d as i32 - 1) * level1);

    let dcol = u32::from(pixel.column()) / 2;
    let r = 2 * (u32::from(ROC_NUMROWS) - u32::from(pixel.row())) + u32::from(pixel.column()) % 2;
    [
        digit(dcol / 6),
        digit(dcol % 6),
        digit(r / 36),
        digit((r % 36) / 6),
        digit(r % 6),
        to_sample(level0 + pixel.value() as i32),
    ]
}

// 12 bit two's complement
fn to_sample(value: i32) -> u16 {
    (value as u16) & 0x0fff
}
