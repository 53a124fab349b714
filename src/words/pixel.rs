//! Contains the [Pixel] hit and the codecs that translate between hardware words and pixel addresses
//!
//! A digital hit is transported as 24 bits split over two 16-bit words (12 payload bits each):
//!
//! ```text
//! bit:  23..21  20..18  17..15  14..12  11..9   8..5   4   3..0
//!       c1      c0      r2      r1      r0      PH hi  0   PH lo
//! ```
//! The column and row digits are base-6 encoded, the pulse height is split by a fill bit that must be zero.
//! Newer chip generations use a linear address layout instead, see [Pixel::from_raw_linear].
//!
//! Analog chips transmit a hit as six ADC samples, decoded by [Pixel::from_analog] relative to the
//! ultrablack and black reference levels of the chip.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Number of pixel rows on a readout chip
pub const ROC_NUMROWS: u8 = 80;
/// Number of pixel columns on a readout chip
pub const ROC_NUMCOLS: u8 = 52;

/// Failure to turn a raw hit into a [Pixel]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PixelDecodeError {
    /// Decoded row or column is outside the pixel matrix, or an address fill bit is set
    #[error("invalid pixel address")]
    InvalidAddress,
    /// The fill bit between the pulse-height nibbles is set
    #[error("invalid pulse-height fill bit")]
    InvalidPulseheight,
    /// Row decoded as 80, the signature of a corrupted readout buffer
    #[error("corrupt readout buffer (row 80)")]
    CorruptBuffer,
}

/// One decoded pixel hit.
///
/// Identity and ordering is given by `(roc_id, column, row)`, the value is not part of it.
///
/// The value is kept as a 16-bit pulse-height mean (integer units) and the variance as a 16-bit
/// fixed-point fraction of the `[0, 1]` range (values above saturate).
#[derive(Debug, Clone, Copy, Default)]
pub struct Pixel {
    roc_id: u8,
    column: u8,
    row: u8,
    value: i16,
    variance: u16,
}

impl Pixel {
    const PULSEHEIGHT_FILL_BIT: u32 = 0x10;
    const LINEAR_FILL_BITS: u32 = 0x10_1000;

    /// Create a pixel from explicit address and value.
    pub fn new(roc_id: u8, column: u8, row: u8, value: f64) -> Self {
        let mut pixel = Self {
            roc_id,
            column,
            row,
            value: 0,
            variance: 0,
        };
        pixel.set_value(value);
        pixel
    }

    /// Decode a raw 24-bit hit, selecting the address layout from the chip generation flags.
    pub fn decode(
        raw: u32,
        roc_id: u8,
        invert: bool,
        linear: bool,
    ) -> Result<Self, PixelDecodeError> {
        if linear {
            Self::from_raw_linear(raw, roc_id)
        } else {
            Self::from_raw(raw, roc_id, invert)
        }
    }

    /// Decode a raw 24-bit hit with the base-6 address layout.
    ///
    /// If `invert` is set every row digit is XOR'ed with `0x7` before decoding.
    pub fn from_raw(raw: u32, roc_id: u8, invert: bool) -> Result<Self, PixelDecodeError> {
        let value = Self::pulseheight(raw)?;

        let digit = |shift: u32| -> i32 {
            let d = ((raw >> shift) & 0x7) as i32;
            if invert {
                d ^ 0x7
            } else {
                d
            }
        };
        let r = digit(15) * 36 + digit(12) * 6 + digit(9);
        let row = i32::from(ROC_NUMROWS) - r / 2;
        let column = 2 * (((raw >> 21) & 0x7) as i32 * 6 + ((raw >> 18) & 0x7) as i32) + (r & 1);

        let (column, row) = Self::check_address(column, row)?;
        Ok(Self::new(roc_id, column, row, f64::from(value)))
    }

    /// Decode a raw 24-bit hit with the linear address layout of the latest chip generation.
    pub fn from_raw_linear(raw: u32, roc_id: u8) -> Result<Self, PixelDecodeError> {
        let value = Self::pulseheight(raw)?;
        if raw & Self::LINEAR_FILL_BITS != 0 {
            return Err(PixelDecodeError::InvalidAddress);
        }
        let column = (((raw >> 17) & 0x07) + ((raw >> 18) & 0x38)) as i32;
        let row = (((raw >> 9) & 0x07) + ((raw >> 10) & 0x78)) as i32;

        let (column, row) = Self::check_address(column, row)?;
        Ok(Self::new(roc_id, column, row, f64::from(value)))
    }

    /// Decode an analog hit from six ADC samples (the low 12 bits of each word are used).
    ///
    /// `ultrablack` and `black` are the reference levels of the chip the hit belongs to.
    pub fn from_analog(
        samples: &[u16],
        roc_id: u8,
        ultrablack: i16,
        black: i16,
    ) -> Result<Self, PixelDecodeError> {
        if samples.len() != 6 {
            return Err(PixelDecodeError::InvalidAddress);
        }
        let level0 = i32::from(black);
        let level1 = (i32::from(black) - i32::from(ultrablack)) / 4;
        let level_s = level1 / 2;

        // Digits are unsigned, a sample below the lowest level wraps and fails the address check
        let translate = |sample: u16| -> i32 {
            let mut y = i32::from(expand_sign(sample)) - level0;
            if y >= 0 {
                y += level_s;
            } else {
                y -= level_s;
            }
            if level1 == 0 {
                0
            } else {
                i32::from((y / level1 + 1) as u8)
            }
        };

        let c = translate(samples[0]) * 6 + translate(samples[1]);
        let r = (translate(samples[2]) * 6 + translate(samples[3])) * 6 + translate(samples[4]);
        let row = i32::from(ROC_NUMROWS) - r / 2;
        let column = 2 * c + (r & 1);

        // Analog decoding has no buffer corruption signature, every range violation is an address error
        let (column, row) =
            Self::check_address(column, row).map_err(|_| PixelDecodeError::InvalidAddress)?;
        let value = i32::from(expand_sign(samples[5])) - level0;
        Ok(Self::new(roc_id, column, row, f64::from(value)))
    }

    /// Encode the pixel into the raw 24-bit base-6 layout (non-inverted).
    pub fn encode(&self) -> u32 {
        let mut raw = self.encoded_pulseheight();

        let r = 2 * (u32::from(ROC_NUMROWS) - u32::from(self.row));
        raw |= (r / 36) << 15;
        raw |= ((r % 36) / 6) << 12;
        raw |= ((r % 36) % 6 + u32::from(self.column) % 2) << 9;

        let dcol = u32::from(self.column) / 2;
        raw |= (dcol / 6) << 21;
        raw |= (dcol % 6) << 18;

        raw & 0x00ff_ffff
    }

    /// Encode the pixel into the raw 24-bit linear layout.
    pub fn encode_linear(&self) -> u32 {
        let mut raw = self.encoded_pulseheight();
        let column = u32::from(self.column);
        let row = u32::from(self.row);
        raw |= ((column & 0x07) << 17) | ((column & 0x38) << 18);
        raw |= ((row & 0x07) << 9) | ((row & 0x78) << 10);
        raw & 0x00ff_ffff
    }

    /// Index of the chip in the token chain (including the channel offset)
    pub fn roc_id(&self) -> u8 {
        self.roc_id
    }

    /// Pixel column, `0..52`
    pub fn column(&self) -> u8 {
        self.column
    }

    /// Pixel row, `0..80`
    pub fn row(&self) -> u8 {
        self.row
    }

    /// Pulse height (or hit count) of the pixel
    pub fn value(&self) -> f64 {
        f64::from(self.value)
    }

    /// Stores the value rounded to the nearest integer, saturating at the `i16` range.
    pub fn set_value(&mut self, value: f64) {
        self.value = value.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
    }

    /// Variance of the value
    pub fn variance(&self) -> f64 {
        f64::from(self.variance) / f64::from(u16::MAX)
    }

    /// Stores the variance with a resolution of 1/65535, clamped to `[0, 1]`.
    pub fn set_variance(&mut self, variance: f64) {
        self.variance = (variance.clamp(0.0, 1.0) * f64::from(u16::MAX)).round() as u16;
    }

    fn pulseheight(raw: u32) -> Result<u32, PixelDecodeError> {
        if raw & Self::PULSEHEIGHT_FILL_BIT != 0 {
            log::trace!("{raw:#08X}: non-zero pulse-height fill bit");
            return Err(PixelDecodeError::InvalidPulseheight);
        }
        Ok((raw & 0x0f) + ((raw >> 1) & 0xf0))
    }

    fn encoded_pulseheight(&self) -> u32 {
        let value = self.value.clamp(0, 0xff) as u32;
        ((value & 0xf0) << 1) + (value & 0x0f)
    }

    fn check_address(column: i32, row: i32) -> Result<(u8, u8), PixelDecodeError> {
        if row == i32::from(ROC_NUMROWS) {
            return Err(PixelDecodeError::CorruptBuffer);
        }
        if !(0..i32::from(ROC_NUMROWS)).contains(&row)
            || !(0..i32::from(ROC_NUMCOLS)).contains(&column)
        {
            return Err(PixelDecodeError::InvalidAddress);
        }
        Ok((column as u8, row as u8))
    }
}

impl PartialEq for Pixel {
    fn eq(&self, other: &Self) -> bool {
        self.roc_id == other.roc_id && self.column == other.column && self.row == other.row
    }
}

impl Eq for Pixel {}

impl PartialOrd for Pixel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pixel {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.roc_id, self.column, self.row).cmp(&(other.roc_id, other.column, other.row))
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ROC {roc} [{col},{row},{val}]",
            roc = self.roc_id,
            col = self.column,
            row = self.row,
            val = self.value
        )
    }
}

/// Sign-extend a 12-bit ADC sample.
pub fn expand_sign(sample: u16) -> i16 {
    let sample = sample & 0x0fff;
    if sample & 0x0800 != 0 {
        (sample | 0xf000) as i16
    } else {
        sample as i16
    }
}
