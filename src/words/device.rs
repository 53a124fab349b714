//! Hardware generation identifiers and the decoder flag word
//!
//! The numeric values are part of the wire contract with the testboard firmware and are ordered,
//! the decoder selects its code paths by comparing them (e.g. every [RocType] at or above
//! [RocType::Psi46dig] is read out digitally).
#![allow(non_camel_case_types)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// TBM envelope type of a DAQ channel, ordered `None < Emu < DESER400 generations`
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TbmType {
    /// No TBM, single ROC read out through DESER160
    #[default]
    None = 0x00,
    /// TBM emulated by the testboard firmware (soft TBM)
    Emu = 0x01,
    /// TBM08
    Tbm08 = 0x11,
    /// TBM08a
    Tbm08a = 0x12,
    /// TBM08b
    Tbm08b = 0x13,
    /// TBM09, 4 ports with dummy fill hits
    Tbm09 = 0x14,
}

impl TbmType {
    /// Token-chain length used when none is configured explicitly
    pub fn default_chain_length(self) -> u8 {
        match self {
            TbmType::None | TbmType::Emu => 1,
            TbmType::Tbm08 | TbmType::Tbm08a | TbmType::Tbm08b => 8,
            TbmType::Tbm09 => 4,
        }
    }

    /// Returns true if the envelope is framed by the DESER400 deserializer.
    pub fn is_deser400(self) -> bool {
        self > TbmType::Emu
    }
}

impl fmt::Display for TbmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TbmType::None => write!(f, "none"),
            TbmType::Emu => write!(f, "soft TBM"),
            TbmType::Tbm08 => write!(f, "TBM08"),
            TbmType::Tbm08a => write!(f, "TBM08a"),
            TbmType::Tbm08b => write!(f, "TBM08b"),
            TbmType::Tbm09 => write!(f, "TBM09"),
        }
    }
}

/// Readout chip generation
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RocType {
    /// Analog PSI46v2
    Psi46v2 = 0x01,
    /// Analog PSI46xdb
    Psi46xdb = 0x02,
    /// First digital generation, pixel addresses are transmitted inverted
    Psi46dig = 0x03,
    /// Digital with trigger extension
    Psi46dig_trig = 0x04,
    /// Digital v2 (B)
    Psi46digv2_b = 0x05,
    /// Digital v2, first generation with readback in the ROC header
    Psi46digv2 = 0x06,
    /// Digital v2.1
    Psi46digv21 = 0x07,
    /// Digital v2.1 respin, linear pixel addressing
    #[default]
    Psi46digv21respin = 0x08,
}

impl RocType {
    /// Returns true for the analog generations that are read out through the ADC.
    pub fn is_analog(self) -> bool {
        self < RocType::Psi46dig
    }

    /// Returns true if ROC headers carry readback bits.
    pub fn has_readback(self) -> bool {
        self >= RocType::Psi46digv2
    }

    /// Returns true if the pixel address is transmitted bit-inverted.
    pub fn inverted_address(self) -> bool {
        self == RocType::Psi46dig
    }

    /// Returns true if the pixel address uses the linear encoding.
    pub fn linear_address(self) -> bool {
        self >= RocType::Psi46digv21respin
    }
}

impl fmt::Display for RocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RocType::Psi46v2 => "psi46v2",
            RocType::Psi46xdb => "psi46xdb",
            RocType::Psi46dig => "psi46dig",
            RocType::Psi46dig_trig => "psi46dig_trig",
            RocType::Psi46digv2_b => "psi46digv2_b",
            RocType::Psi46digv2 => "psi46digv2",
            RocType::Psi46digv21 => "psi46digv21",
            RocType::Psi46digv21respin => "psi46digv21respin",
        };
        write!(f, "{name}")
    }
}

/// Bit flags that switch optional decoder behavior on or off
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecoderFlags(u16);

impl DecoderFlags {
    /// Log the raw records surrounding events with event, TBM or ROC errors.
    pub const DUMP_FLAWED_EVENTS: u16 = 0x0100;
    /// Do not collect readback words from ROC headers.
    pub const DISABLE_READBACK_COLLECTION: u16 = 0x0200;
    /// Do not cross-check the TBM trigger count against the local event counter.
    pub const DISABLE_EVENTID_CHECK: u16 = 0x0400;
    /// Record the XOR eye-diagram byte of every DESER400 ROC header.
    pub const ENABLE_XORSUM_LOGGING: u16 = 0x0800;

    /// Create the flag word from its raw value.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw flag word
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Returns true if every bit of `flag` is set.
    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }
}

impl std::str::FromStr for DecoderFlags {
    type Err = std::num::ParseIntError;

    /// Accepts decimal or `0x` prefixed hexadecimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16).map(Self),
            None => s.parse::<u16>().map(Self),
        }
    }
}

impl fmt::Display for DecoderFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn envelope_ordering() {
        assert!(TbmType::None < TbmType::Emu);
        assert!(TbmType::Emu < TbmType::Tbm08);
        assert!(TbmType::Tbm08b < TbmType::Tbm09);
        assert!(!TbmType::Emu.is_deser400());
        assert!(TbmType::Tbm08.is_deser400());
        assert_eq!(TbmType::Tbm09 as u8, 0x14);
    }

    #[test]
    fn device_generations() {
        assert!(RocType::Psi46xdb.is_analog());
        assert!(!RocType::Psi46dig.is_analog());
        assert!(RocType::Psi46dig.inverted_address());
        assert!(!RocType::Psi46digv2_b.has_readback());
        assert!(RocType::Psi46digv2.has_readback());
        assert!(RocType::Psi46digv21respin.linear_address());
        assert!(!RocType::Psi46digv21.linear_address());
    }

    #[test]
    fn flags_from_str() {
        let flags: DecoderFlags = "0x0500".parse().unwrap();
        assert!(flags.contains(DecoderFlags::DUMP_FLAWED_EVENTS));
        assert!(flags.contains(DecoderFlags::DISABLE_EVENTID_CHECK));
        assert!(!flags.contains(DecoderFlags::ENABLE_XORSUM_LOGGING));
        let flags: DecoderFlags = "512".parse().unwrap();
        assert_eq!(flags.bits(), DecoderFlags::DISABLE_READBACK_COLLECTION);
        assert!("0xZZ".parse::<DecoderFlags>().is_err());
    }

    #[test]
    fn serde_lowercase_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            envelope: TbmType,
            device: RocType,
        }
        let w: Wrapper = toml::from_str("envelope = \"tbm08b\"\ndevice = \"psi46dig_trig\"").unwrap();
        assert_eq!(w.envelope, TbmType::Tbm08b);
        assert_eq!(w.device, RocType::Psi46dig_trig);
    }
}
