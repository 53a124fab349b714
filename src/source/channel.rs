//! Contains the [ChannelConfig] describing the hardware behind one DAQ channel

use crate::words::device::{DecoderFlags, RocType, TbmType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Read-only description of a DAQ channel, handed to a word source at construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// DAQ channel index
    pub channel: u8,
    /// Number of ROCs in the token chain, `None` selects the default of the envelope type
    pub chain_length: Option<u8>,
    /// ROC id of the first chip in the token chain
    pub chain_offset: u8,
    /// TBM envelope type, selects the framing protocol
    pub envelope: TbmType,
    /// ROC generation, selects the decoding path
    pub device: RocType,
    /// Optional decoder behavior
    pub flags: DecoderFlags,
}

impl ChannelConfig {
    /// Create a channel config with the default token-chain length of the envelope.
    pub fn new(channel: u8, envelope: TbmType, device: RocType) -> Self {
        Self {
            channel,
            envelope,
            device,
            ..Default::default()
        }
    }

    /// Set an explicit token-chain length.
    pub fn with_chain_length(mut self, chain_length: u8) -> Self {
        self.chain_length = Some(chain_length);
        self
    }

    /// Set the token-chain offset.
    pub fn with_chain_offset(mut self, chain_offset: u8) -> Self {
        self.chain_offset = chain_offset;
        self
    }

    /// Set the decoder flags.
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = DecoderFlags::new(flags);
        self
    }

    /// Token-chain length in effect for this channel
    pub fn chain_length(&self) -> u8 {
        self.chain_length
            .unwrap_or_else(|| self.default_chain_length())
    }

    /// Token-chain length implied by the envelope type
    pub fn default_chain_length(&self) -> u8 {
        self.envelope.default_chain_length()
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let framing = match self.envelope {
            TbmType::None => "DESER160",
            TbmType::Emu => "SOFTTBM",
            _ => "DESER400",
        };
        write!(
            f,
            "Channel {ch} ({len} ROCs, {first}-{last}) {framing} {env}/{dev} flags {flags}",
            ch = self.channel,
            len = self.chain_length(),
            first = self.chain_offset,
            last = u16::from(self.chain_offset) + u16::from(self.chain_length()),
            env = self.envelope,
            dev = self.device,
            flags = self.flags,
        )
    }
}
