//! Contains the decoded [Event] and accessors for the TBM header and trailer bit fields

use super::pixel::Pixel;
use itertools::Itertools;
use std::fmt;

/// The decoded content of one trigger.
///
/// `header` and `trailer` hold the payload bytes of the two TBM header words and the two TBM trailer
/// words, packed as `(first & 0xff) << 8 | (second & 0xff)`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Event {
    /// Packed TBM header
    pub header: u16,
    /// Packed TBM trailer
    pub trailer: u16,
    /// Decoded pixel hits in stream order
    pub pixels: Vec<Pixel>,
    /// Number of decoding errors counted while producing this event
    pub error_count: u32,
}

impl Event {
    const NO_TOKEN_PASS: u16 = 0x8000;
    const RESET_TBM: u16 = 0x4000;
    const RESET_ROC: u16 = 0x2000;
    const SYNC_ERROR: u16 = 0x1000;
    const SYNC_TRIGGER: u16 = 0x0800;
    const CLEAR_TRIGGER_COUNT: u16 = 0x0400;
    const CAL_TRIGGER: u16 = 0x0200;
    const STACK_FULL: u16 = 0x0100;
    const AUTO_RESET: u16 = 0x0080;
    const PKAM_RESET: u16 = 0x0040;
    const STACK_COUNT_MASK: u16 = 0x003f;

    /// Reset header, trailer, pixels and error count.
    pub fn clear(&mut self) {
        self.header = 0;
        self.trailer = 0;
        self.pixels.clear();
        self.error_count = 0;
    }

    /// Remove the decoded content but keep the error count.
    pub(crate) fn clear_content(&mut self) {
        self.header = 0;
        self.trailer = 0;
        self.pixels.clear();
    }

    /// TBM trigger counter (8 bits)
    pub fn trigger_count(&self) -> u8 {
        (self.header >> 8) as u8
    }

    /// Identifier of the data carried in [Event::data_value]
    pub fn data_id(&self) -> u8 {
        ((self.header & 0x00c0) >> 6) as u8
    }

    /// 6-bit data payload of the header
    pub fn data_value(&self) -> u8 {
        (self.header & 0x003f) as u8
    }

    /// The token did not pass the chain
    pub fn has_no_token_pass(&self) -> bool {
        self.trailer & Self::NO_TOKEN_PASS != 0
    }

    /// The TBM was reset
    pub fn has_reset_tbm(&self) -> bool {
        self.trailer & Self::RESET_TBM != 0
    }

    /// The ROCs were reset
    pub fn has_reset_roc(&self) -> bool {
        self.trailer & Self::RESET_ROC != 0
    }

    /// TBM reported a synchronisation error
    pub fn has_sync_error(&self) -> bool {
        self.trailer & Self::SYNC_ERROR != 0
    }

    /// Trigger was a synchronisation trigger
    pub fn has_sync_trigger(&self) -> bool {
        self.trailer & Self::SYNC_TRIGGER != 0
    }

    /// The trigger counter was cleared
    pub fn has_clear_trigger_count(&self) -> bool {
        self.trailer & Self::CLEAR_TRIGGER_COUNT != 0
    }

    /// Trigger was a calibration trigger
    pub fn has_cal_trigger(&self) -> bool {
        self.trailer & Self::CAL_TRIGGER != 0
    }

    /// The TBM trigger stack is full
    pub fn stack_full(&self) -> bool {
        self.trailer & Self::STACK_FULL != 0
    }

    /// TBM auto reset was sent
    pub fn has_auto_reset(&self) -> bool {
        self.trailer & Self::AUTO_RESET != 0
    }

    /// Token chain was reset by the PKAM counter
    pub fn has_pkam_reset(&self) -> bool {
        self.trailer & Self::PKAM_RESET != 0
    }

    /// Number of triggers on the TBM stack
    pub fn stack_count(&self) -> u8 {
        (self.trailer & Self::STACK_COUNT_MASK) as u8
    }

    /// Multi-line description of the header fields
    pub fn header_summary(&self) -> String {
        format!(
            "Header {hdr:#06X}: trigger count {cnt}, data id {id} value {val}",
            hdr = self.header,
            cnt = self.trigger_count(),
            id = self.data_id(),
            val = self.data_value()
        )
    }

    /// Description of the trailer flags that are set
    pub fn trailer_summary(&self) -> String {
        let flags = [
            (self.has_no_token_pass(), "NoTokenPass"),
            (self.has_reset_tbm(), "ResetTBM"),
            (self.has_reset_roc(), "ResetROC"),
            (self.has_sync_error(), "SyncError"),
            (self.has_sync_trigger(), "SyncTrigger"),
            (self.has_clear_trigger_count(), "ClearTriggerCount"),
            (self.has_cal_trigger(), "CalTrigger"),
            (self.stack_full(), "StackFull"),
            (self.has_auto_reset(), "AutoReset"),
            (self.has_pkam_reset(), "PkamReset"),
        ];
        format!(
            "Trailer {trl:#06X}: [{set}] stack count {cnt}",
            trl = self.trailer,
            set = flags.iter().filter(|(set, _)| *set).map(|(_, n)| n).join(", "),
            cnt = self.stack_count()
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "====== {hdr:04X} ====== {pixels} ====== {trl:04X} ======",
            hdr = self.header,
            pixels = self.pixels.iter().join(" "),
            trl = self.trailer
        )
    }
}
