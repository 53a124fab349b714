//! State machine classifying the words of a DESER400 event body
#![allow(non_camel_case_types)]

use self::DESER400_Scan::ROC_DATA_;
use crate::util::*;

/// Kinds of words found between the TBM header and trailer of a DESER400 event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deser400Word {
    /// ROC header, carries the XOR nibble and readback bits
    RocHeader,
    /// First of the two words of a pixel hit
    Pixel,
    /// First word of an out-of-band TBM header
    TbmHeader,
    /// Second word of an out-of-band TBM header
    TbmHeaderContinuation,
    /// First word of an out-of-band TBM trailer
    TbmTrailer,
    /// Second word of an out-of-band TBM trailer
    TbmTrailerContinuation,
    /// Anything else, skipped
    Unknown,
}

/// Out-of-band TBM word pair that lost its second word.
///
/// Carries the classification of the word that arrived instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BrokenTbmPair {
    Header(Deser400Word),
    Trailer(Deser400Word),
}

sm! {
    // States have the '_' suffix and events the '_' prefix, variants show up as `STATE_By_Event`
    DESER400_Scan {
        InitialStates { ROC_DATA_ }

        _Header {
            ROC_DATA_ => TBM_HEADER_,
            TBM_HEADER_ => TBM_HEADER_,
            TBM_TRAILER_ => TBM_HEADER_
        }

        _Trailer {
            ROC_DATA_ => TBM_TRAILER_,
            TBM_HEADER_ => TBM_TRAILER_,
            TBM_TRAILER_ => TBM_TRAILER_
        }

        _Data {
            ROC_DATA_ => ROC_DATA_,
            TBM_HEADER_ => ROC_DATA_,
            TBM_TRAILER_ => ROC_DATA_
        }
    }
}

/// Tracks whether the scan is inside an out-of-band TBM header or trailer pair.
pub(crate) struct Deser400Fsm {
    state_machine: DESER400_Scan::Variant,
}

impl Default for Deser400Fsm {
    fn default() -> Self {
        Self::new()
    }
}

impl Deser400Fsm {
    const MARKER_MASK: u16 = 0xe000;
    const ROC_HEADER: u16 = 0x4000;
    const PIXEL_MAX: u16 = 0x2000;
    const TBM_HEADER: u16 = 0xa000;
    const TBM_HEADER_CONT: u16 = 0x8000;
    const TBM_TRAILER: u16 = 0xe000;
    const TBM_TRAILER_CONT: u16 = 0xc000;

    pub(crate) fn new() -> Self {
        Self {
            state_machine: DESER400_Scan::Machine::new(ROC_DATA_).as_enum(),
        }
    }

    pub(crate) fn reset_fsm(&mut self) {
        self.state_machine = DESER400_Scan::Machine::new(ROC_DATA_).as_enum();
    }

    /// Returns the pair that is still waiting for its second word, if any.
    pub(crate) fn pending(&self) -> Option<BrokenTbmPair> {
        use DESER400_Scan::Variant as state;
        match self.state_machine {
            state::TBM_HEADER_By_Header(_) => Some(BrokenTbmPair::Header(Deser400Word::Unknown)),
            state::TBM_TRAILER_By_Trailer(_) => {
                Some(BrokenTbmPair::Trailer(Deser400Word::Unknown))
            }
            state::InitialROC_DATA_(_) | state::ROC_DATA_By_Data(_) => None,
        }
    }

    /// Advance the state machine by one word.
    ///
    /// Returns the kind of the word, or the broken pair if an out-of-band TBM header or trailer was
    /// not followed by its continuation word. The error carries the kind of the offending word.
    pub(crate) fn advance(&mut self, word: u16) -> Result<Deser400Word, BrokenTbmPair> {
        use DESER400_Scan as event;
        use DESER400_Scan::Variant as state;

        let current_state = self.state_machine.clone();

        let (next_state, current_word) = match current_state {
            state::InitialROC_DATA_(stm) => match word & Self::MARKER_MASK {
                Self::TBM_HEADER => (
                    stm.transition(event::_Header).as_enum(),
                    Ok(Deser400Word::TbmHeader),
                ),
                Self::TBM_TRAILER => (
                    stm.transition(event::_Trailer).as_enum(),
                    Ok(Deser400Word::TbmTrailer),
                ),
                _ => (
                    stm.transition(event::_Data).as_enum(),
                    Ok(Self::roc_data(word)),
                ),
            },
            state::ROC_DATA_By_Data(stm) => match word & Self::MARKER_MASK {
                Self::TBM_HEADER => (
                    stm.transition(event::_Header).as_enum(),
                    Ok(Deser400Word::TbmHeader),
                ),
                Self::TBM_TRAILER => (
                    stm.transition(event::_Trailer).as_enum(),
                    Ok(Deser400Word::TbmTrailer),
                ),
                _ => (
                    stm.transition(event::_Data).as_enum(),
                    Ok(Self::roc_data(word)),
                ),
            },
            state::TBM_HEADER_By_Header(stm) => match word & Self::MARKER_MASK {
                Self::TBM_HEADER_CONT => (
                    stm.transition(event::_Data).as_enum(),
                    Ok(Deser400Word::TbmHeaderContinuation),
                ),
                Self::TBM_HEADER => (
                    stm.transition(event::_Header).as_enum(),
                    Err(BrokenTbmPair::Header(Deser400Word::TbmHeader)),
                ),
                Self::TBM_TRAILER => (
                    stm.transition(event::_Trailer).as_enum(),
                    Err(BrokenTbmPair::Header(Deser400Word::TbmTrailer)),
                ),
                _ => (
                    stm.transition(event::_Data).as_enum(),
                    Err(BrokenTbmPair::Header(Self::roc_data(word))),
                ),
            },
            state::TBM_TRAILER_By_Trailer(stm) => match word & Self::MARKER_MASK {
                Self::TBM_TRAILER_CONT => (
                    stm.transition(event::_Data).as_enum(),
                    Ok(Deser400Word::TbmTrailerContinuation),
                ),
                Self::TBM_HEADER => (
                    stm.transition(event::_Header).as_enum(),
                    Err(BrokenTbmPair::Trailer(Deser400Word::TbmHeader)),
                ),
                Self::TBM_TRAILER => (
                    stm.transition(event::_Trailer).as_enum(),
                    Err(BrokenTbmPair::Trailer(Deser400Word::TbmTrailer)),
                ),
                _ => (
                    stm.transition(event::_Data).as_enum(),
                    Err(BrokenTbmPair::Trailer(Self::roc_data(word))),
                ),
            },
        };

        self.state_machine = next_state;
        current_word
    }

    fn roc_data(word: u16) -> Deser400Word {
        let marker = word & Self::MARKER_MASK;
        if marker == Self::ROC_HEADER {
            Deser400Word::RocHeader
        } else if marker <= Self::PIXEL_MAX {
            Deser400Word::Pixel
        } else {
            Deser400Word::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_roc_data() {
        let mut fsm = Deser400Fsm::new();
        assert_eq!(fsm.advance(0x4007), Ok(Deser400Word::RocHeader));
        assert_eq!(fsm.advance(0x0123), Ok(Deser400Word::Pixel));
        assert_eq!(fsm.advance(0x2456), Ok(Deser400Word::Pixel));
        assert_eq!(fsm.advance(0x8000), Ok(Deser400Word::Unknown));
        assert_eq!(fsm.advance(0x6000), Ok(Deser400Word::Unknown));
        assert_eq!(fsm.advance(0xc000), Ok(Deser400Word::Unknown));
        assert!(fsm.pending().is_none());
    }

    #[test]
    fn out_of_band_pairs() {
        let mut fsm = Deser400Fsm::new();
        assert_eq!(fsm.advance(0xa012), Ok(Deser400Word::TbmHeader));
        assert!(fsm.pending().is_some());
        assert_eq!(fsm.advance(0x8034), Ok(Deser400Word::TbmHeaderContinuation));
        assert_eq!(fsm.advance(0x4001), Ok(Deser400Word::RocHeader));
        assert_eq!(fsm.advance(0xe000), Ok(Deser400Word::TbmTrailer));
        assert_eq!(fsm.advance(0xc000), Ok(Deser400Word::TbmTrailerContinuation));
        assert!(fsm.pending().is_none());
    }

    #[test]
    fn broken_pairs_reclassify_the_word() {
        let mut fsm = Deser400Fsm::new();
        let _ = fsm.advance(0xa000);
        assert_eq!(
            fsm.advance(0x4001),
            Err(BrokenTbmPair::Header(Deser400Word::RocHeader))
        );
        let _ = fsm.advance(0xe000);
        assert_eq!(
            fsm.advance(0xa001),
            Err(BrokenTbmPair::Trailer(Deser400Word::TbmHeader))
        );
        // Still inside the header started by the offending word
        assert_eq!(
            fsm.pending(),
            Some(BrokenTbmPair::Header(Deser400Word::Unknown))
        );
        fsm.reset_fsm();
        assert!(fsm.pending().is_none());
    }
}
