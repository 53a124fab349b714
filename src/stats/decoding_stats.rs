//! Contains the [DecodingStatistics] counters maintained by the event decoder

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

/// Counters of the decoding outcome, grouped into info, event, TBM, ROC and pixel counters.
///
/// The decoder hands out a snapshot and resets its own copy on every read, snapshots of several
/// reads or channels are merged with `+=` or [DecodingStatistics::sum].
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodingStatistics {
    /// Raw words seen by the decoder
    pub info_words_read: u64,
    /// Events without pixel hits
    pub info_events_empty: u32,
    /// Events with at least one pixel hit
    pub info_events_valid: u32,
    /// Successfully decoded pixel hits
    pub info_pixels_valid: u32,

    /// Frames without start marker
    pub errors_event_start: u32,
    /// Frames without end marker
    pub errors_event_stop: u32,
    /// Frames exceeding the record size
    pub errors_event_overflow: u32,
    /// DESER400 code errors
    pub errors_event_invalid_words: u32,
    /// ROC headers with failed XOR eye diagram
    pub errors_event_invalid_xor: u32,
    /// DESER400 frame errors
    pub errors_event_frame: u32,
    /// DESER400 idle data
    pub errors_event_idledata: u32,
    /// DESER400 no data
    pub errors_event_nodata: u32,
    /// PKAM reset together with missing token pass
    pub errors_event_pkam: u32,
    /// ROC data despite missing token pass
    pub errors_event_notokenpass: u32,

    /// Malformed TBM headers
    pub errors_tbm_header: u32,
    /// Malformed TBM trailers
    pub errors_tbm_trailer: u32,
    /// TBM trigger count differing from the expected event ID
    pub errors_tbm_eventid_mismatch: u32,

    /// Events where the number of ROC headers differs from the token-chain length
    pub errors_roc_missing: u32,
    /// Misaligned readback start markers
    pub errors_roc_readback: u32,

    /// Pixel hits cut short by the end of the event
    pub errors_pixel_incomplete: u32,
    /// Pixel hits with an invalid address
    pub errors_pixel_address: u32,
    /// Pixel hits with a non-zero pulse-height fill bit
    pub errors_pixel_pulseheight: u32,
    /// Pixel hits decoded to row 80
    pub errors_pixel_buffer_corrupt: u32,
}

impl DecodingStatistics {
    /// Reset all counters.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Sum of empty and valid events
    pub fn info_events_total(&self) -> u32 {
        self.info_events_empty + self.info_events_valid
    }

    /// Sum of all event errors
    pub fn errors_event(&self) -> u32 {
        self.errors_event_start
            + self.errors_event_stop
            + self.errors_event_overflow
            + self.errors_event_invalid_words
            + self.errors_event_invalid_xor
            + self.errors_event_frame
            + self.errors_event_idledata
            + self.errors_event_nodata
            + self.errors_event_pkam
            + self.errors_event_notokenpass
    }

    /// Sum of all TBM errors
    pub fn errors_tbm(&self) -> u32 {
        self.errors_tbm_header + self.errors_tbm_trailer + self.errors_tbm_eventid_mismatch
    }

    /// Sum of all ROC errors
    pub fn errors_roc(&self) -> u32 {
        self.errors_roc_missing + self.errors_roc_readback
    }

    /// Sum of all pixel errors
    pub fn errors_pixel(&self) -> u32 {
        self.errors_pixel_incomplete
            + self.errors_pixel_address
            + self.errors_pixel_pulseheight
            + self.errors_pixel_buffer_corrupt
    }

    /// Sum of all errors
    pub fn errors(&self) -> u32 {
        self.errors_event() + self.errors_tbm() + self.errors_roc() + self.errors_pixel()
    }

    /// Merge another snapshot into this one.
    pub fn sum(&mut self, other: DecodingStatistics) {
        *self += other;
    }

    /// Log every counter at info level.
    pub fn dump(&self) {
        for line in self.to_string().lines() {
            log::info!("{line}");
        }
    }
}

impl AddAssign for DecodingStatistics {
    fn add_assign(&mut self, other: Self) {
        self.info_words_read += other.info_words_read;
        self.info_events_empty += other.info_events_empty;
        self.info_events_valid += other.info_events_valid;
        self.info_pixels_valid += other.info_pixels_valid;
        self.errors_event_start += other.errors_event_start;
        self.errors_event_stop += other.errors_event_stop;
        self.errors_event_overflow += other.errors_event_overflow;
        self.errors_event_invalid_words += other.errors_event_invalid_words;
        self.errors_event_invalid_xor += other.errors_event_invalid_xor;
        self.errors_event_frame += other.errors_event_frame;
        self.errors_event_idledata += other.errors_event_idledata;
        self.errors_event_nodata += other.errors_event_nodata;
        self.errors_event_pkam += other.errors_event_pkam;
        self.errors_event_notokenpass += other.errors_event_notokenpass;
        self.errors_tbm_header += other.errors_tbm_header;
        self.errors_tbm_trailer += other.errors_tbm_trailer;
        self.errors_tbm_eventid_mismatch += other.errors_tbm_eventid_mismatch;
        self.errors_roc_missing += other.errors_roc_missing;
        self.errors_roc_readback += other.errors_roc_readback;
        self.errors_pixel_incomplete += other.errors_pixel_incomplete;
        self.errors_pixel_address += other.errors_pixel_address;
        self.errors_pixel_pulseheight += other.errors_pixel_pulseheight;
        self.errors_pixel_buffer_corrupt += other.errors_pixel_buffer_corrupt;
    }
}

impl fmt::Display for DecodingStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Decoding statistics:")?;
        writeln!(f, "  General information:")?;
        writeln!(f, "\t 16bit words read:         {}", self.info_words_read)?;
        writeln!(f, "\t valid events total:       {}", self.info_events_total())?;
        writeln!(f, "\t empty events:             {}", self.info_events_empty)?;
        writeln!(f, "\t valid events with pixels: {}", self.info_events_valid)?;
        writeln!(f, "\t valid pixel hits:         {}", self.info_pixels_valid)?;
        writeln!(f, "  Event errors: \t           {}", self.errors_event())?;
        writeln!(f, "\t start marker:             {}", self.errors_event_start)?;
        writeln!(f, "\t stop marker:              {}", self.errors_event_stop)?;
        writeln!(f, "\t overflow:                 {}", self.errors_event_overflow)?;
        writeln!(f, "\t invalid 5bit words:       {}", self.errors_event_invalid_words)?;
        writeln!(f, "\t invalid XOR eye diagram:  {}", self.errors_event_invalid_xor)?;
        writeln!(f, "\t frame (header/trailer):   {}", self.errors_event_frame)?;
        writeln!(f, "\t idle data (no TBM trl):   {}", self.errors_event_idledata)?;
        writeln!(f, "\t no data (only TBM hdr):   {}", self.errors_event_nodata)?;
        writeln!(f, "\t PKAM counter reset:       {}", self.errors_event_pkam)?;
        writeln!(f, "\t ROC data with NoTokenPass:{}", self.errors_event_notokenpass)?;
        writeln!(f, "  TBM errors: \t\t           {}", self.errors_tbm())?;
        writeln!(f, "\t flawed TBM headers:       {}", self.errors_tbm_header)?;
        writeln!(f, "\t flawed TBM trailers:      {}", self.errors_tbm_trailer)?;
        writeln!(f, "\t event ID mismatches:      {}", self.errors_tbm_eventid_mismatch)?;
        writeln!(f, "  ROC errors: \t\t           {}", self.errors_roc())?;
        writeln!(f, "\t missing ROC header(s):    {}", self.errors_roc_missing)?;
        writeln!(f, "\t misplaced readback start: {}", self.errors_roc_readback)?;
        writeln!(f, "  Pixel decoding errors:\t   {}", self.errors_pixel())?;
        writeln!(f, "\t pixel data incomplete:    {}", self.errors_pixel_incomplete)?;
        writeln!(f, "\t pixel address:            {}", self.errors_pixel_address)?;
        writeln!(f, "\t pulse height fill bit:    {}", self.errors_pixel_pulseheight)?;
        write!(f, "\t buffer corruption:        {}", self.errors_pixel_buffer_corrupt)
    }
}
