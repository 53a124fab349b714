//! Data types for the words of the DTB readout stream: chip generations, raw and decoded events, and pixel hits.

pub mod device;
pub mod event;
pub mod pixel;
pub mod raw_event;
