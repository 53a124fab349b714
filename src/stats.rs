//! All stat collecting functionality
//!
//! Decoder threads send [StatType] messages to the [Controller](crate::controller::Controller), which sums
//! them up, stops processing if too many errors are seen, and prints the [Report](report::Report) at the end.

use crate::config::prelude::{DataOutputFormat, DataOutputMode};
use crate::source::ChannelConfig;
use decoding_stats::DecodingStatistics;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

pub mod decoding_stats;
pub mod report;
mod table_formatter_utils;

#[derive(Debug, Clone, PartialEq)]
/// Possible stats that can be sent to the Controller.
pub enum StatType {
    /// Fatal error, stop processing.
    Fatal(Box<str>),
    /// Non-fatal error, reported but processing continues.
    Error(Box<str>),
    /// A decoder was set up for a DAQ channel.
    ChannelConfigured(ChannelConfig),
    /// Decoding statistics of one channel since its last report.
    Decoding(Box<ChannelStatistics>),
}

impl std::fmt::Display for StatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatType::Fatal(e) => write!(f, "Fatal error: {e}"),
            StatType::Error(e) => write!(f, "Error: {e}"),
            StatType::ChannelConfigured(cfg) => write!(f, "Configured: {cfg}"),
            StatType::Decoding(ch_stats) => write!(
                f,
                "Channel {ch}: {events} events decoded, {errors} errors",
                ch = ch_stats.channel,
                events = ch_stats.events,
                errors = ch_stats.stats.errors()
            ),
        }
    }
}

/// Decoding statistics of one DAQ channel
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatistics {
    /// DAQ channel index
    pub channel: u8,
    /// Events handed out by the decoder, including the ones that were discarded
    pub events: u64,
    /// Counters of the decoder
    pub stats: DecodingStatistics,
}

impl ChannelStatistics {
    /// Wrap a snapshot of decoder statistics.
    pub fn new(channel: u8, events: u64, stats: DecodingStatistics) -> Self {
        Self {
            channel,
            events,
            stats,
        }
    }

    /// Add a later snapshot of the same channel.
    pub fn merge(&mut self, other: &ChannelStatistics) {
        debug_assert_eq!(self.channel, other.channel);
        self.events += other.events;
        self.stats += other.stats;
    }
}

/// Final statistics of a run as written with `--output-stats`
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsOutput {
    /// Events over all channels
    pub events: u64,
    /// Counters summed over all channels
    pub total: DecodingStatistics,
    /// Counters of every channel, ordered by channel index
    pub channel: Vec<ChannelStatistics>,
}

impl StatsOutput {
    /// Sum up the per channel statistics.
    pub fn from_channels(channels: &[ChannelStatistics]) -> Self {
        let mut output = Self {
            channel: channels.to_vec(),
            ..Default::default()
        };
        output.channel.sort_by_key(|ch| ch.channel);
        for ch in &output.channel {
            output.events += ch.events;
            output.total += ch.stats;
        }
        output
    }

    /// Serialize the statistics and write them to the given output.
    pub fn write_stats(&self, mode: &DataOutputMode, format: DataOutputFormat) -> io::Result<()> {
        if *mode == DataOutputMode::None {
            return Ok(());
        }
        let stats_str = match format {
            DataOutputFormat::JSON => serde_json::to_string_pretty(self).map_err(io::Error::other)?,
            DataOutputFormat::TOML => toml::to_string_pretty(self).map_err(io::Error::other)?,
        };
        write_stats_str(mode, &stats_str)
    }
}

fn write_stats_str(mode: &DataOutputMode, stats_str: &str) -> io::Result<()> {
    match mode {
        DataOutputMode::File(path) => std::fs::write(path, stats_str),
        DataOutputMode::Stdout => writeln!(io::stdout().lock(), "{stats_str}"),
        DataOutputMode::None => Ok(()),
    }
}
