//! The [Report] is built by the [Controller](crate::controller::Controller) and printed at the end of execution
//!
//! It contains several [StatSummary] rows that make up the global statistics, the detected channel setups,
//! and optional sub-tables with the error breakdown and the per channel counters.
use tabled::{
    settings::{object::Rows, Alignment, Format, Modify, Panel},
    Table, Tabled,
};

use super::decoding_stats::DecodingStatistics;
use super::table_formatter_utils::format_global_stats_sub_table;
use super::table_formatter_utils::format_sub_table;
use super::table_formatter_utils::format_super_table;
use super::table_formatter_utils::SubtableColor;
use super::{ChannelStatistics, StatsOutput};
use owo_colors::OwoColorize;

/// Describes the columns of the report table
#[derive(Tabled)]
pub struct StatSummary {
    /// Name of the statistic
    pub statistic: String,
    /// Its value
    pub value: String,
    /// Additional notes
    pub notes: String,
}

impl StatSummary {
    /// Create a row, `None` leaves the notes column empty.
    pub fn new(statistic: String, value: String, notes: Option<String>) -> Self {
        Self {
            statistic,
            value,
            notes: notes.unwrap_or_default(),
        }
    }
}

impl std::default::Default for StatSummary {
    fn default() -> Self {
        Self {
            statistic: "".to_string(),
            value: "".to_string(),
            notes: "".to_string(),
        }
    }
}

/// Describes the columns of the detected attributes table
#[derive(Tabled)]
struct DetectedAttribute {
    pub attribute: String,
    pub detected: String,
}

/// Describes the columns of the per channel table
#[derive(Tabled)]
struct ChannelRow {
    channel: u8,
    events: u64,
    pixels: u32,
    errors: u32,
}

/// Describes the columns of the error breakdown table
#[derive(Tabled)]
struct ErrorRow {
    category: &'static str,
    error: &'static str,
    count: u32,
}

/// Structure of the report printed at the end of execution
///
/// Contains convenience methods to add stats to the report, and to generate the report table
pub struct Report {
    pub(crate) stats: Vec<StatSummary>,
    error_stats_table: Option<Table>,
    channel_stats_table: Option<Table>,
    detected_attributes: Vec<DetectedAttribute>,
    processing_time: std::time::Duration,
    fatal_error: Option<String>,
    report_table: Option<Table>,
}

impl Report {
    /// Create an empty report.
    pub fn new(processing_time: std::time::Duration) -> Self {
        Self {
            stats: Vec::new(),
            error_stats_table: None,
            channel_stats_table: None,
            detected_attributes: Vec::new(),
            processing_time,
            fatal_error: None,
            report_table: None,
        }
    }

    /// Fill the global stats and sub-tables from the final statistics of a run.
    pub fn with_stats_output(processing_time: std::time::Duration, output: &StatsOutput) -> Self {
        let mut report = Self::new(processing_time);
        summarize_global(&mut report, output);
        if output.total.errors() > 0 {
            report.add_error_stats(error_table(&output.total));
        }
        if output.channel.len() > 1 {
            report.add_channel_stats(channel_table(&output.channel));
        }
        report
    }

    /// Add the table listing every non-zero error counter.
    pub fn add_error_stats(&mut self, error_stats_table: Table) {
        self.error_stats_table = Some(error_stats_table);
    }

    /// Add the table with one row per channel.
    pub fn add_channel_stats(&mut self, channel_stats_table: Table) {
        self.channel_stats_table = Some(channel_stats_table);
    }

    /// Add a row to the global stats.
    pub fn add_stat(&mut self, stat: StatSummary) {
        self.stats.push(stat);
    }

    /// Add an attribute to the detected attributes table.
    pub fn add_detected_attribute(&mut self, attribute: String, detected: String) {
        self.detected_attributes.push(DetectedAttribute {
            attribute,
            detected,
        });
    }

    /// Mark the report as terminated early.
    pub fn add_fatal_error(&mut self, error: String) {
        self.fatal_error = Some(error);
    }

    /// Print the report to stdout.
    pub fn print(&mut self) {
        let mut global_stats_table = Table::new(&self.stats);
        format_global_stats_sub_table(&mut global_stats_table);

        let mut lower_row = format_sub_table(
            Table::new(&self.detected_attributes),
            "Detected Attributes",
            SubtableColor::Yellow,
        );
        if let Some(channel_stats_table) = self.channel_stats_table.clone() {
            let channel_stats_table =
                format_sub_table(channel_stats_table, "Channels", SubtableColor::Purple);
            lower_row = tabled::row![lower_row, channel_stats_table];
        }
        if let Some(error_stats_table) = self.error_stats_table.clone() {
            let error_stats_table =
                format_sub_table(error_stats_table, "Decoding Errors", SubtableColor::Red);
            lower_row = tabled::row![lower_row, error_stats_table];
        }

        let mut multi_table = tabled::col![global_stats_table, lower_row];
        let multi_table = multi_table.with(tabled::settings::Style::rounded());
        let mut report_table = format_super_table(multi_table, self.processing_time);

        if let Some(fatal_error) = &self.fatal_error {
            let _ = report_table
                .with(Panel::header(format!(
                    "FATAL ERROR - EARLY TERMINATION: {fatal_error}"
                )))
                .with(
                    Modify::new(Rows::single(0))
                        .with(Alignment::center())
                        .with(Format::content(|x| x.red().to_string())),
                );
        }
        println!("{report_table}");
        self.report_table = Some(report_table);
    }
}

fn summarize_global(report: &mut Report, output: &StatsOutput) {
    let total = &output.total;
    let errors = total.errors();
    report.add_stat(StatSummary::new(
        "Total errors".to_string(),
        errors.to_string(),
        None,
    ));
    report.add_stat(StatSummary::new(
        "Words read".to_string(),
        total.info_words_read.to_string(),
        None,
    ));
    report.add_stat(StatSummary::new(
        "Events".to_string(),
        output.events.to_string(),
        Some(format!(
            "{discarded} discarded",
            discarded = output
                .events
                .saturating_sub(u64::from(total.info_events_total()))
        )),
    ));
    report.add_stat(StatSummary::new(
        "Valid events".to_string(),
        total.info_events_total().to_string(),
        Some(format!(
            "{empty} empty, {with_hits} with hits",
            empty = total.info_events_empty,
            with_hits = total.info_events_valid
        )),
    ));
    report.add_stat(StatSummary::new(
        "Pixel hits".to_string(),
        total.info_pixels_valid.to_string(),
        None,
    ));
}

/// Table with one row per non-zero error counter.
pub(crate) fn error_table(stats: &DecodingStatistics) -> Table {
    let rows = [
        ("Event", "start marker", stats.errors_event_start),
        ("Event", "stop marker", stats.errors_event_stop),
        ("Event", "overflow", stats.errors_event_overflow),
        ("Event", "invalid 5bit words", stats.errors_event_invalid_words),
        ("Event", "invalid XOR", stats.errors_event_invalid_xor),
        ("Event", "frame", stats.errors_event_frame),
        ("Event", "idle data", stats.errors_event_idledata),
        ("Event", "no data", stats.errors_event_nodata),
        ("Event", "PKAM reset", stats.errors_event_pkam),
        ("Event", "NoTokenPass", stats.errors_event_notokenpass),
        ("TBM", "header", stats.errors_tbm_header),
        ("TBM", "trailer", stats.errors_tbm_trailer),
        ("TBM", "event ID mismatch", stats.errors_tbm_eventid_mismatch),
        ("ROC", "missing", stats.errors_roc_missing),
        ("ROC", "readback", stats.errors_roc_readback),
        ("Pixel", "incomplete", stats.errors_pixel_incomplete),
        ("Pixel", "address", stats.errors_pixel_address),
        ("Pixel", "pulse height", stats.errors_pixel_pulseheight),
        ("Pixel", "buffer corrupt", stats.errors_pixel_buffer_corrupt),
    ];
    Table::new(
        rows.into_iter()
            .filter(|(_, _, count)| *count > 0)
            .map(|(category, error, count)| ErrorRow {
                category,
                error,
                count,
            }),
    )
}

/// Table with the summed up counters of every channel.
pub(crate) fn channel_table(channels: &[ChannelStatistics]) -> Table {
    Table::new(channels.iter().map(|ch| ChannelRow {
        channel: ch.channel,
        events: ch.events,
        pixels: ch.stats.info_pixels_valid,
        errors: ch.stats.errors(),
    }))
}
