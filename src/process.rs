//! Per channel processing: one worker thread pulls a channel's raw words through the splitter and decoder
//!
//! Depending on the [Config] a worker decodes and reports statistics, or prints a view of the raw records or decoded events.
//! Decoding statistics are sent to the [Controller](crate::controller::Controller) every [STATS_REPORT_INTERVAL] events and at the end of the stream.

use crate::config::channels::ChannelInput;
use crate::pipe::decoder::DtbEventDecoder;
use crate::pipe::splitter::DtbEventSplitter;
use crate::pipe::RawEventSource;
use crate::source::file_source::FileSource;
use crate::source::{ChannelConfig, PipeError, WordSource};
use crate::util::*;

/// Number of events between two statistics reports of a worker
pub const STATS_REPORT_INTERVAL: u64 = 1000;

/// Spawn the worker thread of one DAQ channel.
pub fn spawn_channel<C: Config + 'static>(
    config: &'static C,
    input: ChannelInput,
    stats_send: flume::Sender<StatType>,
    stop_flag: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    Builder::new()
        .name(format!("channel_{}", input.config.channel))
        .spawn(move || {
            let channel = input.config.channel;
            if let Err(e) = process_channel(config, &input, &stats_send, &stop_flag) {
                log::debug!("Channel {channel} stopped: {e}");
                let _ = stats_send.send(StatType::Error(
                    format!("Channel {channel}: {e}").into_boxed_str(),
                ));
            }
        })
}

fn process_channel<C: Config>(
    config: &C,
    input: &ChannelInput,
    stats_send: &flume::Sender<StatType>,
    stop_flag: &AtomicBool,
) -> io::Result<()> {
    let _ = stats_send.send(StatType::ChannelConfigured(input.config));
    match &input.file {
        Some(path) => {
            log::info!("Channel {}: reading {}", input.config.channel, path.display());
            let source = FileSource::open(path, input.config)?;
            process_source(config, source, stats_send, stop_flag)
        }
        None => {
            log::info!("Channel {}: reading stdin", input.config.channel);
            let source = FileSource::new(io::stdin().lock(), input.config);
            process_source(config, source, stats_send, stop_flag)
        }
    }
}

/// Run the pipeline on any word source, as selected by the view option of the [Config].
pub fn process_source<C: Config, S: WordSource>(
    config: &C,
    source: S,
    stats_send: &flume::Sender<StatType>,
    stop_flag: &AtomicBool,
) -> io::Result<()> {
    let splitter = DtbEventSplitter::new(source);
    match config.view() {
        Some(ViewCommands::Raw) => view_raw(splitter, &mut io::stdout(), stop_flag),
        Some(ViewCommands::Events) => decode(
            DtbEventDecoder::new(splitter),
            stats_send,
            stop_flag,
            Some(&mut io::stdout()),
        ),
        None => decode::<_, io::Stdout>(DtbEventDecoder::new(splitter), stats_send, stop_flag, None),
    }
}

/// Print every framed record of the channel.
pub fn view_raw<R: RawEventSource, W: Write>(
    mut splitter: R,
    out: &mut W,
    stop_flag: &AtomicBool,
) -> io::Result<()> {
    let channel = splitter.config().channel;
    while !stop_flag.load(Ordering::Relaxed) {
        let record = match splitter.read() {
            Ok(record) => record,
            Err(e) => return end_of_stream(e),
        };
        if !write_view_line(out, format_args!("{channel:>3}: {record}"))? {
            break;
        }
    }
    Ok(())
}

/// Decode every event of the channel, printing them if `view` is given, and report the statistics.
pub fn decode<R: RawEventSource, W: Write>(
    mut decoder: DtbEventDecoder<R>,
    stats_send: &flume::Sender<StatType>,
    stop_flag: &AtomicBool,
    mut view: Option<&mut W>,
) -> io::Result<()> {
    let config: ChannelConfig = *decoder.config();
    let mut events_since_report: u64 = 0;
    let mut result = Ok(());

    while !stop_flag.load(Ordering::Relaxed) {
        let event = match decoder.read() {
            Ok(event) => event,
            Err(e) => {
                result = end_of_stream(e);
                break;
            }
        };
        if let Some(out) = view.as_mut() {
            match write_view_line(
                out,
                format_args!("{ch:>3}: {event}", ch = config.channel),
            ) {
                Ok(true) => (),
                Ok(false) => break,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        events_since_report += 1;
        if events_since_report == STATS_REPORT_INTERVAL {
            send_statistics(&mut decoder, events_since_report, stats_send);
            events_since_report = 0;
        }
    }

    send_statistics(&mut decoder, events_since_report, stats_send);
    if config.device.has_readback() {
        for (roc, values) in decoder.get_readback().iter().enumerate() {
            if !values.is_empty() {
                log::debug!(
                    "Channel {ch} ROC {roc}: {n} readback values",
                    ch = config.channel,
                    roc = roc + usize::from(config.chain_offset),
                    n = values.len()
                );
            }
        }
    }
    result
}

fn send_statistics<R: RawEventSource>(
    decoder: &mut DtbEventDecoder<R>,
    events: u64,
    stats_send: &flume::Sender<StatType>,
) {
    let stats = decoder.get_statistics();
    let channel = decoder.config().channel;
    if stats_send
        .send(StatType::Decoding(Box::new(ChannelStatistics::new(
            channel, events, stats,
        ))))
        .is_err()
    {
        log::trace!("Stats channel closed, dropping statistics of channel {channel}");
    }
}

// The stream ending is not an error
fn end_of_stream(e: PipeError) -> io::Result<()> {
    match e {
        PipeError::BufferEmpty => Ok(()),
        PipeError::NotConnected => Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "word source is not connected",
        )),
        PipeError::Io(e) => Err(e),
    }
}

// Returns false if the reader of the view went away
fn write_view_line<W: Write>(out: &mut W, line: fmt::Arguments<'_>) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            log::warn!("Broken pipe, stdout was closed before the view was complete");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
