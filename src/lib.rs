#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
// Readability lints
#![warn(
    clippy::option_filter_map,
    clippy::manual_filter_map,
    clippy::if_not_else,
    clippy::nonminimal_bool,
    clippy::single_match_else,
    clippy::range_plus_one,
    clippy::int_plus_one,
    clippy::needless_range_loop,
    clippy::needless_continue,
    clippy::shadow_same,
    clippy::shadow_unrelated
)]
// Performance lints
#![warn(variant_size_differences)]
#![warn(
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,
    clippy::mutex_integer,
    clippy::mem_forget,
    clippy::maybe_infinite_iter
)]
// Safety lints
#![warn(unused_results)]
#![warn(unused_import_braces)]
#![warn(trivial_casts, trivial_numeric_casts)]
// Unhandled results (allow unwrap and expect as there are many cases where the unwrap is totally safe)
#![warn(clippy::map_unwrap_or)]

//! dtbpipe splits and decodes raw readout data of pixel detector testboards (DTB)
//!
//! The raw 16-bit word stream of a DAQ channel is framed into per-trigger records by the
//! [DtbEventSplitter](pipe::splitter::DtbEventSplitter), which the [DtbEventDecoder](pipe::decoder::DtbEventDecoder)
//! turns into events with TBM header, TBM trailer and pixel hits, while counting every decoding error.
//!
//! # Usage
//!
//! ## Decoding a raw data file and printing the report
//! ```shell
//! # Single ROC read out through DESER160
//! $ dtbpipe <input_file>
//!
//! # Module with a TBM08b and 8 ROCs per channel, one file per channel
//! $ dtbpipe ch0.raw ch1.raw -t tbm08b -r psi46digv21respin
//! ```
//!
//! ## Channel layout from a TOML file, stop after 100 decoding errors
//! ```shell
//! $ dtbpipe -c channels.toml -e 100
//! ```
//!
//! ## Reading data from stdin and writing the statistics as JSON to stdout
//! ```shell
//! $ cat <input_file> | dtbpipe -t tbm09 -S stdout -D json
//! ```
//!
//! ## Printing a view of the raw records or the decoded events
//! ```shell
//! $ dtbpipe <input_file> -t emu view raw
//! $ dtbpipe <input_file> -t emu view events
//! ```
//!
//! ## Generating emulated raw data
//! ```shell
//! $ dtbpipe -t tbm08b generate --events 1000 --output emulated.raw
//! ```

use crate::config::channels::ChannelInput;
use crate::util::*;

/// Write an error message to stderr.
/// All error messages should be written through this function to ensure consistency.
#[inline]
pub fn display_error(err_msg: &str) {
    log::error!("{}", owo_colors::OwoColorize::red(&err_msg));
}

pub mod config;
pub mod controller;
pub mod emulator;
pub mod init;
pub mod pipe;
pub mod process;
pub mod source;
pub mod stats;
pub mod util;
pub mod words;

/// Does the initial setup for input data processing
///
/// Spawns one worker thread per DAQ channel and waits for all of them to finish.
#[allow(clippy::needless_pass_by_value)] // The sender is cloned into every worker, the original is dropped when all workers are spawned
pub fn init_processing(
    config: &'static impl Config,
    inputs: Vec<ChannelInput>,
    stat_send: flume::Sender<StatType>,
    stop_flag: Arc<AtomicBool>,
) -> io::Result<()> {
    let mut workers = Vec::with_capacity(inputs.len());
    for input in inputs {
        let channel = input.config.channel;
        match process::spawn_channel(config, input, stat_send.clone(), stop_flag.clone()) {
            Ok(handle) => workers.push(handle),
            Err(e) => {
                stop_flag.store(true, Ordering::SeqCst);
                let _ = stat_send.send(StatType::Fatal(
                    format!("Failed to spawn worker of channel {channel}: {e}").into(),
                ));
                break;
            }
        }
    }
    drop(stat_send);

    let mut result = Ok(());
    for worker in workers {
        if let Err(e) = worker.join() {
            log::error!("Channel worker terminated early: {e:?}");
            result = Err(io::Error::other("channel worker panicked"));
        }
    }
    result
}

/// Writes an emulated raw data file as described by the `generate` subcommand
pub fn generate(config: &impl Config, args: &GenerateArgs) -> io::Result<()> {
    let mut channel_config = source::ChannelConfig::new(0, config.envelope(), config.device())
        .with_chain_offset(config.chain_offset())
        .with_flags(config.decoder_flags().bits());
    if let Some(rocs) = args.rocs.or(config.chain_length()) {
        channel_config = channel_config.with_chain_length(rocs);
    }
    log::info!(
        "Generating {events} events for {channel_config} into {out}",
        events = args.events,
        out = args.output.display()
    );
    let mut emulator = emulator::Emulator::new(channel_config, args.hits, args.seed);
    let mut writer = io::BufWriter::new(fs::File::create(&args.output)?);
    for _ in 0..args.events {
        source::file_source::write_words(&mut writer, &emulator.next_event().words)?;
    }
    writer.flush()
}
