//! Miscellaneous utility functions

use crate::config::prelude::*;
use crate::config::Cfg;
use std::sync::{atomic::AtomicBool, Arc};

/// Start the [stderrlog] instance, and immediately use it to log the configured [DataOutputMode] of the stats.
pub fn init_error_logger(cfg: &(impl UtilOpt + InputOutputOpt)) {
    stderrlog::new()
        .module("dtbpipe")
        .verbosity(cfg.verbosity() as usize)
        .init()
        .expect("Failed to initialize logger");
    match cfg.stats_output_mode() {
        DataOutputMode::Stdout => log::trace!("Stats ouput set to stdout"),
        DataOutputMode::File(path) => log::trace!("Stats ouput set to file {}", path.display()),
        DataOutputMode::None => {
            log::trace!("Stats output set to suppressed")
        }
    }
    log::trace!("Starting dtbpipe with args: {:#?}", Cfg::global());
    log::trace!("Views enabled: {:#?}", Cfg::global().view());
}

/// Initializes the Ctrl+C handler to facilitate graceful shutdown on Ctrl+C
///
/// Also handles SIGTERM and SIGHUP if the `termination` feature is enabled
pub fn init_ctrlc_handler(stop_flag: Arc<AtomicBool>) {
    // Handles SIGINT, SIGTERM and SIGHUP (as the `termination` feature is  enabled)
    ctrlc::set_handler({
        let mut stop_sig_count = 0;
        move || {
            log::warn!(
                "Stop Ctrl+C, SIGTERM, or SIGHUP received, stopping gracefully, please wait..."
            );
            stop_flag.store(true, std::sync::atomic::Ordering::SeqCst);
            stop_sig_count += 1;
            if stop_sig_count > 1 {
                log::warn!("Second stop signal received, ungraceful shutdown.");
                std::process::exit(1);
            }
        }
    })
    .expect("Error setting Ctrl-C handler");
}

/// Exits the program with the appropriate exit code
pub fn exit(exit_code: u8, any_errors_flag: &AtomicBool) -> std::process::ExitCode {
    exit_with(exit_code, any_errors_flag, Cfg::global().any_errors_exit_code())
}

fn exit_with(
    exit_code: u8,
    any_errors_flag: &AtomicBool,
    any_errors_exit_code: Option<u8>,
) -> std::process::ExitCode {
    if exit_code == 0 {
        log::debug!("Exit successful from data processing");
        match any_errors_exit_code {
            Some(code) if any_errors_flag.load(std::sync::atomic::Ordering::Relaxed) => {
                std::process::ExitCode::from(code)
            }
            _ => std::process::ExitCode::SUCCESS,
        }
    } else {
        std::process::ExitCode::from(exit_code)
    }
}
