//! Contains the [run] function that is the entry point for dtbpipe
use crate::util::lib::{init_ctrlc_handler, init_error_logger};
use crate::{
    config::{channels::channel_inputs, init_config},
    controller::init_controller,
    init_processing,
    util::*,
};

/// Entry point for dtbpipe
pub fn run() -> ExitCode {
    human_panic::setup_panic!();

    if let Err(e) = init_config() {
        eprintln!("{e}");
        return ExitCode::from(1);
    };

    init_error_logger(Cfg::global());

    if let Some(shell) = Cfg::global().generate_completions {
        Cfg::generate_completion_script(shell);
        log::warn!("Completions generated for {shell:?}. Exiting...");
        return ExitCode::from(0);
    }

    if let Some(args) = Cfg::global().generate() {
        return match crate::generate(Cfg::global(), args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                crate::display_error(&format!(
                    "Failed to generate {}: {e}",
                    args.output.display()
                ));
                ExitCode::from(1)
            }
        };
    }

    // Launch controller thread
    // If max allowed errors is reached, the controller thread signals every other thread to stop
    let (controller, stat_send_chan, stop_flag, any_errors_flag) = init_controller(Cfg::global());

    // Handles SIGINT, SIGTERM and SIGHUP (as the `termination` feature is  enabled)
    init_ctrlc_handler(stop_flag.clone());

    let exit_code: u8 = match channel_inputs(Cfg::global()) {
        Ok(inputs) => match init_processing(Cfg::global(), inputs, stat_send_chan, stop_flag) {
            Ok(_) => 0,
            Err(e) => {
                log::error!("Init processing failed: {e}");
                1
            }
        },
        Err(e) => {
            let _ = stat_send_chan.send(StatType::Fatal(e.to_string().into()));
            drop(stat_send_chan);
            1
        }
    };

    controller.join().expect("Failed to join stats thread");

    lib::exit(exit_code, &any_errors_flag)
}
