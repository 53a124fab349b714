//! Contains the [Controller] that collects stats and reports errors.
//! It also controls the stop flag, which can be used to stop the program if a fatal error occurs, or if the config contains a max number of errors to tolerate.
//! Finally when the event loop breaks (at the end of execution), it will print a summary of the stats collected, using the Report struct.
//!
//! Also contains the convenience [init_controller] function, which spawns a thread with the [Controller] running, and returns the thread handle, the channel to send stats to, and the stop flag.

use crate::source::ChannelConfig;
use crate::util::*;

/// Spawns a thread with the [Controller] running, and returns the thread handle, the channel to send stats to, and the stop flag.
pub fn init_controller<C: Config + 'static>(
    config: &'static C,
) -> (
    JoinHandle<()>,
    flume::Sender<StatType>,
    Arc<AtomicBool>,
    Arc<AtomicBool>,
) {
    log::trace!("Initializing stats controller");
    let mut stats = Controller::new(config);
    let stats_send_chan = stats.send_channel();
    let thread_stop_flag = stats.end_processing_flag();
    let any_errors_flag = stats.any_errors_flag();

    let stats_thread = Builder::new()
        .name("stats_thread".to_string())
        .spawn(move || {
            stats.run();
        })
        .expect("Failed to spawn stats thread");
    (
        stats_thread,
        stats_send_chan,
        thread_stop_flag,
        any_errors_flag,
    )
}

/// The Controller receives stats and builds a summary report that is printed at the end of execution.
pub struct Controller<C: Config + 'static> {
    channel_stats: Vec<ChannelStatistics>,
    channel_configs: Vec<ChannelConfig>,
    error_messages: Vec<Box<str>>,
    fatal_error: Option<Box<str>>,
    /// Time from [Controller] is instantiated, to all processing threads disconnected their [StatType] producer channel.
    pub processing_time: Instant,
    config: &'static C,
    max_tolerate_errors: u32,
    // The channel where stats are received from other threads.
    stats_recv_chan: flume::Receiver<StatType>,
    // Kept to hand out clones, set to None when the event loop starts so the loop ends once every producer dropped its sender.
    stats_send_chan: Option<flume::Sender<StatType>>,
    end_processing_flag: Arc<AtomicBool>,
    any_errors_flag: Arc<AtomicBool>,
    spinner: Option<ProgressBar>,
    spinner_message: String,
}

impl<C: Config + 'static> Controller<C> {
    /// Creates a new [Controller] from a [Config], with an unbounded channel to receive [StatType] on.
    pub fn new(global_config: &'static C) -> Self {
        let (stats_send_chan, stats_recv_chan): (
            flume::Sender<StatType>,
            flume::Receiver<StatType>,
        ) = flume::unbounded();
        Controller {
            channel_stats: Vec::new(),
            channel_configs: Vec::new(),
            error_messages: Vec::new(),
            fatal_error: None,
            config: global_config,
            processing_time: Instant::now(),
            max_tolerate_errors: global_config.max_tolerate_errors(),
            stats_recv_chan,
            stats_send_chan: Some(stats_send_chan),
            end_processing_flag: Arc::new(AtomicBool::new(false)),
            any_errors_flag: Arc::new(AtomicBool::new(false)),
            spinner: if global_config.report_enabled() {
                Some(new_styled_spinner())
            } else {
                None
            },
            spinner_message: String::new(),
        }
    }

    /// Returns a clone of the channel that is used to send stats to the Controller.
    pub fn send_channel(&self) -> flume::Sender<StatType> {
        match &self.stats_send_chan {
            Some(chan) => chan.clone(),
            None => {
                log::error!("Controller send channel is none, most likely it is already running and does not accept new producers");
                panic!("Controller send channel is none, most likely it is already running and does not accept new producers");
            }
        }
    }

    /// Returns a cloned reference to the end processing flag.
    pub fn end_processing_flag(&self) -> Arc<AtomicBool> {
        self.end_processing_flag.clone()
    }

    /// Returns a cloned reference to the any errors flag
    ///
    /// The flag is set if any decoding errors or processing errors were seen at end of processing.
    pub fn any_errors_flag(&self) -> Arc<AtomicBool> {
        self.any_errors_flag.clone()
    }

    /// Starts the event loop for the Controller
    /// This function will block until the channel is closed
    pub fn run(&mut self) {
        self.stats_send_chan = None;

        // Breaks when every producer has dropped its sender
        while let Ok(stats_update) = self.stats_recv_chan.recv() {
            self.update(stats_update);
        }

        let output = StatsOutput::from_channels(&self.channel_stats);

        if self.config.report_enabled() {
            self.process_error_messages();
            if !self.channel_configs.is_empty() || self.fatal_error.is_some() {
                self.new_spinner_with_prefix("Generating report".to_string());
                self.print(&output);
            }
        } else {
            log::info!("View active or stats are written to stdout, skipping report summary printout.");
            self.process_error_messages();
        }

        if self.any_errors(&output) {
            self.any_errors_flag.store(true, Ordering::SeqCst);
        }

        if let Some(format) = self.config.stats_output_format() {
            if let Err(e) = output.write_stats(&self.config.stats_output_mode(), format) {
                crate::display_error(&format!("Failed writing stats output: {e}"));
            }
        }
    }

    fn update(&mut self, stat: StatType) {
        match stat {
            StatType::ChannelConfigured(channel_config) => {
                log::debug!("{channel_config}");
                self.channel_configs.push(channel_config);
            }
            StatType::Decoding(ch_stats) => {
                log::trace!("{}", StatType::Decoding(ch_stats.clone()));
                match self
                    .channel_stats
                    .iter_mut()
                    .find(|ch| ch.channel == ch_stats.channel)
                {
                    Some(ch) => ch.merge(&ch_stats),
                    None => self.channel_stats.push(*ch_stats),
                }
                let events: u64 = self.channel_stats.iter().map(|ch| ch.events).sum();
                if let Some(spinner) = &self.spinner {
                    spinner.set_prefix(format!("Decoded {events} events"));
                }
                if ch_stats.stats.errors() > 0 {
                    self.set_spinner_msg(
                        format!("{err_cnt} Errors in data!", err_cnt = self.error_count())
                            .red()
                            .to_string(),
                    );
                }
                self.check_max_errors();
            }
            StatType::Error(msg) => {
                // Stop processing any error messages
                if self.fatal_error.is_some() {
                    log::trace!("Fatal error already seen, ignoring error: {msg}");
                    return;
                }
                self.error_messages.push(msg);
                self.set_spinner_msg(
                    format!("{err_cnt} Errors in data!", err_cnt = self.error_count())
                        .red()
                        .to_string(),
                );
                self.check_max_errors();
            }
            StatType::Fatal(err) => {
                if self.fatal_error.is_some() {
                    log::trace!("Fatal error already seen, ignoring error: {err}");
                    return;
                }
                self.end_processing_flag.store(true, Ordering::SeqCst);
                log::error!("FATAL: {err}\nShutting down...");
                self.fatal_error = Some(err);
            }
        }
    }

    /// Decoding errors of all channels plus the reported processing errors
    fn error_count(&self) -> u64 {
        self.channel_stats
            .iter()
            .map(|ch| u64::from(ch.stats.errors()))
            .sum::<u64>()
            + self.error_messages.len() as u64
    }

    fn check_max_errors(&mut self) {
        if self.max_tolerate_errors > 0
            && self.error_count() >= u64::from(self.max_tolerate_errors)
            && !self.end_processing_flag.load(Ordering::SeqCst)
        {
            log::trace!("Errors reached maximum tolerated errors, exiting...");
            self.end_processing_flag.store(true, Ordering::SeqCst);
        }
    }

    fn any_errors(&self, output: &StatsOutput) -> bool {
        output.total.errors() > 0 || !self.error_messages.is_empty() || self.fatal_error.is_some()
    }

    fn process_error_messages(&mut self) {
        if self.error_messages.is_empty() || self.config.mute_errors() {
            return;
        }
        self.new_spinner_with_prefix(
            format!(
                "Processing {err_count} error messages",
                err_count = self.error_messages.len()
            )
            .yellow()
            .to_string(),
        );
        let limit = if self.max_tolerate_errors > 0 {
            self.max_tolerate_errors as usize
        } else {
            usize::MAX
        };
        for msg in self.error_messages.iter().take(limit) {
            crate::display_error(msg);
        }
        if let Some(spinner) = &self.spinner {
            spinner.abandon();
        }
    }

    /// Builds and prints the report
    fn print(&mut self, output: &StatsOutput) {
        let mut report = Report::with_stats_output(self.processing_time.elapsed(), output);
        for channel_config in &self.channel_configs {
            report.add_detected_attribute(
                format!("Channel {ch}", ch = channel_config.channel),
                format!(
                    "{env}/{dev}, {len} ROCs from {first}",
                    env = channel_config.envelope,
                    dev = channel_config.device,
                    len = channel_config.chain_length(),
                    first = channel_config.chain_offset
                ),
            );
        }
        if let Some(fatal_error) = &self.fatal_error {
            report.add_fatal_error(fatal_error.to_string());
        }
        self.append_spinner_msg("... completed");
        if let Some(spinner) = &self.spinner {
            spinner.abandon();
        }
        report.print();
    }

    /// Add completed message to current spinner and abandon it
    /// Replace it with new spinner with an empty message
    /// Set the new spinners prefix message
    fn new_spinner_with_prefix(&mut self, prefix: String) {
        if self.spinner.is_some() {
            self.append_spinner_msg("... completed");
        }
        if let Some(spinner) = self.spinner.take() {
            spinner.abandon();
        }
        let spinner = new_styled_spinner();
        spinner.set_prefix(prefix);
        self.spinner = Some(spinner);
        self.spinner_message = "".to_string();
    }

    fn set_spinner_msg(&mut self, new_msg: String) {
        if let Some(spinner) = &self.spinner {
            self.spinner_message = new_msg;
            spinner.set_message(self.spinner_message.clone());
        }
    }

    fn append_spinner_msg(&mut self, to_append: &str) {
        if let Some(spinner) = &self.spinner {
            self.spinner_message = self.spinner_message.clone() + to_append + " ";
            spinner.set_message(self.spinner_message.clone());
        }
    }
}

fn new_styled_spinner() -> ProgressBar {
    let spinner_style = ProgressStyle::with_template("{spinner} [ {prefix:.bold.blue} ] {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▹▹▹▹▹",
            "▸▹▹▹▹",
            "▹▸▹▹▹",
            "▹▹▸▹▹",
            "▹▹▹▸▹",
            "▹▹▹▹▸",
            "▪▪▪▪▪",
        ]);
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
