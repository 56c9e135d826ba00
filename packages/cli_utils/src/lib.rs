#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared terminal utilities for the safe route tools.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, so `log::info!` output is suspended while a
//! spinner redraws. [`BusyIndicator`] is the spinner shown while a request
//! is outstanding.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const TICK: Duration = Duration::from_millis(100);

/// A spinner that can be shown and hidden repeatedly.
#[derive(Debug)]
pub struct BusyIndicator {
    multi: MultiProgress,
    message: String,
    bar: Option<ProgressBar>,
}

impl BusyIndicator {
    /// Creates a hidden indicator that will show `message` when started.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Self {
        Self {
            multi: multi.clone(),
            message: message.to_string(),
            bar: None,
        }
    }

    /// Shows the spinner. Does nothing if it is already showing.
    pub fn start(&mut self) {
        if self.bar.is_some() {
            return;
        }
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(self.message.clone());
        bar.enable_steady_tick(TICK);
        self.bar = Some(bar);
    }

    /// Hides the spinner. Does nothing if it is not showing.
    pub fn stop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    /// Whether the spinner is showing.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.bar.is_some()
    }

    /// Prints a line above the spinner without tearing it.
    pub fn println(&self, line: &str) {
        if self.multi.println(line).is_err() {
            log::debug!("Terminal unavailable, dropping line: {line}");
        }
    }
}

impl Drop for BusyIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// The filter comes from `RUST_LOG`. Returns the [`MultiProgress`] every
/// spinner must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already installed when called twice (tests).
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
