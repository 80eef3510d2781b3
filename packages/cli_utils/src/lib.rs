#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Terminal plumbing for the `crash_warehouse` binary: the load progress
//! bar and a logger that keeps log lines from tearing it.

use std::sync::Arc;
use std::time::Duration;

use crash_warehouse_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const WAITING_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const COUNTING_TEMPLATE: &str = "  {msg:<14} {wide_bar:.cyan/dim} {pos}/{len} records [{eta}]";

/// Progress for one warehouse load, reported through [`ProgressCallback`].
///
/// The loader walks every record twice (conforming, then fact building)
/// and announces both passes up front with `set_total`.
pub struct IndicatifProgress {
    bar: ProgressBar,
    counting: ProgressStyle,
}

impl IndicatifProgress {
    /// Adds a bar for the loader to `multi`. It spins under `message` until
    /// the loader reports how many steps to expect.
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let waiting = ProgressStyle::with_template(WAITING_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let counting = ProgressStyle::with_template(COUNTING_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        let bar = multi.add(ProgressBar::new_spinner().with_style(waiting));
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Arc::new(Self { bar, counting })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(self.counting.clone());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge` and returns the [`MultiProgress`] the load bar
/// must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();
    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let max_level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_err()
    {
        // Another logger is already installed; keep it.
        return multi;
    }
    log::set_max_level(max_level);
    multi
}

