//! `cardwatch monitor`: poll every subscription until ctrl-c.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use cardwatch_daemon::scheduler::{DEFAULT_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES};
use cardwatch_daemon::{start_blocking, PollScheduler, SchedulerConfig};

use super::GlobalArgs;

/// Arguments for `cardwatch monitor`.
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Minutes between polls (minimum 1).
    #[arg(value_name = "MINUTES", default_value_t = DEFAULT_INTERVAL_MINUTES)]
    pub interval: u64,

    /// Seconds to wait between repositories within one poll.
    #[arg(long, value_name = "SECONDS", default_value_t = 2)]
    pub entry_delay: u64,
}

impl MonitorArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = global.check_context()?;
        if self.interval < MIN_INTERVAL_MINUTES {
            eprintln!("interval raised to the minimum of {MIN_INTERVAL_MINUTES} minute");
        }
        let config = SchedulerConfig {
            entry_delay: Duration::from_secs(self.entry_delay),
            ..SchedulerConfig::from_minutes(self.interval)
        };
        println!(
            "Monitoring {} every {} min. Press ctrl-c to stop.",
            ctx.store.path().display(),
            config.interval.as_secs() / 60
        );
        start_blocking(PollScheduler::new(ctx, config)).context("monitor stopped with an error")
    }
}
