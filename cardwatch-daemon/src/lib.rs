//! Monitor runtime: periodic poll scheduler on tokio with ctrl-c shutdown.

mod error;
mod runtime;
pub mod scheduler;

pub use error::DaemonError;
pub use runtime::{init_tracing, run_until_signal, start_blocking};
pub use scheduler::{PollScheduler, SchedulerConfig, TickSummary, MAX_HOLD};
