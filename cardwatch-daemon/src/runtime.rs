use tokio_util::sync::CancellationToken;

use crate::error::{io_err, DaemonError};
use crate::scheduler::PollScheduler;

/// Start the monitor and block the current thread until ctrl-c.
pub fn start_blocking(scheduler: PollScheduler) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run_until_signal(scheduler, CancellationToken::new()))
}

/// Run `scheduler` until ctrl-c or until `cancel` is triggered elsewhere.
pub async fn run_until_signal(
    mut scheduler: PollScheduler,
    cancel: CancellationToken,
) -> Result<(), DaemonError> {
    let scheduler_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            scheduler.run(cancel.clone()).await;
            cancel.cancel();
            Ok::<(), DaemonError>(())
        })
    };

    let signal_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, stopping after the current check");
                            cancel.cancel();
                            Ok(())
                        }
                        Err(err) => {
                            cancel.cancel();
                            Err(DaemonError::Signal(err.to_string()))
                        }
                    }
                }
            }
        })
    };

    let (scheduler_result, signal_result) = tokio::join!(scheduler_handle, signal_handle);
    handle_join("scheduler", scheduler_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            message: err.to_string(),
        }),
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// `info` filter. Events go to stderr so command output on stdout stays
/// clean. Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
