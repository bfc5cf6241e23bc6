//! External capture step: hands a rendered HTML card to a screenshot program.
//!
//! The command line is split on whitespace (no shell). `{input}` and
//! `{output}` are replaced with the HTML path and the image path; when neither
//! placeholder appears, both paths are appended in that order.
//!
//! The program is killed once [`DEFAULT_CAPTURE_TIMEOUT`] (or the configured
//! timeout) passes without it exiting.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::RenderError;

const INPUT: &str = "{input}";
const OUTPUT: &str = "{output}";

pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A parsed capture command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CaptureCommand {
    /// Parse a command line. Returns `None` for a blank string.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        let mut args: Vec<String> = words.collect();
        let has_placeholder = args.iter().any(|a| a.contains(INPUT) || a.contains(OUTPUT));
        if !has_placeholder {
            args.push(INPUT.to_string());
            args.push(OUTPUT.to_string());
        }
        Some(CaptureCommand {
            program,
            args,
            timeout: DEFAULT_CAPTURE_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with placeholders substituted.
    pub fn args_for(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace(INPUT, &input).replace(OUTPUT, &output))
            .collect()
    }

    /// Run the command for `html` and return the image path.
    ///
    /// The image sits next to the HTML with a `.png` extension.
    pub fn run(&self, html: &Path) -> Result<PathBuf, RenderError> {
        let image = html.with_extension("png");
        let mut child = Command::new(&self.program)
            .args(self.args_for(html, &image))
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| self.failure(e.to_string()))?;

        let deadline = Instant::now().checked_add(self.timeout);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if deadline.is_some_and(|d| Instant::now() >= d) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.failure(format!(
                        "timed out after {}s",
                        self.timeout.as_secs_f32()
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(self.failure(e.to_string()));
                }
            }
        };
        if !status.success() {
            return Err(self.failure(format!("exited with {status}")));
        }
        if !image.exists() {
            return Err(self.failure(format!("did not produce {}", image.display())));
        }
        Ok(image)
    }

    fn failure(&self, message: String) -> RenderError {
        RenderError::Capture {
            program: self.program.clone(),
            message,
        }
    }
}
