//! FFmpeg process adapter
//!
//! Runs an invocation plan as an `ffmpeg` child process, turning its stderr
//! into progress events and keeping the last lines as diagnostics.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::engine::{InvocationPlan, StderrProgressParser};
use crate::ports::*;

/// Number of stderr lines kept for error reports
const DIAGNOSTIC_LINES: usize = 20;

/// Engine backed by the ffmpeg command line tool
#[derive(Debug, Clone)]
pub struct FfmpegProcessAdapter {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegProcessAdapter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.ffmpeg_binary).with_timeout(config.timeout())
    }

    /// Kill the process when it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    fn program_name(&self) -> String {
        self.binary
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.binary.to_string_lossy().to_string())
    }
}

#[async_trait]
impl EnginePort for FfmpegProcessAdapter {
    async fn run(
        &self,
        plan: &InvocationPlan,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<EngineOutcome, DomainError> {
        let program = self.program_name();
        info!(
            command = %plan.command_line(&program),
            outputs = plan.outputs.len(),
            "Starting transcode"
        );
        let started = Instant::now();

        let mut child = Command::new(&self.binary)
            .args(&plan.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::EngineFailure {
                message: format!("failed to spawn {}: {}", program, e),
                diagnostics: String::new(),
            })?;

        let mut stderr = child.stderr.take().ok_or_else(|| DomainError::EngineFailure {
            message: format!("{} stderr was not captured", program),
            diagnostics: String::new(),
        })?;

        let mut parser = StderrProgressParser::new(plan.concatenates);
        let mut tail = DiagnosticsTail::new(DIAGNOSTIC_LINES);

        let drive = async {
            let mut buffer = [0u8; 4096];
            let mut line = Vec::new();
            let mut handle = |raw: &[u8]| {
                let text = String::from_utf8_lossy(raw);
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                if let Some(percentage) = parser.feed(text) {
                    progress(ProgressEvent { percentage });
                }
                tail.push(text);
            };

            loop {
                let read = stderr.read(&mut buffer).await?;
                if read == 0 {
                    break;
                }
                // Status lines end in \r, everything else in \n
                for &byte in &buffer[..read] {
                    if byte == b'\n' || byte == b'\r' {
                        handle(&line);
                        line.clear();
                    } else {
                        line.push(byte);
                    }
                }
            }
            handle(&line);

            child.wait().await
        };

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, drive).await.ok(),
            None => Some(drive.await),
        };

        let status = match waited {
            Some(result) => result.map_err(|e| DomainError::EngineFailure {
                message: format!("I/O error waiting for {}: {}", program, e),
                diagnostics: tail.render(),
            })?,
            None => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out process");
                }
                return Err(DomainError::EngineFailure {
                    message: format!(
                        "{} timed out after {:?}",
                        program,
                        self.timeout.unwrap_or_default()
                    ),
                    diagnostics: tail.render(),
                });
            }
        };

        let elapsed = started.elapsed();
        if !status.success() {
            return Err(DomainError::EngineFailure {
                message: format!("{} exited with {}", program, status),
                diagnostics: tail.render(),
            });
        }

        debug!(elapsed_ms = elapsed.as_millis() as u64, "Transcode finished");
        Ok(EngineOutcome {
            diagnostics: tail.render(),
            elapsed,
        })
    }
}

/// Ring buffer of the last stderr lines
#[derive(Debug)]
struct DiagnosticsTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticsTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    fn render(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}
