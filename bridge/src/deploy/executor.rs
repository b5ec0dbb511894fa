//! Provisioning process executor
//!
//! Spawns the provisioning tool as a detached child, streams its stdout and
//! stderr line by line into an in-memory buffer and the deploy log, and
//! publishes the exit value on a watch channel once the child terminates.

use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::deploy::command::ToolCommand;
use crate::errors::BridgeError;
use crate::filesys::file::File;

/// Exit value reported when the tool could not be started at all
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;

/// Exit value reported when the tool's exit status could not be collected
pub const WAIT_FAILURE_EXIT_CODE: i32 = -2;

/// How long output is drained after the tool exits before its exit value is published
pub const OUTPUT_DRAIN_LIMIT: Duration = Duration::from_millis(500);

/// Output captured from the running tool
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    inner: Arc<Mutex<CapturedText>>,
}

#[derive(Debug, Default)]
struct CapturedText {
    text: String,
    frozen: bool,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line; ignored once frozen
    pub fn append_line(&self, line: &str) {
        let mut captured = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if captured.frozen {
            return;
        }
        captured.text.push_str(line);
        captured.text.push('\n');
    }

    pub fn freeze(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frozen = true;
    }

    pub fn snapshot(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .text
            .clone()
    }
}

/// Where the tool's output goes: memory first, then the deploy log
#[derive(Clone)]
struct OutputSink {
    buffer: OutputBuffer,
    log: Arc<tokio::sync::Mutex<fs::File>>,
}

impl OutputSink {
    async fn write_line(&self, line: &str) {
        self.buffer.append_line(line);

        let mut log = self.log.lock().await;
        let written = async {
            log.write_all(line.as_bytes()).await?;
            log.write_all(b"\n").await
        }
        .await;
        if let Err(e) = written {
            warn!("Failed to write deploy log: {}", e);
        }
    }

    async fn flush(&self) {
        if let Err(e) = self.log.lock().await.flush().await {
            warn!("Failed to flush deploy log: {}", e);
        }
    }
}

/// Handle on a launched provisioning tool process
#[derive(Debug)]
pub struct ProcessExecutor {
    pid: Option<u32>,
    output: OutputBuffer,
    exit_rx: watch::Receiver<Option<i32>>,
}

impl ProcessExecutor {
    /// Launch the tool and return as soon as the child exists.
    ///
    /// Errors are launch failures only: a missing program, missing
    /// permissions, or an unwritable deploy log. Anything the tool does after
    /// starting is reported through its exit value.
    pub async fn start(command: &ToolCommand, deploy_log: &File) -> Result<Self, BridgeError> {
        let log = deploy_log.create().await.map_err(|e| {
            BridgeError::LaunchError(format!(
                "cannot open {}: {}",
                deploy_log.path().display(),
                e
            ))
        })?;

        let mut child = command
            .to_command()
            .spawn()
            .map_err(|e| BridgeError::LaunchError(format!("{}: {}", command.program.display(), e)))?;

        let pid = child.id();
        info!("Launched provisioning tool (pid {:?}): {}", pid, command.display());

        let output = OutputBuffer::new();
        let sink = OutputSink {
            buffer: output.clone(),
            log: Arc::new(tokio::sync::Mutex::new(log)),
        };
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (exit_tx, exit_rx) = watch::channel(None);

        let stdout_pump = tokio::spawn(pump(stdout, sink.clone()));
        let stderr_pump = tokio::spawn(pump(stderr, sink.clone()));

        tokio::spawn(async move {
            let status = child.wait().await;

            // Pipes inherited by a background grandchild stay open past the
            // tool's exit; those pumps keep draining on their own.
            let drained = tokio::time::timeout(OUTPUT_DRAIN_LIMIT, async {
                let _ = tokio::join!(stdout_pump, stderr_pump);
            })
            .await;
            if drained.is_err() {
                warn!(
                    "Provisioning tool (pid {:?}) exited with its output still open",
                    pid
                );
            }
            sink.flush().await;
            sink.buffer.freeze();

            let exit_value = match status {
                Ok(status) => exit_value_of(status),
                Err(e) => {
                    error!("Failed to collect provisioning tool exit status: {}", e);
                    WAIT_FAILURE_EXIT_CODE
                }
            };
            debug!("Provisioning tool (pid {:?}) exited with {}", pid, exit_value);
            let _ = exit_tx.send(Some(exit_value));
        });

        Ok(Self {
            pid,
            output,
            exit_rx,
        })
    }

    /// OS process id, if the child was still known at launch
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_alive(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    /// Exit value, available after termination
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_rx.borrow()
    }

    /// Output captured so far; frozen once the exit value is published
    pub fn captured_output(&self) -> String {
        self.output.snapshot()
    }

    /// Completion channel, resolved with the exit value
    pub fn completion(&self) -> Completion {
        Completion {
            rx: self.exit_rx.clone(),
        }
    }
}

/// Awaitable exit of a [`ProcessExecutor`]
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<Option<i32>>,
}

impl Completion {
    /// Wait for the tool to exit and return its exit value
    pub async fn wait(mut self) -> i32 {
        match self.rx.wait_for(Option::is_some).await {
            Ok(code) => (*code).unwrap_or(WAIT_FAILURE_EXIT_CODE),
            Err(_) => WAIT_FAILURE_EXIT_CODE,
        }
    }
}

async fn pump<R>(reader: Option<R>, sink: OutputSink)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => sink.write_line(&line).await,
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped reading provisioning tool output: {}", e);
                break;
            }
        }
    }
    sink.flush().await;
}

fn exit_value_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    WAIT_FAILURE_EXIT_CODE
}
