//! Client for communicating with the automation driver subprocess
//!
//! Requests are strictly sequential: the harness awaits every response
//! before issuing the next command, because correctness of the
//! install/verify cycle depends on ordering.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};

use crate::common::{Error, Result};

use super::codec;
use super::types::{Command, Request, Response};

/// Client for a spawned automation driver
pub struct DriverClient {
    /// Driver subprocess
    driver: Child,
    /// Buffered reader for driver stdout
    reader: BufReader<ChildStdout>,
    /// Buffered writer for driver stdin
    writer: BufWriter<ChildStdin>,
    /// Sequence number for requests
    seq: i64,
    /// Per-request timeout
    request_timeout: Duration,
}

impl DriverClient {
    /// Spawn the automation driver and create a client
    pub async fn spawn(
        driver_path: &Path,
        args: &[String],
        request_secs: u64,
    ) -> Result<Self> {
        let mut cmd = TokioCommand::new(driver_path);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()) // Let driver errors go to stderr
            .kill_on_drop(true); // the driver must not outlive a failed startup

        let mut driver = cmd.spawn().map_err(|e| {
            Error::DriverStartFailed(format!(
                "Failed to start {}: {}",
                driver_path.display(),
                e
            ))
        })?;

        let stdin = driver
            .stdin
            .take()
            .ok_or_else(|| Error::DriverStartFailed("Failed to get driver stdin".to_string()))?;
        let stdout = driver
            .stdout
            .take()
            .ok_or_else(|| Error::DriverStartFailed("Failed to get driver stdout".to_string()))?;

        Ok(Self {
            driver,
            reader: BufReader::new(stdout),
            writer: BufWriter::new(stdin),
            seq: 0,
            request_timeout: Duration::from_secs(request_secs),
        })
    }

    /// Send a command and wait for its response body
    pub async fn send_command(&mut self, command: Command) -> Result<Value> {
        let name = command.name();
        self.seq += 1;
        let request = Request {
            seq: self.seq,
            command,
        };

        tracing::debug!(seq = request.seq, command = name, "driver request");
        codec::write_frame(&mut self.writer, &request).await?;

        let response = tokio::time::timeout(
            self.request_timeout,
            self.read_response(request.seq),
        )
        .await
        .map_err(|_| Error::Timeout(self.request_timeout.as_secs()))??;

        if !response.success {
            return Err(Error::request_failed(
                name,
                response.message.as_deref().unwrap_or("unknown error"),
            ));
        }

        Ok(response.body)
    }

    /// Read messages until the response matching `request_seq` arrives
    ///
    /// Anything else on the stream has no awaiting caller; it is
    /// written to the diagnostic stream and skipped.
    async fn read_response(&mut self, request_seq: i64) -> Result<Response> {
        loop {
            let frame = codec::read_frame(&mut self.reader).await?;

            match serde_json::from_value::<Response>(frame.clone()) {
                Ok(response) if response.request_seq == request_seq => {
                    tracing::debug!(seq = response.seq, success = response.success, "driver response");
                    return Ok(response);
                }
                Ok(response) => {
                    tracing::error!(
                        "unmatched driver response for request {} (awaiting {})",
                        response.request_seq,
                        request_seq
                    );
                }
                Err(_) => {
                    tracing::error!("unhandled driver message: {}", frame);
                }
            }
        }
    }

    /// Kill the driver subprocess, ignoring failures
    pub async fn shutdown(mut self) {
        if let Err(e) = self.driver.kill().await {
            tracing::warn!("failed to kill driver process: {}", e);
        }
    }
}
