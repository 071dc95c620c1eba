//! IPC client for talking to the floatclock daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Streaming `watch` connections

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::types::{ConfigureParams, EngineSnapshot, IpcRequest, IpcResponse};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: usize = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a client for the given socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Starts or resumes the displayed timer.
    pub async fn start(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Start).await
    }

    /// Pauses the displayed timer.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Pause).await
    }

    /// Resets the displayed timer.
    pub async fn reset(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Reset).await
    }

    /// Selects a countdown preset in minutes.
    pub async fn preset(&self, minutes: u32) -> Result<IpcResponse> {
        self.call(&IpcRequest::Preset { minutes }).await
    }

    /// Sets the countdown length in seconds.
    pub async fn duration(&self, seconds: u32) -> Result<IpcResponse> {
        self.call(&IpcRequest::Duration { seconds }).await
    }

    /// Switches to the next mode.
    pub async fn cycle_mode(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::CycleMode).await
    }

    /// Skips to the next Pomodoro phase.
    pub async fn advance_phase(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::AdvancePhase).await
    }

    /// Changes timer settings.
    pub async fn configure(&self, params: ConfigureParams) -> Result<IpcResponse> {
        self.call(&IpcRequest::Configure { params }).await
    }

    /// Queries the current snapshot.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Status).await
    }

    /// Follows state changes until the daemon closes the connection.
    ///
    /// `on_snapshot` is called with the current snapshot first, then with
    /// every change.
    pub async fn watch<F>(&self, mut on_snapshot: F) -> Result<()>
    where
        F: FnMut(&EngineSnapshot),
    {
        let stream = self.open(&IpcRequest::Watch).await?;
        let mut lines = BufReader::new(stream).lines();

        let first = timeout(Duration::from_secs(IO_TIMEOUT_SECS), lines.next_line())
            .await
            .context("読み込みがタイムアウトしました")?
            .context("レスポンスの受信に失敗しました")?
            .context("Daemonからの応答がありませんでした")?;
        let response: IpcResponse =
            serde_json::from_str(&first).context("レスポンスのパースに失敗しました")?;
        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }
        if let Some(snapshot) = &response.data {
            on_snapshot(snapshot);
        }

        while let Some(line) = lines
            .next_line()
            .await
            .context("スナップショットの受信に失敗しました")?
        {
            let snapshot: EngineSnapshot =
                serde_json::from_str(&line).context("スナップショットのパースに失敗しました")?;
            on_snapshot(&snapshot);
        }

        tracing::debug!("Daemonが監視接続を閉じました");
        Ok(())
    }

    /// Sends a request and turns an error response into an error.
    async fn call(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let response = self.send_request_with_retry(request).await?;
        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Sends a request to the daemon, retrying transport failures.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("リクエスト失敗 (試行 {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("リクエストを送信できませんでした")))
    }

    /// Sends a single request and reads the whole response.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let stream = self.open(request).await?;

        let mut buffer = Vec::new();
        let n = timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream
                .take(MAX_RESPONSE_SIZE as u64)
                .read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if n == 0 {
            anyhow::bail!("Daemonからの応答がありませんでした");
        }

        let response: IpcResponse =
            serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")?;
        Ok(response)
    }

    /// Connects, writes the request and closes the write half.
    async fn open(&self, request: &IpcRequest) -> Result<UnixStream> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .with_context(|| {
                format!(
                    "Daemonに接続できません ({})。'floatclock daemon' を起動してください",
                    self.socket_path.display()
                )
            })?;

        let request_json =
            serde_json::to_string(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(request_json.as_bytes()),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        Ok(stream)
    }
}

// ============================================================================
// Tests
// ============================================================================
