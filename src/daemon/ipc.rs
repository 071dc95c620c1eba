//! Control socket for the timer daemon.
//!
//! - [`IpcServer`]: Unix domain socket listener
//! - [`RequestHandler`]: maps requests onto [`TimerEngine`] commands
//!
//! One JSON request per connection. The client writes the request and shuts
//! down its write half; the daemon answers with one JSON line. A `watch`
//! request keeps the connection open and streams every snapshot as a further
//! JSON line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::broadcast::next_snapshot;
use crate::clock::format_remaining;
use crate::config::merge_pomodoro_changes;
use crate::types::{ConfigureParams, EngineSnapshot, IpcRequest, IpcResponse};

use super::timer::{CommandStatus, InvalidCommand, Outcome, TimerEngine};

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// A stale socket file from a previous run is removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Reads a request until the client closes its write half.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, oversized input or invalid JSON.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::with_capacity(256);
        let mut limited = (&mut *stream).take(MAX_REQUEST_SIZE as u64 + 1);

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            limited.read_to_end(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            anyhow::bail!("Connection closed by client");
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest =
            serde_json::from_slice(&buffer).context("Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        write_line(stream, response).await
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Writes one JSON value followed by a newline.
async fn write_line<T: Serialize>(stream: &mut UnixStream, value: &T) -> Result<()> {
    let mut json = serde_json::to_vec(value).context("Failed to serialize IPC message")?;
    json.push(b'\n');

    stream
        .write_all(&json)
        .await
        .context("Failed to write response")?;
    stream.flush().await.context("Failed to flush response")?;

    Ok(())
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to TimerEngine.
#[derive(Clone)]
pub struct RequestHandler {
    /// Shared reference to the timer engine
    engine: Arc<Mutex<TimerEngine>>,
}

impl RequestHandler {
    /// Creates a new request handler with the given timer engine.
    pub fn new(engine: Arc<Mutex<TimerEngine>>) -> Self {
        Self { engine }
    }

    /// Serves one connection: reads the request, then answers or streams.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be read or the response cannot
    /// be written.
    pub async fn serve(&self, mut stream: UnixStream) -> Result<()> {
        let request = match IpcServer::receive_request(&mut stream).await {
            Ok(request) => request,
            Err(e) => {
                let response = IpcResponse::error(format!("リクエストを解釈できません: {:#}", e));
                let _ = IpcServer::send_response(&mut stream, &response).await;
                return Err(e);
            }
        };
        debug!(?request, "リクエストを受信しました");

        if request == IpcRequest::Watch {
            return self.watch(stream).await;
        }

        let response = self.handle(request).await;
        IpcServer::send_response(&mut stream, &response).await
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start => {
                self.run(TimerEngine::start, |_| "タイマーを開始しました".to_string())
                    .await
            }
            IpcRequest::Pause => {
                self.run(TimerEngine::pause, |_| "タイマーを一時停止しました".to_string())
                    .await
            }
            IpcRequest::Reset => {
                self.run(TimerEngine::reset, |_| "タイマーをリセットしました".to_string())
                    .await
            }
            IpcRequest::Preset { minutes } => {
                self.run(
                    |engine| engine.set_preset(minutes),
                    |_| format!("カウントダウンを{}分に設定しました", minutes),
                )
                .await
            }
            IpcRequest::Duration { seconds } => {
                self.run(
                    |engine| engine.set_duration_seconds(seconds),
                    |_| format!("カウントダウンを{}に設定しました", format_remaining(seconds)),
                )
                .await
            }
            IpcRequest::CycleMode => {
                self.run(TimerEngine::cycle_mode, |snapshot| {
                    format!("モードを切り替えました: {}", snapshot.mode.as_str())
                })
                .await
            }
            IpcRequest::AdvancePhase => {
                self.run(TimerEngine::advance_phase, |snapshot| {
                    format!("{}に進みました", snapshot.pomodoro.phase.label())
                })
                .await
            }
            IpcRequest::Configure { params } => self.handle_configure(params).await,
            IpcRequest::Status => {
                let engine = self.engine.lock().await;
                IpcResponse::success("", Some(engine.get_snapshot()))
            }
            IpcRequest::Watch => {
                let engine = self.engine.lock().await;
                IpcResponse::success("監視を開始しました", Some(engine.get_snapshot()))
            }
        }
    }

    /// Runs one engine command under the lock and builds the response.
    async fn run<C, M>(&self, command: C, message: M) -> IpcResponse
    where
        C: FnOnce(&mut TimerEngine) -> Outcome,
        M: FnOnce(&EngineSnapshot) -> String,
    {
        let mut engine = self.engine.lock().await;
        let outcome = command(&mut *engine);
        let snapshot = engine.get_snapshot();
        let warning = save_warning(&outcome);

        match outcome.status {
            CommandStatus::Applied => {
                IpcResponse::success(message(&snapshot), Some(snapshot)).with_warning(warning)
            }
            CommandStatus::Unchanged => IpcResponse::success("変更はありません", Some(snapshot)),
            CommandStatus::Rejected(reason) => ignored(&reason, snapshot),
        }
    }

    /// Handles the configure command.
    ///
    /// Durations are applied first so a rejected change leaves the flags
    /// untouched too.
    async fn handle_configure(&self, params: ConfigureParams) -> IpcResponse {
        if params.is_empty() {
            return IpcResponse::error("変更する設定を指定してください");
        }

        let mut engine = self.engine.lock().await;
        let mut outcomes = Vec::new();

        if params.touches_pomodoro_durations() {
            let current = engine.get_snapshot().pomodoro.settings();
            let settings = match merge_pomodoro_changes(current, &params) {
                Ok(settings) => settings,
                Err(e) => return IpcResponse::error(e),
            };

            let outcome = engine.configure_pomodoro(settings);
            if let CommandStatus::Rejected(reason) = &outcome.status {
                return ignored(reason, engine.get_snapshot());
            }
            outcomes.push(outcome);
        }

        if let Some(enabled) = params.auto_repeat {
            outcomes.push(engine.set_auto_repeat(enabled));
        }
        if let Some(enabled) = params.auto_start_next {
            outcomes.push(engine.set_auto_start_next(enabled));
        }

        let snapshot = engine.get_snapshot();
        if !outcomes.iter().any(Outcome::is_applied) {
            return IpcResponse::success("変更はありません", Some(snapshot));
        }
        let warning = outcomes.iter().rev().find_map(save_warning);
        IpcResponse::success("設定を更新しました", Some(snapshot)).with_warning(warning)
    }

    /// Streams snapshots to a watching client until it goes away.
    async fn watch(&self, mut stream: UnixStream) -> Result<()> {
        let (mut rx, snapshot) = {
            let engine = self.engine.lock().await;
            (engine.subscribe(), engine.get_snapshot())
        };

        let response = IpcResponse::success("監視を開始しました", Some(snapshot));
        IpcServer::send_response(&mut stream, &response).await?;

        while let Some(snapshot) = next_snapshot(&mut rx).await {
            if let Err(e) = write_line(&mut stream, &snapshot).await {
                debug!("監視クライアントが切断しました: {:#}", e);
                break;
            }
        }
        Ok(())
    }
}

/// A command the engine declined in its current state. Not a fault: the
/// state is returned unchanged with the reason.
fn ignored(reason: &InvalidCommand, snapshot: EngineSnapshot) -> IpcResponse {
    debug!(%reason, "コマンドを無視しました");
    IpcResponse::success(format!("変更できません: {}", reason), Some(snapshot))
}

/// Turns a failed save into a user-facing warning.
fn save_warning(outcome: &Outcome) -> Option<String> {
    outcome
        .save_error
        .as_ref()
        .map(|e| format!("状態を保存できませんでした: {} ({})", e, e.suggestion()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncBufReadExt, BufReader};

    use crate::notification::MockNotifier;
    use crate::store::MemoryStore;
    use crate::time::ManualTimeSource;
    use crate::types::{Mode, Phase};

    const T0: i64 = 1_800_000_000;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        (dir, path)
    }

    fn create_engine_with_store(store: MemoryStore) -> Arc<Mutex<TimerEngine>> {
        let engine = TimerEngine::new(
            store,
            Arc::new(MockNotifier::new()),
            Arc::new(ManualTimeSource::new(T0)),
        );
        Arc::new(Mutex::new(engine))
    }

    fn create_engine() -> Arc<Mutex<TimerEngine>> {
        create_engine_with_store(MemoryStore::new())
    }

    async fn send_raw(path: &Path, request: &str) -> String {
        let mut stream = UnixStream::connect(path).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    // ------------------------------------------------------------------------
    // IpcServer Tests
    // ------------------------------------------------------------------------

    mod ipc_server_tests {
        use super::*;

        #[tokio::test]
        async fn test_server_creation() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = IpcServer::new(&socket_path);

            assert!(server.is_ok());
            assert!(socket_path.exists());
        }

        #[tokio::test]
        async fn test_server_removes_existing_socket() {
            let (_dir, socket_path) = create_temp_socket_path();
            std::fs::write(&socket_path, "stale").unwrap();

            assert!(IpcServer::new(&socket_path).is_ok());
        }

        #[tokio::test]
        async fn test_server_creates_parent_directory() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("subdir").join("test.sock");

            let server = IpcServer::new(&socket_path);
            assert!(server.is_ok());
            assert!(socket_path.parent().unwrap().exists());
        }

        #[tokio::test]
        async fn test_receive_request_preset() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream
                    .write_all(br#"{"command":"preset","minutes":25}"#)
                    .await
                    .unwrap();
                stream.shutdown().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();

            assert_eq!(request, IpcRequest::Preset { minutes: 25 });
            client_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_receive_request_invalid_json() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(b"not valid json").await.unwrap();
                stream.shutdown().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            assert!(IpcServer::receive_request(&mut stream).await.is_err());
        }

        #[tokio::test]
        async fn test_receive_request_too_large() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let _ = stream.write_all(&vec![b' '; MAX_REQUEST_SIZE + 10]).await;
                let _ = stream.shutdown().await;
            });

            let mut stream = server.accept().await.unwrap();
            let err = IpcServer::receive_request(&mut stream).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<IpcError>(),
                Some(IpcError::RequestTooLarge)
            ));
        }

        #[tokio::test]
        async fn test_send_response_is_one_line() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let mut buffer = String::new();
                stream.read_to_string(&mut buffer).await.unwrap();
                buffer
            });

            let mut stream = server.accept().await.unwrap();
            let response = IpcResponse::success("Test message", None);
            IpcServer::send_response(&mut stream, &response)
                .await
                .unwrap();
            drop(stream);

            let received = client_handle.await.unwrap();
            assert!(received.ends_with('\n'));
            let parsed: IpcResponse = serde_json::from_str(received.trim()).unwrap();
            assert_eq!(parsed.message, "Test message");
        }

        #[tokio::test]
        async fn test_server_drop_cleanup() {
            let (_dir, socket_path) = create_temp_socket_path();

            {
                let _server = IpcServer::new(&socket_path).unwrap();
                assert!(socket_path.exists());
            }

            assert!(!socket_path.exists());
        }
    }

    // ------------------------------------------------------------------------
    // RequestHandler Tests
    // ------------------------------------------------------------------------

    mod request_handler_tests {
        use super::*;

        #[tokio::test]
        async fn test_handle_status() {
            let handler = RequestHandler::new(create_engine());

            let response = handler.handle(IpcRequest::Status).await;

            assert_eq!(response.status, "success");
            let data = response.data.unwrap();
            assert_eq!(data.mode, Mode::Clock);
        }

        #[tokio::test]
        async fn test_start_in_clock_mode_is_ignored() {
            let handler = RequestHandler::new(create_engine());

            let response = handler.handle(IpcRequest::Start).await;

            assert_eq!(response.status, "success");
            assert!(response.message.starts_with("変更できません"));
            assert_eq!(response.data.unwrap(), EngineSnapshot::default());
        }

        #[tokio::test]
        async fn test_cycle_then_start() {
            let handler = RequestHandler::new(create_engine());

            let response = handler.handle(IpcRequest::CycleMode).await;
            assert!(response.message.contains("countdown"));

            let response = handler.handle(IpcRequest::Start).await;
            assert_eq!(response.status, "success");
            assert_eq!(response.message, "タイマーを開始しました");
            assert!(response.data.unwrap().countdown.running);
        }

        #[tokio::test]
        async fn test_pause_twice_reports_no_change() {
            let handler = RequestHandler::new(create_engine());
            handler.handle(IpcRequest::CycleMode).await;
            handler.handle(IpcRequest::Start).await;

            let first = handler.handle(IpcRequest::Pause).await;
            let second = handler.handle(IpcRequest::Pause).await;

            assert_eq!(first.message, "タイマーを一時停止しました");
            assert_eq!(second.status, "success");
            assert_eq!(second.message, "変更はありません");
        }

        #[tokio::test]
        async fn test_preset_while_running_is_ignored() {
            let handler = RequestHandler::new(create_engine());
            handler.handle(IpcRequest::CycleMode).await;
            handler.handle(IpcRequest::Start).await;

            let response = handler.handle(IpcRequest::Preset { minutes: 25 }).await;

            assert!(!response.is_error());
            assert!(response.message.starts_with("変更できません"));
            let status = handler.handle(IpcRequest::Status).await;
            assert_eq!(status.data.unwrap().countdown.total_seconds, 300);
        }

        #[tokio::test]
        async fn test_duration_message() {
            let handler = RequestHandler::new(create_engine());

            let response = handler.handle(IpcRequest::Duration { seconds: 90 }).await;

            assert_eq!(response.message, "カウントダウンを01:30に設定しました");
        }

        #[tokio::test]
        async fn test_skip_phase() {
            let handler = RequestHandler::new(create_engine());

            let response = handler.handle(IpcRequest::AdvancePhase).await;

            assert_eq!(response.data.unwrap().pomodoro.phase, Phase::ShortBreak);
        }

        #[tokio::test]
        async fn test_configure_merges_with_current_settings() {
            let handler = RequestHandler::new(create_engine());
            let params = ConfigureParams {
                work_minutes: Some(50),
                auto_start_next: Some(true),
                ..ConfigureParams::default()
            };

            let response = handler.handle(IpcRequest::Configure { params }).await;

            assert_eq!(response.message, "設定を更新しました");
            let pomodoro = response.data.unwrap().pomodoro;
            assert_eq!(pomodoro.work_seconds, 50 * 60);
            assert_eq!(pomodoro.short_break_seconds, 5 * 60);
            assert!(pomodoro.auto_start_next);
        }

        #[tokio::test]
        async fn test_configure_out_of_range() {
            let handler = RequestHandler::new(create_engine());
            let params = ConfigureParams {
                work_minutes: Some(500),
                auto_repeat: Some(true),
                ..ConfigureParams::default()
            };

            let response = handler.handle(IpcRequest::Configure { params }).await;

            assert!(response.is_error());
            let status = handler.handle(IpcRequest::Status).await;
            assert!(!status.data.unwrap().countdown.auto_repeat);
        }

        #[tokio::test]
        async fn test_configure_keeps_untouched_second_durations() {
            let mut snapshot = EngineSnapshot::default();
            snapshot.pomodoro.work_seconds = 90;
            snapshot.pomodoro.remaining_seconds = 90;
            let handler =
                RequestHandler::new(create_engine_with_store(MemoryStore::with_snapshot(snapshot)));
            let params = ConfigureParams {
                sessions_before_long: Some(3),
                ..ConfigureParams::default()
            };

            let response = handler.handle(IpcRequest::Configure { params }).await;

            assert_eq!(response.message, "設定を更新しました");
            let pomodoro = response.data.unwrap().pomodoro;
            assert_eq!(pomodoro.work_seconds, 90);
            assert_eq!(pomodoro.sessions_before_long, 3);
        }

        #[tokio::test]
        async fn test_configure_while_running_is_ignored() {
            let handler = RequestHandler::new(create_engine());
            handler.handle(IpcRequest::CycleMode).await;
            handler.handle(IpcRequest::CycleMode).await;
            handler.handle(IpcRequest::Start).await;
            let params = ConfigureParams {
                work_minutes: Some(10),
                auto_repeat: Some(true),
                ..ConfigureParams::default()
            };

            let response = handler.handle(IpcRequest::Configure { params }).await;

            assert!(!response.is_error());
            assert!(response.message.starts_with("変更できません"));
            let snapshot = response.data.unwrap();
            assert_eq!(snapshot.pomodoro.work_seconds, 25 * 60);
            assert!(!snapshot.countdown.auto_repeat);
        }

        #[tokio::test]
        async fn test_configure_empty() {
            let handler = RequestHandler::new(create_engine());
            let response = handler
                .handle(IpcRequest::Configure {
                    params: ConfigureParams::default(),
                })
                .await;
            assert!(response.is_error());
        }

        #[tokio::test]
        async fn test_save_failure_becomes_warning() {
            let store = MemoryStore::new();
            store.set_fail_writes(true);
            let handler = RequestHandler::new(create_engine_with_store(store));

            let response = handler.handle(IpcRequest::CycleMode).await;

            assert_eq!(response.status, "success");
            assert!(response.warning.is_some());
            assert_eq!(response.data.unwrap().mode, Mode::Countdown);
        }
    }

    // ------------------------------------------------------------------------
    // Connection Tests
    // ------------------------------------------------------------------------

    mod serve_tests {
        use super::*;

        #[tokio::test]
        async fn test_serve_round_trip() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();
            let handler = RequestHandler::new(create_engine());

            let server_task = tokio::spawn(async move {
                let stream = server.accept().await.unwrap();
                handler.serve(stream).await
            });

            let raw = send_raw(&socket_path, r#"{"command":"cycle_mode"}"#).await;
            let response: IpcResponse = serde_json::from_str(raw.trim()).unwrap();

            assert_eq!(response.data.unwrap().mode, Mode::Countdown);
            assert!(server_task.await.unwrap().is_ok());
        }

        #[tokio::test]
        async fn test_serve_invalid_request_gets_error_response() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();
            let handler = RequestHandler::new(create_engine());

            let server_task = tokio::spawn(async move {
                let stream = server.accept().await.unwrap();
                handler.serve(stream).await
            });

            let raw = send_raw(&socket_path, r#"{"command":"explode"}"#).await;
            let response: IpcResponse = serde_json::from_str(raw.trim()).unwrap();

            assert!(response.is_error());
            assert!(server_task.await.unwrap().is_err());
        }

        #[tokio::test]
        async fn test_watch_streams_snapshots() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();
            let engine = create_engine();
            let handler = RequestHandler::new(Arc::clone(&engine));

            tokio::spawn(async move {
                let stream = server.accept().await.unwrap();
                let _ = handler.serve(stream).await;
            });

            let mut stream = UnixStream::connect(&socket_path).await.unwrap();
            stream.write_all(br#"{"command":"watch"}"#).await.unwrap();
            stream.shutdown().await.unwrap();
            let mut lines = BufReader::new(stream).lines();

            let first = lines.next_line().await.unwrap().unwrap();
            let response: IpcResponse = serde_json::from_str(&first).unwrap();
            assert_eq!(response.data.unwrap().mode, Mode::Clock);

            let _ = engine.lock().await.cycle_mode();

            let next = lines.next_line().await.unwrap().unwrap();
            let snapshot: EngineSnapshot = serde_json::from_str(&next).unwrap();
            assert_eq!(snapshot.mode, Mode::Countdown);
        }
    }
}
