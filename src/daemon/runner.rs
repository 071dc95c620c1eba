//! Daemon host loop.
//!
//! Wires config, store, notifications and the engine together, replays the
//! suspension gap once, then drives the engine at 1 Hz while serving the
//! control socket. Everything runs on one task set of a current-thread
//! runtime; the engine mutex only orders socket commands against ticks.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::broadcast::StateBroadcaster;
use crate::config::AppConfig;
use crate::notification::{self, NotificationDispatcher, SinkSet};
use crate::store::JsonFileStore;
use crate::time::{SystemTimeSource, TimeSource};

use super::ipc::{IpcServer, RequestHandler};
use super::timer::TimerEngine;

/// Tick cadence.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Runs the daemon until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the control socket cannot be bound.
pub async fn run(config: AppConfig) -> Result<()> {
    let store =
        JsonFileStore::new(config.snapshot_path()).with_fallback(config.initial_snapshot());
    info!(path = %store.path().display(), "デーモンを起動します");

    let (notifier, events) = notification::channel();
    let sinks = SinkSet::new(config.notifications.hook());
    let dispatcher_task = tokio::spawn(NotificationDispatcher::new(events, sinks).run());

    let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
    let mut engine = TimerEngine::new(store, Arc::new(notifier), Arc::clone(&time))
        .with_broadcaster(StateBroadcaster::new(config.broadcast_capacity));

    let _ = engine.resume_recompute(time.now());

    let engine = Arc::new(Mutex::new(engine));
    let server = IpcServer::new(&config.socket_path())?;
    let handler = RequestHandler::new(Arc::clone(&engine));
    info!(socket = %server.socket_path().display(), "コントロールソケットで待機します");

    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = engine.lock().await.tick(time.now());
            }
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.serve(stream).await {
                            debug!("リクエスト処理に失敗しました: {:#}", e);
                        }
                    });
                }
                Err(e) => warn!("接続を受け付けられませんでした: {:#}", e),
            },
            _ = &mut shutdown => {
                info!("終了シグナルを受信しました");
                break;
            }
        }
    }

    // Dropping the engine closes the notification channel; let queued
    // completions drain.
    drop(handler);
    drop(engine);
    drop(server);
    match tokio::time::timeout(Duration::from_secs(2), dispatcher_task).await {
        Ok(Ok(delivered)) => debug!(delivered, "通知ディスパッチャが終了しました"),
        Ok(Err(e)) => warn!("通知ディスパッチャが異常終了しました: {}", e),
        Err(_) => debug!("通知の配信待ちを打ち切りました"),
    }

    info!("デーモンを終了しました");
    Ok(())
}
