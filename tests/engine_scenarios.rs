//! Engine scenarios through the public API.
//!
//! Covers the behaviour a host relies on:
//! - state invariants under arbitrary command/tick sequences
//! - resume recomputation after a restart from the JSON snapshot
//! - boundary crossing while suspended
//! - Pomodoro session rollover
//! - snapshot round trips and corrupt-file recovery
//! - observers that fall behind

use std::sync::Arc;

use floatclock::broadcast::{next_snapshot, StateBroadcaster};
use floatclock::daemon::{CommandStatus, TimerEngine};
use floatclock::notification::MockNotifier;
use floatclock::store::{JsonFileStore, MemoryStore, SnapshotStore};
use floatclock::time::ManualTimeSource;
use floatclock::types::{
    CompletionEvent, CountdownState, EngineSnapshot, Mode, Phase, PomodoroSettings,
};

// ============================================================================
// Test Helpers
// ============================================================================

const T0: i64 = 1_800_000_000;

struct Fixture {
    engine: TimerEngine,
    notifier: Arc<MockNotifier>,
    time: Arc<ManualTimeSource>,
}

fn fixture_with_store(store: impl SnapshotStore + 'static, now: i64) -> Fixture {
    let notifier = Arc::new(MockNotifier::new());
    let time = Arc::new(ManualTimeSource::new(now));
    let engine = TimerEngine::new(store, notifier.clone(), time.clone());
    Fixture {
        engine,
        notifier,
        time,
    }
}

fn fixture() -> Fixture {
    fixture_with_store(MemoryStore::new(), T0)
}

fn switch_to(engine: &mut TimerEngine, mode: Mode) {
    for _ in 0..3 {
        if engine.get_snapshot().mode == mode {
            return;
        }
        let _ = engine.cycle_mode();
    }
}

fn assert_invariants(snapshot: &EngineSnapshot) {
    let countdown = &snapshot.countdown;
    assert!(
        countdown.remaining_seconds <= countdown.total_seconds,
        "countdown remaining {} > total {}",
        countdown.remaining_seconds,
        countdown.total_seconds
    );
    assert!(!(countdown.running && countdown.paused));

    let pomodoro = &snapshot.pomodoro;
    assert!(pomodoro.remaining_seconds <= pomodoro.phase_total());
    assert!(pomodoro.current_session <= pomodoro.sessions_before_long);
}

fn short_pomodoro() -> PomodoroSettings {
    PomodoroSettings {
        work_seconds: 20,
        short_break_seconds: 5,
        long_break_seconds: 10,
        sessions_before_long: 2,
    }
}

// ============================================================================
// Invariants
// ============================================================================

/// 任意のコマンド列とティックの後でも不変条件が保たれる
#[test]
fn invariants_hold_for_arbitrary_sequences() {
    let mut f = fixture();
    let _ = f.engine.set_duration_seconds(30);
    let _ = f.engine.configure_pomodoro(short_pomodoro());

    // Deterministic LCG so failures are reproducible
    let mut seed: u64 = 0x5eed;
    let mut now = T0;
    for _ in 0..2_000 {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let roll = (seed >> 33) % 12;
        match roll {
            0 => {
                let _ = f.engine.start();
            }
            1 => {
                let _ = f.engine.pause();
            }
            2 => {
                let _ = f.engine.reset();
            }
            3 => {
                let _ = f.engine.cycle_mode();
            }
            4 => {
                let _ = f.engine.advance_phase();
            }
            5 => {
                let _ = f.engine.set_preset(((seed >> 40) % 3 + 1) as u32);
            }
            6 => {
                let _ = f.engine.set_auto_repeat(seed & 1 == 0);
            }
            7 => {
                let _ = f.engine.set_auto_start_next(seed & 2 == 0);
            }
            8 => {
                // Occasional long jump, as after a sleep
                now += ((seed >> 20) % 500) as i64;
                let _ = f.engine.tick(now);
            }
            _ => {
                now += 1;
                let _ = f.engine.tick(now);
            }
        }
        f.time.set(now);
        assert_invariants(&f.engine.get_snapshot());
    }
}

/// 一時停止を2回呼んでも1回と同じ結果になる
#[test]
fn pause_twice_equals_pause_once() {
    for mode in [Mode::Countdown, Mode::Pomodoro] {
        let mut f = fixture();
        switch_to(&mut f.engine, mode);
        let _ = f.engine.start();
        let _ = f.engine.tick(T0 + 7);

        let _ = f.engine.pause();
        let once = f.engine.get_snapshot();
        let outcome = f.engine.pause();
        let twice = f.engine.get_snapshot();

        assert_eq!(outcome.status, CommandStatus::Unchanged);
        assert_eq!(once, twice);
    }
}

// ============================================================================
// Countdown
// ============================================================================

/// プリセット5分 → 開始 → 300回のティックでちょうど1回完了する
#[test]
fn five_minute_preset_completes_once_after_300_ticks() {
    let mut f = fixture();

    let _ = f.engine.set_preset(5);
    switch_to(&mut f.engine, Mode::Countdown);
    let _ = f.engine.start();
    for i in 1..=300 {
        let _ = f.engine.tick(T0 + i);
    }

    let countdown = f.engine.get_snapshot().countdown;
    assert_eq!(countdown.remaining_seconds, 0);
    assert!(!countdown.running);
    assert_eq!(f.notifier.events(), vec![CompletionEvent::CountdownComplete]);

    // Further ticks change nothing
    for i in 301..=310 {
        let _ = f.engine.tick(T0 + i);
    }
    assert_eq!(f.notifier.count(), 1);
}

/// 動作中のプリセット変更は無視される
#[test]
fn preset_is_ignored_while_running() {
    let mut f = fixture();
    switch_to(&mut f.engine, Mode::Countdown);
    let _ = f.engine.start();
    let _ = f.engine.tick(T0 + 12);
    let before = f.engine.get_snapshot().countdown;

    let outcome = f.engine.set_preset(25);

    assert!(outcome.rejection().is_some());
    let after = f.engine.get_snapshot().countdown;
    assert_eq!(after.total_seconds, before.total_seconds);
    assert_eq!(after.remaining_seconds, before.remaining_seconds);
}

/// 表示モードに関係なくカウントダウンは進み続ける
#[test]
fn countdown_keeps_running_while_viewing_pomodoro() {
    let mut f = fixture();
    switch_to(&mut f.engine, Mode::Countdown);
    let _ = f.engine.start();
    switch_to(&mut f.engine, Mode::Pomodoro);

    for i in 1..=60 {
        let _ = f.engine.tick(T0 + i);
    }

    let snapshot = f.engine.get_snapshot();
    assert_eq!(snapshot.mode, Mode::Pomodoro);
    assert_eq!(snapshot.countdown.remaining_seconds, 240);
    assert!(!snapshot.pomodoro.running);
}

// ============================================================================
// Resume recomputation
// ============================================================================

fn running_countdown(total: u32, remaining: u32, auto_repeat: bool) -> EngineSnapshot {
    EngineSnapshot {
        mode: Mode::Countdown,
        countdown: CountdownState {
            total_seconds: total,
            remaining_seconds: remaining,
            running: true,
            paused: false,
            auto_repeat,
            last_tick_epoch: Some(T0),
        },
        ..EngineSnapshot::default()
    }
}

/// 600秒中400秒残りのまま150秒中断 → 250秒残りで実行継続
#[test]
fn resume_applies_suspension_gap() {
    let mut f = fixture_with_store(
        MemoryStore::with_snapshot(running_countdown(600, 400, false)),
        T0 + 150,
    );

    let _ = f.engine.resume_recompute(T0 + 150);

    let countdown = f.engine.get_snapshot().countdown;
    assert_eq!(countdown.remaining_seconds, 250);
    assert!(countdown.running);
    assert_eq!(countdown.last_tick_epoch, Some(T0 + 150));
}

/// 残り10秒・自動リピートで75秒中断 → 完了1回、残り55秒
#[test]
fn resume_across_boundary_fires_exactly_once() {
    let mut f = fixture_with_store(
        MemoryStore::with_snapshot(running_countdown(60, 10, true)),
        T0 + 75,
    );

    let _ = f.engine.resume_recompute(T0 + 75);

    let countdown = f.engine.get_snapshot().countdown;
    assert_eq!(countdown.remaining_seconds, 55);
    assert!(countdown.running);
    assert_eq!(f.notifier.count_of(CompletionEvent::CountdownComplete), 1);
    assert_eq!(f.notifier.count(), 1);
}

/// 自動リピートなしで中断中に完了 → 停止して残り0
#[test]
fn resume_past_end_without_repeat_stops() {
    let mut f = fixture_with_store(
        MemoryStore::with_snapshot(running_countdown(60, 10, false)),
        T0 + 3600,
    );

    let _ = f.engine.resume_recompute(T0 + 3600);

    let countdown = f.engine.get_snapshot().countdown;
    assert_eq!(countdown.remaining_seconds, 0);
    assert!(!countdown.running);
    assert!(countdown.last_tick_epoch.is_none());
    assert_eq!(f.notifier.count(), 1);
}

/// プロセスを終了して再起動しても、JSONスナップショットから残り時間を復元できる
#[test]
fn restart_from_json_snapshot_recovers_running_timer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    {
        let mut first = fixture_with_store(JsonFileStore::new(&path), T0);
        switch_to(&mut first.engine, Mode::Countdown);
        let _ = first.engine.set_duration_seconds(600);
        let _ = first.engine.start();
        for i in 1..=200 {
            let _ = first.engine.tick(T0 + i);
        }
        assert_eq!(first.engine.get_snapshot().countdown.remaining_seconds, 400);
        // Killed here: no shutdown hook runs
    }

    let mut second = fixture_with_store(JsonFileStore::new(&path), T0 + 350);
    assert_eq!(second.engine.get_snapshot().countdown.remaining_seconds, 400);

    let _ = second.engine.resume_recompute(T0 + 350);

    let snapshot = second.engine.get_snapshot();
    assert_eq!(snapshot.mode, Mode::Countdown);
    assert_eq!(snapshot.countdown.remaining_seconds, 250);
    assert!(snapshot.countdown.running);
}

/// 手で編集された極端なタイムスタンプでも再計算は失敗せず、時間を適用しない
#[test]
fn hand_edited_extreme_timestamp_is_survivable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let mut snapshot = running_countdown(600, 400, false);
    snapshot.countdown.last_tick_epoch = Some(i64::MIN);
    std::fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();

    let mut f = fixture_with_store(JsonFileStore::new(&path), T0);
    let _ = f.engine.resume_recompute(T0);

    let countdown = f.engine.get_snapshot().countdown;
    assert_eq!(countdown.remaining_seconds, 400);
    assert!(countdown.running);
    assert_eq!(countdown.last_tick_epoch, Some(T0));
    assert_eq!(f.notifier.count(), 0);
}

/// 一時停止中のタイマーは中断時間の影響を受けない
#[test]
fn paused_timer_is_not_advanced_by_resume() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    {
        let mut first = fixture_with_store(JsonFileStore::new(&path), T0);
        switch_to(&mut first.engine, Mode::Countdown);
        let _ = first.engine.start();
        let _ = first.engine.tick(T0 + 100);
        let _ = first.engine.pause();
    }

    let mut second = fixture_with_store(JsonFileStore::new(&path), T0 + 10_000);
    let outcome = second.engine.resume_recompute(T0 + 10_000);

    assert_eq!(outcome.status, CommandStatus::Unchanged);
    let countdown = second.engine.get_snapshot().countdown;
    assert_eq!(countdown.remaining_seconds, 200);
    assert!(countdown.paused);
}

/// ポモドーロが中断中に2フェーズを通過 → フェーズごとに通知される
#[test]
fn resume_replays_each_pomodoro_phase() {
    let mut f = fixture();
    let _ = f.engine.configure_pomodoro(short_pomodoro());
    let _ = f.engine.set_auto_start_next(true);
    switch_to(&mut f.engine, Mode::Pomodoro);
    let _ = f.engine.start();

    // work 20 + short 5 + 3 seconds into the next work
    let _ = f.engine.resume_recompute(T0 + 28);

    assert_eq!(
        f.notifier.events(),
        vec![
            CompletionEvent::PhaseComplete(Phase::Work),
            CompletionEvent::PhaseComplete(Phase::ShortBreak),
        ]
    );
    let pomodoro = f.engine.get_snapshot().pomodoro;
    assert_eq!(pomodoro.phase, Phase::Work);
    assert_eq!(pomodoro.current_session, 1);
    assert_eq!(pomodoro.remaining_seconds, 17);
    assert!(pomodoro.running);
}

/// 中断後の一括再計算と毎秒のティックは同じ状態になる
#[test]
fn resume_and_live_ticking_agree() {
    let build = || {
        let mut f = fixture();
        let _ = f.engine.configure_pomodoro(short_pomodoro());
        let _ = f.engine.set_auto_start_next(true);
        switch_to(&mut f.engine, Mode::Pomodoro);
        let _ = f.engine.start();
        f
    };
    let mut live = build();
    let mut resumed = build();

    for i in 1..=100 {
        let _ = live.engine.tick(T0 + i);
    }
    let _ = resumed.engine.resume_recompute(T0 + 100);

    assert_eq!(
        live.engine.get_snapshot().pomodoro,
        resumed.engine.get_snapshot().pomodoro
    );
    assert_eq!(live.notifier.events(), resumed.notifier.events());
}

// ============================================================================
// Pomodoro
// ============================================================================

/// 最後の作業セッションが終わると長い休憩に入り、セッション数が0に戻る
#[test]
fn last_work_session_rolls_over_to_long_break() {
    let mut f = fixture();
    let _ = f.engine.configure_pomodoro(short_pomodoro());
    switch_to(&mut f.engine, Mode::Pomodoro);

    // First work + short break, skipped
    let _ = f.engine.advance_phase();
    let _ = f.engine.advance_phase();
    let before = f.engine.get_snapshot().pomodoro;
    assert_eq!(before.phase, Phase::Work);
    assert_eq!(before.current_session, before.sessions_before_long - 1);

    f.time.set(T0);
    let _ = f.engine.start();
    let _ = f.engine.tick(T0 + 20);

    let pomodoro = f.engine.get_snapshot().pomodoro;
    assert_eq!(pomodoro.phase, Phase::LongBreak);
    assert_eq!(pomodoro.current_session, 0);
    assert_eq!(pomodoro.remaining_seconds, 10);
    assert!(!pomodoro.running);
    assert_eq!(
        f.notifier.events(),
        vec![CompletionEvent::PhaseComplete(Phase::Work)]
    );
}

// ============================================================================
// Persistence
// ============================================================================

/// 到達可能な状態は保存→読み込みでフィールド単位に一致する
#[test]
fn reachable_states_round_trip_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let mut f = fixture();

    let steps: Vec<Box<dyn Fn(&mut TimerEngine)>> = vec![
        Box::new(|e: &mut TimerEngine| {
            let _ = e.cycle_mode();
        }),
        Box::new(|e: &mut TimerEngine| {
            let _ = e.start();
        }),
        Box::new(|e: &mut TimerEngine| {
            let _ = e.tick(T0 + 42);
        }),
        Box::new(|e: &mut TimerEngine| {
            let _ = e.pause();
        }),
        Box::new(|e: &mut TimerEngine| {
            let _ = e.cycle_mode();
            let _ = e.advance_phase();
            let _ = e.set_auto_start_next(true);
        }),
        Box::new(|e: &mut TimerEngine| {
            let _ = e.start();
            let _ = e.tick(T0 + 99);
        }),
    ];

    let store = JsonFileStore::new(&path);
    for step in steps {
        step(&mut f.engine);
        let snapshot = f.engine.get_snapshot();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load(), snapshot);
    }
}

/// 壊れたスナップショットは既定値で起動し、次の保存で上書きされる
#[test]
fn corrupt_snapshot_starts_from_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, "{ \"mode\": \"countdown\", \"countdown\": ").unwrap();

    let mut f = fixture_with_store(JsonFileStore::new(&path), T0);
    assert_eq!(f.engine.get_snapshot(), EngineSnapshot::default());

    let outcome = f.engine.cycle_mode();
    assert!(outcome.save_error.is_none());

    let reloaded = JsonFileStore::new(&path).try_load().unwrap().unwrap();
    assert_eq!(reloaded.mode, Mode::Countdown);
}

/// 保存に失敗してもタイマーは正しく進み、回復後の保存で整合する
#[test]
fn failing_store_never_loses_running_timer() {
    let store = MemoryStore::new();
    let mut f = fixture_with_store(store.clone(), T0);
    switch_to(&mut f.engine, Mode::Countdown);
    let _ = f.engine.start();

    store.set_fail_writes(true);
    for i in 1..=30 {
        let outcome = f.engine.tick(T0 + i);
        assert!(outcome.save_error.is_some());
    }
    assert!(f.engine.is_save_failing());

    store.set_fail_writes(false);
    let _ = f.engine.tick(T0 + 31);

    assert_eq!(store.stored().unwrap().countdown.remaining_seconds, 269);
    assert!(!f.engine.is_save_failing());
}

// ============================================================================
// Observers
// ============================================================================

/// 遅い購読者は古いスナップショットを失うが、エンジンは止まらず最新を受け取れる
#[tokio::test]
async fn lagging_observer_skips_to_latest() {
    let notifier = Arc::new(MockNotifier::new());
    let time = Arc::new(ManualTimeSource::new(T0));
    let mut engine = TimerEngine::new(MemoryStore::new(), notifier, time)
        .with_broadcaster(StateBroadcaster::new(2));
    let mut slow = engine.subscribe();

    switch_to(&mut engine, Mode::Countdown);
    let _ = engine.start();
    let mut prompt = engine.subscribe();
    for i in 1..=10 {
        let _ = engine.tick(T0 + i);
        let seen = prompt.recv().await.unwrap();
        assert_eq!(seen, engine.get_snapshot());
    }

    let mut last = None;
    while let Ok(snapshot) = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        next_snapshot(&mut slow),
    )
    .await
    {
        last = snapshot;
    }
    assert_eq!(last.unwrap().countdown.remaining_seconds, 290);
}
