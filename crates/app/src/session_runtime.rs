//! Session timer driver
//!
//! Runs the 200ms tick loop over the shared timer and fans the
//! resulting events out to whoever is rendering the window: the global
//! bar, the alert sound hooks, the post-commit navigation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use anju_core::{AlertKind, TimerEvent, TimerPhase, TICK_INTERVAL_MS};

use crate::state::AppState;

/// Seconds shown on the receipt screen before navigating away
const COUNTDOWN_SECS: u8 = 5;

/// Event fanned out to session observers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Window progress, 200ms cadence
    Tick { remaining_ms: u64, progress: f64 },
    /// A reminder threshold was crossed
    Alert(AlertKind),
    /// The window expired; no commit can follow
    Locked,
    /// Post-commit countdown, 5 down to 1
    Countdown(u8),
    /// Countdown finished; leave the selection screen
    NavigateAway,
}

/// Spawn the tick loop; events arrive on the returned receiver's channel
pub fn spawn(state: Arc<AppState>) -> (broadcast::Sender<SessionEvent>, JoinHandle<()>) {
    let (tx, _) = broadcast::channel(64);
    let loop_tx = tx.clone();
    let handle = tokio::spawn(async move {
        run(state, loop_tx, Duration::from_secs(1)).await;
    });
    (tx, handle)
}

async fn run(state: Arc<AppState>, tx: broadcast::Sender<SessionEvent>, countdown_step: Duration) {
    let mut interval = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    let mut last_phase = TimerPhase::Idle;

    loop {
        interval.tick().await;

        let (events, phase) = {
            let mut timer = state.timer.lock().unwrap();
            let epoch = timer.epoch();
            let events = timer.tick(epoch, Instant::now());
            (events, timer.phase())
        };

        for event in events {
            let _ = tx.send(translate(event));
        }

        match (last_phase, phase) {
            // A commit landed since the last tick
            (TimerPhase::Running, TimerPhase::Finished) => {
                info!("Selection committed, starting receipt countdown");
                post_commit_countdown(&tx, countdown_step).await;
                state.clear_active();
            }
            (TimerPhase::Running, TimerPhase::Locked) => {
                debug!("Selection window expired");
                state.clear_active();
            }
            _ => {}
        }
        last_phase = phase;
    }
}

async fn post_commit_countdown(tx: &broadcast::Sender<SessionEvent>, step: Duration) {
    for n in (1..=COUNTDOWN_SECS).rev() {
        let _ = tx.send(SessionEvent::Countdown(n));
        tokio::time::sleep(step).await;
    }
    let _ = tx.send(SessionEvent::NavigateAway);
}

fn translate(event: TimerEvent) -> SessionEvent {
    match event {
        TimerEvent::Tick {
            remaining_ms,
            progress,
        } => SessionEvent::Tick {
            remaining_ms,
            progress,
        },
        TimerEvent::Alert(kind) => SessionEvent::Alert(kind),
        TimerEvent::Locked => SessionEvent::Locked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_covers_all_events() {
        assert_eq!(
            translate(TimerEvent::Tick {
                remaining_ms: 1000,
                progress: 0.5
            }),
            SessionEvent::Tick {
                remaining_ms: 1000,
                progress: 0.5
            }
        );
        assert_eq!(
            translate(TimerEvent::Alert(AlertKind::Strong)),
            SessionEvent::Alert(AlertKind::Strong)
        );
        assert_eq!(translate(TimerEvent::Locked), SessionEvent::Locked);
    }

    #[tokio::test]
    async fn test_countdown_sequence() {
        let (tx, mut rx) = broadcast::channel(16);
        post_commit_countdown(&tx, Duration::from_millis(1)).await;

        for expected in (1..=COUNTDOWN_SECS).rev() {
            assert_eq!(rx.recv().await.unwrap(), SessionEvent::Countdown(expected));
        }
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::NavigateAway);
    }

    #[tokio::test]
    async fn test_loop_emits_ticks_and_lock() {
        let state = Arc::new(AppState::in_memory(12).unwrap());
        let candidate = anju_core::CandidateRecord::new(
            "0001".into(),
            "测试一".into(),
            "id0001".into(),
            "1380001".into(),
        );
        state
            .db
            .lock()
            .unwrap()
            .candidates()
            .create(&candidate)
            .unwrap();
        state
            .begin_session(candidate.id, anju_core::Round::First)
            .unwrap();

        let (tx, mut rx) = broadcast::channel(64);
        let loop_state = state.clone();
        let handle = tokio::spawn(async move {
            run(loop_state, tx, Duration::from_millis(1)).await;
        });

        // First tick arrives within the 200ms cadence
        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("tick within cadence")
            .unwrap();
        assert!(matches!(event, SessionEvent::Tick { .. }));

        handle.abort();
    }
}
