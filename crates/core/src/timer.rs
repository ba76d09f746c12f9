//! Selection session countdown
//!
//! One candidate gets a fixed 3-minute window to complete a selection.
//! The timer is a small owned state machine: the caller drives it with
//! periodic `tick` calls (every 200 ms or less) and reacts to the events
//! it returns. No global instance; one timer per operator session.
//!
//! States: Idle -> Running -> {Finished | Locked} -> Idle (via reset).
//! A tick carries the epoch it was scheduled under; ticks from a
//! cancelled episode are no-ops, so a late callback racing a reset
//! cannot resurrect a dead countdown.

use std::time::Instant;

/// Full selection window: 3 minutes
pub const SELECTION_WINDOW_MS: u64 = 3 * 60 * 1000;

/// Recommended tick interval. Must stay well under the tightest alert
/// spacing (2 s) so no threshold is skipped.
pub const TICK_INTERVAL_MS: u64 = 200;

/// Gentle reminders: every 30 s for the first two minutes, every 15 s
/// during the final minute.
const LIGHT_ALERTS_MS: [u64; 7] = [150_000, 120_000, 90_000, 60_000, 45_000, 30_000, 15_000];

/// Urgent reminders: every 2 s over the last 10 seconds.
const STRONG_ALERTS_MS: [u64; 5] = [10_000, 8_000, 6_000, 4_000, 2_000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Finished,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Light,
    Strong,
}

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    Tick { remaining_ms: u64, progress: f64 },
    Alert(AlertKind),
    /// The window expired; fired exactly once per Running episode
    Locked,
}

#[derive(Debug)]
pub struct SelectionTimer {
    phase: TimerPhase,
    deadline: Option<Instant>,
    remaining_ms: u64,
    /// Bumped on every start/finish/reset; stale ticks carry an old value
    epoch: u64,
}

impl SelectionTimer {
    pub fn new() -> Self {
        Self {
            phase: TimerPhase::Idle,
            deadline: None,
            remaining_ms: SELECTION_WINDOW_MS,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn is_locked(&self) -> bool {
        self.phase == TimerPhase::Locked
    }

    /// Elapsed fraction of the window as a percentage. Idle and Finished
    /// render without a timer, so they report 0.
    pub fn progress(&self) -> f64 {
        match self.phase {
            TimerPhase::Idle | TimerPhase::Finished => 0.0,
            TimerPhase::Running | TimerPhase::Locked => {
                let elapsed = SELECTION_WINDOW_MS - self.remaining_ms;
                (elapsed as f64 / SELECTION_WINDOW_MS as f64 * 100.0).clamp(0.0, 100.0)
            }
        }
    }

    /// Begin the countdown. Only legal from Idle; restarting requires an
    /// explicit `reset` first, so a start while Running is ignored.
    pub fn start(&mut self, now: Instant) {
        if self.phase != TimerPhase::Idle {
            return;
        }
        self.deadline = Some(now + std::time::Duration::from_millis(SELECTION_WINDOW_MS));
        self.remaining_ms = SELECTION_WINDOW_MS;
        self.phase = TimerPhase::Running;
        self.epoch += 1;
        tracing::debug!(epoch = self.epoch, "selection timer started");
    }

    /// The candidate committed a selection in time. Running -> Finished.
    pub fn finish(&mut self) {
        if self.phase != TimerPhase::Running {
            return;
        }
        self.phase = TimerPhase::Finished;
        self.deadline = None;
        self.remaining_ms = SELECTION_WINDOW_MS;
        self.epoch += 1;
    }

    /// Back to Idle from any state. Idempotent.
    pub fn reset(&mut self) {
        self.phase = TimerPhase::Idle;
        self.deadline = None;
        self.remaining_ms = SELECTION_WINDOW_MS;
        self.epoch += 1;
    }

    /// Advance the countdown. `epoch` is the value the driver captured
    /// when it scheduled this tick; a mismatch means the episode was
    /// cancelled and the tick must do nothing.
    ///
    /// Threshold alerts are edge-triggered: a threshold fires when the
    /// previous remaining time was above it and the current one is at or
    /// below it, so each fires at most once per episode.
    pub fn tick(&mut self, epoch: u64, now: Instant) -> Vec<TimerEvent> {
        if epoch != self.epoch || self.phase != TimerPhase::Running {
            return Vec::new();
        }
        let deadline = match self.deadline {
            Some(d) => d,
            None => return Vec::new(),
        };

        let prev = self.remaining_ms;
        let left = deadline
            .checked_duration_since(now)
            .map_or(0, |d| d.as_millis() as u64);
        self.remaining_ms = left;

        let mut events = vec![TimerEvent::Tick {
            remaining_ms: left,
            progress: self.progress(),
        }];

        for threshold in LIGHT_ALERTS_MS {
            if prev > threshold && left <= threshold {
                events.push(TimerEvent::Alert(AlertKind::Light));
            }
        }
        for threshold in STRONG_ALERTS_MS {
            if prev > threshold && left <= threshold {
                events.push(TimerEvent::Alert(AlertKind::Strong));
            }
        }

        if left == 0 {
            self.phase = TimerPhase::Locked;
            self.deadline = None;
            self.epoch += 1;
            events.push(TimerEvent::Locked);
            tracing::info!("selection window expired, session locked");
        }

        events
    }
}

impl Default for SelectionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn alerts(events: &[TimerEvent]) -> Vec<AlertKind> {
        events
            .iter()
            .filter_map(|e| match e {
                TimerEvent::Alert(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let timer = SelectionTimer::new();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining_ms(), SELECTION_WINDOW_MS);
        assert_eq!(timer.progress(), 0.0);
    }

    #[test]
    fn test_start_only_from_idle() {
        let now = Instant::now();
        let mut timer = SelectionTimer::new();
        timer.start(now);
        let epoch = timer.epoch();
        timer.start(now + Duration::from_secs(5));
        // Second start is a no-op; same episode
        assert_eq!(timer.epoch(), epoch);
        assert!(timer.is_running());
    }

    #[test]
    fn test_remaining_monotonic() {
        let now = Instant::now();
        let mut timer = SelectionTimer::new();
        timer.start(now);
        let epoch = timer.epoch();

        let mut last = timer.remaining_ms();
        for step in 1..=20u64 {
            timer.tick(epoch, now + Duration::from_millis(step * 200));
            assert!(timer.remaining_ms() <= last);
            last = timer.remaining_ms();
        }
    }

    #[test]
    fn test_light_alert_edge_triggering() {
        let now = Instant::now();
        let mut timer = SelectionTimer::new();
        timer.start(now);
        let epoch = timer.epoch();

        // 180000 -> 150000: crossing the first light threshold
        let e1 = timer.tick(epoch, now + Duration::from_millis(30_000));
        assert_eq!(alerts(&e1), vec![AlertKind::Light]);

        // 150000 -> 145000: no threshold crossed
        let e2 = timer.tick(epoch, now + Duration::from_millis(35_000));
        assert!(alerts(&e2).is_empty());

        // 145000 -> 120000: second light threshold
        let e3 = timer.tick(epoch, now + Duration::from_millis(60_000));
        assert_eq!(alerts(&e3), vec![AlertKind::Light]);
    }

    #[test]
    fn test_strong_alerts_near_zero() {
        let now = Instant::now();
        let mut timer = SelectionTimer::new();
        timer.start(now);
        let epoch = timer.epoch();

        // Jump to 9 s remaining: 15 s light and 10 s strong both crossed
        let events = timer.tick(epoch, now + Duration::from_millis(171_000));
        let kinds = alerts(&events);
        assert!(kinds.contains(&AlertKind::Light));
        assert!(kinds.contains(&AlertKind::Strong));

        // 9 s -> 7.9 s: only the 8 s strong threshold
        let events = timer.tick(epoch, now + Duration::from_millis(172_100));
        assert_eq!(alerts(&events), vec![AlertKind::Strong]);
    }

    #[test]
    fn test_expiry_locks_once() {
        let now = Instant::now();
        let mut timer = SelectionTimer::new();
        timer.start(now);
        let epoch = timer.epoch();

        let events = timer.tick(epoch, now + Duration::from_millis(SELECTION_WINDOW_MS));
        assert_eq!(timer.phase(), TimerPhase::Locked);
        assert_eq!(timer.remaining_ms(), 0);
        assert_eq!(
            events.iter().filter(|e| **e == TimerEvent::Locked).count(),
            1
        );
        assert_eq!(timer.progress(), 100.0);

        // Epoch was bumped on lock; the next scheduled tick is stale
        let late = timer.tick(epoch, now + Duration::from_millis(SELECTION_WINDOW_MS + 200));
        assert!(late.is_empty());
        assert_eq!(timer.phase(), TimerPhase::Locked);
    }

    #[test]
    fn test_finish_cancels_ticks() {
        let now = Instant::now();
        let mut timer = SelectionTimer::new();
        timer.start(now);
        let epoch = timer.epoch();

        timer.finish();
        assert_eq!(timer.phase(), TimerPhase::Finished);
        assert_eq!(timer.progress(), 0.0);

        let late = timer.tick(epoch, now + Duration::from_millis(400));
        assert!(late.is_empty());
        assert_eq!(timer.phase(), TimerPhase::Finished);
    }

    #[test]
    fn test_reset_idempotent() {
        let now = Instant::now();
        let mut timer = SelectionTimer::new();
        timer.start(now);
        timer.tick(timer.epoch(), now + Duration::from_millis(SELECTION_WINDOW_MS));
        assert!(timer.is_locked());

        timer.reset();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining_ms(), SELECTION_WINDOW_MS);

        timer.reset();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining_ms(), SELECTION_WINDOW_MS);
    }

    #[test]
    fn test_stale_tick_after_reset_is_noop() {
        let now = Instant::now();
        let mut timer = SelectionTimer::new();
        timer.start(now);
        let epoch = timer.epoch();
        timer.reset();

        let events = timer.tick(epoch, now + Duration::from_millis(200));
        assert!(events.is_empty());
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }
}
