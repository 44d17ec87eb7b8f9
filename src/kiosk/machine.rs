use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::model::KioskMode;
use crate::resolver::{PlaylistItem, DEFAULT_SPOT_SECONDS};

/// Shortest time a spot stays on screen.
pub const MIN_SPOT_DURATION: Duration = Duration::from_secs(1);

/// Where the playlist currently is.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    /// Nothing to play; no timers.
    Idle,
    Playing { index: usize, started: Instant },
    /// `remaining` only freezes the progress bar; resume restarts the full
    /// duration.
    Paused { index: usize, remaining: Duration },
    Disabled { message: Option<String> },
}

/// Emitted on every entry into `Playing`.
#[derive(Clone, Debug, PartialEq)]
pub struct Entered {
    pub index: usize,
    /// Previous index when this entry came from an automatic advance.
    pub from: Option<usize>,
}

/// Timed playlist state machine. Holds no timers itself: the driver asks
/// for the current deadline and calls back when it passes.
pub struct PlaylistMachine<R> {
    items: Vec<PlaylistItem>,
    mode: KioskMode,
    phase: Phase,
    rng: R,
}

impl<R: Rng> PlaylistMachine<R> {
    /// A zero duration gets the default spot time; anything else is raised
    /// to at least [`MIN_SPOT_DURATION`].
    pub fn new(mut items: Vec<PlaylistItem>, mode: KioskMode, rng: R) -> Self {
        for item in &mut items {
            item.duration = if item.duration.is_zero() {
                Duration::from_secs(DEFAULT_SPOT_SECONDS)
            } else {
                item.duration.max(MIN_SPOT_DURATION)
            };
        }
        Self {
            items,
            mode,
            phase: Phase::Idle,
            rng,
        }
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn current(&self) -> Option<&PlaylistItem> {
        match self.phase {
            Phase::Playing { index, .. } | Phase::Paused { index, .. } => self.items.get(index),
            Phase::Idle | Phase::Disabled { .. } => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.phase, Phase::Playing { .. })
    }

    /// Begin at the first item. An empty playlist stays `Idle`.
    pub fn start(&mut self, now: Instant) -> Option<Entered> {
        self.enter(0, None, now)
    }

    fn enter(&mut self, index: usize, from: Option<usize>, now: Instant) -> Option<Entered> {
        if self.items.is_empty() {
            self.phase = Phase::Idle;
            return None;
        }
        self.phase = Phase::Playing {
            index,
            started: now,
        };
        Some(Entered { index, from })
    }

    /// When the current item's duration runs out, if playing.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Playing { index, started } => Some(started + self.items[index].duration),
            _ => None,
        }
    }

    /// Index that follows `current` under the session's mode.
    pub fn next_index(&mut self, current: usize) -> usize {
        let n = self.items.len();
        match self.mode {
            KioskMode::Shuffle if n > 1 => loop {
                let candidate = self.rng.gen_range(0..n);
                if candidate != current {
                    break candidate;
                }
            },
            _ => (current + 1) % n,
        }
    }

    /// Duration ran out: move to the next item.
    pub fn advance(&mut self, now: Instant) -> Option<Entered> {
        let Phase::Playing { index, .. } = self.phase else {
            return None;
        };
        let next = self.next_index(index);
        self.enter(next, Some(index), now)
    }

    /// Click/tap: pause when playing, resume when paused. Returns the entry
    /// on resume.
    pub fn toggle(&mut self, now: Instant) -> Option<Entered> {
        match self.phase {
            Phase::Playing { index, started } => {
                let elapsed = now.saturating_duration_since(started);
                let remaining = self.items[index].duration.saturating_sub(elapsed);
                self.phase = Phase::Paused { index, remaining };
                None
            }
            Phase::Paused { index, .. } => self.enter(index, None, now),
            Phase::Idle | Phase::Disabled { .. } => None,
        }
    }

    pub fn disable(&mut self, message: Option<String>) {
        self.phase = Phase::Disabled { message };
    }

    /// Leave `Disabled`, restarting at the first item.
    pub fn enable(&mut self, now: Instant) -> Option<Entered> {
        match self.phase {
            Phase::Disabled { .. } => self.enter(0, None, now),
            _ => None,
        }
    }

    /// Progress through the current item in percent, 0–100.
    pub fn progress(&self, now: Instant) -> f64 {
        let (elapsed, duration) = match self.phase {
            Phase::Playing { index, started } => {
                (now.saturating_duration_since(started), self.items[index].duration)
            }
            Phase::Paused { index, remaining } => {
                let duration = self.items[index].duration;
                (duration.saturating_sub(remaining), duration)
            }
            Phase::Idle | Phase::Disabled { .. } => return 0.0,
        };
        if duration.is_zero() {
            return 100.0;
        }
        (elapsed.as_secs_f64() / duration.as_secs_f64() * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::spot;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn playlist(n: usize, secs: u64) -> Vec<PlaylistItem> {
        (0..n)
            .map(|i| PlaylistItem {
                spot: spot(&format!("s{i}"), "cave", i as i64),
                duration: Duration::from_secs(secs),
            })
            .collect()
    }

    fn machine(n: usize, mode: KioskMode) -> PlaylistMachine<StdRng> {
        PlaylistMachine::new(playlist(n, 5), mode, StdRng::seed_from_u64(7))
    }

    fn index_of(m: &PlaylistMachine<StdRng>) -> Option<usize> {
        match m.phase() {
            Phase::Playing { index, .. } | Phase::Paused { index, .. } => Some(*index),
            _ => None,
        }
    }

    #[test]
    fn loop_mode_cycles_in_order() {
        let mut m = machine(3, KioskMode::Loop);
        let now = Instant::now();
        assert_eq!(m.start(now), Some(Entered { index: 0, from: None }));

        let mut seen = vec![0];
        for _ in 0..3 {
            seen.push(m.advance(now).unwrap().index);
        }
        assert_eq!(seen, [0, 1, 2, 0]);
    }

    #[test]
    fn advance_reports_previous_index() {
        let mut m = machine(3, KioskMode::Loop);
        let now = Instant::now();
        m.start(now);
        assert_eq!(m.advance(now), Some(Entered { index: 1, from: Some(0) }));
    }

    #[test]
    fn shuffle_never_repeats_immediately() {
        let mut m = machine(4, KioskMode::Shuffle);
        let now = Instant::now();
        m.start(now);

        let mut previous = 0;
        let mut visited = [false; 4];
        for _ in 0..1000 {
            let next = m.advance(now).unwrap().index;
            assert_ne!(next, previous);
            visited[next] = true;
            previous = next;
        }
        assert!(visited.iter().all(|v| *v));
    }

    #[test]
    fn shuffle_with_one_item_stays_put() {
        let mut m = machine(1, KioskMode::Shuffle);
        let now = Instant::now();
        m.start(now);
        assert_eq!(m.advance(now).unwrap().index, 0);
    }

    #[test]
    fn empty_playlist_stays_idle() {
        let mut m = machine(0, KioskMode::Loop);
        let now = Instant::now();
        assert!(m.start(now).is_none());
        assert_eq!(m.phase(), &Phase::Idle);
        assert!(m.deadline().is_none());
        assert!(m.advance(now).is_none());
        assert!(m.toggle(now).is_none());
        assert_eq!(m.progress(now), 0.0);
    }

    #[test]
    fn deadline_follows_item_duration() {
        let mut m = machine(2, KioskMode::Loop);
        let now = Instant::now();
        m.start(now);
        assert_eq!(m.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[test]
    fn short_durations_never_spin_the_deadline() {
        let mut items = playlist(2, 5);
        items[0].duration = Duration::ZERO;
        items[1].duration = Duration::from_millis(1);
        let mut m = PlaylistMachine::new(items, KioskMode::Loop, StdRng::seed_from_u64(7));

        let now = Instant::now();
        m.start(now);
        assert_eq!(m.deadline(), Some(now + Duration::from_secs(DEFAULT_SPOT_SECONDS)));
        m.advance(now);
        assert_eq!(m.deadline(), Some(now + MIN_SPOT_DURATION));
    }

    #[test]
    fn pause_clears_deadline_and_freezes_progress() {
        let mut m = machine(2, KioskMode::Loop);
        let start = Instant::now();
        m.start(start);

        let paused_at = start + Duration::from_secs(2);
        assert!(m.toggle(paused_at).is_none());
        assert_eq!(
            m.phase(),
            &Phase::Paused { index: 0, remaining: Duration::from_secs(3) }
        );
        assert!(m.deadline().is_none());
        assert!(m.advance(paused_at + Duration::from_secs(60)).is_none());
        assert!((m.progress(paused_at + Duration::from_secs(60)) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn resume_restarts_full_duration() {
        let mut m = machine(2, KioskMode::Loop);
        let start = Instant::now();
        m.start(start);
        m.toggle(start + Duration::from_secs(4));

        let resumed_at = start + Duration::from_secs(30);
        assert_eq!(m.toggle(resumed_at), Some(Entered { index: 0, from: None }));
        assert_eq!(m.deadline(), Some(resumed_at + Duration::from_secs(5)));
        assert_eq!(m.progress(resumed_at), 0.0);
    }

    #[test]
    fn progress_is_ascending_and_clamped() {
        let mut m = machine(1, KioskMode::Loop);
        let start = Instant::now();
        m.start(start);
        assert_eq!(m.progress(start), 0.0);
        assert!((m.progress(start + Duration::from_millis(2500)) - 50.0).abs() < 1e-9);
        assert_eq!(m.progress(start + Duration::from_secs(9)), 100.0);
    }

    #[test]
    fn disable_then_enable_restarts_at_first_item() {
        let mut m = machine(3, KioskMode::Loop);
        let now = Instant::now();
        m.start(now);
        m.advance(now);
        m.advance(now);
        assert_eq!(index_of(&m), Some(2));

        m.disable(Some("Closed for maintenance".into()));
        assert!(m.current().is_none());
        assert!(m.deadline().is_none());
        assert!(m.toggle(now).is_none());

        assert_eq!(m.enable(now), Some(Entered { index: 0, from: None }));
        assert_eq!(index_of(&m), Some(0));
    }

    #[test]
    fn enable_while_playing_is_a_no_op() {
        let mut m = machine(3, KioskMode::Loop);
        let now = Instant::now();
        m.start(now);
        m.advance(now);
        assert!(m.enable(now).is_none());
        assert_eq!(index_of(&m), Some(1));
    }
}
