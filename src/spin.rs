//! Spin engine: the `Idle → Spinning → Settled` state machine.
//!
//! The engine never reads a clock. Every tick carries the frame timestamp
//! (milliseconds, `performance.now()` in the browser), and the first tick of a
//! spin becomes its start time. Rotation accumulates across spins and is only
//! reduced modulo 360 by the resolver.

use rand::Rng;

use crate::config::SpinDuration;
use crate::scheduler::{Channel, TickScheduler, TickToken};

/// Extra rotation every spin adds at minimum (two full turns).
pub const MIN_EXTRA_ROTATION: f64 = 720.0;
/// Width of the random band on top of [`MIN_EXTRA_ROTATION`] (three more turns).
pub const EXTRA_ROTATION_RANGE: f64 = 1080.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpinPhase {
    Idle,
    Spinning,
    Settled,
}

/// Outcome of delivering one tick to the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpinTick {
    /// Tick was stale, cancelled, or arrived while not spinning.
    Ignored,
    /// Wheel moved; another tick has been requested.
    Advanced { rotation: f64, progress: f64 },
    /// Animation reached full progress; rotation is exactly the target.
    Settled { rotation: f64 },
}

/// Quintic ease-out: fast start, long gentle settle.
pub fn ease_out_quint(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(5)
}

/// Random extra rotation in `[720, 1800)` degrees.
pub fn random_extra_rotation<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    MIN_EXTRA_ROTATION + rng.random::<f64>() * EXTRA_ROTATION_RANGE
}

#[derive(Debug)]
pub struct SpinEngine {
    phase: SpinPhase,
    current_rotation: f64,
    prior_rotation: f64,
    target_rotation: f64,
    start_ms: Option<f64>,
    /// Duration the next spin will use.
    duration: SpinDuration,
    /// Duration locked in when the running spin started.
    active_duration: SpinDuration,
    token: Option<TickToken>,
    torn_down: bool,
}

impl Default for SpinEngine {
    fn default() -> Self {
        Self::new(SpinDuration::default())
    }
}

impl SpinEngine {
    pub fn new(duration: SpinDuration) -> Self {
        Self {
            phase: SpinPhase::Idle,
            current_rotation: 0.0,
            prior_rotation: 0.0,
            target_rotation: 0.0,
            start_ms: None,
            duration,
            active_duration: duration,
            token: None,
            torn_down: false,
        }
    }

    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    pub fn is_spinning(&self) -> bool {
        self.phase == SpinPhase::Spinning
    }

    pub fn rotation(&self) -> f64 {
        self.current_rotation
    }

    pub fn target_rotation(&self) -> f64 {
        self.target_rotation
    }

    /// Rotation the current (or last) spin started from.
    pub fn prior_rotation(&self) -> f64 {
        self.prior_rotation
    }

    pub fn duration(&self) -> SpinDuration {
        self.duration
    }

    /// Takes effect from the next spin; a running spin keeps its own timing.
    pub fn set_duration(&mut self, duration: SpinDuration) {
        self.duration = duration;
    }

    /// Duration of the running (or last) spin.
    pub fn active_duration(&self) -> SpinDuration {
        self.active_duration
    }

    pub fn pending_token(&self) -> Option<TickToken> {
        self.token
    }

    /// Start a spin with a random extra rotation.
    ///
    /// Returns `false` (and changes nothing) while already spinning, with fewer
    /// than two items, or after teardown.
    pub fn request_spin<R, S>(&mut self, item_count: usize, rng: &mut R, sched: &mut S) -> bool
    where
        R: Rng + ?Sized,
        S: TickScheduler + ?Sized,
    {
        let extra = random_extra_rotation(rng);
        self.request_spin_by(item_count, extra, sched)
    }

    /// Start a spin that adds exactly `extra` degrees. `extra` is not range-checked.
    pub fn request_spin_by<S>(&mut self, item_count: usize, extra: f64, sched: &mut S) -> bool
    where
        S: TickScheduler + ?Sized,
    {
        if self.torn_down || self.is_spinning() || item_count < 2 {
            log::debug!("spin rejected (phase {:?}, {} items)", self.phase, item_count);
            return false;
        }
        if let Some(old) = self.token.take() {
            sched.cancel(old);
        }
        self.prior_rotation = self.current_rotation;
        self.target_rotation = self.current_rotation + extra;
        self.start_ms = None;
        self.active_duration = self.duration;
        self.phase = SpinPhase::Spinning;
        self.token = Some(sched.request_tick(Channel::Spin));
        log::info!(
            "spin started: {:.1}° -> {:.1}° over {}s",
            self.prior_rotation,
            self.target_rotation,
            self.active_duration.secs()
        );
        true
    }

    /// Progress in `[0, 1]` for a frame at `now_ms`.
    fn progress_at(&self, now_ms: f64) -> f64 {
        let start = self.start_ms.unwrap_or(now_ms);
        let elapsed = (now_ms - start).max(0.0);
        (elapsed / self.active_duration.as_millis()).min(1.0)
    }

    /// Deliver a frame tick. Only the token the engine is waiting for is honoured.
    pub fn on_tick<S>(&mut self, token: TickToken, now_ms: f64, sched: &mut S) -> SpinTick
    where
        S: TickScheduler + ?Sized,
    {
        if self.torn_down || self.phase != SpinPhase::Spinning || self.token != Some(token) {
            return SpinTick::Ignored;
        }
        self.token = None;
        if self.start_ms.is_none() {
            self.start_ms = Some(now_ms);
        }

        let progress = self.progress_at(now_ms);
        if progress < 1.0 {
            let span = self.target_rotation - self.prior_rotation;
            let next = self.prior_rotation + span * ease_out_quint(progress);
            // Out-of-order timestamps must never move the wheel backwards.
            self.current_rotation = self.current_rotation.max(next).min(self.target_rotation);
            self.token = Some(sched.request_tick(Channel::Spin));
            SpinTick::Advanced { rotation: self.current_rotation, progress }
        } else {
            self.current_rotation = self.target_rotation;
            self.phase = SpinPhase::Settled;
            self.start_ms = None;
            log::info!("spin settled at {:.1}°", self.current_rotation);
            SpinTick::Settled { rotation: self.current_rotation }
        }
    }

    /// Drop back to `Idle` once the settled result has been consumed.
    pub fn acknowledge(&mut self) {
        if self.phase == SpinPhase::Settled {
            self.phase = SpinPhase::Idle;
        }
    }

    /// Cancel any pending tick and refuse all further ticks and spins.
    pub fn teardown<S>(&mut self, sched: &mut S)
    where
        S: TickScheduler + ?Sized,
    {
        if let Some(token) = self.token.take() {
            sched.cancel(token);
        }
        if self.is_spinning() {
            log::debug!("spin engine torn down mid-spin at {:.1}°", self.current_rotation);
        }
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
