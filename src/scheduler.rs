//! Cooperative single-threaded tick scheduling.
//!
//! Each animation (wheel spin, confetti, result reveal) owns at most one
//! outstanding [`TickToken`]. Requesting a tick never runs anything inline; the
//! host later delivers the tick back to the owner of that channel, which checks
//! the token before mutating state.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::window;

/// Which animation loop a tick belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Spin,
    Confetti,
    ResultReveal,
}

/// Handle for one scheduled tick. Cancelling a stale token is harmless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickToken {
    pub channel: Channel,
    pub id: u64,
}

pub trait TickScheduler {
    /// Schedule one callback on the next animation frame.
    fn request_tick(&mut self, channel: Channel) -> TickToken;
    /// Schedule one callback after `delay_ms` of wall time.
    fn request_delay(&mut self, channel: Channel, delay_ms: f64) -> TickToken;
    fn cancel(&mut self, token: TickToken);
}

// --- Manual scheduler (tests / headless drivers) ----------------------------

/// Scheduler that only records requests; the driver decides when they fire.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Vec<(TickToken, Option<f64>)>,
    cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, channel: Channel, delay: Option<f64>) -> TickToken {
        self.next_id += 1;
        let token = TickToken { channel, id: self.next_id };
        self.pending.push((token, delay));
        token
    }

    /// Remove and return every pending frame tick (delays stay queued).
    pub fn take_frames(&mut self) -> Vec<TickToken> {
        let (frames, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(_, d)| d.is_none());
        self.pending = rest;
        frames.into_iter().map(|(t, _)| t).collect()
    }

    /// Remove and return every pending delayed tick.
    pub fn take_delays(&mut self) -> Vec<(TickToken, f64)> {
        let (delays, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(_, d)| d.is_some());
        self.pending = rest;
        delays.into_iter().filter_map(|(t, d)| d.map(|d| (t, d))).collect()
    }

    pub fn pending(&self, channel: Channel) -> usize {
        self.pending.iter().filter(|(t, _)| t.channel == channel).count()
    }

    pub fn is_pending(&self, token: TickToken) -> bool {
        self.pending.iter().any(|(t, _)| *t == token)
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled
    }
}

impl TickScheduler for ManualScheduler {
    fn request_tick(&mut self, channel: Channel) -> TickToken {
        self.push(channel, None)
    }

    fn request_delay(&mut self, channel: Channel, delay_ms: f64) -> TickToken {
        self.push(channel, Some(delay_ms.max(0.0)))
    }

    fn cancel(&mut self, token: TickToken) {
        let before = self.pending.len();
        self.pending.retain(|(t, _)| *t != token);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }
}

// --- Browser scheduler ------------------------------------------------------

/// Delivered to the host when a browser callback fires: the token plus the frame timestamp.
pub type TickHandler = Rc<dyn Fn(TickToken, f64)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BrowserHandle {
    Frame(i32),
    Timeout(i32),
}

/// Frame spacing used when `requestAnimationFrame` is unavailable.
const FALLBACK_FRAME_MS: f64 = 16.0;

/// Use the animation-frame handle, or schedule through `fallback` when the
/// request failed. `None` means nothing was scheduled.
fn frame_or_fallback<E: std::fmt::Debug>(
    frame: Option<Result<i32, E>>,
    fallback: impl FnOnce() -> Option<i32>,
) -> Option<BrowserHandle> {
    match frame {
        Some(Ok(handle)) => Some(BrowserHandle::Frame(handle)),
        failed => {
            log::warn!("requestAnimationFrame failed ({failed:?}); falling back to setTimeout");
            fallback().map(BrowserHandle::Timeout)
        }
    }
}

/// `setTimeout` calls back without a timestamp; read the frame clock instead.
fn tick_timestamp(ts: f64, clock: impl FnOnce() -> f64) -> f64 {
    if ts.is_finite() { ts } else { clock() }
}

fn performance_now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

fn set_timeout(cb: &Closure<dyn FnMut(f64)>, delay_ms: f64) -> Option<i32> {
    let result = window()?.set_timeout_with_callback_and_timeout_and_arguments_0(
        cb.as_ref().unchecked_ref(),
        delay_ms.max(0.0) as i32,
    );
    match result {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::warn!("setTimeout failed: {e:?}");
            None
        }
    }
}

type LiveCallbacks = Rc<RefCell<Vec<(u64, BrowserHandle, Closure<dyn FnMut(f64)>)>>>;

/// `requestAnimationFrame` / `setTimeout` backed scheduler.
///
/// Each request allocates a one-shot closure that forwards to `handler`. The
/// closure stays in `live` until it fires or is cancelled. A fired closure is
/// parked in `spent` because it cannot be dropped while the browser is still
/// executing it; the next firing releases it.
pub struct FrameScheduler {
    next_id: u64,
    handler: TickHandler,
    live: LiveCallbacks,
    spent: Rc<RefCell<Vec<Closure<dyn FnMut(f64)>>>>,
}

impl FrameScheduler {
    pub fn new(handler: TickHandler) -> Self {
        Self {
            next_id: 0,
            handler,
            live: Rc::new(RefCell::new(Vec::new())),
            spent: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn make_callback(&mut self, channel: Channel) -> (TickToken, Closure<dyn FnMut(f64)>) {
        self.next_id += 1;
        let token = TickToken { channel, id: self.next_id };
        let handler = self.handler.clone();
        let live = self.live.clone();
        let spent = self.spent.clone();
        let cb = Closure::wrap(Box::new(move |ts: f64| {
            let fired = {
                let mut live = live.borrow_mut();
                let pos = live.iter().position(|(id, _, _)| *id == token.id);
                pos.map(|p| live.swap_remove(p))
            };
            {
                let mut spent = spent.borrow_mut();
                spent.clear();
                if let Some((_, _, closure)) = fired {
                    spent.push(closure);
                }
            }
            handler(token, tick_timestamp(ts, performance_now));
        }) as Box<dyn FnMut(f64)>);
        (token, cb)
    }

    fn track(&mut self, token: TickToken, handle: Option<BrowserHandle>, cb: Closure<dyn FnMut(f64)>) {
        match handle {
            Some(handle) => self.live.borrow_mut().push((token.id, handle, cb)),
            None => log::error!("could not schedule {:?} tick; the browser refused every timer", token.channel),
        }
    }
}

impl TickScheduler for FrameScheduler {
    fn request_tick(&mut self, channel: Channel) -> TickToken {
        let (token, cb) = self.make_callback(channel);
        let frame = window().map(|w| w.request_animation_frame(cb.as_ref().unchecked_ref()));
        let handle = frame_or_fallback(frame, || set_timeout(&cb, FALLBACK_FRAME_MS));
        self.track(token, handle, cb);
        token
    }

    fn request_delay(&mut self, channel: Channel, delay_ms: f64) -> TickToken {
        let (token, cb) = self.make_callback(channel);
        let handle = set_timeout(&cb, delay_ms).map(BrowserHandle::Timeout);
        self.track(token, handle, cb);
        token
    }

    fn cancel(&mut self, token: TickToken) {
        let mut live = self.live.borrow_mut();
        if let Some(pos) = live.iter().position(|(id, _, _)| *id == token.id) {
            let (_, handle, _cb) = live.swap_remove(pos);
            if let Some(w) = window() {
                match handle {
                    BrowserHandle::Frame(h) => {
                        let _ = w.cancel_animation_frame(h);
                    }
                    BrowserHandle::Timeout(h) => w.clear_timeout_with_handle(h),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_scheduler_tracks_and_cancels() {
        let mut s = ManualScheduler::new();
        let a = s.request_tick(Channel::Spin);
        let b = s.request_tick(Channel::Confetti);
        let c = s.request_delay(Channel::ResultReveal, 300.0);
        assert_ne!(a, b);
        assert_eq!(s.pending(Channel::Spin), 1);
        s.cancel(a);
        s.cancel(a);
        assert_eq!(s.cancelled_count(), 1);
        assert!(!s.is_pending(a));
        assert_eq!(s.take_frames(), vec![b]);
        assert!(s.is_pending(c));
        assert_eq!(s.take_delays(), vec![(c, 300.0)]);
        assert!(s.take_frames().is_empty());
    }

    #[test]
    fn failed_frame_request_falls_back_to_timeout() {
        let ok = frame_or_fallback(Some(Ok::<i32, &str>(7)), || panic!("no fallback needed"));
        assert_eq!(ok, Some(BrowserHandle::Frame(7)));

        let refused = frame_or_fallback(Some(Err("InvalidStateError")), || Some(3));
        assert_eq!(refused, Some(BrowserHandle::Timeout(3)));

        let no_window = frame_or_fallback::<&str>(None, || Some(4));
        assert_eq!(no_window, Some(BrowserHandle::Timeout(4)));

        assert_eq!(frame_or_fallback(Some(Err("x")), || None), None);
    }

    #[test]
    fn timeout_ticks_read_the_frame_clock() {
        assert_eq!(tick_timestamp(1_234.5, || panic!("clock not needed")), 1_234.5);
        assert_eq!(tick_timestamp(f64::NAN, || 99.0), 99.0);
    }
}
