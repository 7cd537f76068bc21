//! Application state and event handling, independent of the DOM.
//!
//! `RouletteApp` owns everything the page mutates: the menu list, the spin
//! engine, the confetti burst and the result popup. The browser layer forwards
//! user input and scheduler ticks here and re-renders from the accessors.

use rand::Rng;

use crate::config::{RouletteConfig, SpinDuration};
use crate::confetti::{ConfettiSimulator, ConfettiTick};
use crate::error::RouletteError;
use crate::menu::{AddOutcome, KeyValueStore, MenuList};
use crate::resolver;
use crate::scheduler::{Channel, TickScheduler, TickToken};
use crate::sector;
use crate::spin::{SpinEngine, SpinTick};

/// What the host should do after handing an event to the app.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    None,
    RenderNeeded,
    /// The list changed; redraw and clear the input box.
    MenuChanged,
    /// Show a blocking warning to the user.
    Warn(String),
    /// A spin finished on this item; the popup follows after the reveal delay.
    Selected(String),
    ShowResult(String),
}

pub const MIN_ITEMS_WARNING: &str = "최소 2개의 메뉴가 필요합니다.";

pub struct RouletteApp<K: KeyValueStore> {
    config: RouletteConfig,
    store: K,
    menus: MenuList,
    engine: SpinEngine,
    confetti: ConfettiSimulator,
    selected: Option<String>,
    popup_visible: bool,
    reveal_token: Option<TickToken>,
}

impl<K: KeyValueStore> RouletteApp<K> {
    /// Load the persisted menu list and build idle state.
    pub fn new(config: RouletteConfig, store: K) -> Self {
        let menus = MenuList::load(&store, &config.storage_key, &config.default_menus);
        log::info!("loaded {} menus", menus.len());
        let engine = SpinEngine::new(config.spin_duration);
        Self {
            config,
            store,
            menus,
            engine,
            confetti: ConfettiSimulator::new(),
            selected: None,
            popup_visible: false,
            reveal_token: None,
        }
    }

    pub fn menus(&self) -> &MenuList {
        &self.menus
    }

    pub fn engine(&self) -> &SpinEngine {
        &self.engine
    }

    pub fn confetti(&self) -> &ConfettiSimulator {
        &self.confetti
    }

    pub fn rotation(&self) -> f64 {
        self.engine.rotation()
    }

    pub fn is_spinning(&self) -> bool {
        self.engine.is_spinning()
    }

    pub fn can_spin(&self) -> bool {
        !self.engine.is_spinning() && self.menus.len() >= 2 && !self.engine.is_torn_down()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn popup_visible(&self) -> bool {
        self.popup_visible && self.selected.is_some()
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn spin_duration(&self) -> SpinDuration {
        self.engine.duration()
    }

    pub fn config(&self) -> &RouletteConfig {
        &self.config
    }

    fn persist(&mut self) {
        if let Err(e) = self.menus.save(&mut self.store, &self.config.storage_key) {
            log::warn!("failed to persist menus: {e}");
        }
    }

    // --- User input ---

    pub fn add_menu(&mut self, text: &str) -> Action {
        match self.menus.add(text) {
            AddOutcome::Added => {
                self.persist();
                log::debug!("menu added: {}", text.trim());
                Action::MenuChanged
            }
            outcome => {
                log::debug!("menu add ignored ({outcome:?})");
                Action::None
            }
        }
    }

    /// Remove by index. Ignored mid-spin; rejected with a warning at the two-item floor.
    pub fn remove_menu(&mut self, index: usize) -> Action {
        if self.engine.is_spinning() {
            return Action::None;
        }
        match self.menus.remove(index) {
            Ok(removed) => {
                self.persist();
                log::debug!("menu removed: {removed}");
                Action::MenuChanged
            }
            Err(RouletteError::TooFewItems { .. }) => Action::Warn(MIN_ITEMS_WARNING.to_string()),
            Err(e) => {
                log::debug!("remove ignored: {e}");
                Action::None
            }
        }
    }

    /// Which item a top-referenced screen angle hits, given the current rotation.
    pub fn menu_at_screen_angle(&self, screen_angle: f64) -> usize {
        sector::sector_at(screen_angle - self.engine.rotation(), self.menus.len())
    }

    /// Canvas click: remove the sector under the click point.
    pub fn click_wheel(&mut self, screen_angle: f64) -> Action {
        if self.engine.is_spinning() {
            return Action::None;
        }
        let index = self.menu_at_screen_angle(screen_angle);
        self.remove_menu(index)
    }

    pub fn set_spin_duration(&mut self, secs: u32) -> Action {
        self.engine.set_duration(SpinDuration::new(secs));
        Action::RenderNeeded
    }

    pub fn dismiss_popup(&mut self) -> Action {
        if !self.popup_visible {
            return Action::None;
        }
        self.popup_visible = false;
        Action::RenderNeeded
    }

    pub fn spin<R, S>(&mut self, rng: &mut R, sched: &mut S) -> Action
    where
        R: Rng + ?Sized,
        S: TickScheduler + ?Sized,
    {
        let extra = crate::spin::random_extra_rotation(rng);
        self.spin_by(extra, sched)
    }

    /// Spin with a fixed extra rotation. Used by [`Self::spin`] and deterministic drivers.
    pub fn spin_by<S>(&mut self, extra: f64, sched: &mut S) -> Action
    where
        S: TickScheduler + ?Sized,
    {
        self.engine.acknowledge();
        if !self.engine.request_spin_by(self.menus.len(), extra, sched) {
            return Action::None;
        }
        self.selected = None;
        self.popup_visible = false;
        if let Some(token) = self.reveal_token.take() {
            sched.cancel(token);
        }
        self.confetti.stop(sched);
        Action::RenderNeeded
    }

    // --- Scheduler ticks ---

    /// Route a delivered tick to the animation that owns it.
    pub fn on_tick<R, S>(&mut self, token: TickToken, now_ms: f64, rng: &mut R, sched: &mut S) -> Action
    where
        R: Rng + ?Sized,
        S: TickScheduler + ?Sized,
    {
        match token.channel {
            Channel::Spin => match self.engine.on_tick(token, now_ms, sched) {
                SpinTick::Ignored => Action::None,
                SpinTick::Advanced { .. } => Action::RenderNeeded,
                SpinTick::Settled { rotation } => self.settle(rotation, rng, sched),
            },
            Channel::Confetti => match self.confetti.on_tick(token, sched) {
                ConfettiTick::Ignored => Action::None,
                ConfettiTick::Running | ConfettiTick::Finished => Action::RenderNeeded,
            },
            Channel::ResultReveal => {
                if self.reveal_token != Some(token) {
                    return Action::None;
                }
                self.reveal_token = None;
                match &self.selected {
                    Some(item) => {
                        self.popup_visible = true;
                        Action::ShowResult(item.clone())
                    }
                    None => Action::None,
                }
            }
        }
    }

    fn settle<R, S>(&mut self, rotation: f64, rng: &mut R, sched: &mut S) -> Action
    where
        R: Rng + ?Sized,
        S: TickScheduler + ?Sized,
    {
        // Resolve against the list as it is now, not as it was when the spin began.
        let Some(item) = resolver::resolve(rotation, self.menus.items()).map(str::to_string) else {
            return Action::RenderNeeded;
        };
        log::info!("selected menu: {item}");
        self.selected = Some(item.clone());
        self.confetti.burst(rng, sched);
        self.reveal_token = Some(sched.request_delay(Channel::ResultReveal, self.config.result_delay_ms));
        Action::Selected(item)
    }

    /// Cancel every pending tick; nothing mutates after this.
    pub fn teardown<S>(&mut self, sched: &mut S)
    where
        S: TickScheduler + ?Sized,
    {
        self.engine.teardown(sched);
        self.confetti.stop(sched);
        if let Some(token) = self.reveal_token.take() {
            sched.cancel(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MemoryStore;
    use crate::scheduler::ManualScheduler;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn app_with(items: &[&str]) -> RouletteApp<MemoryStore> {
        let json = serde_json::to_string(items).unwrap();
        let store = MemoryStore::with_entry(crate::config::STORAGE_KEY, &json);
        RouletteApp::new(RouletteConfig::default(), store)
    }

    fn run_spin(app: &mut RouletteApp<MemoryStore>, s: &mut ManualScheduler, rng: &mut StdRng) -> Option<String> {
        let mut now = 0.0;
        let mut picked = None;
        for _ in 0..10_000 {
            let frames = s.take_frames();
            if frames.is_empty() {
                break;
            }
            for t in frames {
                if let Action::Selected(item) = app.on_tick(t, now, rng, s) {
                    picked = Some(item);
                }
            }
            now += 16.0;
        }
        picked
    }

    #[test]
    fn new_app_uses_defaults_without_storage() {
        let app = RouletteApp::new(RouletteConfig::default(), MemoryStore::new());
        assert_eq!(app.menus().len(), 8);
        assert!(app.can_spin());
    }

    #[test]
    fn mutations_are_persisted() {
        let mut app = app_with(&["A", "B"]);
        assert_eq!(app.add_menu("C"), Action::MenuChanged);
        assert_eq!(app.store().raw(crate::config::STORAGE_KEY), Some(r#"["A","B","C"]"#));
        assert_eq!(app.add_menu("C"), Action::None);
        assert_eq!(app.remove_menu(0), Action::MenuChanged);
        assert_eq!(app.store().raw(crate::config::STORAGE_KEY), Some(r#"["B","C"]"#));
        assert_eq!(app.remove_menu(0), Action::Warn(MIN_ITEMS_WARNING.to_string()));
        assert_eq!(app.menus().len(), 2);
    }

    #[test]
    fn spin_resolves_and_reveals() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut s = ManualScheduler::new();
        let mut app = app_with(&["A", "B", "C", "D"]);
        app.set_spin_duration(2);
        // 720 + 45 leaves the pointer over the last quarter.
        assert_eq!(app.spin_by(765.0, &mut s), Action::RenderNeeded);
        assert!(!app.can_spin());
        assert_eq!(app.spin_by(900.0, &mut s), Action::None);

        let picked = run_spin(&mut app, &mut s, &mut rng);
        assert_eq!(picked.as_deref(), Some("D"));
        assert_eq!(app.selected(), Some("D"));
        assert!(!app.popup_visible());
        // the driver loop ran the confetti burst to completion as well
        assert!(!app.confetti().is_active());
        assert!(app.confetti().particles().is_empty());

        let delays = s.take_delays();
        assert_eq!(delays.len(), 1);
        assert_eq!(delays[0].1, 300.0);
        assert_eq!(app.on_tick(delays[0].0, 0.0, &mut rng, &mut s), Action::ShowResult("D".into()));
        assert!(app.popup_visible());
        assert_eq!(app.dismiss_popup(), Action::RenderNeeded);
        assert!(!app.popup_visible());
    }

    #[test]
    fn new_spin_clears_previous_result() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut s = ManualScheduler::new();
        let mut app = app_with(&["A", "B"]);
        app.set_spin_duration(2);
        app.spin_by(720.0, &mut s);
        assert_eq!(run_spin(&mut app, &mut s, &mut rng).as_deref(), Some("A"));
        assert!(app.can_spin());

        app.spin(&mut rng, &mut s);
        assert_eq!(app.selected(), None);
        // the pending reveal from the first spin was cancelled
        assert!(s.take_delays().is_empty());
        assert!(app.is_spinning());
    }

    #[test]
    fn list_edited_mid_spin_uses_final_list() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut s = ManualScheduler::new();
        let mut app = app_with(&["A", "B", "C"]);
        app.set_spin_duration(2);
        app.spin_by(720.0 + 10.0, &mut s);
        assert_eq!(app.add_menu("D"), Action::MenuChanged);
        // removal stays blocked while the wheel turns
        assert_eq!(app.remove_menu(0), Action::None);
        // pointer at 350° over 4 items -> index 3
        assert_eq!(run_spin(&mut app, &mut s, &mut rng).as_deref(), Some("D"));
    }

    #[test]
    fn duration_set_mid_spin_is_kept_for_next_spin() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut s = ManualScheduler::new();
        let mut app = app_with(&["A", "B", "C"]);
        app.spin_by(900.0, &mut s);
        assert_eq!(app.set_spin_duration(9), Action::RenderNeeded);
        assert_eq!(app.spin_duration().secs(), 9);

        run_spin(&mut app, &mut s, &mut rng);
        assert_eq!(app.spin_duration().secs(), 9);
        app.spin_by(900.0, &mut s);
        assert_eq!(app.engine().active_duration().secs(), 9);
    }

    #[test]
    fn stale_confetti_tick_does_not_redraw() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut s = ManualScheduler::new();
        let mut app = app_with(&["A", "B"]);
        let foreign = TickToken { channel: Channel::Confetti, id: 9_999 };
        assert_eq!(app.on_tick(foreign, 0.0, &mut rng, &mut s), Action::None);

        app.set_spin_duration(2);
        app.spin_by(720.0, &mut s);
        run_spin(&mut app, &mut s, &mut rng);
        assert!(app.confetti().particles().is_empty());
        assert_eq!(app.on_tick(foreign, 0.0, &mut rng, &mut s), Action::None);
    }

    #[test]
    fn clicking_a_sector_removes_it() {
        let mut app = app_with(&["A", "B", "C", "D"]);
        assert_eq!(app.menu_at_screen_angle(100.0), 1);
        assert_eq!(app.click_wheel(100.0), Action::MenuChanged);
        assert_eq!(app.menus().items(), ["A", "C", "D"]);
    }

    #[test]
    fn teardown_stops_everything() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut s = ManualScheduler::new();
        let mut app = app_with(&["A", "B"]);
        app.spin_by(1000.0, &mut s);
        let frames = s.take_frames();
        app.teardown(&mut s);
        for t in frames {
            assert_eq!(app.on_tick(t, 10.0, &mut rng, &mut s), Action::None);
        }
        assert_eq!(app.rotation(), 0.0);
        assert!(!app.can_spin());
        assert_eq!(app.spin_by(900.0, &mut s), Action::None);
    }
}
