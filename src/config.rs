//! Runtime configuration handed over by the JS host.
//!
//! Every field has a default so the host can pass a partial JSON object (or
//! nothing at all) to `start_roulette`.

use serde::Deserialize;

/// Key under which the menu list is persisted in `localStorage`.
pub const STORAGE_KEY: &str = "lunchMenus";

/// Menus shown on first launch or when the stored list is unusable.
pub const DEFAULT_MENUS: &[&str] = &[
    "비빔밥", "김치찌개", "된장찌개", "불고기", "짜장면", "짬뽕", "초밥", "라멘",
];

/// Delay between a spin settling and the result popup appearing.
pub const RESULT_REVEAL_DELAY_MS: f64 = 300.0;

/// Spin duration in whole seconds, always within [`SpinDuration::MIN`, `SpinDuration::MAX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "u32")]
pub struct SpinDuration(u8);

impl SpinDuration {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 10;

    /// Clamp arbitrary user input into the supported range.
    pub fn new(secs: u32) -> Self {
        let clamped = secs.clamp(Self::MIN as u32, Self::MAX as u32);
        SpinDuration(clamped as u8)
    }

    pub fn secs(self) -> u8 {
        self.0
    }

    pub fn as_millis(self) -> f64 {
        self.0 as f64 * 1000.0
    }
}

impl Default for SpinDuration {
    fn default() -> Self {
        SpinDuration(5)
    }
}

impl From<u32> for SpinDuration {
    fn from(secs: u32) -> Self {
        SpinDuration::new(secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RouletteConfig {
    pub storage_key: String,
    pub default_menus: Vec<String>,
    pub spin_duration: SpinDuration,
    pub result_delay_ms: f64,
    pub canvas_id: String,
    pub canvas_size: u32,
}

impl Default for RouletteConfig {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            default_menus: DEFAULT_MENUS.iter().map(|m| m.to_string()).collect(),
            spin_duration: SpinDuration::default(),
            result_delay_ms: RESULT_REVEAL_DELAY_MS,
            canvas_id: "lr-wheel-canvas".to_string(),
            canvas_size: 360,
        }
    }
}

impl RouletteConfig {
    /// Parse host-provided JSON. Missing, blank or malformed input falls back to defaults.
    pub fn from_json(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str::<RouletteConfig>(raw) {
            Ok(mut cfg) => {
                if cfg.default_menus.len() < 2 {
                    log::warn!("config default_menus has fewer than 2 entries; using built-in list");
                    cfg.default_menus = Self::default().default_menus;
                }
                cfg
            }
            Err(e) => {
                log::warn!("ignoring invalid roulette config: {e}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_clamped() {
        assert_eq!(SpinDuration::new(0).secs(), 2);
        assert_eq!(SpinDuration::new(7).secs(), 7);
        assert_eq!(SpinDuration::new(99).secs(), 10);
        assert_eq!(SpinDuration::default().as_millis(), 5000.0);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg = RouletteConfig::from_json(Some(r#"{"spin_duration": 42, "canvas_size": 300}"#));
        assert_eq!(cfg.spin_duration.secs(), 10);
        assert_eq!(cfg.canvas_size, 300);
        assert_eq!(cfg.storage_key, STORAGE_KEY);
        assert_eq!(cfg.default_menus.len(), DEFAULT_MENUS.len());
    }

    #[test]
    fn bad_json_falls_back() {
        let cfg = RouletteConfig::from_json(Some("not json"));
        assert_eq!(cfg.result_delay_ms, RESULT_REVEAL_DELAY_MS);
        let cfg = RouletteConfig::from_json(Some("   "));
        assert_eq!(cfg.canvas_id, "lr-wheel-canvas");
        let cfg = RouletteConfig::from_json(Some(r#"{"default_menus": ["solo"]}"#));
        assert_eq!(cfg.default_menus.len(), DEFAULT_MENUS.len());
    }
}
