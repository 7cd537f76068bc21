//! Crate-wide error type.

use wasm_bindgen::JsValue;

/// Errors surfaced by menu persistence, the cache worker and the browser glue.
#[derive(Debug, thiserror::Error)]
pub enum RouletteError {
    /// Removing another item would leave fewer than the minimum on the wheel.
    #[error("at least {min} menu items are required")]
    TooFewItems { min: usize },
    /// Index passed to a list operation is past the end of the menu list.
    #[error("menu index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    /// The key-value store rejected a read or write.
    #[error("storage error: {0}")]
    Storage(String),
    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The network request behind a fetch failed.
    #[error("network error: {0}")]
    Network(String),
    /// A cache operation failed.
    #[error("cache error: {0}")]
    Cache(String),
    /// A browser API call threw.
    #[error("javascript error: {0}")]
    Js(String),
}

impl From<JsValue> for RouletteError {
    fn from(value: JsValue) -> Self {
        let msg = value
            .as_string()
            .unwrap_or_else(|| format!("{value:?}"));
        RouletteError::Js(msg)
    }
}

impl From<RouletteError> for JsValue {
    fn from(err: RouletteError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let e = RouletteError::TooFewItems { min: 2 };
        assert_eq!(e.to_string(), "at least 2 menu items are required");
        let e = RouletteError::IndexOutOfRange { index: 5, len: 3 };
        assert!(e.to_string().contains("5"));
    }

    #[test]
    fn serde_errors_convert() {
        let bad: Result<Vec<String>, _> = serde_json::from_str("{nope");
        let err: RouletteError = bad.unwrap_err().into();
        assert!(matches!(err, RouletteError::Serde(_)));
    }
}
