//! The editable menu list and its persistence.

use std::collections::HashMap;

use crate::error::RouletteError;

/// Fewest items the wheel may hold.
pub const MIN_ITEMS: usize = 2;

/// String key-value persistence (browser `localStorage` or an in-memory map).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, RouletteError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), RouletteError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, RouletteError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), RouletteError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `window.localStorage`.
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    pub fn open() -> Result<Self, RouletteError> {
        let win = web_sys::window().ok_or_else(|| RouletteError::Storage("no window".into()))?;
        let storage = win
            .local_storage()?
            .ok_or_else(|| RouletteError::Storage("localStorage unavailable".into()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, RouletteError> {
        Ok(self.storage.get_item(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), RouletteError> {
        Ok(self.storage.set_item(key, value)?)
    }
}

/// Store used by the page: `localStorage` when the browser allows it, otherwise
/// an in-memory map that lasts as long as the page.
pub enum PageStore {
    Local(LocalStorageStore),
    Memory(MemoryStore),
}

impl PageStore {
    pub fn open() -> Self {
        Self::from_open(LocalStorageStore::open())
    }

    /// Use the opened `localStorage`, or fall back to memory when it is blocked.
    pub fn from_open(opened: Result<LocalStorageStore, RouletteError>) -> Self {
        match opened {
            Ok(local) => PageStore::Local(local),
            Err(e) => {
                log::warn!("localStorage unavailable ({e}); menu changes will not persist");
                PageStore::Memory(MemoryStore::new())
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, PageStore::Local(_))
    }
}

impl KeyValueStore for PageStore {
    fn get(&self, key: &str) -> Result<Option<String>, RouletteError> {
        match self {
            PageStore::Local(s) => s.get(key),
            PageStore::Memory(s) => s.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), RouletteError> {
        match self {
            PageStore::Local(s) => s.set(key, value),
            PageStore::Memory(s) => s.set(key, value),
        }
    }
}

/// Result of [`MenuList::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Empty,
    Duplicate,
}

/// Ordered, duplicate-free list of menu names with at least [`MIN_ITEMS`] entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuList {
    items: Vec<String>,
}

impl MenuList {
    /// Build from raw entries: trims, drops blanks and duplicates. `None` if fewer than two survive.
    pub fn from_items<I, S>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = MenuList { items: Vec::new() };
        for item in items {
            list.add(item.as_ref());
        }
        (list.len() >= MIN_ITEMS).then_some(list)
    }

    /// Load the persisted list, falling back to `defaults` when absent or unusable.
    pub fn load<K: KeyValueStore + ?Sized>(store: &K, key: &str, defaults: &[String]) -> Self {
        let fallback = || {
            MenuList::from_items(defaults).unwrap_or_else(|| MenuList {
                items: crate::config::DEFAULT_MENUS.iter().map(|m| m.to_string()).collect(),
            })
        };
        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return fallback(),
            Err(e) => {
                log::warn!("could not read stored menus: {e}");
                return fallback();
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(items) => MenuList::from_items(items).unwrap_or_else(|| {
                log::warn!("stored menu list has fewer than {MIN_ITEMS} usable items; using defaults");
                fallback()
            }),
            Err(e) => {
                log::warn!("stored menu list is corrupt ({e}); using defaults");
                fallback()
            }
        }
    }

    pub fn save<K: KeyValueStore + ?Sized>(&self, store: &mut K, key: &str) -> Result<(), RouletteError> {
        let json = serde_json::to_string(&self.items)?;
        store.set(key, &json)
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn add(&mut self, text: &str) -> AddOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return AddOutcome::Empty;
        }
        if self.items.iter().any(|m| m == trimmed) {
            return AddOutcome::Duplicate;
        }
        self.items.push(trimmed.to_string());
        AddOutcome::Added
    }

    /// Remove the item at `index` unless that would leave fewer than [`MIN_ITEMS`].
    pub fn remove(&mut self, index: usize) -> Result<String, RouletteError> {
        if self.items.len() <= MIN_ITEMS {
            return Err(RouletteError::TooFewItems { min: MIN_ITEMS });
        }
        if index >= self.items.len() {
            return Err(RouletteError::IndexOutOfRange { index, len: self.items.len() });
        }
        Ok(self.items.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        vec!["X".into(), "Y".into(), "Z".into()]
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, RouletteError> {
            Err(RouletteError::Storage("denied".into()))
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), RouletteError> {
            Err(RouletteError::Storage("quota".into()))
        }
    }

    #[test]
    fn load_falls_back_on_missing_or_corrupt() {
        let empty = MemoryStore::new();
        assert_eq!(MenuList::load(&empty, "k", &defaults()).items(), defaults().as_slice());

        let corrupt = MemoryStore::with_entry("k", "[\"A\", ");
        assert_eq!(MenuList::load(&corrupt, "k", &defaults()).items(), defaults().as_slice());

        let wrong_shape = MemoryStore::with_entry("k", "{\"a\":1}");
        assert_eq!(MenuList::load(&wrong_shape, "k", &defaults()).len(), 3);

        let too_short = MemoryStore::with_entry("k", "[\"only\"]");
        assert_eq!(MenuList::load(&too_short, "k", &defaults()).len(), 3);

        assert_eq!(MenuList::load(&BrokenStore, "k", &defaults()).len(), 3);
    }

    #[test]
    fn load_reads_and_cleans_stored_list() {
        let store = MemoryStore::with_entry("k", r#"["A", " B ", "A", ""]"#);
        let list = MenuList::load(&store, "k", &defaults());
        assert_eq!(list.items(), ["A", "B"]);
    }

    #[test]
    fn save_round_trips_through_store() {
        let mut store = MemoryStore::new();
        let mut list = MenuList::from_items(["A", "B"]).unwrap();
        list.add("C");
        list.save(&mut store, "k").unwrap();
        assert_eq!(store.raw("k"), Some(r#"["A","B","C"]"#));
        assert!(list.save(&mut BrokenStore, "k").is_err());
    }

    #[test]
    fn blocked_local_storage_falls_back_to_memory() {
        let blocked = Err(RouletteError::Js("SecurityError: access denied".into()));
        let mut store = PageStore::from_open(blocked);
        assert!(!store.is_persistent());
        assert_eq!(MenuList::load(&store, "k", &defaults()).items(), defaults().as_slice());

        let list = MenuList::from_items(["A", "B"]).unwrap();
        list.save(&mut store, "k").unwrap();
        assert_eq!(MenuList::load(&store, "k", &defaults()), list);
    }

    #[test]
    fn add_ignores_blank_and_duplicates() {
        let mut list = MenuList::from_items(["A", "B"]).unwrap();
        assert_eq!(list.add("   "), AddOutcome::Empty);
        assert_eq!(list.add(" A "), AddOutcome::Duplicate);
        assert_eq!(list.add(" 라멘 "), AddOutcome::Added);
        assert_eq!(list.items(), ["A", "B", "라멘"]);
    }

    #[test]
    fn remove_respects_floor() {
        let mut list = MenuList::from_items(["A", "B"]).unwrap();
        assert!(matches!(list.remove(0), Err(RouletteError::TooFewItems { min: 2 })));
        assert_eq!(list.len(), 2);

        list.add("C");
        assert!(matches!(list.remove(7), Err(RouletteError::IndexOutOfRange { .. })));
        assert_eq!(list.remove(1).unwrap(), "B");
        assert_eq!(list.items(), ["A", "C"]);
    }

    #[test]
    fn from_items_needs_two() {
        assert!(MenuList::from_items(["A"]).is_none());
        assert!(MenuList::from_items(["A", "A"]).is_none());
        assert!(MenuList::from_items(["A", "B"]).is_some());
    }
}
