//! Offline asset cache: install / activate / network-first fetch.
//!
//! The worker logic is written against [`AssetHost`] so it runs the same over
//! the browser Cache API (see `sw`) and over [`MemoryAssetHost`] in tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use crate::error::RouletteError;

/// Bump the version suffix to drop every older cache on the next activation.
pub const CACHE_NAME: &str = "rullet-cache-v1";

pub const ASSET_MANIFEST: &[&str] = &[
    ".",
    "index.html",
    "icon.png",
    "og_image.png",
    "manifest.json",
    "sw.js",
    "https://cdnjs.cloudflare.com/ajax/libs/gsap/3.12.5/gsap.min.js",
    "https://cdn.jsdelivr.net/npm/canvas-confetti@1.5.1/dist/confetti.browser.min.js",
];

/// Body served when neither the network nor the cache can answer.
pub const OFFLINE_BODY: &str = "오프라인 상태입니다.";

/// Network and cache primitives the worker needs from its environment.
#[allow(async_fn_in_trait)]
pub trait AssetHost {
    type Request;
    type Response;

    async fn fetch(&self, req: &Self::Request) -> Result<Self::Response, RouletteError>;
    /// Open `cache` and add every URL, failing if any of them fails.
    async fn add_all(&self, cache: &str, urls: &[&str]) -> Result<(), RouletteError>;
    async fn cache_names(&self) -> Result<Vec<String>, RouletteError>;
    async fn delete_cache(&self, cache: &str) -> Result<bool, RouletteError>;
    /// Match `req` against every cache.
    async fn lookup(&self, req: &Self::Request) -> Result<Option<Self::Response>, RouletteError>;
    /// Write `resp` into `cache` without making the caller wait for it.
    fn store(&self, cache: &str, req: &Self::Request, resp: Self::Response);
    fn clone_response(&self, resp: &Self::Response) -> Result<Self::Response, RouletteError>;
    fn offline_response(&self) -> Result<Self::Response, RouletteError>;
}

pub struct AssetCacheWorker<H: AssetHost> {
    host: H,
    cache_name: String,
    manifest: Vec<String>,
}

impl<H: AssetHost> AssetCacheWorker<H> {
    pub fn new(host: H, cache_name: &str, manifest: &[&str]) -> Self {
        Self {
            host,
            cache_name: cache_name.to_string(),
            manifest: manifest.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Worker with the built-in cache name and manifest.
    pub fn with_defaults(host: H) -> Self {
        Self::new(host, CACHE_NAME, ASSET_MANIFEST)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub async fn install(&self) -> Result<(), RouletteError> {
        let urls: Vec<&str> = self.manifest.iter().map(String::as_str).collect();
        self.host.add_all(&self.cache_name, &urls).await?;
        log::info!("cached {} assets in {}", urls.len(), self.cache_name);
        Ok(())
    }

    /// Delete every cache except the current one. Returns the deleted names.
    pub async fn activate(&self) -> Result<Vec<String>, RouletteError> {
        let mut deleted = Vec::new();
        for name in self.host.cache_names().await? {
            if name == self.cache_name {
                continue;
            }
            if self.host.delete_cache(&name).await? {
                log::info!("deleted stale cache {name}");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Network first; on failure the cached copy, then the offline placeholder.
    pub async fn fetch(&self, req: &H::Request) -> Result<H::Response, RouletteError> {
        match self.host.fetch(req).await {
            Ok(resp) => {
                match self.host.clone_response(&resp) {
                    Ok(copy) => self.host.store(&self.cache_name, req, copy),
                    Err(e) => log::warn!("could not clone response for caching: {e}"),
                }
                Ok(resp)
            }
            Err(e) => {
                log::warn!("network fetch failed ({e}); trying cache");
                match self.host.lookup(req).await {
                    Ok(Some(cached)) => {
                        log::debug!("served from cache");
                        Ok(cached)
                    }
                    Ok(None) => self.host.offline_response(),
                    Err(e) => {
                        log::warn!("cache lookup failed: {e}");
                        self.host.offline_response()
                    }
                }
            }
        }
    }
}

// --- In-memory host ---------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub body: String,
}

impl AssetResponse {
    pub fn ok(body: &str) -> Self {
        Self { status: 200, body: body.to_string() }
    }
}

/// Single-threaded fake network plus named caches keyed by URL.
#[derive(Debug, Default)]
pub struct MemoryAssetHost {
    network: RefCell<HashMap<String, AssetResponse>>,
    caches: RefCell<BTreeMap<String, HashMap<String, AssetResponse>>>,
    offline: Cell<bool>,
}

impl MemoryAssetHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: &str) {
        self.network.borrow_mut().insert(url.to_string(), AssetResponse::ok(body));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn create_cache(&self, name: &str) {
        self.caches.borrow_mut().entry(name.to_string()).or_default();
    }

    pub fn has_cache(&self, name: &str) -> bool {
        self.caches.borrow().contains_key(name)
    }

    pub fn cached(&self, cache: &str, url: &str) -> Option<AssetResponse> {
        self.caches.borrow().get(cache).and_then(|c| c.get(url).cloned())
    }

    pub fn cached_urls(&self, cache: &str) -> Vec<String> {
        let mut urls: Vec<String> = self
            .caches
            .borrow()
            .get(cache)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        urls.sort();
        urls
    }

    fn network_get(&self, url: &str) -> Result<AssetResponse, RouletteError> {
        if self.offline.get() {
            return Err(RouletteError::Network("offline".into()));
        }
        self.network
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| RouletteError::Network(format!("unreachable: {url}")))
    }
}

impl AssetHost for MemoryAssetHost {
    type Request = String;
    type Response = AssetResponse;

    async fn fetch(&self, req: &String) -> Result<AssetResponse, RouletteError> {
        self.network_get(req)
    }

    async fn add_all(&self, cache: &str, urls: &[&str]) -> Result<(), RouletteError> {
        let mut fetched = HashMap::new();
        for url in urls {
            let resp = self
                .network_get(url)
                .map_err(|e| RouletteError::Cache(format!("addAll failed: {e}")))?;
            fetched.insert(url.to_string(), resp);
        }
        self.caches.borrow_mut().entry(cache.to_string()).or_default().extend(fetched);
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>, RouletteError> {
        Ok(self.caches.borrow().keys().cloned().collect())
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, RouletteError> {
        Ok(self.caches.borrow_mut().remove(cache).is_some())
    }

    async fn lookup(&self, req: &String) -> Result<Option<AssetResponse>, RouletteError> {
        Ok(self.caches.borrow().values().find_map(|c| c.get(req).cloned()))
    }

    fn store(&self, cache: &str, req: &String, resp: AssetResponse) {
        self.caches
            .borrow_mut()
            .entry(cache.to_string())
            .or_default()
            .insert(req.clone(), resp);
    }

    fn clone_response(&self, resp: &AssetResponse) -> Result<AssetResponse, RouletteError> {
        Ok(resp.clone())
    }

    fn offline_response(&self) -> Result<AssetResponse, RouletteError> {
        Ok(AssetResponse::ok(OFFLINE_BODY))
    }
}
