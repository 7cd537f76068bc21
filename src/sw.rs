//! Service worker entry: wires install / activate / fetch events to
//! [`AssetCacheWorker`] over the browser Cache API.

use std::rc::Rc;

use js_sys::{Array, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};
use web_sys::{Cache, CacheStorage, ExtendableEvent, FetchEvent, Request, Response, ServiceWorkerGlobalScope};

use crate::error::RouletteError;
use crate::worker::{AssetCacheWorker, AssetHost, OFFLINE_BODY};

/// [`AssetHost`] backed by `fetch()` and `caches` of the worker global scope.
pub struct BrowserAssetHost {
    scope: ServiceWorkerGlobalScope,
}

impl BrowserAssetHost {
    pub fn new(scope: ServiceWorkerGlobalScope) -> Self {
        Self { scope }
    }

    fn caches(&self) -> Result<CacheStorage, RouletteError> {
        Ok(self.scope.caches()?)
    }
}

async fn open_cache(caches: &CacheStorage, name: &str) -> Result<Cache, RouletteError> {
    let cache = JsFuture::from(caches.open(name)).await?;
    Ok(cache.dyn_into::<Cache>()?)
}

impl AssetHost for BrowserAssetHost {
    type Request = Request;
    type Response = Response;

    async fn fetch(&self, req: &Request) -> Result<Response, RouletteError> {
        let resp = JsFuture::from(self.scope.fetch_with_request(req))
            .await
            .map_err(|e| RouletteError::Network(format!("{e:?}")))?;
        Ok(resp.dyn_into::<Response>()?)
    }

    async fn add_all(&self, cache: &str, urls: &[&str]) -> Result<(), RouletteError> {
        let cache = open_cache(&self.caches()?, cache).await?;
        let list: Array = urls.iter().map(|u| JsValue::from_str(u)).collect();
        JsFuture::from(cache.add_all_with_str_sequence(&list))
            .await
            .map_err(|e| RouletteError::Cache(format!("addAll failed: {e:?}")))?;
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>, RouletteError> {
        let keys = JsFuture::from(self.caches()?.keys()).await?;
        Ok(Array::from(&keys).iter().filter_map(|k| k.as_string()).collect())
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, RouletteError> {
        let deleted = JsFuture::from(self.caches()?.delete(cache)).await?;
        Ok(deleted.as_bool().unwrap_or(false))
    }

    async fn lookup(&self, req: &Request) -> Result<Option<Response>, RouletteError> {
        let found = JsFuture::from(self.caches()?.match_with_request(req)).await?;
        if found.is_undefined() || found.is_null() {
            return Ok(None);
        }
        Ok(Some(found.dyn_into::<Response>()?))
    }

    fn store(&self, cache: &str, req: &Request, resp: Response) {
        // The Cache API only accepts GET requests.
        if req.method() != "GET" {
            return;
        }
        let caches = match self.caches() {
            Ok(c) => c,
            Err(e) => {
                log::warn!("cache storage unavailable: {e}");
                return;
            }
        };
        let name = cache.to_string();
        let req = Clone::clone(req);
        spawn_local(async move {
            let result = async {
                let cache = open_cache(&caches, &name).await?;
                JsFuture::from(cache.put_with_request(&req, &resp)).await?;
                Ok::<(), RouletteError>(())
            }
            .await;
            if let Err(e) = result {
                log::warn!("failed to cache {}: {e}", req.url());
            }
        });
    }

    fn clone_response(&self, resp: &Response) -> Result<Response, RouletteError> {
        Ok(resp.clone()?)
    }

    fn offline_response(&self) -> Result<Response, RouletteError> {
        Ok(Response::new_with_opt_str(Some(OFFLINE_BODY))?)
    }
}

type SharedWorker = Rc<AssetCacheWorker<BrowserAssetHost>>;

fn wait_until(evt: &ExtendableEvent, promise: Promise, phase: &str) {
    if let Err(e) = evt.wait_until(&promise) {
        log::warn!("{phase}: waitUntil rejected: {e:?}");
    }
}

/// Register the worker's event listeners. Call once from the service worker script.
#[wasm_bindgen]
pub fn start_service_worker() -> Result<(), JsValue> {
    let scope: ServiceWorkerGlobalScope = js_sys::global().dyn_into()?;
    let worker: SharedWorker = Rc::new(AssetCacheWorker::with_defaults(BrowserAssetHost::new(scope.clone())));

    {
        let worker = worker.clone();
        let closure = Closure::wrap(Box::new(move |evt: ExtendableEvent| {
            let worker = worker.clone();
            let promise = future_to_promise(async move {
                worker.install().await.map(|_| JsValue::UNDEFINED).map_err(JsValue::from)
            });
            wait_until(&evt, promise, "install");
        }) as Box<dyn FnMut(_)>);
        scope.add_event_listener_with_callback("install", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    {
        let worker = worker.clone();
        let closure = Closure::wrap(Box::new(move |evt: ExtendableEvent| {
            let worker = worker.clone();
            let promise = future_to_promise(async move {
                worker.activate().await.map(|_| JsValue::UNDEFINED).map_err(JsValue::from)
            });
            wait_until(&evt, promise, "activate");
        }) as Box<dyn FnMut(_)>);
        scope.add_event_listener_with_callback("activate", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    {
        let closure = Closure::wrap(Box::new(move |evt: FetchEvent| {
            let worker = worker.clone();
            let request = evt.request();
            let promise = future_to_promise(async move {
                worker.fetch(&request).await.map(JsValue::from).map_err(JsValue::from)
            });
            if let Err(e) = evt.respond_with(&promise) {
                log::warn!("respondWith failed: {e:?}");
            }
        }) as Box<dyn FnMut(_)>);
        scope.add_event_listener_with_callback("fetch", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    log::info!("service worker listeners registered");
    Ok(())
}
