// Integration tests (native) for the `lunch-roulette` crate.
// These tests avoid wasm-specific functionality and exercise pure Rust logic so
// they can run under `cargo test` on the host.

use futures::executor::block_on;
use lunch_roulette::app::{Action, RouletteApp};
use lunch_roulette::config::{RouletteConfig, STORAGE_KEY};
use lunch_roulette::menu::{KeyValueStore, MemoryStore};
use lunch_roulette::resolver::{resolve, resolve_index};
use lunch_roulette::scheduler::ManualScheduler;
use lunch_roulette::spin::{SpinEngine, SpinTick};
use lunch_roulette::worker::{ASSET_MANIFEST, AssetCacheWorker, CACHE_NAME, MemoryAssetHost, OFFLINE_BODY};
use lunch_roulette::SpinDuration;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn app_with(items: &[&str]) -> RouletteApp<MemoryStore> {
    let mut store = MemoryStore::new();
    store.set(STORAGE_KEY, &serde_json::to_string(items).unwrap()).unwrap();
    RouletteApp::new(RouletteConfig::default(), store)
}

/// Deliver frame ticks 16ms apart until the scheduler runs dry; returns the selected item.
fn drive(app: &mut RouletteApp<MemoryStore>, sched: &mut ManualScheduler, rng: &mut StdRng) -> Option<String> {
    let mut now = 1_000.0;
    let mut picked = None;
    loop {
        let frames = sched.take_frames();
        if frames.is_empty() {
            return picked;
        }
        for token in frames {
            if let Action::Selected(item) = app.on_tick(token, now, rng, sched) {
                picked = Some(item);
            }
        }
        now += 16.0;
    }
}

#[test]
fn four_items_quarter_offset_picks_last() {
    let items = ["A", "B", "C", "D"];
    assert_eq!(resolve(45.0, &items), Some("D"));
    assert_eq!(resolve(0.0, &["A", "B"]), Some("A"));
    assert_eq!(resolve_index(180.0, 2), 1);
}

#[test]
fn end_to_end_spin_picks_item_under_pointer() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut sched = ManualScheduler::new();
    let mut app = app_with(&["A", "B", "C", "D"]);
    app.set_spin_duration(2);

    assert_eq!(app.spin_by(720.0 + 45.0, &mut sched), Action::RenderNeeded);
    assert_eq!(drive(&mut app, &mut sched, &mut rng).as_deref(), Some("D"));
    assert_eq!(app.rotation(), 765.0);
}

#[test]
fn random_spins_always_land_on_a_listed_item() {
    let mut rng = StdRng::seed_from_u64(1234);
    let mut sched = ManualScheduler::new();
    let mut app = app_with(&["김밥", "라멘", "초밥"]);
    app.set_spin_duration(2);

    let mut previous = app.rotation();
    for _ in 0..5 {
        assert_eq!(app.spin(&mut rng, &mut sched), Action::RenderNeeded);
        let picked = drive(&mut app, &mut sched, &mut rng).expect("spin settles on an item");
        assert!(app.menus().items().contains(&picked));
        let added = app.rotation() - previous;
        assert!((720.0..1800.0).contains(&added), "added {added}");
        assert_eq!(Some(picked.as_str()), resolve(app.rotation(), app.menus().items()));
        previous = app.rotation();
    }
}

#[test]
fn removal_floor_keeps_two_items() {
    let mut app = app_with(&["A", "B"]);
    assert!(matches!(app.remove_menu(1), Action::Warn(_)));
    assert_eq!(app.menus().items(), ["A", "B"]);
    assert_eq!(app.store().raw(STORAGE_KEY), Some(r#"["A","B"]"#));
}

#[test]
fn corrupt_storage_falls_back_to_defaults() {
    let store = MemoryStore::with_entry(STORAGE_KEY, "{{{ not json");
    let app = RouletteApp::new(RouletteConfig::default(), store);
    assert_eq!(app.menus().len(), lunch_roulette::DEFAULT_MENUS.len());
}

#[test]
fn spin_engine_monotonic_and_snaps_to_target() {
    let mut sched = ManualScheduler::new();
    let mut engine = SpinEngine::new(SpinDuration::new(3));
    assert!(engine.request_spin_by(5, 1333.3, &mut sched));
    let mut last = engine.rotation();
    let mut now = 0.0;
    loop {
        let token = sched.take_frames().pop().expect("pending spin tick");
        match engine.on_tick(token, now, &mut sched) {
            SpinTick::Advanced { rotation, progress } => {
                assert!(rotation >= last);
                assert!(progress < 1.0);
                last = rotation;
            }
            SpinTick::Settled { rotation } => {
                assert_eq!(rotation, engine.target_rotation());
                break;
            }
            SpinTick::Ignored => panic!("live token ignored"),
        }
        now += 7.0;
    }
}

#[test]
fn restarting_cancels_the_previous_spin_tick() {
    let mut sched = ManualScheduler::new();
    let mut engine = SpinEngine::new(SpinDuration::new(2));
    engine.request_spin_by(3, 900.0, &mut sched);
    let stale = sched.take_frames()[0];
    engine.on_tick(stale, 0.0, &mut sched);
    engine.on_tick(sched.take_frames()[0], 2_500.0, &mut sched);
    engine.acknowledge();

    engine.request_spin_by(3, 900.0, &mut sched);
    // the consumed tick from the first spin cannot drive the second one
    assert_eq!(engine.on_tick(stale, 10.0, &mut sched), SpinTick::Ignored);
    assert_eq!(sched.take_frames().len(), 1);
    assert!(engine.is_spinning());
}

#[test]
fn cache_worker_install_activate_fetch() {
    let host = MemoryAssetHost::new();
    for url in ASSET_MANIFEST {
        host.serve(url, "asset");
    }
    host.create_cache("rullet-cache-v0");
    let worker = AssetCacheWorker::with_defaults(host);

    block_on(worker.install()).unwrap();
    for url in ASSET_MANIFEST {
        assert!(worker.host().cached(CACHE_NAME, url).is_some(), "{url} not cached");
    }

    let deleted = block_on(worker.activate()).unwrap();
    assert_eq!(deleted, vec!["rullet-cache-v0".to_string()]);
    assert!(worker.host().has_cache(CACHE_NAME));

    worker.host().set_offline(true);
    let resp = block_on(worker.fetch(&"sw.js".to_string())).unwrap();
    assert_eq!(resp.body, "asset");
    let resp = block_on(worker.fetch(&"missing.css".to_string())).unwrap();
    assert_eq!(resp.body, OFFLINE_BODY);
}
