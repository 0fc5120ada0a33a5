//! End-to-end relay tests.
//!
//! Every test wires a real page document, boot listener, in-process
//! runtime and background router, so requests travel the full
//! page -> content script -> background -> content script -> page path.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use valoisan_core::bootstrap::{BackgroundContext, ContentContext};
use valoisan_core::correlator::CallOutcome;
use valoisan_platform::browser::{
    BrowserRuntime, MemoryDocument, MemoryExtensionStorage, MemoryLocalStorage,
};
use valoisan_platform::dom::Element;
use valoisan_platform::events::{PageEvents, RECEIVE_BACKGROUND_MESSAGE};
use valoisan_platform::messaging::BackgroundMessaging;
use valoisan_platform::storage::{ExtensionStorage, LocalStorage, NativeExtensionStorage};
use valoisan_types::config::RelayConfig;
use valoisan_types::manifest::{ExtensionManifest, InstallDetails};
use valoisan_types::state::{CANONICAL_STATE_KEY, LEGACY_STATE_KEY, PreferenceState};

const PAGE_URL: &str = "https://mail.google.com/mail/u/0/#inbox";

struct Harness {
    runtime: BrowserRuntime,
    storage: Arc<dyn ExtensionStorage>,
    local: Arc<MemoryLocalStorage>,
    document: Arc<MemoryDocument>,
    background: BackgroundContext,
    page: ContentContext,
}

impl Harness {
    fn new(storage: Arc<dyn ExtensionStorage>, local: MemoryLocalStorage) -> Self {
        let config = RelayConfig {
            call_timeout_ms: 2_000,
            ..RelayConfig::default()
        };
        let mut manifest = ExtensionManifest::new("Valoisan", "3.2.1");
        manifest.description = Some("Campaigns from your inbox".into());
        manifest.extra.insert("permissions".into(), json!(["storage", "tabs"]));

        let runtime = BrowserRuntime::new(manifest);
        let background =
            BackgroundContext::new(&config, Arc::clone(&storage), Arc::new(runtime.background()));
        background.start();

        let local = Arc::new(local);
        let document = Arc::new(MemoryDocument::new());
        let page = ContentContext::boot(
            &config,
            PAGE_URL,
            document.clone(),
            Arc::new(runtime.open_tab(PAGE_URL)),
            local.clone(),
        )
        .expect("main view should boot");

        Self {
            runtime,
            storage,
            local,
            document,
            background,
            page,
        }
    }

    fn memory() -> Self {
        Self::new(Arc::new(MemoryExtensionStorage::new()), MemoryLocalStorage::new())
    }

    async fn shutdown(self) {
        self.page.shutdown().await;
        self.background.stop().await;
    }
}

fn state_data(state: Value) -> Option<Map<String, Value>> {
    let mut data = Map::new();
    data.insert("state".into(), state);
    Some(data)
}

/// Test 1: getState replies carry exactly `getState:response`.
#[tokio::test]
async fn test_get_state_response_action() {
    let h = Harness::memory();
    let reply = h
        .page
        .correlator()
        .call("getState", None)
        .await
        .unwrap()
        .into_resolved()
        .unwrap();
    assert_eq!(reply.action, "getState:response");
    assert_eq!(reply.field("state"), Some(&json!({})));
    h.shutdown().await;
}

/// Test 2: setState then getState returns the record just set.
#[tokio::test]
async fn test_set_then_get_returns_latest_record() {
    let h = Harness::memory();
    let correlator = h.page.correlator();
    let record = json!({"token": "t-1", "contactFilter": "vip", "onboarding": 2});

    correlator.send("setState", state_data(json!({"token": "old"}))).unwrap();
    correlator.send("setState", state_data(record.clone())).unwrap();

    let reply = correlator
        .call("getState", None)
        .await
        .unwrap()
        .into_resolved()
        .unwrap();
    assert_eq!(reply.field("state"), Some(&record));
    h.shutdown().await;
}

/// Test 3: empty canonical store migrates the legacy mirror.
#[tokio::test]
async fn test_load_migrates_legacy_mirror() {
    let local = MemoryLocalStorage::new().with_item(LEGACY_STATE_KEY, r#"{"token":"abc"}"#);
    let h = Harness::new(Arc::new(MemoryExtensionStorage::new()), local);

    let state = h.page.load_state().await.unwrap();
    assert_eq!(
        state.to_value().unwrap(),
        json!({"token": "abc", "receiveAll": true})
    );
    h.shutdown().await;
}

/// Test 4: both stores empty yields `{receiveAll: true}` only.
#[tokio::test]
async fn test_load_with_nothing_stored() {
    let h = Harness::memory();
    let state = h.page.load_state().await.unwrap();
    assert_eq!(state.to_value().unwrap(), json!({"receiveAll": true}));
    h.shutdown().await;
}

/// Test 5: an explicit receiveAll survives load.
#[tokio::test]
async fn test_load_keeps_explicit_receive_all() {
    let local =
        MemoryLocalStorage::new().with_item(LEGACY_STATE_KEY, r#"{"receiveAll":false}"#);
    let h = Harness::new(Arc::new(MemoryExtensionStorage::new()), local);
    let state = h.page.load_state().await.unwrap();
    assert_eq!(state.receive_all, Some(false));
    h.shutdown().await;
}

/// Test 6: save writes both stores and the JSON carries no save capability.
#[tokio::test]
async fn test_save_round_trip() {
    let storage = Arc::new(MemoryExtensionStorage::new());
    let h = Harness::new(storage.clone(), MemoryLocalStorage::new());

    let mut state = h.page.load_state().await.unwrap();
    state.user_email = Some("someone@example.com".into());
    state.current_campaign_id = Some("cmp-9".into());
    state.save().unwrap();

    let mirrored = h.local.get_item(LEGACY_STATE_KEY).unwrap();
    let mirrored: Value = serde_json::from_str(&mirrored).unwrap();
    assert!(mirrored.get("save").is_none());
    assert_eq!(mirrored["userEmail"], "someone@example.com");

    // The canonical write is unacknowledged; a later read observes it.
    let reloaded = h.page.load_state().await.unwrap();
    assert_eq!(reloaded.current_campaign_id.as_deref(), Some("cmp-9"));
    assert_eq!(storage.snapshot(CANONICAL_STATE_KEY), Some(mirrored));
    h.shutdown().await;
}

/// Test 7: getManifest returns the declared manifest unchanged.
#[tokio::test]
async fn test_get_manifest_deep_equals_declared() {
    let h = Harness::memory();
    let reply = h
        .page
        .correlator()
        .call("getManifest", None)
        .await
        .unwrap()
        .into_resolved()
        .unwrap();
    let declared = h.runtime.background().manifest().to_value().unwrap();
    assert_eq!(reply.field("manifest"), Some(&declared));
    assert_eq!(declared["permissions"], json!(["storage", "tabs"]));
    h.shutdown().await;
}

/// Test 8: concurrent same-action calls each get their own reply.
#[tokio::test]
async fn test_concurrent_calls_are_correlated() {
    let h = Harness::memory();
    let correlator = h.page.correlator();

    let (a, b, c) = tokio::join!(
        correlator.call("getState", None),
        correlator.call("getState", None),
        correlator.call("getManifest", None),
    );
    for outcome in [a.unwrap(), b.unwrap(), c.unwrap()] {
        assert!(outcome.is_resolved());
    }
    assert_eq!(h.document.listener_count(RECEIVE_BACKGROUND_MESSAGE), 0);
    h.shutdown().await;
}

/// Test 9: unknown actions never get a reply.
#[tokio::test]
async fn test_unknown_action_times_out() {
    let h = Harness::memory();
    let correlator = valoisan_core::Correlator::new(h.page.correlator().bridge().clone())
        .with_timeout(Duration::from_millis(100));

    let outcome = correlator.call("wipeMailbox", None).await.unwrap();
    assert_eq!(outcome, CallOutcome::TimedOut);
    h.shutdown().await;
}

/// Test 10: a cancelled call ends promptly.
#[tokio::test]
async fn test_cancelled_call() {
    let h = Harness::memory();
    h.background.stop().await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = h
        .page
        .correlator()
        .call_with_cancel("getState", None, &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, CallOutcome::Cancelled);
    h.page.shutdown().await;
}

/// Test 11: load fails when the background is not answering.
#[tokio::test]
async fn test_load_without_background_fails() {
    let config = RelayConfig {
        call_timeout_ms: 100,
        ..RelayConfig::default()
    };
    let runtime = BrowserRuntime::new(ExtensionManifest::new("Valoisan", "1.0.0"));
    let page = ContentContext::boot(
        &config,
        PAGE_URL,
        Arc::new(MemoryDocument::new()),
        Arc::new(runtime.open_tab(PAGE_URL)),
        Arc::new(MemoryLocalStorage::new()),
    )
    .unwrap();

    let err = page.load_state().await.unwrap_err();
    assert!(err.to_string().contains("timed out"));
    page.shutdown().await;
}

/// Test 12: a storage read failure leaves the call unanswered.
#[tokio::test]
async fn test_storage_failure_sends_no_reply() {
    let storage = Arc::new(MemoryExtensionStorage::new());
    let h = Harness::new(storage.clone(), MemoryLocalStorage::new());
    storage.fail_reads(true);

    let correlator = valoisan_core::Correlator::new(h.page.correlator().bridge().clone())
        .with_timeout(Duration::from_millis(150));
    let outcome = correlator.call("getState", None).await.unwrap();
    assert_eq!(outcome, CallOutcome::TimedOut);
    h.shutdown().await;
}

/// Test 13: records persist in the native file store across restarts.
#[tokio::test]
async fn test_native_storage_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let h = Harness::new(
            Arc::new(NativeExtensionStorage::new(&path)),
            MemoryLocalStorage::new(),
        );
        let mut state = h.page.load_state().await.unwrap();
        state.token = Some("persisted".into());
        state.save().unwrap();
        // Wait for the unacknowledged write to land.
        let reloaded = h.page.load_state().await.unwrap();
        assert_eq!(reloaded.token.as_deref(), Some("persisted"));
        h.shutdown().await;
    }

    let h = Harness::new(
        Arc::new(NativeExtensionStorage::new(&path)),
        MemoryLocalStorage::new(),
    );
    let stored = h.storage.get(CANONICAL_STATE_KEY).await.unwrap().unwrap();
    let stored = PreferenceState::from_value(stored).unwrap();
    assert_eq!(stored.token.as_deref(), Some("persisted"));
    h.shutdown().await;
}

/// Test 14: a selector appearing after 200ms is found.
#[tokio::test]
async fn test_wait_for_late_selector() {
    let h = Harness::memory();
    let document = h.document.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        document.insert(".valoisan-pane", Element::new("div").with_text("pane"));
    });

    let start = Instant::now();
    let found = h
        .page
        .dom()
        .wait_for_selector(".valoisan-pane", None)
        .await
        .unwrap();
    assert_eq!(found.text, "pane");
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(start.elapsed() < Duration::from_secs(2));
    h.shutdown().await;
}

/// Test 15: a never-appearing selector resolves within [timeout, timeout + interval].
#[tokio::test]
async fn test_wait_for_missing_selector_bounds() {
    let h = Harness::memory();
    let timeout = Duration::from_millis(500);

    let start = Instant::now();
    let found = h
        .page
        .dom()
        .wait_for_selector(".never", Some(timeout))
        .await;
    let elapsed = start.elapsed();

    assert!(found.is_none());
    assert!(elapsed >= timeout, "resolved early: {elapsed:?}");
    assert!(
        elapsed <= timeout + Duration::from_millis(100) + Duration::from_millis(150),
        "resolved late: {elapsed:?}"
    );
    h.shutdown().await;
}

/// Test 16: a fresh install opens onboarding; an update does not.
#[tokio::test]
async fn test_install_hook() {
    let h = Harness::memory();
    let install: InstallDetails = serde_json::from_value(json!({"reason": "install"})).unwrap();
    let update: InstallDetails =
        serde_json::from_value(json!({"reason": "update", "previousVersion": "3.2.0"})).unwrap();

    assert!(h.background.on_installed(&install).await.unwrap().is_some());
    assert!(h.background.on_installed(&update).await.unwrap().is_none());
    assert_eq!(h.runtime.created_tabs(), vec!["./install.html".to_string()]);
    h.shutdown().await;
}
