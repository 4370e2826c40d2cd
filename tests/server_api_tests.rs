use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use drawlab::parallel::WorkerPool;
use drawlab::provider::store::{BuiltinCatalog, StoreError, TableStore};
use drawlab::server::ratelimit::{ManualClock, RateLimiter};
use drawlab::server::routes::route_request;
use drawlab::server::ServerState;

const CALLER: &str = "10.0.0.1";

fn test_state(limit: u32) -> ServerState {
    ServerState::new(
        Arc::new(BuiltinCatalog),
        RateLimiter::new(limit, 60, Arc::new(ManualClock::at(1_000))),
        WorkerPool::default(),
    )
}

const SUMMARY_KEYS: [&str; 14] = [
    "samples",
    "obs_total_draws",
    "mean_total_draws",
    "median_total_draws",
    "std_total_draws",
    "percentile_rank_of_obs_%",
    "normal_fit_mu",
    "normal_fit_sigma_mle",
    "normal_fit_sigma_sample",
    "ks_distance",
    "normal_pdf_at_obs",
    "hist_density_at_obs",
    "hist_bin_width",
    "theoretical_percentile",
];

#[test]
fn health_endpoint_returns_ok_json_with_rate_headers() {
    let state = test_state(30);
    let response = route_request("GET", "/api/health", "", CALLER, &state);
    assert_eq!(response.status_code, 200);
    assert_eq!(response.content_type, "application/json");
    assert!(response.body.contains("\"ok\":true"));
    assert_eq!(response.header("X-RateLimit-Limit"), Some("30"));
    assert_eq!(response.header("X-RateLimit-Remaining"), Some("30"));
    assert!(response.header("X-RateLimit-Reset").is_some());
}

#[test]
fn simulate_endpoint_returns_summary_and_svg() {
    let state = test_state(30);
    let body = r#"{"GAME_ID": 1, "GOAL": 7, "OBS_TOTAL": 888, "N_SIMS": 10000, "BINS": 128, "SEED": 20251014}"#;
    let response = route_request("POST", "/api/simulate", body, CALLER, &state);
    assert_eq!(response.status_code, 200);

    let payload: serde_json::Value =
        serde_json::from_str(&response.body).expect("response should be valid json");
    assert_eq!(payload["ok"], true);

    let summary = payload["summary"]
        .as_object()
        .expect("summary should be an object");
    for key in SUMMARY_KEYS {
        assert!(summary.contains_key(key), "missing summary key {key}");
    }
    assert_eq!(summary.len(), SUMMARY_KEYS.len());
    assert_eq!(summary["samples"], 10_000);
    assert_eq!(summary["obs_total_draws"], 888);

    let svg = payload["image_svg"].as_str().expect("image_svg string");
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<rect class=\"bar\"").count(), 128);
}

#[test]
fn simulate_endpoint_is_deterministic_for_fixed_seed() {
    let state = test_state(30);
    let body = r#"{"GAME_ID": 1, "GOAL": 3, "OBS_TOTAL": 400, "N_SIMS": 10000, "SEED": 77}"#;
    let a = route_request("POST", "/api/simulate", body, CALLER, &state);
    let b = route_request("POST", "/api/simulate", body, CALLER, &state);
    assert_eq!(a.status_code, 200);
    assert_eq!(a.body, b.body);
}

#[test]
fn simulate_endpoint_changes_with_seed() {
    let state = test_state(30);
    let a = route_request(
        "POST",
        "/api/simulate",
        r#"{"GAME_ID": 1, "GOAL": 3, "OBS_TOTAL": 400, "N_SIMS": 10000, "SEED": 1}"#,
        CALLER,
        &state,
    );
    let b = route_request(
        "POST",
        "/api/simulate",
        r#"{"GAME_ID": 1, "GOAL": 3, "OBS_TOTAL": 400, "N_SIMS": 10000, "SEED": 2}"#,
        CALLER,
        &state,
    );
    assert_eq!(a.status_code, 200);
    assert_eq!(b.status_code, 200);
    assert_ne!(a.body, b.body);
}

#[test]
fn simulate_accepts_form_encoded_bodies() {
    let state = test_state(30);
    let response = route_request(
        "POST",
        "/api/simulate",
        "GAME_ID=1&GOAL=2&OBS_TOTAL=150&N_SIMS=10000&SEED=5",
        CALLER,
        &state,
    );
    assert_eq!(response.status_code, 200);
    assert!(response.body.contains("\"ok\":true"));
}

#[test]
fn unknown_game_id_is_not_found_without_partial_summary() {
    let state = test_state(30);
    let response = route_request(
        "POST",
        "/api/simulate",
        r#"{"GAME_ID": 999999, "GOAL": 7, "OBS_TOTAL": 888}"#,
        CALLER,
        &state,
    );
    assert_eq!(response.status_code, 404);

    let payload: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(payload["ok"], false);
    assert!(payload["error"].as_str().unwrap().contains("GAME_ID"));
    assert!(payload.get("summary").is_none());
    assert!(payload.get("image_svg").is_none());
}

#[test]
fn invalid_payloads_are_rejected_before_the_pipeline() {
    let state = test_state(30);
    for body in [
        "",
        "{bad json}",
        r#"{"GAME_ID": 1, "GOAL": 7}"#,
        r#"{"GAME_ID": 1, "GOAL": -2, "OBS_TOTAL": 888}"#,
        r#"{"GAME_ID": 1, "GOAL": 7, "OBS_TOTAL": 0}"#,
    ] {
        let response = route_request("POST", "/api/simulate", body, CALLER, &state);
        assert_eq!(response.status_code, 400, "body: {body}");
        assert!(response.body.contains("\"ok\":false"));
        assert!(response.header("X-RateLimit-Limit").is_some());
    }
}

#[test]
fn unknown_route_is_404_with_rate_headers() {
    let state = test_state(30);
    let response = route_request("GET", "/api/bogus", "", CALLER, &state);
    assert_eq!(response.status_code, 404);
    assert!(response.header("X-RateLimit-Remaining").is_some());
}

struct FailingStore {
    fetches: AtomicUsize,
}

impl TableStore for FailingStore {
    fn fetch(&self, _game_id: u32) -> Result<Vec<f64>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("kv store down".to_string()))
    }
}

#[test]
fn unreachable_store_maps_to_503() {
    let state = ServerState::new(
        Arc::new(FailingStore {
            fetches: AtomicUsize::new(0),
        }),
        RateLimiter::new(30, 60, Arc::new(ManualClock::at(0))),
        WorkerPool::default(),
    );
    let response = route_request(
        "POST",
        "/api/simulate",
        r#"{"GAME_ID": 1, "GOAL": 7, "OBS_TOTAL": 888}"#,
        CALLER,
        &state,
    );
    assert_eq!(response.status_code, 503);
    assert!(response.body.contains("unavailable"));
}

#[test]
fn throttled_requests_short_circuit_before_the_provider() {
    let store = Arc::new(FailingStore {
        fetches: AtomicUsize::new(0),
    });
    let clock = Arc::new(ManualClock::at(1_000));
    let state = ServerState::new(
        store.clone(),
        RateLimiter::new(1, 60, clock),
        WorkerPool::default(),
    );
    let body = r#"{"GAME_ID": 1, "GOAL": 7, "OBS_TOTAL": 888}"#;

    let first = route_request("POST", "/api/simulate", body, CALLER, &state);
    assert_eq!(first.status_code, 503);
    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

    for _ in 0..3 {
        let throttled = route_request("POST", "/api/simulate", body, CALLER, &state);
        assert_eq!(throttled.status_code, 429);
        assert_eq!(throttled.header("X-RateLimit-Remaining"), Some("0"));
        assert!(throttled.body.contains("\"ok\":false"));
    }
    // The provider (and everything behind it) was never reached again.
    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
}

#[test]
fn http_string_carries_rate_limit_headers() {
    let state = test_state(30);
    let response = route_request("GET", "/api/health", "", CALLER, &state);
    let raw = response.to_http_string();
    assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(raw.contains("X-RateLimit-Limit: 30\r\n"));
    assert!(raw.contains("Content-Type: application/json\r\n"));
}
