//! Request parsing and the simulate pipeline behind `/api/simulate`.
//!
//! Accepts a JSON object or a form-encoded body with the uppercase keys the
//! UI posts (`GAME_ID`, `GOAL`, `OBS_TOTAL`, `N_SIMS`, `BINS`, `SEED`).
//! Numeric values may arrive as JSON numbers or as text; both coerce through
//! the same finite-positive-integer checks before the pipeline runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::info;
use serde::Serialize;

use crate::error::EngineError;
use crate::parallel::{simulate_on_pool, WorkerPool};
use crate::plot::render_histogram_svg;
use crate::provider::store::{BuiltinCatalog, JsonTableStore, TableStore};
use crate::provider::TableCache;
use crate::server::ratelimit::RateLimiter;
use crate::sim::SimulateParams;
use crate::stats::summary::{fit_normal, summarize_with_fit, SummaryReport};

pub const DEFAULT_N_SIMS: u32 = 500_000;
pub const MIN_N_SIMS: u32 = 10_000;
pub const MAX_N_SIMS: u32 = 2_000_000;
pub const DEFAULT_BINS: u32 = 128;
pub const MIN_BINS: u32 = 32;
pub const MAX_BINS: u32 = 256;
pub const DEFAULT_SEED: u64 = 20251014;
/// Structural cap: goals above this imply totals beyond any table's
/// practical reach and make one request arbitrarily expensive.
pub const MAX_GOAL: u32 = 1_000;

/// Shared server state: table cache, limiter, and simulator pool. Built once
/// at startup and handed to every connection.
pub struct ServerState {
    pub tables: TableCache,
    pub limiter: RateLimiter,
    pub pool: WorkerPool,
}

impl ServerState {
    pub fn new(store: Arc<dyn TableStore>, limiter: RateLimiter, pool: WorkerPool) -> Self {
        Self {
            tables: TableCache::new(store),
            limiter,
            pool,
        }
    }

    /// Store, limiter and pool from the environment: `DRAWLAB_TABLES` (JSON
    /// file store, built-in catalog otherwise), `DRAWLAB_RATE_LIMIT`,
    /// `DRAWLAB_RATE_WINDOW_SECS`, `DRAWLAB_WORKERS`.
    pub fn from_env() -> Self {
        let store: Arc<dyn TableStore> = match std::env::var("DRAWLAB_TABLES") {
            Ok(path) if !path.trim().is_empty() => Arc::new(JsonTableStore::new(path)),
            _ => Arc::new(BuiltinCatalog),
        };
        Self::new(store, RateLimiter::from_env(), WorkerPool::from_env())
    }
}

/// Validated simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationRequest {
    pub game_id: u32,
    pub goal: u32,
    pub obs_total: u64,
    pub n_sims: u32,
    pub bins: u32,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse {
    pub ok: bool,
    pub summary: SummaryReport,
    pub image_svg: String,
}

pub fn health_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string(&serde_json::json!({
        "ok": true,
        "service": "drawlab",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Run the full pipeline for one request body and serialize the response.
pub fn simulate_payload(body: &str, state: &ServerState) -> Result<String, EngineError> {
    let request = parse_request(body)?;
    let started = Instant::now();

    let spec = state.tables.load(request.game_id)?;
    let totals = simulate_on_pool(
        &spec,
        SimulateParams {
            goal: request.goal,
            n_sims: request.n_sims,
            seed: request.seed,
        },
        &state.pool,
    )?;
    let fit = fit_normal(&totals)?;
    let summary = summarize_with_fit(&totals, request.obs_total, request.bins as usize, &fit);
    let title = format!(
        "Total draws distribution: GET {} (n={})",
        request.goal, request.n_sims
    );
    let image_svg = render_histogram_svg(
        &totals,
        &fit,
        request.obs_total,
        request.bins as usize,
        &title,
    );

    info!(
        "simulate game={} goal={} n_sims={} seed={} took {:.1}ms",
        request.game_id,
        request.goal,
        request.n_sims,
        request.seed,
        started.elapsed().as_secs_f64() * 1000.0
    );

    let response = SimulateResponse {
        ok: true,
        summary,
        image_svg,
    };
    serde_json::to_string(&response)
        .map_err(|err| EngineError::Validation(format!("response serialization: {err}")))
}

/// Parse and validate a request body. Touches neither the provider nor the
/// simulator; all failures here are `Validation`.
pub fn parse_request(body: &str) -> Result<SimulationRequest, EngineError> {
    let fields = body_fields(body)?;

    let game_id = required_int(&fields, "GAME_ID")?;
    let goal = required_int(&fields, "GOAL")?;
    let obs_total = required_int(&fields, "OBS_TOTAL")?;

    if game_id > u64::from(u32::MAX) {
        return Err(EngineError::Validation("GAME_ID out of range".to_string()));
    }
    if goal > u64::from(MAX_GOAL) {
        return Err(EngineError::Validation(format!(
            "GOAL must be at most {MAX_GOAL}"
        )));
    }

    let n_sims = optional_int(&fields, "N_SIMS")?
        .unwrap_or(u64::from(DEFAULT_N_SIMS))
        .clamp(u64::from(MIN_N_SIMS), u64::from(MAX_N_SIMS)) as u32;
    let bins = optional_int(&fields, "BINS")?
        .unwrap_or(u64::from(DEFAULT_BINS))
        .clamp(u64::from(MIN_BINS), u64::from(MAX_BINS)) as u32;
    let seed = optional_int(&fields, "SEED")?.unwrap_or(DEFAULT_SEED);

    Ok(SimulationRequest {
        game_id: game_id as u32,
        goal: goal as u32,
        obs_total,
        n_sims,
        bins,
        seed,
    })
}

/// Flatten a JSON object or a form-encoded body into key -> text.
fn body_fields(body: &str) -> Result<HashMap<String, String>, EngineError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation("empty request body".to_string()));
    }

    if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|err| EngineError::Validation(format!("invalid json: {err}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| EngineError::Validation("body must be a json object".to_string()))?;
        let mut fields = HashMap::new();
        for (key, entry) in object {
            let text = match entry {
                serde_json::Value::Number(number) => number.to_string(),
                serde_json::Value::String(text) => text.clone(),
                serde_json::Value::Null => continue,
                other => {
                    return Err(EngineError::Validation(format!(
                        "{key} must be numeric, got {other}"
                    )))
                }
            };
            fields.insert(key.clone(), text);
        }
        return Ok(fields);
    }

    // Form-encoded fallback: key=value pairs joined by '&'.
    let mut fields = HashMap::new();
    for pair in trimmed.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(fields)
}

fn required_int(fields: &HashMap<String, String>, key: &str) -> Result<u64, EngineError> {
    match fields.get(key) {
        Some(raw) => coerce_positive_int(key, raw),
        None => Err(EngineError::Validation(format!("{key} is required"))),
    }
}

fn optional_int(fields: &HashMap<String, String>, key: &str) -> Result<Option<u64>, EngineError> {
    match fields.get(key) {
        Some(raw) if !raw.is_empty() => coerce_positive_int(key, raw).map(Some),
        _ => Ok(None),
    }
}

/// Coerce request text to a finite positive integer.
fn coerce_positive_int(key: &str, raw: &str) -> Result<u64, EngineError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| EngineError::Validation(format!("{key} must be a number, got {raw:?}")))?;
    if !value.is_finite() {
        return Err(EngineError::Validation(format!("{key} must be finite")));
    }
    if value <= 0.0 {
        return Err(EngineError::Validation(format!("{key} must be positive")));
    }
    if value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(EngineError::Validation(format!(
            "{key} must be a positive integer, got {raw:?}"
        )));
    }
    Ok(value as u64)
}
