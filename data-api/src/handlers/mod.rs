use crate::analysis::{change_ratio, holding_end_value, AnalysisMode};
use crate::error::{ApiError, Result};
use crate::models::{OverviewQuery, OverviewResponse, OverviewRow, SeriesResponse};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use ohlc_feed::Interval;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_INVESTMENT: f64 = 1000.0;
const DEFAULT_FEE_PERCENT: f64 = 0.25;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn get_symbols(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.config.feed.symbols.clone())
}

/// Intervals the feed collects, in configured order.
pub async fn get_intervals(State(state): State<Arc<AppState>>) -> Json<Vec<Interval>> {
    Json(state.config.feed.intervals.clone())
}

pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path((symbol, interval)): Path<(String, String)>,
) -> Result<Json<SeriesResponse>> {
    let interval = parse_interval(&state, &interval)?;
    let symbol = state
        .config
        .feed
        .find_symbol(&symbol)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown symbol {}", symbol)))?
        .to_string();

    let path = state.store.path_for(&symbol, interval);
    let data = state
        .store
        .load(&path)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No data for {} ({}m)", symbol, interval)))?;

    debug!("Serving {} points for {} ({}m)", data.len(), symbol, interval);
    Ok(Json(SeriesResponse {
        symbol,
        interval,
        data,
    }))
}

pub async fn get_overview(
    State(state): State<Arc<AppState>>,
    Path((mode, interval)): Path<(String, String)>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<OverviewResponse>> {
    let mode: AnalysisMode = mode.parse().map_err(ApiError::Validation)?;
    let interval = parse_interval(&state, &interval)?;
    if !mode.is_implemented() {
        return Err(ApiError::NotImplemented(format!("{} analysis", mode)));
    }

    let investment = query.investment.unwrap_or(DEFAULT_INVESTMENT);
    let fee = query.fee.unwrap_or(DEFAULT_FEE_PERCENT);
    if !investment.is_finite() || investment <= 0.0 {
        return Err(ApiError::Validation("investment must be positive".to_string()));
    }
    if !(0.0..100.0).contains(&fee) {
        return Err(ApiError::Validation("fee must be between 0 and 100".to_string()));
    }

    let mut rows = Vec::with_capacity(state.config.feed.symbols.len());
    for symbol in &state.config.feed.symbols {
        let path = state.store.path_for(symbol, interval);
        let end_value = state
            .store
            .load(&path)
            .await?
            .and_then(|series| holding_end_value(&series, investment, fee));
        rows.push(OverviewRow {
            symbol: symbol.clone(),
            end_value,
            change: end_value.and_then(|value| change_ratio(value, investment)),
        });
    }

    info!(
        "Computed {} overview for {} symbols ({}m, investment {}, fee {}%)",
        mode,
        rows.len(),
        interval,
        investment,
        fee
    );
    Ok(Json(OverviewResponse {
        mode: mode.to_string(),
        interval,
        investment,
        fee,
        rows,
    }))
}

/// Only intervals the feed actually collects are servable.
fn parse_interval(state: &AppState, raw: &str) -> Result<Interval> {
    raw.parse::<u32>()
        .ok()
        .and_then(|minutes| state.config.feed.find_interval(minutes))
        .ok_or_else(|| {
            let supported: Vec<String> = state
                .config
                .feed
                .intervals
                .iter()
                .map(ToString::to_string)
                .collect();
            ApiError::Validation(format!(
                "Unsupported interval {}, expected one of {}",
                raw,
                supported.join(", ")
            ))
        })
}
