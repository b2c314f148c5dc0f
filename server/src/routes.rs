use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use nexus_stats::calendar::{cell_views, CellView, WEEKDAYS};
use nexus_stats::surface::{Color, DrawingSurface, Point, TextAlign, TextBaseline, TextStyle};
use nexus_stats::{
    render_overview_cards, render_trend, week_of, DateRange, QuickSelect, StatsOverview,
    SvgSurface,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::ApiClient;
use crate::bitmap::render_svg_to_png;
use crate::error::AppError;

const MAX_SIDE: f64 = 4096.0;
const MAX_PIXEL_RATIO: f64 = 4.0;

/// Chart size used when a request does not specify one.
#[derive(Debug, Clone, Copy)]
pub struct ChartDefaults {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            pixel_ratio: 1.0,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub defaults: ChartDefaults,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stats/trend.svg", get(trend_svg))
        .route("/stats/trend.png", get(trend_png))
        .route("/stats/overview", get(overview_json))
        .route("/stats/overview.svg", get(overview_svg))
        .route("/calendar", get(calendar))
        .route("/calendar/week", get(calendar_week))
        .route("/calendar/quick/:kind", get(calendar_quick))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub dpr: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ChartQuery {
    fn surface(&self, defaults: &ChartDefaults) -> Result<SvgSurface, AppError> {
        let width = self.width.unwrap_or(defaults.width);
        let height = self.height.unwrap_or(defaults.height);
        let ratio = self.dpr.unwrap_or(defaults.pixel_ratio);

        if !(width > 0.0 && width <= MAX_SIDE && height > 0.0 && height <= MAX_SIDE) {
            return Err(AppError::bad_request(format!(
                "width and height must be within 1..={}",
                MAX_SIDE
            )));
        }
        if !(ratio > 0.0 && ratio <= MAX_PIXEL_RATIO) {
            return Err(AppError::bad_request(format!(
                "dpr must be within (0, {}]",
                MAX_PIXEL_RATIO
            )));
        }
        if width * ratio > MAX_SIDE || height * ratio > MAX_SIDE {
            return Err(AppError::bad_request(format!(
                "width and height times dpr must be at most {}",
                MAX_SIDE
            )));
        }
        Ok(SvgSurface::new(width, height, ratio))
    }

    fn range(&self) -> Result<Option<DateRange>, AppError> {
        match (self.start_date, self.end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) if start <= end => Ok(Some(DateRange { start, end })),
            (Some(_), Some(_)) => Err(AppError::bad_request("start_date is after end_date")),
            _ => Err(AppError::bad_request(
                "start_date and end_date must be given together",
            )),
        }
    }
}

/// Fetch the series and draw it. An empty series gets a centred notice
/// instead of a chart.
pub async fn build_trend_svg(
    api: &ApiClient,
    defaults: &ChartDefaults,
    query: &ChartQuery,
) -> Result<String, AppError> {
    let mut surface = query.surface(defaults)?;
    let stats = api.fetch_stats(query.range()?).await?;
    let trend = stats.trend.unwrap_or_default();
    info!(points = trend.len(), "rendering trend chart");

    if trend.is_empty() {
        draw_notice(&mut surface, "No trend data");
    } else {
        render_trend(&trend, &mut surface);
    }
    Ok(surface.to_svg())
}

fn draw_notice(surface: &mut SvgSurface, text: &str) {
    let size = nexus_stats::surface::prepare(surface);
    surface.fill_text(
        text,
        Point::new(size.width / 2.0, size.height / 2.0),
        &TextStyle::new(Color::MUTED, 14.0)
            .align(TextAlign::Center)
            .baseline(TextBaseline::Middle),
    );
}

async fn trend_svg(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let svg = build_trend_svg(&state.api, &state.defaults, &query).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

async fn trend_png(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let svg = build_trend_svg(&state.api, &state.defaults, &query).await?;
    let png = render_svg_to_png(&svg)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

async fn overview_json(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsOverview>, AppError> {
    let stats = state.api.fetch_stats(None).await?;
    Ok(Json(stats.overview.unwrap_or_default()))
}

async fn overview_svg(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let defaults = ChartDefaults {
        height: 220.0,
        ..state.defaults
    };
    let mut surface = query.surface(&defaults)?;
    let stats = state.api.fetch_stats(None).await?;
    render_overview_cards(&stats.overview.unwrap_or_default(), &mut surface);
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], surface.to_svg()))
}

// ============================================================================
// Calendar
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// `YYYY-MM`; defaults to the current month.
    pub month: Option<String>,
    pub selected: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CalendarView {
    pub title: String,
    pub weekdays: [&'static str; 7],
    pub cells: Vec<CellView>,
}

fn parse_month(month: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("invalid month '{}', expected YYYY-MM", month)))
}

pub fn calendar_view(
    cursor: NaiveDate,
    selected: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<CalendarView, AppError> {
    let cells = cell_views(cursor, selected, today)
        .ok_or_else(|| out_of_range(&cursor.format("%Y-%m").to_string()))?;
    Ok(CalendarView {
        title: cursor.format("%B %Y").to_string(),
        weekdays: WEEKDAYS,
        cells,
    })
}

fn out_of_range(what: &str) -> AppError {
    AppError::bad_request(format!("{} is outside the supported calendar range", what))
}

async fn calendar(Query(query): Query<CalendarQuery>) -> Result<Json<CalendarView>, AppError> {
    let today = Local::now().date_naive();
    let cursor = match query.month.as_deref() {
        Some(month) => parse_month(month)?,
        None => today,
    };
    Ok(Json(calendar_view(cursor, query.selected, today)?))
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub date: NaiveDate,
}

async fn calendar_week(Query(query): Query<WeekQuery>) -> Result<Json<DateRange>, AppError> {
    week_of(query.date)
        .map(Json)
        .ok_or_else(|| out_of_range(&query.date.to_string()))
}

async fn calendar_quick(Path(kind): Path<String>) -> Result<Json<DateRange>, AppError> {
    let kind: QuickSelect = kind.parse().map_err(AppError::not_found)?;
    let today = Local::now().date_naive();
    kind.range_at(today)
        .map(Json)
        .ok_or_else(|| out_of_range(&today.to_string()))
}
