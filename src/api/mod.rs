use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, warn};

use crate::analytics::params;
use crate::analytics::probability::{FollowupParams, InjuryFollowup};
use crate::analytics::views::{self, *};
use crate::analytics::weather::WeatherCondition;
use crate::analytics::AnalyticsError;
use crate::auth::{self, Account, AuthError, Credentials, Pbkdf2Hasher};
use crate::db::{Database, DatasetAccessor};

/// Condition used by the follow-up probability when none is requested.
const DEFAULT_FOLLOWUP_CONDITION: WeatherCondition = WeatherCondition::Foggy;

#[derive(Clone)]
pub struct AppState {
    /// Source for every analytical view
    pub dataset: Arc<dyn DatasetAccessor>,
    /// Account store
    pub db: Database,
    pub hasher: Pbkdf2Hasher,
    /// `W` for `/injury_probability/:season`
    pub default_window: u32,
}

/// Build the Axum router for the analytics API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/average_stats/:weather_condition", get(average_stats_handler))
        .route("/top_players/:num", get(top_players_handler))
        .route(
            "/adverse_weather_performance/:wind_speed/:limit",
            get(adverse_weather_performance_handler),
        )
        .route("/adverse_weather_team_comp/:teams", get(team_comp_handler))
        .route("/cold_weather_qbs/:min_games", get(cold_weather_qbs_handler))
        .route("/goal_line_backs/:min_tds/:min_games", get(goal_line_backs_handler))
        .route("/consistent_scorers/:position", get(consistent_scorers_handler))
        .route("/injury_resilience", get(injury_resilience_handler))
        .route("/injury_resilience/:position", get(injury_resilience_position_handler))
        .route("/player_performance_tiers/:position", get(tiers_handler))
        .route("/injury_followup_probability/:window", get(followup_handler))
        .route("/injury_probability/:season", get(injury_probability_handler))
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Analytics(AnalyticsError::InvalidParameter { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::UserExists) => StatusCode::CONFLICT,
            ApiError::Auth(
                AuthError::EmptyUsername
                | AuthError::EmptyPassword
                | AuthError::UnknownUser
                | AuthError::InvalidPassword,
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Analytics(AnalyticsError::DataAccess(e)) => {
                error!("Query failed: {:#}", e);
                "Query failure".to_string()
            }
            ApiError::Auth(AuthError::Storage(e)) | ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                "Internal error".to_string()
            }
            ApiError::Auth(AuthError::MalformedCredential) => {
                error!("Stored credential could not be parsed");
                "Internal error".to_string()
            }
            other => {
                debug!("Rejected request: {}", other);
                other.to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn rows<T>(view: &str, rows: Vec<T>) -> ApiResult<Vec<T>> {
    debug!("{} returned {} row(s)", view, rows.len());
    Ok(Json(rows))
}

// ── Query strings ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SeasonQuery {
    pub season: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PositionQuery {
    pub position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TierQuery {
    pub season_floor: Option<String>,
    pub min_players: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowupQuery {
    pub season: Option<String>,
    pub min_seasons: Option<String>,
    pub condition: Option<String>,
}

fn optional_season(raw: Option<&str>) -> Result<Option<i32>, AnalyticsError> {
    params::optional_str(raw)
        .map(|s| params::season("season", &s))
        .transpose()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    dataset: String,
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(Health {
        status: "ok",
        dataset: state.dataset.name().to_string(),
    })
}

/// GET /average_stats/:weather_condition?season=2021
async fn average_stats_handler(
    State(state): State<Arc<AppState>>,
    Path(condition): Path<String>,
    Query(q): Query<SeasonQuery>,
) -> ApiResult<Vec<WeatherAverageRow>> {
    let condition = params::weather_condition_filter("weather_condition", &condition)?;
    let season = optional_season(q.season.as_deref())?;
    let out = views::weather_conditioned_average(state.dataset.as_ref(), condition, season).await?;
    rows("average_stats", out)
}

/// GET /top_players/:num
async fn top_players_handler(
    State(state): State<Arc<AppState>>,
    Path(num): Path<String>,
) -> ApiResult<Vec<FantasyTotalRow>> {
    let num = params::positive_int("num", &num)?;
    let out = views::ranked_fantasy_totals(state.dataset.as_ref(), num).await?;
    rows("top_players", out)
}

/// GET /adverse_weather_performance/:wind_speed/:limit
async fn adverse_weather_performance_handler(
    State(state): State<Arc<AppState>>,
    Path((wind_speed, limit)): Path<(String, String)>,
) -> ApiResult<Vec<WindDeltaRow>> {
    let wind_speed = params::number("wind_speed", &wind_speed)?;
    let limit = params::positive_int("limit", &limit)?;
    let out = views::adverse_weather_delta(state.dataset.as_ref(), wind_speed, limit).await?;
    rows("adverse_weather_performance", out)
}

/// GET /adverse_weather_team_comp/:teams (comma-separated codes)
async fn team_comp_handler(
    State(state): State<Arc<AppState>>,
    Path(teams): Path<String>,
) -> ApiResult<Vec<TeamComparisonRow>> {
    let teams = params::team_codes("teams", &teams)?;
    let out = views::team_weather_comparison(state.dataset.as_ref(), &teams).await?;
    rows("adverse_weather_team_comp", out)
}

/// GET /cold_weather_qbs/:min_games
async fn cold_weather_qbs_handler(
    State(state): State<Arc<AppState>>,
    Path(min_games): Path<String>,
) -> ApiResult<Vec<ColdQuarterbackRow>> {
    let min_games = params::positive_int("min_games", &min_games)?;
    let out = views::cold_weather_quarterbacks(state.dataset.as_ref(), min_games).await?;
    rows("cold_weather_qbs", out)
}

/// GET /goal_line_backs/:min_tds/:min_games
async fn goal_line_backs_handler(
    State(state): State<Arc<AppState>>,
    Path((min_tds, min_games)): Path<(String, String)>,
) -> ApiResult<Vec<GoalLineBackRow>> {
    let min_tds = params::non_negative_int("min_tds", &min_tds)?;
    let min_games = params::positive_int("min_games", &min_games)?;
    let out = views::goal_line_backs(state.dataset.as_ref(), min_tds, min_games).await?;
    rows("goal_line_backs", out)
}

/// GET /consistent_scorers/:position
async fn consistent_scorers_handler(
    State(state): State<Arc<AppState>>,
    Path(position): Path<String>,
) -> ApiResult<Vec<ConsistentScorerRow>> {
    let position = params::required_str("position", &position)?;
    let out = views::consistent_scorers(state.dataset.as_ref(), &position).await?;
    rows("consistent_scorers", out)
}

/// GET /injury_resilience?position=RB
async fn injury_resilience_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PositionQuery>,
) -> ApiResult<Vec<InjuryResilienceRow>> {
    let position = params::optional_str(q.position.as_deref());
    let out = views::injury_resilience(state.dataset.as_ref(), position.as_deref()).await?;
    rows("injury_resilience", out)
}

/// GET /injury_resilience/:position
async fn injury_resilience_position_handler(
    State(state): State<Arc<AppState>>,
    Path(position): Path<String>,
) -> ApiResult<Vec<InjuryResilienceRow>> {
    let position = params::required_str("position", &position)?;
    let out = views::injury_resilience(state.dataset.as_ref(), Some(&position)).await?;
    rows("injury_resilience", out)
}

/// GET /player_performance_tiers/:position?season_floor=2018&min_players=1
async fn tiers_handler(
    State(state): State<Arc<AppState>>,
    Path(position): Path<String>,
    Query(q): Query<TierQuery>,
) -> ApiResult<Vec<TierRow>> {
    let position = params::required_str("position", &position)?;
    let season_floor = match params::optional_str(q.season_floor.as_deref()) {
        Some(raw) => params::season("season_floor", &raw)?,
        None => DEFAULT_SEASON_FLOOR,
    };
    let min_players = match params::optional_str(q.min_players.as_deref()) {
        Some(raw) => params::positive_int("min_players", &raw)?,
        None => DEFAULT_MIN_TIER_PLAYERS,
    };
    let out =
        views::performance_tiers(state.dataset.as_ref(), &position, season_floor, min_players)
            .await?;
    rows("player_performance_tiers", out)
}

/// GET /injury_followup_probability/:window?season=&min_seasons=&condition=
async fn followup_handler(
    State(state): State<Arc<AppState>>,
    Path(window): Path<String>,
    Query(q): Query<FollowupQuery>,
) -> ApiResult<Vec<InjuryFollowup>> {
    let half_width = params::non_negative_int("window", &window)?;
    let season = optional_season(q.season.as_deref())?;
    let min_seasons = match params::optional_str(q.min_seasons.as_deref()) {
        Some(raw) => params::positive_int("min_seasons", &raw)?,
        None => 1,
    };
    let condition = match params::optional_str(q.condition.as_deref()) {
        Some(raw) => params::weather_condition("condition", &raw)?,
        None => DEFAULT_FOLLOWUP_CONDITION,
    };
    let followup = FollowupParams {
        half_width,
        season,
        min_seasons,
    };
    let out = views::injury_followup_probability(state.dataset.as_ref(), followup, condition).await?;
    rows("injury_followup_probability", out)
}

/// GET /injury_probability/:season
async fn injury_probability_handler(
    State(state): State<Arc<AppState>>,
    Path(season): Path<String>,
) -> ApiResult<Vec<InjuryFollowup>> {
    let season = params::season("season", &season)?;
    let followup = FollowupParams {
        half_width: state.default_window,
        season: Some(season),
        min_seasons: 1,
    };
    let out = views::injury_followup_probability(
        state.dataset.as_ref(),
        followup,
        DEFAULT_FOLLOWUP_CONDITION,
    )
    .await?;
    rows("injury_probability", out)
}

/// POST /register {"username": "...", "password": "..."}
async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(creds): Json<Credentials>,
) -> ApiResult<Account> {
    let result =
        tokio::task::spawn_blocking(move || auth::register(&state.db, &state.hasher, &creds))
            .await
            .map_err(anyhow::Error::from)?;
    Ok(Json(result?))
}

/// POST /login {"username": "...", "password": "..."}
async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(creds): Json<Credentials>,
) -> ApiResult<Account> {
    let username = creds.username.clone();
    let result = tokio::task::spawn_blocking(move || auth::login(&state.db, &state.hasher, &creds))
        .await
        .map_err(anyhow::Error::from)?;
    if let Err(AuthError::InvalidPassword) = &result {
        warn!("Failed login for {}", username);
    }
    Ok(Json(result?))
}
