//! Handlers for listing and running scripts, statistics, and the feed.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use scripthost_core::error::CoreError;
use scripthost_core::external::ExternalContext;
use scripthost_core::profile::ActiveProfiles;
use scripthost_core::stats::StatsSnapshot;
use scripthost_engine::RunReport;
use scripthost_events::FeedItem;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Statistics window plus the profiles switched on so far.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub window: StatsSnapshot,
    pub profiles: ActiveProfiles,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/scripts
pub async fn list_scripts(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let names = state.supervisor.library().list().await?;
    Ok(Json(DataResponse { data: names }))
}

/// POST /api/v1/scripts/{filename}/run
///
/// The optional JSON body is an external context merged over the script's
/// baseline bindings. Failed and timed-out runs are still `200`: the report
/// carries the status. Only an unknown script is a `404`.
pub async fn run_script(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    body: Bytes,
) -> AppResult<Json<DataResponse<RunReport>>> {
    let external = parse_external(&body)?;

    let report = state.supervisor.run_report(&filename, external).await;
    if report.is_not_found() {
        return Err(CoreError::NotFound {
            entity: "script",
            key: filename,
        }
        .into());
    }

    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<DataResponse<StatsResponse>> {
    let window = state.supervisor.stats().await;
    Json(DataResponse {
        data: StatsResponse {
            window,
            profiles: state.supervisor.active_profiles(),
        },
    })
}

/// GET /api/v1/feed
pub async fn list_feed(State(state): State<AppState>) -> Json<DataResponse<Vec<FeedItem>>> {
    Json(DataResponse {
        data: state.feed.recent(),
    })
}

fn parse_external(body: &[u8]) -> AppResult<Option<ExternalContext>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("Invalid external context: {e}")))
}
