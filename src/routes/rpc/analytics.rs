use axum::{
    extract::State,
    http::{header, HeaderMap},
};
use serde::{Deserialize, Serialize};

use super::{ok, Rpc, RpcInput, RpcQuery};
use crate::auth::AdminUser;
use crate::db::models::{EventType, NewAnalyticsEvent, ProjectAnalyticsDetail, ProjectAnalyticsSummary};
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::{self, positive_id, MAX_URL_LEN};

const MAX_USER_AGENT_LEN: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInput {
    pub project_id: i64,
    pub event_type: EventType,
    pub referrer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Tracked {
    pub tracked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailInput {
    pub project_id: i64,
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// analytics.track - public. Malformed input is a 400; a storage failure is
/// logged and reported as `tracked: false`.
pub async fn track(
    State(state): State<AppState>,
    headers: HeaderMap,
    RpcInput(input): RpcInput<TrackInput>,
) -> Result<Rpc<Tracked>, AppError> {
    let project_id = positive_id(input.project_id)?;
    if let Some(referrer) = &input.referrer {
        validation::text("referrer", referrer, MAX_URL_LEN)?;
    }
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| truncate(ua, MAX_USER_AGENT_LEN));

    let event = NewAnalyticsEvent {
        project_id,
        event_type: input.event_type,
        referrer: input.referrer.filter(|r| !r.is_empty()),
        user_agent,
    };

    let tracked = match state.store.track_event(event).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(project_id, error = %e, "failed to record analytics event");
            false
        }
    };
    Ok(ok(Tracked { tracked }))
}

/// analytics.summary - per-project click and view totals.
pub async fn summary(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Rpc<Vec<ProjectAnalyticsSummary>>, AppError> {
    Ok(ok(state.store.analytics_summary().await?))
}

/// analytics.detail?projectId=<id>
pub async fn detail(
    State(state): State<AppState>,
    _admin: AdminUser,
    RpcQuery(input): RpcQuery<DetailInput>,
) -> Result<Rpc<ProjectAnalyticsDetail>, AppError> {
    let project_id = positive_id(input.project_id)?;
    Ok(ok(state.store.analytics_for_project(project_id).await?))
}
