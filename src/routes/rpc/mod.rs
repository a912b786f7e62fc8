/**
 * RPC Routes
 * Namespaced procedures under /api/trpc/<namespace>.<procedure>.
 * Queries are GET with input in the query string; mutations are POST with a
 * JSON body. Successful responses are wrapped as {"result": {"data": ...}}.
 */
pub mod admin;
pub mod analytics;
pub mod public;
pub mod system;
pub mod theme;

use axum::{
    extract::{FromRequest, FromRequestParts, Query},
    http::request::Parts,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;
use admin::{EducationEntries, Experiences, Projects, SkillCategories};

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResult<T> {
    pub data: T,
}

/// Successful procedure response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Rpc<T> {
    pub result: RpcResult<T>,
}

pub fn ok<T>(data: T) -> Rpc<T> {
    Rpc {
        result: RpcResult { data },
    }
}

impl<T: Serialize> IntoResponse for Rpc<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Success {
    pub success: bool,
}

pub const SUCCESS: Success = Success { success: true };

/// JSON mutation input; malformed bodies become validation errors.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct RpcInput<T>(pub T);

/// Query input, either as `?input=<json>` or as plain query parameters.
pub struct RpcQuery<T>(pub T);

#[derive(Deserialize)]
struct EncodedInput {
    input: String,
}

impl<T, S> FromRequestParts<S> for RpcQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Ok(Query(EncodedInput { input })) =
            Query::<EncodedInput>::from_request_parts(parts, state).await
        {
            return serde_json::from_str(&input)
                .map(RpcQuery)
                .map_err(|e| AppError::validation(format!("Invalid input: {e}")));
        }
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(RpcQuery(value))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        // public
        .route("/portfolio.getAll", get(public::get_all))
        .route("/auth.me", get(public::me))
        .route("/auth.logout", post(public::logout))
        .route("/theme.get", get(theme::get))
        .route("/theme.layout", get(theme::layout))
        .route("/analytics.track", post(analytics::track))
        // admin
        .route("/theme.update", post(theme::update))
        .route("/theme.reset", post(theme::reset))
        .route("/adminProfile.get", get(admin::get_profile))
        .route("/adminProfile.update", post(admin::update_profile))
        .route("/adminProjects.list", get(admin::list::<Projects>))
        .route("/adminProjects.create", post(admin::create::<Projects>))
        .route("/adminProjects.update", post(admin::update::<Projects>))
        .route("/adminProjects.delete", post(admin::delete::<Projects>))
        .route("/adminProjects.reorder", post(admin::reorder::<Projects>))
        .route("/adminProjects.bulkTileSize", post(admin::bulk_tile_size))
        .route("/adminExperiences.list", get(admin::list::<Experiences>))
        .route("/adminExperiences.create", post(admin::create::<Experiences>))
        .route("/adminExperiences.update", post(admin::update::<Experiences>))
        .route("/adminExperiences.delete", post(admin::delete::<Experiences>))
        .route("/adminExperiences.reorder", post(admin::reorder::<Experiences>))
        .route("/adminSkills.list", get(admin::list::<SkillCategories>))
        .route("/adminSkills.create", post(admin::create::<SkillCategories>))
        .route("/adminSkills.update", post(admin::update::<SkillCategories>))
        .route("/adminSkills.delete", post(admin::delete::<SkillCategories>))
        .route("/adminSkills.reorder", post(admin::reorder::<SkillCategories>))
        .route("/adminEducation.list", get(admin::list::<EducationEntries>))
        .route("/adminEducation.create", post(admin::create::<EducationEntries>))
        .route("/adminEducation.update", post(admin::update::<EducationEntries>))
        .route("/adminEducation.delete", post(admin::delete::<EducationEntries>))
        .route("/adminEducation.reorder", post(admin::reorder::<EducationEntries>))
        .route("/analytics.summary", get(analytics::summary))
        .route("/analytics.detail", get(analytics::detail))
        .route("/system.notifyOwner", post(system::notify_owner))
}
