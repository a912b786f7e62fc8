//! Admin content procedures. Every handler takes [`AdminUser`] first, so the
//! session and role are checked before any input is read.

use async_trait::async_trait;
use axum::extract::State;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{ok, Rpc, RpcInput, Success, SUCCESS};
use crate::auth::AdminUser;
use crate::db::models::{
    self, AppUser, Experience, ExperiencePatch, NewEducation, NewExperience, NewProject,
    NewSkillCategory, Profile, ProfilePatch, Project, ProjectPatch, SkillCategory,
    SkillCategoryPatch, SortedTable, TileSize,
};
use crate::db::{PortfolioStore, StoreResult};
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::{positive_id, IdInput, ReorderInput, Validate};

/// A reorderable content table and its store operations.
#[async_trait]
pub trait ContentTable: Send + Sync + 'static {
    const TABLE: SortedTable;
    type Row: Serialize + Send;
    type New: DeserializeOwned + Validate + Send;
    type Patch: DeserializeOwned + Validate + Send;

    async fn list(store: &dyn PortfolioStore) -> StoreResult<Vec<Self::Row>>;
    async fn create(store: &dyn PortfolioStore, new: Self::New) -> StoreResult<Self::Row>;
    async fn update(
        store: &dyn PortfolioStore,
        id: i32,
        patch: Self::Patch,
    ) -> StoreResult<Option<Self::Row>>;
}

pub struct Projects;
pub struct Experiences;
pub struct SkillCategories;
pub struct EducationEntries;

#[async_trait]
impl ContentTable for Projects {
    const TABLE: SortedTable = SortedTable::Projects;
    type Row = Project;
    type New = NewProject;
    type Patch = ProjectPatch;

    async fn list(store: &dyn PortfolioStore) -> StoreResult<Vec<Project>> {
        store.list_projects().await
    }
    async fn create(store: &dyn PortfolioStore, new: NewProject) -> StoreResult<Project> {
        store.create_project(new).await
    }
    async fn update(
        store: &dyn PortfolioStore,
        id: i32,
        patch: ProjectPatch,
    ) -> StoreResult<Option<Project>> {
        store.update_project(id, patch).await
    }
}

#[async_trait]
impl ContentTable for Experiences {
    const TABLE: SortedTable = SortedTable::Experiences;
    type Row = Experience;
    type New = NewExperience;
    type Patch = ExperiencePatch;

    async fn list(store: &dyn PortfolioStore) -> StoreResult<Vec<Experience>> {
        store.list_experiences().await
    }
    async fn create(store: &dyn PortfolioStore, new: NewExperience) -> StoreResult<Experience> {
        store.create_experience(new).await
    }
    async fn update(
        store: &dyn PortfolioStore,
        id: i32,
        patch: ExperiencePatch,
    ) -> StoreResult<Option<Experience>> {
        store.update_experience(id, patch).await
    }
}

#[async_trait]
impl ContentTable for SkillCategories {
    const TABLE: SortedTable = SortedTable::SkillCategories;
    type Row = SkillCategory;
    type New = NewSkillCategory;
    type Patch = SkillCategoryPatch;

    async fn list(store: &dyn PortfolioStore) -> StoreResult<Vec<SkillCategory>> {
        store.list_skill_categories().await
    }
    async fn create(
        store: &dyn PortfolioStore,
        new: NewSkillCategory,
    ) -> StoreResult<SkillCategory> {
        store.create_skill_category(new).await
    }
    async fn update(
        store: &dyn PortfolioStore,
        id: i32,
        patch: SkillCategoryPatch,
    ) -> StoreResult<Option<SkillCategory>> {
        store.update_skill_category(id, patch).await
    }
}

#[async_trait]
impl ContentTable for EducationEntries {
    const TABLE: SortedTable = SortedTable::Education;
    type Row = models::Education;
    type New = NewEducation;
    type Patch = models::EducationPatch;

    async fn list(store: &dyn PortfolioStore) -> StoreResult<Vec<models::Education>> {
        store.list_education().await
    }
    async fn create(store: &dyn PortfolioStore, new: NewEducation) -> StoreResult<models::Education> {
        store.create_education(new).await
    }
    async fn update(
        store: &dyn PortfolioStore,
        id: i32,
        patch: models::EducationPatch,
    ) -> StoreResult<Option<models::Education>> {
        store.update_education(id, patch).await
    }
}

/// `{id, ...fields}` for partial updates.
#[derive(Debug, Deserialize)]
pub struct UpdateInput<P> {
    pub id: i64,
    #[serde(flatten)]
    pub patch: P,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTileSizeInput {
    pub tile_size: TileSize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkTileSizeResult {
    pub success: bool,
    pub updated: u64,
}

fn audit(admin: &AppUser, action: &str, table: SortedTable, id: Option<i32>) {
    tracing::info!(
        target: "audit",
        admin = %admin.login,
        action,
        table = table.table_name(),
        id,
        "admin mutation"
    );
}

fn not_found(table: SortedTable) -> AppError {
    AppError::NotFound(format!("{} not found", table.entity()))
}

pub async fn get_profile(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Rpc<Option<Profile>>, AppError> {
    Ok(ok(state.store.get_profile().await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RpcInput(patch): RpcInput<ProfilePatch>,
) -> Result<Rpc<Profile>, AppError> {
    patch.validate()?;
    let profile = state.store.upsert_profile(patch).await?;
    tracing::info!(target: "audit", admin = %admin.login, action = "update", table = "profile", "admin mutation");
    Ok(ok(profile))
}

pub async fn list<C: ContentTable>(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Rpc<Vec<C::Row>>, AppError> {
    Ok(ok(C::list(state.store.as_ref()).await?))
}

pub async fn create<C: ContentTable>(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RpcInput(input): RpcInput<C::New>,
) -> Result<Rpc<C::Row>, AppError> {
    input.validate()?;
    let row = C::create(state.store.as_ref(), input).await?;
    audit(&admin, "create", C::TABLE, None);
    Ok(ok(row))
}

pub async fn update<C: ContentTable>(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RpcInput(input): RpcInput<UpdateInput<C::Patch>>,
) -> Result<Rpc<C::Row>, AppError> {
    let id = positive_id(input.id)?;
    input.patch.validate()?;
    let row = C::update(state.store.as_ref(), id, input.patch)
        .await?
        .ok_or_else(|| not_found(C::TABLE))?;
    audit(&admin, "update", C::TABLE, Some(id));
    Ok(ok(row))
}

pub async fn delete<C: ContentTable>(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RpcInput(input): RpcInput<IdInput>,
) -> Result<Rpc<Success>, AppError> {
    let id = positive_id(input.id)?;
    if !state.store.delete(C::TABLE, id).await? {
        return Err(not_found(C::TABLE));
    }
    audit(&admin, "delete", C::TABLE, Some(id));
    Ok(ok(SUCCESS))
}

/// All-or-nothing: an unknown id fails the whole batch with 404.
pub async fn reorder<C: ContentTable>(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RpcInput(input): RpcInput<ReorderInput>,
) -> Result<Rpc<Success>, AppError> {
    let updates = input.into_updates()?;
    match state.store.reorder(C::TABLE, &updates).await {
        Ok(()) => {}
        Err(sqlx::Error::RowNotFound) => return Err(not_found(C::TABLE)),
        Err(e) => return Err(e.into()),
    }
    tracing::info!(
        target: "audit",
        admin = %admin.login,
        action = "reorder",
        table = C::TABLE.table_name(),
        count = updates.len(),
        "admin mutation"
    );
    Ok(ok(SUCCESS))
}

pub async fn bulk_tile_size(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RpcInput(input): RpcInput<BulkTileSizeInput>,
) -> Result<Rpc<BulkTileSizeResult>, AppError> {
    let updated = state.store.set_all_tile_sizes(input.tile_size).await?;
    tracing::info!(
        target: "audit",
        admin = %admin.login,
        action = "bulkTileSize",
        tile_size = input.tile_size.as_str(),
        updated,
        "admin mutation"
    );
    Ok(ok(BulkTileSizeResult {
        success: true,
        updated,
    }))
}
