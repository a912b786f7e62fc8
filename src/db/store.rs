use async_trait::async_trait;

use super::models::*;
use crate::theme::ThemeSettings;

pub type StoreResult<T> = Result<T, sqlx::Error>;

/// Persistence seam for every handler. `PgStore` is the production
/// implementation; `MemoryStore` backs database-less runs and tests.
///
/// Reorder batches are all-or-nothing: if any id is unknown, no row changes
/// and `sqlx::Error::RowNotFound` is returned.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn get_profile(&self) -> StoreResult<Option<Profile>>;
    async fn upsert_profile(&self, patch: ProfilePatch) -> StoreResult<Profile>;

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;
    async fn update_project(&self, id: i32, patch: ProjectPatch) -> StoreResult<Option<Project>>;
    /// Returns the number of projects changed.
    async fn set_all_tile_sizes(&self, size: TileSize) -> StoreResult<u64>;

    async fn list_experiences(&self) -> StoreResult<Vec<Experience>>;
    async fn create_experience(&self, new: NewExperience) -> StoreResult<Experience>;
    async fn update_experience(
        &self,
        id: i32,
        patch: ExperiencePatch,
    ) -> StoreResult<Option<Experience>>;

    async fn list_skill_categories(&self) -> StoreResult<Vec<SkillCategory>>;
    async fn create_skill_category(&self, new: NewSkillCategory) -> StoreResult<SkillCategory>;
    async fn update_skill_category(
        &self,
        id: i32,
        patch: SkillCategoryPatch,
    ) -> StoreResult<Option<SkillCategory>>;

    async fn list_education(&self) -> StoreResult<Vec<Education>>;
    async fn create_education(&self, new: NewEducation) -> StoreResult<Education>;
    async fn update_education(
        &self,
        id: i32,
        patch: EducationPatch,
    ) -> StoreResult<Option<Education>>;

    /// `false` when no row had that id.
    async fn delete(&self, table: SortedTable, id: i32) -> StoreResult<bool>;
    async fn reorder(&self, table: SortedTable, items: &[SortUpdate]) -> StoreResult<()>;

    /// Stored theme, or defaults when none has been saved.
    async fn get_theme(&self) -> StoreResult<ThemeSettings>;
    async fn save_theme(&self, theme: &ThemeSettings) -> StoreResult<ThemeSettings>;

    async fn find_user_by_github_id(&self, github_id: &str) -> StoreResult<Option<AppUser>>;
    /// Insert or refresh a user after login. An existing role is never changed.
    async fn upsert_github_user(&self, profile: &GithubProfile) -> StoreResult<AppUser>;
    async fn promote_to_admin(&self, user_id: i32) -> StoreResult<AppUser>;
    async fn record_audit_event(
        &self,
        actor_github_id: &str,
        action: &str,
        detail: &str,
    ) -> StoreResult<()>;

    async fn track_event(&self, event: NewAnalyticsEvent) -> StoreResult<()>;
    async fn analytics_summary(&self) -> StoreResult<Vec<ProjectAnalyticsSummary>>;
    async fn analytics_for_project(&self, project_id: i32) -> StoreResult<ProjectAnalyticsDetail>;

    async fn ping(&self) -> StoreResult<()>;

    async fn snapshot(&self) -> StoreResult<PortfolioSnapshot> {
        Ok(PortfolioSnapshot {
            profile: self.get_profile().await?,
            projects: self.list_projects().await?,
            experiences: self.list_experiences().await?,
            skills: self.list_skill_categories().await?,
            education: self.list_education().await?,
        })
    }
}
