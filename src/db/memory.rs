//! Process-local store used when `DATABASE_URL` is unset and by tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;

use super::models::*;
use super::store::{PortfolioStore, StoreResult};
use crate::theme::ThemeSettings;

#[derive(Default)]
struct Inner {
    profile: Option<Profile>,
    projects: Vec<Project>,
    experiences: Vec<Experience>,
    skills: Vec<SkillCategory>,
    education: Vec<Education>,
    theme: Option<ThemeSettings>,
    users: Vec<AppUser>,
    audit: Vec<AuditEntry>,
    events: VecDeque<AnalyticsEvent>,
    next_id: i32,
    next_event_id: i64,
}

/// Oldest analytics events are dropped past this many.
pub const MAX_MEMORY_EVENTS: usize = 50_000;

impl Inner {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn push_user(&mut self, profile: &GithubProfile, role: Role) -> AppUser {
        let now = Utc::now();
        let user = AppUser {
            id: self.allocate_id(),
            github_id: profile.github_id.clone(),
            login: profile.login.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            avatar_url: profile.avatar_url.clone(),
            role,
            created_at: now,
            updated_at: now,
            last_signed_in: now,
        };
        self.users.push(user.clone());
        user
    }

    fn sort_orders(&mut self, table: SortedTable) -> Vec<(i32, &mut i32, &mut chrono::DateTime<Utc>)> {
        match table {
            SortedTable::Projects => self
                .projects
                .iter_mut()
                .map(|r| (r.id, &mut r.sort_order, &mut r.updated_at))
                .collect(),
            SortedTable::Experiences => self
                .experiences
                .iter_mut()
                .map(|r| (r.id, &mut r.sort_order, &mut r.updated_at))
                .collect(),
            SortedTable::SkillCategories => self
                .skills
                .iter_mut()
                .map(|r| (r.id, &mut r.sort_order, &mut r.updated_at))
                .collect(),
            SortedTable::Education => self
                .education
                .iter_mut()
                .map(|r| (r.id, &mut r.sort_order, &mut r.updated_at))
                .collect(),
        }
    }
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
    max_events: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            inner: RwLock::default(),
            max_events: MAX_MEMORY_EVENTS,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_capacity(max_events: usize) -> Self {
        Self {
            max_events,
            ..Self::default()
        }
    }

    /// Insert a user directly, bypassing the login flow.
    pub async fn insert_user(&self, profile: &GithubProfile, role: Role) -> AppUser {
        self.inner.write().await.push_user(profile, role)
    }

    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.inner.read().await.audit.clone()
    }
}

fn sorted<T: Clone>(rows: &[T], key: impl Fn(&T) -> (i32, i32)) -> Vec<T> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(|r| key(r));
    rows
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn get_profile(&self) -> StoreResult<Option<Profile>> {
        Ok(self.inner.read().await.profile.clone())
    }

    async fn upsert_profile(&self, patch: ProfilePatch) -> StoreResult<Profile> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let profile = inner.profile.get_or_insert_with(|| Profile::initial(now));
        profile.apply(patch);
        profile.updated_at = now;
        Ok(profile.clone())
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let inner = self.inner.read().await;
        Ok(sorted(&inner.projects, |p| (p.sort_order, p.id)))
    }

    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let mut inner = self.inner.write().await;
        let project = Project::create(inner.allocate_id(), new, Utc::now());
        inner.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: i32, patch: ProjectPatch) -> StoreResult<Option<Project>> {
        let mut inner = self.inner.write().await;
        Ok(inner.projects.iter_mut().find(|p| p.id == id).map(|p| {
            p.apply(patch);
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn set_all_tile_sizes(&self, size: TileSize) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        for project in inner.projects.iter_mut() {
            project.tile_size = size;
            project.updated_at = now;
        }
        Ok(inner.projects.len() as u64)
    }

    async fn list_experiences(&self) -> StoreResult<Vec<Experience>> {
        let inner = self.inner.read().await;
        Ok(sorted(&inner.experiences, |e| (e.sort_order, e.id)))
    }

    async fn create_experience(&self, new: NewExperience) -> StoreResult<Experience> {
        let mut inner = self.inner.write().await;
        let row = Experience::create(inner.allocate_id(), new, Utc::now());
        inner.experiences.push(row.clone());
        Ok(row)
    }

    async fn update_experience(
        &self,
        id: i32,
        patch: ExperiencePatch,
    ) -> StoreResult<Option<Experience>> {
        let mut inner = self.inner.write().await;
        Ok(inner.experiences.iter_mut().find(|e| e.id == id).map(|e| {
            e.apply(patch);
            e.updated_at = Utc::now();
            e.clone()
        }))
    }

    async fn list_skill_categories(&self) -> StoreResult<Vec<SkillCategory>> {
        let inner = self.inner.read().await;
        Ok(sorted(&inner.skills, |s| (s.sort_order, s.id)))
    }

    async fn create_skill_category(&self, new: NewSkillCategory) -> StoreResult<SkillCategory> {
        let mut inner = self.inner.write().await;
        let row = SkillCategory::create(inner.allocate_id(), new, Utc::now());
        inner.skills.push(row.clone());
        Ok(row)
    }

    async fn update_skill_category(
        &self,
        id: i32,
        patch: SkillCategoryPatch,
    ) -> StoreResult<Option<SkillCategory>> {
        let mut inner = self.inner.write().await;
        Ok(inner.skills.iter_mut().find(|s| s.id == id).map(|s| {
            s.apply(patch);
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn list_education(&self) -> StoreResult<Vec<Education>> {
        let inner = self.inner.read().await;
        Ok(sorted(&inner.education, |e| (e.sort_order, e.id)))
    }

    async fn create_education(&self, new: NewEducation) -> StoreResult<Education> {
        let mut inner = self.inner.write().await;
        let row = Education::create(inner.allocate_id(), new, Utc::now());
        inner.education.push(row.clone());
        Ok(row)
    }

    async fn update_education(
        &self,
        id: i32,
        patch: EducationPatch,
    ) -> StoreResult<Option<Education>> {
        let mut inner = self.inner.write().await;
        Ok(inner.education.iter_mut().find(|e| e.id == id).map(|e| {
            e.apply(patch);
            e.updated_at = Utc::now();
            e.clone()
        }))
    }

    async fn delete(&self, table: SortedTable, id: i32) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before_after = match table {
            SortedTable::Projects => {
                let before = inner.projects.len();
                inner.projects.retain(|r| r.id != id);
                (before, inner.projects.len())
            }
            SortedTable::Experiences => {
                let before = inner.experiences.len();
                inner.experiences.retain(|r| r.id != id);
                (before, inner.experiences.len())
            }
            SortedTable::SkillCategories => {
                let before = inner.skills.len();
                inner.skills.retain(|r| r.id != id);
                (before, inner.skills.len())
            }
            SortedTable::Education => {
                let before = inner.education.len();
                inner.education.retain(|r| r.id != id);
                (before, inner.education.len())
            }
        };
        Ok(before_after.0 != before_after.1)
    }

    async fn reorder(&self, table: SortedTable, items: &[SortUpdate]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let mut rows = inner.sort_orders(table);

        // Check the whole batch before touching anything.
        if items
            .iter()
            .any(|item| !rows.iter().any(|(id, _, _)| *id == item.id))
        {
            return Err(sqlx::Error::RowNotFound);
        }

        let now = Utc::now();
        for item in items {
            if let Some((_, sort_order, updated_at)) =
                rows.iter_mut().find(|(id, _, _)| *id == item.id)
            {
                **sort_order = item.sort_order;
                **updated_at = now;
            }
        }
        Ok(())
    }

    async fn get_theme(&self) -> StoreResult<ThemeSettings> {
        Ok(self.inner.read().await.theme.clone().unwrap_or_default())
    }

    async fn save_theme(&self, theme: &ThemeSettings) -> StoreResult<ThemeSettings> {
        let mut stored = theme.clone();
        stored.updated_at = Some(Utc::now());
        self.inner.write().await.theme = Some(stored.clone());
        Ok(stored)
    }

    async fn find_user_by_github_id(&self, github_id: &str) -> StoreResult<Option<AppUser>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.github_id == github_id).cloned())
    }

    async fn upsert_github_user(&self, profile: &GithubProfile) -> StoreResult<AppUser> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner
            .users
            .iter_mut()
            .find(|u| u.github_id == profile.github_id)
        {
            let now = Utc::now();
            user.login = profile.login.clone();
            user.name = profile.name.clone().or(user.name.take());
            user.email = profile.email.clone().or(user.email.take());
            user.avatar_url = profile.avatar_url.clone().or(user.avatar_url.take());
            user.updated_at = now;
            user.last_signed_in = now;
            return Ok(user.clone());
        }
        Ok(inner.push_user(profile, Role::User))
    }

    async fn promote_to_admin(&self, user_id: i32) -> StoreResult<AppUser> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        user.role = Role::Admin;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn record_audit_event(
        &self,
        actor_github_id: &str,
        action: &str,
        detail: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let id = inner.audit.len() as i64 + 1;
        inner.audit.push(AuditEntry {
            id,
            actor_github_id: actor_github_id.to_string(),
            action: action.to_string(),
            detail: detail.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn track_event(&self, event: NewAnalyticsEvent) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.next_event_id += 1;
        let id = inner.next_event_id;
        while inner.events.len() >= self.max_events.max(1) {
            inner.events.pop_front();
        }
        inner.events.push_back(AnalyticsEvent {
            id,
            project_id: event.project_id,
            event_type: event.event_type.as_str().to_string(),
            referrer: event.referrer,
            user_agent: event.user_agent,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn analytics_summary(&self) -> StoreResult<Vec<ProjectAnalyticsSummary>> {
        let inner = self.inner.read().await;
        let mut summary: BTreeMap<i32, ProjectAnalyticsSummary> = BTreeMap::new();
        for event in &inner.events {
            let entry = summary
                .entry(event.project_id)
                .or_insert_with(|| ProjectAnalyticsSummary {
                    project_id: event.project_id,
                    clicks: 0,
                    views: 0,
                    last_event: event.created_at,
                });
            match event.event_type.as_str() {
                "click" => entry.clicks += 1,
                "view" => entry.views += 1,
                _ => {}
            }
            entry.last_event = entry.last_event.max(event.created_at);
        }
        Ok(summary.into_values().collect())
    }

    async fn analytics_for_project(&self, project_id: i32) -> StoreResult<ProjectAnalyticsDetail> {
        let inner = self.inner.read().await;
        let events = inner
            .events
            .iter()
            .rev()
            .filter(|e| e.project_id == project_id)
            .take(ANALYTICS_DETAIL_LIMIT)
            .cloned()
            .collect();
        Ok(ProjectAnalyticsDetail::from_events(events))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
