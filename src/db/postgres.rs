use async_trait::async_trait;
use sqlx::PgPool;

use super::models::*;
use super::store::{PortfolioStore, StoreResult};
use crate::theme::ThemeSettings;

/// Singleton rows (profile, theme) always live at this id.
const SINGLETON_ID: i32 = 1;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PortfolioStore for PgStore {
    async fn get_profile(&self) -> StoreResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profile WHERE id = $1")
            .bind(SINGLETON_ID)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert_profile(&self, patch: ProfilePatch) -> StoreResult<Profile> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO profile (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(SINGLETON_ID)
            .execute(&mut *tx)
            .await?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profile SET
                full_name = COALESCE($2, full_name),
                title = COALESCE($3, title),
                bio = COALESCE($4, bio),
                hero_tagline = COALESCE($5, hero_tagline),
                hero_subtitle = COALESCE($6, hero_subtitle),
                avatar_url = COALESCE($7, avatar_url),
                resume_url = COALESCE($8, resume_url),
                github_url = COALESCE($9, github_url),
                linkedin_url = COALESCE($10, linkedin_url),
                twitter_url = COALESCE($11, twitter_url),
                email = COALESCE($12, email),
                phone = COALESCE($13, phone),
                location = COALESCE($14, location),
                years_experience = COALESCE($15, years_experience),
                projects_delivered = COALESCE($16, projects_delivered),
                open_source_contributions = COALESCE($17, open_source_contributions),
                client_satisfaction = COALESCE($18, client_satisfaction),
                available_for_work = COALESCE($19, available_for_work),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(SINGLETON_ID)
        .bind(patch.full_name)
        .bind(patch.title)
        .bind(patch.bio)
        .bind(patch.hero_tagline)
        .bind(patch.hero_subtitle)
        .bind(patch.avatar_url)
        .bind(patch.resume_url)
        .bind(patch.github_url)
        .bind(patch.linkedin_url)
        .bind(patch.twitter_url)
        .bind(patch.email)
        .bind(patch.phone)
        .bind(patch.location)
        .bind(patch.years_experience)
        .bind(patch.projects_delivered)
        .bind(patch.open_source_contributions)
        .bind(patch.client_satisfaction)
        .bind(patch.available_for_work)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(profile)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY sort_order ASC, id ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects
                (title, description, image_url, live_url, github_url, tags, featured, tile_size, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(new.title)
        .bind(new.description.unwrap_or_default())
        .bind(new.image_url.unwrap_or_default())
        .bind(new.live_url.unwrap_or_default())
        .bind(new.github_url.unwrap_or_default())
        .bind(new.tags.unwrap_or_default())
        .bind(new.featured.unwrap_or(false))
        .bind(new.tile_size.unwrap_or_default().as_str())
        .bind(new.sort_order.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
    }

    async fn update_project(&self, id: i32, patch: ProjectPatch) -> StoreResult<Option<Project>> {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                image_url = COALESCE($4, image_url),
                live_url = COALESCE($5, live_url),
                github_url = COALESCE($6, github_url),
                tags = COALESCE($7, tags),
                featured = COALESCE($8, featured),
                tile_size = COALESCE($9, tile_size),
                sort_order = COALESCE($10, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.image_url)
        .bind(patch.live_url)
        .bind(patch.github_url)
        .bind(patch.tags)
        .bind(patch.featured)
        .bind(patch.tile_size.map(TileSize::as_str))
        .bind(patch.sort_order)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_all_tile_sizes(&self, size: TileSize) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE projects SET tile_size = $1, updated_at = now()")
            .bind(size.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_experiences(&self) -> StoreResult<Vec<Experience>> {
        sqlx::query_as::<_, Experience>(
            "SELECT * FROM experiences ORDER BY sort_order ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn create_experience(&self, new: NewExperience) -> StoreResult<Experience> {
        sqlx::query_as::<_, Experience>(
            r#"
            INSERT INTO experiences (role, company, period, description, tags, logo_url, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.role)
        .bind(new.company)
        .bind(new.period)
        .bind(new.description.unwrap_or_default())
        .bind(new.tags.unwrap_or_default())
        .bind(new.logo_url.unwrap_or_default())
        .bind(new.sort_order.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
    }

    async fn update_experience(
        &self,
        id: i32,
        patch: ExperiencePatch,
    ) -> StoreResult<Option<Experience>> {
        sqlx::query_as::<_, Experience>(
            r#"
            UPDATE experiences SET
                role = COALESCE($2, role),
                company = COALESCE($3, company),
                period = COALESCE($4, period),
                description = COALESCE($5, description),
                tags = COALESCE($6, tags),
                logo_url = COALESCE($7, logo_url),
                sort_order = COALESCE($8, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.role)
        .bind(patch.company)
        .bind(patch.period)
        .bind(patch.description)
        .bind(patch.tags)
        .bind(patch.logo_url)
        .bind(patch.sort_order)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_skill_categories(&self) -> StoreResult<Vec<SkillCategory>> {
        sqlx::query_as::<_, SkillCategory>(
            "SELECT * FROM skill_categories ORDER BY sort_order ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn create_skill_category(&self, new: NewSkillCategory) -> StoreResult<SkillCategory> {
        sqlx::query_as::<_, SkillCategory>(
            r#"
            INSERT INTO skill_categories (title, icon, skills, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.title)
        .bind(
            new.icon
                .filter(|icon| !icon.is_empty())
                .unwrap_or_else(|| DEFAULT_SKILL_ICON.to_string()),
        )
        .bind(new.skills.unwrap_or_default())
        .bind(new.sort_order.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
    }

    async fn update_skill_category(
        &self,
        id: i32,
        patch: SkillCategoryPatch,
    ) -> StoreResult<Option<SkillCategory>> {
        sqlx::query_as::<_, SkillCategory>(
            r#"
            UPDATE skill_categories SET
                title = COALESCE($2, title),
                icon = COALESCE($3, icon),
                skills = COALESCE($4, skills),
                sort_order = COALESCE($5, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.icon)
        .bind(patch.skills)
        .bind(patch.sort_order)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_education(&self) -> StoreResult<Vec<Education>> {
        sqlx::query_as::<_, Education>("SELECT * FROM education ORDER BY sort_order ASC, id ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn create_education(&self, new: NewEducation) -> StoreResult<Education> {
        sqlx::query_as::<_, Education>(
            r#"
            INSERT INTO education
                (institution, degree, field_of_study, start_year, end_year, description, logo_url, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.institution)
        .bind(new.degree)
        .bind(new.field_of_study.unwrap_or_default())
        .bind(new.start_year)
        .bind(new.end_year)
        .bind(new.description.unwrap_or_default())
        .bind(new.logo_url.unwrap_or_default())
        .bind(new.sort_order.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
    }

    async fn update_education(
        &self,
        id: i32,
        patch: EducationPatch,
    ) -> StoreResult<Option<Education>> {
        sqlx::query_as::<_, Education>(
            r#"
            UPDATE education SET
                institution = COALESCE($2, institution),
                degree = COALESCE($3, degree),
                field_of_study = COALESCE($4, field_of_study),
                start_year = COALESCE($5, start_year),
                end_year = CASE WHEN $10 THEN $6 ELSE end_year END,
                description = COALESCE($7, description),
                logo_url = COALESCE($8, logo_url),
                sort_order = COALESCE($9, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.institution)
        .bind(patch.degree)
        .bind(patch.field_of_study)
        .bind(patch.start_year)
        .bind(patch.end_year.flatten())
        .bind(patch.description)
        .bind(patch.logo_url)
        .bind(patch.sort_order)
        .bind(patch.end_year.is_some())
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete(&self, table: SortedTable, id: i32) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table.table_name());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reorder(&self, table: SortedTable, items: &[SortUpdate]) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {} SET sort_order = $1, updated_at = now() WHERE id = $2",
            table.table_name()
        );

        let mut tx = self.pool.begin().await?;
        for item in items {
            let result = sqlx::query(&sql)
                .bind(item.sort_order)
                .bind(item.id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back the rows already updated.
                return Err(sqlx::Error::RowNotFound);
            }
        }
        tx.commit().await
    }

    async fn get_theme(&self) -> StoreResult<ThemeSettings> {
        let row = sqlx::query_as::<_, ThemeRow>("SELECT * FROM theme_settings WHERE id = $1")
            .bind(SINGLETON_ID)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ThemeSettings::from).unwrap_or_default())
    }

    async fn save_theme(&self, theme: &ThemeSettings) -> StoreResult<ThemeSettings> {
        let row = sqlx::query_as::<_, ThemeRow>(
            r#"
            INSERT INTO theme_settings (
                id, accent_color, accent_color_hover, heading_font, body_font, dark_mode,
                layout_mode, section_order, hidden_sections, section_titles
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                accent_color = EXCLUDED.accent_color,
                accent_color_hover = EXCLUDED.accent_color_hover,
                heading_font = EXCLUDED.heading_font,
                body_font = EXCLUDED.body_font,
                dark_mode = EXCLUDED.dark_mode,
                layout_mode = EXCLUDED.layout_mode,
                section_order = EXCLUDED.section_order,
                hidden_sections = EXCLUDED.hidden_sections,
                section_titles = EXCLUDED.section_titles,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(SINGLETON_ID)
        .bind(theme.accent_color.as_str())
        .bind(theme.accent_color_hover.as_str())
        .bind(&theme.heading_font)
        .bind(&theme.body_font)
        .bind(theme.dark_mode)
        .bind(theme.layout_mode.as_str())
        .bind(&theme.section_order)
        .bind(&theme.hidden_sections)
        .bind(theme.section_titles_json())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_user_by_github_id(&self, github_id: &str) -> StoreResult<Option<AppUser>> {
        sqlx::query_as::<_, AppUser>("SELECT * FROM app_users WHERE github_id = $1")
            .bind(github_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert_github_user(&self, profile: &GithubProfile) -> StoreResult<AppUser> {
        sqlx::query_as::<_, AppUser>(
            r#"
            INSERT INTO app_users (github_id, login, name, email, avatar_url)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (github_id) DO UPDATE SET
                login = EXCLUDED.login,
                name = COALESCE(EXCLUDED.name, app_users.name),
                email = COALESCE(EXCLUDED.email, app_users.email),
                avatar_url = COALESCE(EXCLUDED.avatar_url, app_users.avatar_url),
                updated_at = now(),
                last_signed_in = now()
            RETURNING *
            "#,
        )
        .bind(&profile.github_id)
        .bind(&profile.login)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.avatar_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn promote_to_admin(&self, user_id: i32) -> StoreResult<AppUser> {
        sqlx::query_as::<_, AppUser>(
            "UPDATE app_users SET role = 'admin', updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn record_audit_event(
        &self,
        actor_github_id: &str,
        action: &str,
        detail: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO admin_audit_log (actor_github_id, action, detail) VALUES ($1, $2, $3)",
        )
        .bind(actor_github_id)
        .bind(action)
        .bind(detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn track_event(&self, event: NewAnalyticsEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO project_analytics (project_id, event_type, referrer, user_agent)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(event.project_id)
        .bind(event.event_type.as_str())
        .bind(event.referrer)
        .bind(event.user_agent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn analytics_summary(&self) -> StoreResult<Vec<ProjectAnalyticsSummary>> {
        sqlx::query_as::<_, ProjectAnalyticsSummary>(
            r#"
            SELECT
                project_id,
                COUNT(*) FILTER (WHERE event_type = 'click') AS clicks,
                COUNT(*) FILTER (WHERE event_type = 'view') AS views,
                MAX(created_at) AS last_event
            FROM project_analytics
            GROUP BY project_id
            ORDER BY project_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn analytics_for_project(&self, project_id: i32) -> StoreResult<ProjectAnalyticsDetail> {
        let events = sqlx::query_as::<_, AnalyticsEvent>(
            r#"
            SELECT * FROM project_analytics
            WHERE project_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(project_id)
        .bind(ANALYTICS_DETAIL_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(ProjectAnalyticsDetail::from_events(events))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
