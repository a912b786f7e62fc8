pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{PortfolioStore, StoreResult};

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    /// `None` when no database is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.database_url.as_ref().map(|url| Self {
            url: url.clone(),
            max_connections: config.db_pool_max,
            min_connections: config.db_pool_min.min(config.db_pool_max),
            idle_timeout_secs: config.db_idle_timeout_secs,
        })
    }
}

/// Database URL with credentials masked, for logs.
pub fn redacted_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("****"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable database url>".to_string(),
    }
}

pub async fn init_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing database connection pool...");
    tracing::debug!("Database URL: {}", redacted_url(&config.url));

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(3))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profile (
            id INTEGER PRIMARY KEY,
            full_name TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            bio TEXT NOT NULL DEFAULT '',
            hero_tagline TEXT NOT NULL DEFAULT '',
            hero_subtitle TEXT NOT NULL DEFAULT '',
            avatar_url TEXT NOT NULL DEFAULT '',
            resume_url TEXT NOT NULL DEFAULT '',
            github_url TEXT NOT NULL DEFAULT '',
            linkedin_url TEXT NOT NULL DEFAULT '',
            twitter_url TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            years_experience TEXT NOT NULL DEFAULT '',
            projects_delivered TEXT NOT NULL DEFAULT '',
            open_source_contributions TEXT NOT NULL DEFAULT '',
            client_satisfaction TEXT NOT NULL DEFAULT '',
            available_for_work BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id SERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            image_url TEXT NOT NULL DEFAULT '',
            live_url TEXT NOT NULL DEFAULT '',
            github_url TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '',
            featured BOOLEAN NOT NULL DEFAULT false,
            tile_size TEXT NOT NULL DEFAULT 'medium',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS experiences (
            id SERIAL PRIMARY KEY,
            role TEXT NOT NULL,
            company TEXT NOT NULL,
            period TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '',
            logo_url TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS skill_categories (
            id SERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            icon TEXT NOT NULL DEFAULT 'Code2',
            skills TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS education (
            id SERIAL PRIMARY KEY,
            institution TEXT NOT NULL,
            degree TEXT NOT NULL,
            field_of_study TEXT NOT NULL DEFAULT '',
            start_year INTEGER NOT NULL,
            end_year INTEGER,
            description TEXT NOT NULL DEFAULT '',
            logo_url TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    // Several statements in one go need the simple query protocol.
    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_projects_sort ON projects(sort_order, id);
        CREATE INDEX IF NOT EXISTS idx_experiences_sort ON experiences(sort_order, id);
        CREATE INDEX IF NOT EXISTS idx_skill_categories_sort ON skill_categories(sort_order, id);
        CREATE INDEX IF NOT EXISTS idx_education_sort ON education(sort_order, id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS theme_settings (
            id INTEGER PRIMARY KEY,
            accent_color TEXT NOT NULL DEFAULT '#B85C38',
            accent_color_hover TEXT NOT NULL DEFAULT '#9A4A2E',
            heading_font TEXT NOT NULL DEFAULT 'DM Serif Display',
            body_font TEXT NOT NULL DEFAULT 'DM Sans',
            dark_mode BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    // Layout columns arrived after the first theme release.
    sqlx::query(
        r#"
        ALTER TABLE theme_settings
            ADD COLUMN IF NOT EXISTS layout_mode TEXT NOT NULL DEFAULT 'separate',
            ADD COLUMN IF NOT EXISTS section_order TEXT NOT NULL
                DEFAULT 'hero,about,projects,skills,experience,education,contact',
            ADD COLUMN IF NOT EXISTS hidden_sections TEXT NOT NULL DEFAULT '',
            ADD COLUMN IF NOT EXISTS section_titles TEXT NOT NULL DEFAULT '{}'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS app_users (
            id SERIAL PRIMARY KEY,
            github_id TEXT UNIQUE NOT NULL,
            login TEXT NOT NULL,
            name TEXT,
            email TEXT,
            avatar_url TEXT,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            last_signed_in TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_audit_log (
            id BIGSERIAL PRIMARY KEY,
            actor_github_id TEXT NOT NULL,
            action TEXT NOT NULL,
            detail TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_analytics (
            id BIGSERIAL PRIMARY KEY,
            project_id INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            referrer TEXT,
            user_agent TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_project_analytics_project
            ON project_analytics(project_id, created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}
