//! Database Models - structs representing database tables (used by sqlx/serde).
//!
//! Columns are snake_case; everything that leaves the process is camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

use crate::theme::color::HexColor;
use crate::theme::layout::{self, LayoutMode};
use crate::theme::ThemeSettings;

/// Project tile footprint on the public grid. Unknown stored values read as
/// `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileSize {
    Small,
    #[default]
    Medium,
    Large,
    Wide,
}

impl TileSize {
    pub fn as_str(self) -> &'static str {
        match self {
            TileSize::Small => "small",
            TileSize::Medium => "medium",
            TileSize::Large => "large",
            TileSize::Wide => "wide",
        }
    }
}

impl From<String> for TileSize {
    fn from(value: String) -> Self {
        match value.as_str() {
            "small" => TileSize::Small,
            "large" => TileSize::Large,
            "wide" => TileSize::Wide,
            _ => TileSize::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value == "admin" {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// Boolean columns travel as `0`/`1`; `true`/`false` are accepted on input.
mod flag {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    fn from_raw<E: de::Error>(raw: Raw) -> Result<bool, E> {
        match raw {
            Raw::Bool(value) => Ok(value),
            Raw::Int(0) => Ok(false),
            Raw::Int(1) => Ok(true),
            Raw::Int(n) => Err(E::custom(format!("expected 0 or 1, got {n}"))),
        }
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        from_raw(Raw::deserialize(deserializer)?)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<bool>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_some(&u8::from(*value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<bool>, D::Error> {
            Option::<Raw>::deserialize(deserializer)?
                .map(from_raw)
                .transpose()
        }
    }
}

/// Profile: the portfolio owner's details (single row).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i32,
    pub full_name: String,
    pub title: String,
    pub bio: String,
    pub hero_tagline: String,
    pub hero_subtitle: String,
    pub avatar_url: String,
    pub resume_url: String,
    pub github_url: String,
    pub linkedin_url: String,
    pub twitter_url: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub years_experience: String,
    pub projects_delivered: String,
    pub open_source_contributions: String,
    pub client_satisfaction: String,
    #[serde(with = "flag")]
    pub available_for_work: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// The row the first profile save starts from.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            id: 1,
            full_name: String::new(),
            title: String::new(),
            bio: String::new(),
            hero_tagline: String::new(),
            hero_subtitle: String::new(),
            avatar_url: String::new(),
            resume_url: String::new(),
            github_url: String::new(),
            linkedin_url: String::new(),
            twitter_url: String::new(),
            email: String::new(),
            phone: String::new(),
            location: String::new(),
            years_experience: String::new(),
            projects_delivered: String::new(),
            open_source_contributions: String::new(),
            client_satisfaction: String::new(),
            available_for_work: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: ProfilePatch) {
        let ProfilePatch {
            full_name,
            title,
            bio,
            hero_tagline,
            hero_subtitle,
            avatar_url,
            resume_url,
            github_url,
            linkedin_url,
            twitter_url,
            email,
            phone,
            location,
            years_experience,
            projects_delivered,
            open_source_contributions,
            client_satisfaction,
            available_for_work,
        } = patch;
        set(&mut self.full_name, full_name);
        set(&mut self.title, title);
        set(&mut self.bio, bio);
        set(&mut self.hero_tagline, hero_tagline);
        set(&mut self.hero_subtitle, hero_subtitle);
        set(&mut self.avatar_url, avatar_url);
        set(&mut self.resume_url, resume_url);
        set(&mut self.github_url, github_url);
        set(&mut self.linkedin_url, linkedin_url);
        set(&mut self.twitter_url, twitter_url);
        set(&mut self.email, email);
        set(&mut self.phone, phone);
        set(&mut self.location, location);
        set(&mut self.years_experience, years_experience);
        set(&mut self.projects_delivered, projects_delivered);
        set(&mut self.open_source_contributions, open_source_contributions);
        set(&mut self.client_satisfaction, client_satisfaction);
        set(&mut self.available_for_work, available_for_work);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub hero_tagline: Option<String>,
    pub hero_subtitle: Option<String>,
    pub avatar_url: Option<String>,
    pub resume_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub years_experience: Option<String>,
    pub projects_delivered: Option<String>,
    pub open_source_contributions: Option<String>,
    pub client_satisfaction: Option<String>,
    #[serde(default, with = "flag::option")]
    pub available_for_work: Option<bool>,
}

/// Project model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub live_url: String,
    pub github_url: String,
    /// Comma-separated.
    pub tags: String,
    #[serde(with = "flag")]
    pub featured: bool,
    #[sqlx(try_from = "String")]
    pub tile_size: TileSize,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub tags: Option<String>,
    #[serde(default, with = "flag::option")]
    pub featured: Option<bool>,
    pub tile_size: Option<TileSize>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub tags: Option<String>,
    #[serde(default, with = "flag::option")]
    pub featured: Option<bool>,
    pub tile_size: Option<TileSize>,
    pub sort_order: Option<i32>,
}

impl Project {
    pub fn create(id: i32, new: NewProject, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description.unwrap_or_default(),
            image_url: new.image_url.unwrap_or_default(),
            live_url: new.live_url.unwrap_or_default(),
            github_url: new.github_url.unwrap_or_default(),
            tags: new.tags.unwrap_or_default(),
            featured: new.featured.unwrap_or(false),
            tile_size: new.tile_size.unwrap_or_default(),
            sort_order: new.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: ProjectPatch) {
        set(&mut self.title, patch.title);
        set(&mut self.description, patch.description);
        set(&mut self.image_url, patch.image_url);
        set(&mut self.live_url, patch.live_url);
        set(&mut self.github_url, patch.github_url);
        set(&mut self.tags, patch.tags);
        set(&mut self.featured, patch.featured);
        set(&mut self.tile_size, patch.tile_size);
        set(&mut self.sort_order, patch.sort_order);
    }
}

/// Work experience entry
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: i32,
    pub role: String,
    pub company: String,
    pub period: String,
    pub description: String,
    pub tags: String,
    pub logo_url: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExperience {
    pub role: String,
    pub company: String,
    pub period: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub logo_url: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperiencePatch {
    pub role: Option<String>,
    pub company: Option<String>,
    pub period: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub logo_url: Option<String>,
    pub sort_order: Option<i32>,
}

impl Experience {
    pub fn create(id: i32, new: NewExperience, now: DateTime<Utc>) -> Self {
        Self {
            id,
            role: new.role,
            company: new.company,
            period: new.period,
            description: new.description.unwrap_or_default(),
            tags: new.tags.unwrap_or_default(),
            logo_url: new.logo_url.unwrap_or_default(),
            sort_order: new.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: ExperiencePatch) {
        set(&mut self.role, patch.role);
        set(&mut self.company, patch.company);
        set(&mut self.period, patch.period);
        set(&mut self.description, patch.description);
        set(&mut self.tags, patch.tags);
        set(&mut self.logo_url, patch.logo_url);
        set(&mut self.sort_order, patch.sort_order);
    }
}

pub const DEFAULT_SKILL_ICON: &str = "Code2";

/// Skill category with its comma-separated skills
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillCategory {
    pub id: i32,
    pub title: String,
    pub icon: String,
    pub skills: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSkillCategory {
    pub title: String,
    pub icon: Option<String>,
    pub skills: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCategoryPatch {
    pub title: Option<String>,
    pub icon: Option<String>,
    pub skills: Option<String>,
    pub sort_order: Option<i32>,
}

impl SkillCategory {
    pub fn create(id: i32, new: NewSkillCategory, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            icon: new
                .icon
                .filter(|icon| !icon.is_empty())
                .unwrap_or_else(|| DEFAULT_SKILL_ICON.to_string()),
            skills: new.skills.unwrap_or_default(),
            sort_order: new.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: SkillCategoryPatch) {
        set(&mut self.title, patch.title);
        set(&mut self.icon, patch.icon);
        set(&mut self.skills, patch.skills);
        set(&mut self.sort_order, patch.sort_order);
    }
}

/// Education entry; `end_year` of `None` means ongoing.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub id: i32,
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_year: i32,
    pub end_year: Option<i32>,
    pub description: String,
    pub logo_url: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEducation {
    pub institution: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub start_year: i32,
    pub end_year: Option<i32>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationPatch {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_year: Option<i32>,
    /// `null` clears the end year (ongoing); absent leaves it unchanged.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_year: Option<Option<i32>>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub sort_order: Option<i32>,
}

impl Education {
    pub fn create(id: i32, new: NewEducation, now: DateTime<Utc>) -> Self {
        Self {
            id,
            institution: new.institution,
            degree: new.degree,
            field_of_study: new.field_of_study.unwrap_or_default(),
            start_year: new.start_year,
            end_year: new.end_year,
            description: new.description.unwrap_or_default(),
            logo_url: new.logo_url.unwrap_or_default(),
            sort_order: new.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: EducationPatch) {
        set(&mut self.institution, patch.institution);
        set(&mut self.degree, patch.degree);
        set(&mut self.field_of_study, patch.field_of_study);
        set(&mut self.start_year, patch.start_year);
        set(&mut self.end_year, patch.end_year);
        set(&mut self.description, patch.description);
        set(&mut self.logo_url, patch.logo_url);
        set(&mut self.sort_order, patch.sort_order);
    }
}

/// Tells an explicit `null` (`Some(None)`) apart from an absent field (`None`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

/// One `{id, sortOrder}` pair of a reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortUpdate {
    pub id: i32,
    pub sort_order: i32,
}

/// Content tables that carry a `sort_order` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortedTable {
    Projects,
    Experiences,
    SkillCategories,
    Education,
}

impl SortedTable {
    pub fn table_name(self) -> &'static str {
        match self {
            SortedTable::Projects => "projects",
            SortedTable::Experiences => "experiences",
            SortedTable::SkillCategories => "skill_categories",
            SortedTable::Education => "education",
        }
    }

    /// Singular noun for error messages.
    pub fn entity(self) -> &'static str {
        match self {
            SortedTable::Projects => "Project",
            SortedTable::Experiences => "Experience",
            SortedTable::SkillCategories => "Skill category",
            SortedTable::Education => "Education entry",
        }
    }
}

/// Everything the public page renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub profile: Option<Profile>,
    pub projects: Vec<Project>,
    pub experiences: Vec<Experience>,
    pub skills: Vec<SkillCategory>,
    pub education: Vec<Education>,
}

/// Site user, identified by GitHub account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    pub id: i32,
    pub github_id: String,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

impl AppUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Identity returned by the OAuth provider after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubProfile {
    pub github_id: String,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Admin audit log row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub actor_github_id: String,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Click,
    View,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::View => "view",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalyticsEvent {
    pub project_id: i32,
    pub event_type: EventType,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: i64,
    pub project_id: i32,
    pub event_type: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalyticsSummary {
    pub project_id: i32,
    pub clicks: i64,
    pub views: i64,
    pub last_event: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalyticsDetail {
    pub events: Vec<AnalyticsEvent>,
    pub total_clicks: i64,
    pub total_views: i64,
}

impl ProjectAnalyticsDetail {
    pub fn from_events(events: Vec<AnalyticsEvent>) -> Self {
        let total_clicks = events.iter().filter(|e| e.event_type == "click").count() as i64;
        let total_views = events.iter().filter(|e| e.event_type == "view").count() as i64;
        Self {
            events,
            total_clicks,
            total_views,
        }
    }
}

/// Most recent events returned by the per-project analytics view.
pub const ANALYTICS_DETAIL_LIMIT: usize = 500;

/// Stored theme row. Read leniently: anything malformed falls back to the
/// default for that field.
#[derive(Debug, Clone, FromRow)]
pub struct ThemeRow {
    pub accent_color: String,
    pub accent_color_hover: String,
    pub heading_font: String,
    pub body_font: String,
    pub dark_mode: bool,
    pub layout_mode: String,
    pub section_order: String,
    pub hidden_sections: String,
    /// JSON object of section key → title.
    pub section_titles: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ThemeRow> for ThemeSettings {
    fn from(row: ThemeRow) -> Self {
        let defaults = ThemeSettings::default();
        let accent_color = HexColor::parse(&row.accent_color).unwrap_or(defaults.accent_color);
        let accent_color_hover = HexColor::parse(&row.accent_color_hover)
            .unwrap_or_else(|_| accent_color.derive_hover());
        let section_titles: BTreeMap<String, String> =
            serde_json::from_str(&row.section_titles).unwrap_or_default();
        let section_order = if row.section_order.trim().is_empty() {
            layout::default_section_order()
        } else {
            row.section_order
        };

        ThemeSettings {
            accent_color,
            accent_color_hover,
            heading_font: row.heading_font,
            body_font: row.body_font,
            dark_mode: row.dark_mode,
            layout_mode: LayoutMode::from_stored(&row.layout_mode),
            section_order,
            hidden_sections: row.hidden_sections,
            section_titles,
            updated_at: Some(row.updated_at),
        }
    }
}

impl ThemeSettings {
    pub fn section_titles_json(&self) -> String {
        serde_json::to_string(&self.section_titles).unwrap_or_else(|_| "{}".to_string())
    }
}
