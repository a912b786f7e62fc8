//! Input validation for RPC payloads.
//!
//! Every check returns `AppError::Validation` naming the offending field.

use serde::Deserialize;

use crate::db::models::{
    EducationPatch, ExperiencePatch, NewEducation, NewExperience, NewProject, NewSkillCategory,
    ProfilePatch, ProjectPatch, SkillCategoryPatch, SortUpdate,
};
use crate::error::AppError;

pub const MAX_REORDER_ITEMS: usize = 100;
pub const MAX_SORT_ORDER: i64 = 9999;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_TITLE_LEN: usize = 300;
pub const MAX_TAGLINE_LEN: usize = 500;
pub const MAX_TEXT_LEN: usize = 5000;
pub const MAX_URL_LEN: usize = 2000;
pub const MAX_TAGS_LEN: usize = 2000;
pub const MAX_STAT_LEN: usize = 20;

pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

pub fn text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn required(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    text(field, value, max)
}

fn opt_text(field: &str, value: &Option<String>, max: usize) -> Result<(), AppError> {
    value.as_deref().map_or(Ok(()), |v| text(field, v, max))
}

fn opt_required(field: &str, value: &Option<String>, max: usize) -> Result<(), AppError> {
    value.as_deref().map_or(Ok(()), |v| required(field, v, max))
}

/// Empty, root-relative (`/path`, not `//host`) or absolute `http(s)`.
pub fn http_url(field: &str, value: &str) -> Result<(), AppError> {
    text(field, value, MAX_URL_LEN)?;
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    if value.starts_with('/') && !value.starts_with("//") && !value.contains('\\') {
        return Ok(());
    }
    match ::url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(AppError::validation(format!(
            "{field} must be a valid HTTP(S) URL"
        ))),
    }
}

fn opt_url(field: &str, value: &Option<String>) -> Result<(), AppError> {
    value.as_deref().map_or(Ok(()), |v| http_url(field, v))
}

/// Ids arrive as JSON numbers; only positive values that fit the column are real.
pub fn positive_id(id: i64) -> Result<i32, AppError> {
    if id <= 0 {
        return Err(AppError::validation("id must be a positive integer"));
    }
    i32::try_from(id).map_err(|_| AppError::validation("id is out of range"))
}

pub fn sort_order(value: i64) -> Result<i32, AppError> {
    if !(0..=MAX_SORT_ORDER).contains(&value) {
        return Err(AppError::validation(format!(
            "sortOrder must be between 0 and {MAX_SORT_ORDER}"
        )));
    }
    Ok(value as i32)
}

fn opt_sort_order(value: Option<i32>) -> Result<(), AppError> {
    value.map_or(Ok(()), |v| sort_order(i64::from(v)).map(|_| ()))
}

fn year(field: &str, value: i32) -> Result<(), AppError> {
    if !(1900..=2100).contains(&value) {
        return Err(AppError::validation(format!(
            "{field} must be between 1900 and 2100"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortItem {
    pub id: i64,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderInput {
    pub items: Vec<SortItem>,
}

impl ReorderInput {
    pub fn into_updates(self) -> Result<Vec<SortUpdate>, AppError> {
        if self.items.is_empty() {
            return Err(AppError::validation("items must contain at least 1 entry"));
        }
        if self.items.len() > MAX_REORDER_ITEMS {
            return Err(AppError::validation(format!(
                "items must contain at most {MAX_REORDER_ITEMS} entries"
            )));
        }
        self.items
            .into_iter()
            .map(|item| {
                Ok(SortUpdate {
                    id: positive_id(item.id)?,
                    sort_order: sort_order(item.sort_order)?,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdInput {
    pub id: i64,
}

impl Validate for ProfilePatch {
    fn validate(&self) -> Result<(), AppError> {
        opt_text("fullName", &self.full_name, MAX_NAME_LEN)?;
        opt_text("title", &self.title, MAX_TITLE_LEN)?;
        opt_text("bio", &self.bio, MAX_TEXT_LEN)?;
        opt_text("heroTagline", &self.hero_tagline, MAX_TAGLINE_LEN)?;
        opt_text("heroSubtitle", &self.hero_subtitle, MAX_TEXT_LEN)?;
        opt_url("avatarUrl", &self.avatar_url)?;
        opt_url("resumeUrl", &self.resume_url)?;
        opt_url("githubUrl", &self.github_url)?;
        opt_url("linkedinUrl", &self.linkedin_url)?;
        opt_url("twitterUrl", &self.twitter_url)?;
        opt_text("email", &self.email, 320)?;
        opt_text("phone", &self.phone, 50)?;
        opt_text("location", &self.location, MAX_NAME_LEN)?;
        opt_text("yearsExperience", &self.years_experience, MAX_STAT_LEN)?;
        opt_text("projectsDelivered", &self.projects_delivered, MAX_STAT_LEN)?;
        opt_text(
            "openSourceContributions",
            &self.open_source_contributions,
            MAX_STAT_LEN,
        )?;
        opt_text("clientSatisfaction", &self.client_satisfaction, MAX_STAT_LEN)
    }
}

impl Validate for NewProject {
    fn validate(&self) -> Result<(), AppError> {
        required("title", &self.title, MAX_TITLE_LEN)?;
        opt_text("description", &self.description, MAX_TEXT_LEN)?;
        opt_url("imageUrl", &self.image_url)?;
        opt_url("liveUrl", &self.live_url)?;
        opt_url("githubUrl", &self.github_url)?;
        opt_text("tags", &self.tags, MAX_TAGS_LEN)?;
        opt_sort_order(self.sort_order)
    }
}

impl Validate for ProjectPatch {
    fn validate(&self) -> Result<(), AppError> {
        opt_required("title", &self.title, MAX_TITLE_LEN)?;
        opt_text("description", &self.description, MAX_TEXT_LEN)?;
        opt_url("imageUrl", &self.image_url)?;
        opt_url("liveUrl", &self.live_url)?;
        opt_url("githubUrl", &self.github_url)?;
        opt_text("tags", &self.tags, MAX_TAGS_LEN)?;
        opt_sort_order(self.sort_order)
    }
}

impl Validate for NewExperience {
    fn validate(&self) -> Result<(), AppError> {
        required("role", &self.role, MAX_TITLE_LEN)?;
        required("company", &self.company, MAX_TITLE_LEN)?;
        required("period", &self.period, 100)?;
        opt_text("description", &self.description, MAX_TEXT_LEN)?;
        opt_text("tags", &self.tags, MAX_TAGS_LEN)?;
        opt_url("logoUrl", &self.logo_url)?;
        opt_sort_order(self.sort_order)
    }
}

impl Validate for ExperiencePatch {
    fn validate(&self) -> Result<(), AppError> {
        opt_required("role", &self.role, MAX_TITLE_LEN)?;
        opt_required("company", &self.company, MAX_TITLE_LEN)?;
        opt_required("period", &self.period, 100)?;
        opt_text("description", &self.description, MAX_TEXT_LEN)?;
        opt_text("tags", &self.tags, MAX_TAGS_LEN)?;
        opt_url("logoUrl", &self.logo_url)?;
        opt_sort_order(self.sort_order)
    }
}

impl Validate for NewSkillCategory {
    fn validate(&self) -> Result<(), AppError> {
        required("title", &self.title, MAX_NAME_LEN)?;
        opt_text("icon", &self.icon, 50)?;
        opt_text("skills", &self.skills, MAX_TEXT_LEN)?;
        opt_sort_order(self.sort_order)
    }
}

impl Validate for SkillCategoryPatch {
    fn validate(&self) -> Result<(), AppError> {
        opt_required("title", &self.title, MAX_NAME_LEN)?;
        opt_text("icon", &self.icon, 50)?;
        opt_text("skills", &self.skills, MAX_TEXT_LEN)?;
        opt_sort_order(self.sort_order)
    }
}

impl Validate for NewEducation {
    fn validate(&self) -> Result<(), AppError> {
        required("institution", &self.institution, MAX_TITLE_LEN)?;
        required("degree", &self.degree, MAX_TITLE_LEN)?;
        opt_text("fieldOfStudy", &self.field_of_study, MAX_TITLE_LEN)?;
        year("startYear", self.start_year)?;
        if let Some(end) = self.end_year {
            year("endYear", end)?;
            if end < self.start_year {
                return Err(AppError::validation("endYear must not be before startYear"));
            }
        }
        opt_text("description", &self.description, MAX_TEXT_LEN)?;
        opt_url("logoUrl", &self.logo_url)?;
        opt_sort_order(self.sort_order)
    }
}

impl Validate for EducationPatch {
    fn validate(&self) -> Result<(), AppError> {
        opt_required("institution", &self.institution, MAX_TITLE_LEN)?;
        opt_required("degree", &self.degree, MAX_TITLE_LEN)?;
        opt_text("fieldOfStudy", &self.field_of_study, MAX_TITLE_LEN)?;
        if let Some(start) = self.start_year {
            year("startYear", start)?;
        }
        if let Some(Some(end)) = self.end_year {
            year("endYear", end)?;
        }
        opt_text("description", &self.description, MAX_TEXT_LEN)?;
        opt_url("logoUrl", &self.logo_url)?;
        opt_sort_order(self.sort_order)
    }
}
