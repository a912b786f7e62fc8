//! Theme and layout engine.
//!
//! `ThemeSettings` is the singleton row the admin edits. Updates arrive as a
//! sparse `ThemeUpdate`, are validated field by field and merged into the
//! current settings; the result is what gets stored.

pub mod color;
pub mod css;
pub mod fonts;
pub mod layout;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::AppError;
use color::HexColor;
use fonts::FontRole;
use layout::{LayoutMode, ResolvedSection};

pub const DEFAULT_HEADING_FONT: &str = "DM Serif Display";
pub const DEFAULT_BODY_FONT: &str = "DM Sans";

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Invalid color '{0}': expected #RRGGBB")]
    InvalidColor(String),

    #[error("Font '{0}' is not available")]
    UnknownFont(String),

    #[error("Unknown section '{0}'")]
    UnknownSection(String),

    #[error("Section '{0}' listed more than once")]
    DuplicateSection(String),

    #[error("Section order must list at least one section")]
    EmptySectionOrder,

    #[error("Title for section '{0}' is too long")]
    TitleTooLong(String),

    #[error("Unknown layout mode '{0}'")]
    UnknownLayoutMode(String),
}

impl From<ThemeError> for AppError {
    fn from(err: ThemeError) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    pub accent_color: HexColor,
    pub accent_color_hover: HexColor,
    pub heading_font: String,
    pub body_font: String,
    pub dark_mode: bool,
    pub layout_mode: LayoutMode,
    pub section_order: String,
    pub hidden_sections: String,
    pub section_titles: BTreeMap<String, String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            accent_color: HexColor::from_rgb(0xB8, 0x5C, 0x38),
            accent_color_hover: HexColor::from_rgb(0x9A, 0x4A, 0x2E),
            heading_font: DEFAULT_HEADING_FONT.to_string(),
            body_font: DEFAULT_BODY_FONT.to_string(),
            dark_mode: false,
            layout_mode: LayoutMode::Separate,
            section_order: layout::default_section_order(),
            hidden_sections: String::new(),
            section_titles: BTreeMap::new(),
            updated_at: None,
        }
    }
}

/// Sparse admin edit. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeUpdate {
    pub accent_color: Option<String>,
    pub accent_color_hover: Option<String>,
    pub heading_font: Option<String>,
    pub body_font: Option<String>,
    pub dark_mode: Option<bool>,
    pub layout_mode: Option<String>,
    pub section_order: Option<String>,
    pub hidden_sections: Option<String>,
    pub section_titles: Option<BTreeMap<String, String>>,
}

impl ThemeSettings {
    /// Validate `update` and return the merged settings. Nothing is applied
    /// unless every supplied field is valid.
    ///
    /// A new accent without an explicit hover gets a derived hover, so the two
    /// never drift apart.
    pub fn apply(&self, update: ThemeUpdate) -> Result<ThemeSettings, ThemeError> {
        let mut next = self.clone();

        let accent = update.accent_color.as_deref().map(HexColor::parse).transpose()?;
        let hover = update
            .accent_color_hover
            .as_deref()
            .map(HexColor::parse)
            .transpose()?;
        match (accent, hover) {
            (Some(accent), Some(hover)) => {
                next.accent_color = accent;
                next.accent_color_hover = hover;
            }
            (Some(accent), None) => {
                next.accent_color_hover = accent.derive_hover();
                next.accent_color = accent;
            }
            (None, Some(hover)) => next.accent_color_hover = hover,
            (None, None) => {}
        }

        if let Some(font) = update.heading_font {
            fonts::validate_font(FontRole::Heading, &font)?;
            next.heading_font = font;
        }
        if let Some(font) = update.body_font {
            fonts::validate_font(FontRole::Body, &font)?;
            next.body_font = font;
        }
        if let Some(dark) = update.dark_mode {
            next.dark_mode = dark;
        }
        if let Some(mode) = update.layout_mode {
            next.layout_mode = match mode.as_str() {
                "separate" => LayoutMode::Separate,
                "combined" => LayoutMode::Combined,
                _ => return Err(ThemeError::UnknownLayoutMode(mode)),
            };
        }
        if let Some(order) = update.section_order {
            let keys = layout::parse_section_order(&order)?;
            next.section_order = layout::join_keys(&keys);
        }
        if let Some(hidden) = update.hidden_sections {
            let keys = layout::parse_hidden_sections(&hidden)?;
            next.hidden_sections = layout::join_keys(&keys);
        }
        if let Some(titles) = update.section_titles {
            layout::validate_section_titles(&titles)?;
            next.section_titles = titles
                .into_iter()
                .map(|(k, v)| (k, v.trim().to_string()))
                .filter(|(_, v)| !v.is_empty())
                .collect();
        }

        Ok(next)
    }

    pub fn sections(&self) -> Vec<ResolvedSection> {
        layout::resolve(
            &self.section_order,
            &self.hidden_sections,
            &self.section_titles,
        )
    }
}

/// What the public page needs to lay itself out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    pub layout_mode: LayoutMode,
    pub sections: Vec<ResolvedSection>,
}

impl From<&ThemeSettings> for PageLayout {
    fn from(settings: &ThemeSettings) -> Self {
        Self {
            layout_mode: settings.layout_mode,
            sections: settings.sections(),
        }
    }
}
