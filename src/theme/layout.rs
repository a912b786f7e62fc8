//! Page section layout: which sections render, in what order, and under
//! which headings.
//!
//! Writes are strict: every key must be known and appear at most once.
//! Reads are lenient: rows written before validation existed are resolved by
//! dropping unknown keys and appending any missing ones in default order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::ThemeError;

/// Longest custom section title accepted.
pub const MAX_SECTION_TITLE_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKey {
    Hero,
    About,
    Projects,
    Skills,
    Experience,
    Education,
    Contact,
}

impl SectionKey {
    /// Default display order.
    pub const ALL: [SectionKey; 7] = [
        SectionKey::Hero,
        SectionKey::About,
        SectionKey::Projects,
        SectionKey::Skills,
        SectionKey::Experience,
        SectionKey::Education,
        SectionKey::Contact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKey::Hero => "hero",
            SectionKey::About => "about",
            SectionKey::Projects => "projects",
            SectionKey::Skills => "skills",
            SectionKey::Experience => "experience",
            SectionKey::Education => "education",
            SectionKey::Contact => "contact",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            SectionKey::Hero => "Home",
            SectionKey::About => "About",
            SectionKey::Projects => "Projects",
            SectionKey::Skills => "Skills",
            SectionKey::Experience => "Experience",
            SectionKey::Education => "Education",
            SectionKey::Contact => "Contact",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ThemeError::UnknownSection(s.to_string()))
    }
}

/// `separate`: one block per section. `combined`: skills and experience are
/// merged into a single block on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Separate,
    Combined,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Separate => "separate",
            LayoutMode::Combined => "combined",
        }
    }

    /// Unknown stored values read as the default.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "combined" => LayoutMode::Combined,
            _ => LayoutMode::Separate,
        }
    }
}

pub fn default_section_order() -> String {
    join_keys(&SectionKey::ALL)
}

pub fn join_keys(keys: &[SectionKey]) -> String {
    keys.iter()
        .map(|key| key.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Strict parse used on write: known keys, no duplicates, at least one key.
pub fn parse_section_order(value: &str) -> Result<Vec<SectionKey>, ThemeError> {
    let keys = parse_key_list(value)?;
    if keys.is_empty() {
        return Err(ThemeError::EmptySectionOrder);
    }
    Ok(keys)
}

/// Strict parse of the hidden-section list; empty is allowed.
pub fn parse_hidden_sections(value: &str) -> Result<Vec<SectionKey>, ThemeError> {
    parse_key_list(value)
}

fn parse_key_list(value: &str) -> Result<Vec<SectionKey>, ThemeError> {
    let mut seen = BTreeSet::new();
    let mut keys = Vec::new();
    for raw in split_list(value) {
        let key: SectionKey = raw.parse()?;
        if !seen.insert(key) {
            return Err(ThemeError::DuplicateSection(raw.to_string()));
        }
        keys.push(key);
    }
    Ok(keys)
}

pub fn validate_section_titles(titles: &BTreeMap<String, String>) -> Result<(), ThemeError> {
    for (key, title) in titles {
        key.parse::<SectionKey>()?;
        if title.chars().count() > MAX_SECTION_TITLE_LEN {
            return Err(ThemeError::TitleTooLong(key.clone()));
        }
    }
    Ok(())
}

/// A section as the page should render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSection {
    pub key: SectionKey,
    pub title: String,
    pub visible: bool,
}

/// Lenient resolution of stored layout values into render order.
pub fn resolve(
    section_order: &str,
    hidden_sections: &str,
    titles: &BTreeMap<String, String>,
) -> Vec<ResolvedSection> {
    let mut order: Vec<SectionKey> = Vec::with_capacity(SectionKey::ALL.len());
    for raw in split_list(section_order) {
        match raw.parse::<SectionKey>() {
            Ok(key) if !order.contains(&key) => order.push(key),
            Ok(_) => {}
            Err(_) => tracing::debug!(section = raw, "ignoring unknown section key"),
        }
    }
    for key in SectionKey::ALL {
        if !order.contains(&key) {
            order.push(key);
        }
    }

    let hidden: BTreeSet<SectionKey> = split_list(hidden_sections)
        .filter_map(|raw| raw.parse().ok())
        .collect();

    order
        .into_iter()
        .map(|key| {
            let title = titles
                .get(key.as_str())
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .unwrap_or(key.default_title())
                .to_string();
            ResolvedSection {
                key,
                title,
                visible: !hidden.contains(&key),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order_has_all_seven_sections() {
        let order = default_section_order();
        assert_eq!(
            order,
            "hero,about,projects,skills,experience,education,contact"
        );
        assert_eq!(parse_section_order(&order).unwrap().len(), 7);
    }

    #[test]
    fn test_reordered_sections_parse_in_order() {
        let keys =
            parse_section_order("projects, hero,about,contact,skills,experience,education")
                .unwrap();
        assert_eq!(keys[0], SectionKey::Projects);
        assert_eq!(keys[1], SectionKey::Hero);
    }

    #[test]
    fn test_unknown_and_duplicate_keys_rejected_on_write() {
        assert!(matches!(
            parse_section_order("hero,blog"),
            Err(ThemeError::UnknownSection(_))
        ));
        assert!(matches!(
            parse_section_order("hero,hero"),
            Err(ThemeError::DuplicateSection(_))
        ));
        assert!(matches!(
            parse_section_order(" , "),
            Err(ThemeError::EmptySectionOrder)
        ));
        assert!(parse_hidden_sections("").unwrap().is_empty());
    }

    #[test]
    fn test_titles_validation() {
        let mut titles = BTreeMap::new();
        titles.insert("projects".to_string(), "Selected Work".to_string());
        assert!(validate_section_titles(&titles).is_ok());

        titles.insert("footer".to_string(), "x".to_string());
        assert!(validate_section_titles(&titles).is_err());

        let mut long = BTreeMap::new();
        long.insert("about".to_string(), "a".repeat(MAX_SECTION_TITLE_LEN + 1));
        assert!(matches!(
            validate_section_titles(&long),
            Err(ThemeError::TitleTooLong(_))
        ));
    }

    #[test]
    fn test_resolve_tolerates_legacy_rows() {
        let mut titles = BTreeMap::new();
        titles.insert("projects".to_string(), "Work".to_string());
        titles.insert("about".to_string(), "   ".to_string());

        let sections = resolve("projects,blog,hero,projects", "contact,bogus", &titles);

        assert_eq!(sections.len(), 7);
        assert_eq!(sections[0].key, SectionKey::Projects);
        assert_eq!(sections[0].title, "Work");
        assert_eq!(sections[1].key, SectionKey::Hero);
        // missing keys follow in default order
        assert_eq!(sections[2].key, SectionKey::About);
        assert_eq!(sections[2].title, "About");

        let contact = sections
            .iter()
            .find(|s| s.key == SectionKey::Contact)
            .unwrap();
        assert!(!contact.visible);
        assert_eq!(sections.iter().filter(|s| !s.visible).count(), 1);
    }

    #[test]
    fn test_layout_mode_from_stored() {
        assert_eq!(LayoutMode::from_stored("combined"), LayoutMode::Combined);
        assert_eq!(LayoutMode::from_stored("grid"), LayoutMode::Separate);
    }
}
