//! Theme → CSS custom properties.
//!
//! `ThemeVariables::build` is pure: the same settings always produce the same
//! assignments, which the public stylesheet endpoint renders as a `:root`
//! block.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

use super::color::LIGHT_VARIANT_AMOUNT;
use super::fonts::{self, FontRole};
use super::{ThemeSettings, DEFAULT_BODY_FONT, DEFAULT_HEADING_FONT};

struct Palette {
    background: &'static str,
    card: &'static str,
    foreground: &'static str,
    muted_foreground: &'static str,
    border: &'static str,
}

const LIGHT_PALETTE: Palette = Palette {
    background: "#f5f0eb",
    card: "#ffffff",
    foreground: "#3d3229",
    muted_foreground: "#6b5e52",
    border: "#e8e0d8",
};

const DARK_PALETTE: Palette = Palette {
    background: "#1a1a2e",
    card: "#222240",
    foreground: "#e8e0d8",
    muted_foreground: "#a09890",
    border: "#333355",
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeVariables {
    /// Custom property name (with leading `--`) → value.
    pub variables: BTreeMap<String, String>,
    pub color_scheme: &'static str,
    pub font_urls: Vec<String>,
}

impl ThemeVariables {
    pub fn build(settings: &ThemeSettings) -> Self {
        // Stored rows predate font validation; never let an unknown name reach CSS.
        let heading = checked_font(FontRole::Heading, &settings.heading_font, DEFAULT_HEADING_FONT);
        let body = checked_font(FontRole::Body, &settings.body_font, DEFAULT_BODY_FONT);

        let accent = &settings.accent_color;
        let hover = &settings.accent_color_hover;
        let accent_oklch = accent.to_oklch().to_string();
        let hover_oklch = hover.to_oklch().to_string();

        let mut variables = BTreeMap::new();
        let mut set = |name: &str, value: String| {
            variables.insert(name.to_string(), value);
        };

        set("--font-display", format!("'{heading}', Georgia, serif"));
        set("--font-body", format!("'{body}', system-ui, sans-serif"));

        set("--color-terracotta", accent_oklch.clone());
        set(
            "--color-terracotta-light",
            accent.lighten(LIGHT_VARIANT_AMOUNT).to_oklch().to_string(),
        );
        set("--color-terracotta-dark", hover_oklch.clone());
        set("--primary", accent_oklch.clone());
        set("--ring", accent_oklch.clone());
        set("--sidebar-primary", hover_oklch);
        set("--sidebar-ring", accent_oklch);
        set("--accent-hex", accent.as_str().to_string());
        set("--accent-hover-hex", hover.as_str().to_string());

        let palette = if settings.dark_mode {
            &DARK_PALETTE
        } else {
            &LIGHT_PALETTE
        };
        set("--background", palette.background.to_string());
        set("--card", palette.card.to_string());
        set("--foreground", palette.foreground.to_string());
        set("--muted-foreground", palette.muted_foreground.to_string());
        set("--border", palette.border.to_string());

        let mut font_urls = vec![fonts::stylesheet_url(heading)];
        if body != heading {
            font_urls.push(fonts::stylesheet_url(body));
        }

        Self {
            variables,
            color_scheme: if settings.dark_mode { "dark" } else { "light" },
            font_urls,
        }
    }

    pub fn to_stylesheet(&self) -> String {
        let mut css = String::new();
        for url in &self.font_urls {
            let _ = writeln!(css, "@import url('{url}');");
        }
        css.push_str(":root {\n");
        for (name, value) in &self.variables {
            let _ = writeln!(css, "  {name}: {value};");
        }
        let _ = writeln!(css, "  color-scheme: {};", self.color_scheme);
        css.push_str("}\n");
        css
    }
}

fn checked_font<'a>(role: FontRole, name: &'a str, fallback: &'a str) -> &'a str {
    if fonts::validate_font(role, name).is_ok() {
        name
    } else {
        tracing::warn!(font = name, "stored font not in allow-list, using default");
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{color::HexColor, ThemeUpdate};

    #[test]
    fn test_default_variables() {
        let vars = ThemeVariables::build(&ThemeSettings::default());
        assert_eq!(
            vars.variables["--font-display"],
            "'DM Serif Display', Georgia, serif"
        );
        assert_eq!(
            vars.variables["--font-body"],
            "'DM Sans', system-ui, sans-serif"
        );
        assert_eq!(vars.variables["--accent-hex"], "#B85C38");
        assert_eq!(vars.variables["--accent-hover-hex"], "#9A4A2E");
        assert!(vars.variables["--primary"].starts_with("oklch("));
        assert_eq!(vars.variables["--primary"], vars.variables["--color-terracotta"]);
        assert_eq!(vars.variables["--background"], "#f5f0eb");
        assert_eq!(vars.color_scheme, "light");
        assert_eq!(vars.font_urls.len(), 2);
    }

    #[test]
    fn test_dark_mode_switches_palette() {
        let theme = ThemeSettings::default()
            .apply(ThemeUpdate {
                dark_mode: Some(true),
                ..Default::default()
            })
            .unwrap();
        let vars = ThemeVariables::build(&theme);
        assert_eq!(vars.variables["--background"], "#1a1a2e");
        assert_eq!(vars.variables["--card"], "#222240");
        assert_eq!(vars.color_scheme, "dark");
    }

    #[test]
    fn test_same_font_loaded_once() {
        let theme = ThemeSettings::default()
            .apply(ThemeUpdate {
                heading_font: Some("Inter".into()),
                body_font: Some("Inter".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ThemeVariables::build(&theme).font_urls.len(), 1);
    }

    #[test]
    fn test_legacy_font_falls_back() {
        let mut theme = ThemeSettings::default();
        theme.heading_font = "x'; } body { display:none".to_string();
        let vars = ThemeVariables::build(&theme);
        assert_eq!(
            vars.variables["--font-display"],
            "'DM Serif Display', Georgia, serif"
        );
    }

    #[test]
    fn test_stored_hover_drives_dark_variant() {
        let theme = ThemeSettings::default()
            .apply(ThemeUpdate {
                accent_color: Some("#2563EB".into()),
                accent_color_hover: Some("#112233".into()),
                ..Default::default()
            })
            .unwrap();
        let vars = ThemeVariables::build(&theme);
        let hover = HexColor::parse("#112233").unwrap().to_oklch().to_string();
        assert_eq!(vars.variables["--color-terracotta-dark"], hover);
        assert_eq!(vars.variables["--sidebar-primary"], hover);
        assert_eq!(vars.variables["--accent-hover-hex"], "#112233");
    }

    #[test]
    fn test_stylesheet_rendering() {
        let css = ThemeVariables::build(&ThemeSettings::default()).to_stylesheet();
        assert!(css.starts_with("@import url('https://fonts.googleapis.com/css2?family="));
        assert!(css.contains(":root {\n"));
        assert!(css.contains("  --accent-hex: #B85C38;\n"));
        assert!(css.contains("  color-scheme: light;\n"));
        assert!(css.trim_end().ends_with('}'));
    }
}
