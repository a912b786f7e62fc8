//! Curated font allow-lists. Font names end up inside CSS values and
//! stylesheet URLs, so only these exact names are accepted.

use super::ThemeError;

pub const HEADING_FONTS: &[&str] = &[
    "DM Serif Display",
    "Playfair Display",
    "Lora",
    "Merriweather",
    "Cormorant Garamond",
    "Libre Baskerville",
    "EB Garamond",
    "Crimson Text",
    "Bitter",
    "Josefin Sans",
    "Montserrat",
    "Raleway",
    "Poppins",
    "Inter",
    "Space Grotesk",
];

pub const BODY_FONTS: &[&str] = &[
    "DM Sans",
    "Inter",
    "Poppins",
    "Nunito",
    "Open Sans",
    "Lato",
    "Source Sans 3",
    "Roboto",
    "Work Sans",
    "Outfit",
    "Plus Jakarta Sans",
    "Manrope",
    "Figtree",
    "Geist",
    "IBM Plex Sans",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Heading,
    Body,
}

impl FontRole {
    fn allowed(self) -> &'static [&'static str] {
        match self {
            FontRole::Heading => HEADING_FONTS,
            FontRole::Body => BODY_FONTS,
        }
    }
}

pub fn validate_font(role: FontRole, name: &str) -> Result<(), ThemeError> {
    if role.allowed().contains(&name) {
        Ok(())
    } else {
        Err(ThemeError::UnknownFont(name.to_string()))
    }
}

/// Google Fonts stylesheet for a font name (weights 300..700).
pub fn stylesheet_url(name: &str) -> String {
    format!(
        "https://fonts.googleapis.com/css2?family={}:wght@300;400;500;600;700&display=swap",
        name.replace(' ', "+")
    )
}
