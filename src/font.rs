use serde::Serialize;

use crate::options::Category;

/// Metadata of a single catalog font.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    pub family: String,
    /// Normalized family name used in DOM ids and class names.
    pub id: String,
    pub category: Option<Category>,
    pub scripts: Vec<String>,
    pub variants: Vec<String>,
    pub kind: String,
}

impl Font {
    pub fn new(
        family: impl Into<String>,
        category: Option<Category>,
        scripts: Vec<String>,
        variants: Vec<String>,
    ) -> Self {
        let family = family.into();
        Self {
            id: font_id(&family),
            family,
            category,
            scripts,
            variants,
            kind: "webfonts#webfont".to_owned(),
        }
    }

    /// A stand-in for a family that the catalog does not know about.
    pub fn fallback(family: &str) -> Self {
        Self::new(
            family,
            Some(Category::SansSerif),
            vec!["latin".to_owned()],
            vec!["regular".to_owned()],
        )
    }

    pub fn supports_scripts(&self, scripts: &[String]) -> bool {
        scripts.iter().all(|s| self.scripts.contains(s))
    }

    pub fn supports_variants(&self, variants: &[String]) -> bool {
        variants.iter().all(|v| self.variants.contains(v))
    }
}

/// `"Open Sans"` -> `"open-sans"`
pub fn font_id(family: &str) -> String {
    family
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// The fonts shown by a picker, in display order.
#[derive(Debug, Clone, Default)]
pub struct FontList {
    fonts: Vec<Font>,
}

impl FontList {
    pub fn new(fonts: Vec<Font>) -> Self {
        Self { fonts }
    }

    pub fn get(&self, family: &str) -> Option<&Font> {
        self.fonts.iter().find(|f| f.family == family)
    }

    pub fn position(&self, family: &str) -> Option<usize> {
        self.fonts.iter().position(|f| f.family == family)
    }

    pub fn contains(&self, family: &str) -> bool {
        self.position(family).is_some()
    }

    /// Inserts `font` keeping an alphabetical list alphabetical; otherwise appends.
    /// Returns false if the family is already listed.
    pub fn insert(&mut self, font: Font, alphabetical: bool) -> bool {
        if self.contains(&font.family) {
            return false;
        }
        if alphabetical {
            let idx = self.fonts.partition_point(|f| f.family < font.family);
            self.fonts.insert(idx, font);
        } else {
            self.fonts.push(font);
        }
        true
    }

    pub fn remove(&mut self, family: &str) -> Option<Font> {
        let idx = self.position(family)?;
        Some(self.fonts.remove(idx))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Font> {
        self.fonts.iter()
    }

    pub fn as_slice(&self) -> &[Font] {
        &self.fonts
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
