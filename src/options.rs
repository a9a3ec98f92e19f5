use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};

use crate::{
    error::{Error, Result},
    font::Font,
};

pub const DEFAULT_FAMILY: &str = "Open Sans";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    SansSerif,
    Serif,
    Display,
    Handwriting,
    Monospace,
}

impl Category {
    /// Maps the API's category names; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sans-serif" => Category::SansSerif,
            "serif" => Category::Serif,
            "display" => Category::Display,
            "handwriting" => Category::Handwriting,
            "monospace" => Category::Monospace,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Alphabet,
    Popularity,
}

/// Picker configuration as passed from JS. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Distinguishes the DOM nodes of several pickers on one page.
    pub picker_id: String,
    pub families: Vec<String>,
    pub categories: Vec<Category>,
    /// Required scripts, requested from the API as subsets.
    pub scripts: Vec<String>,
    /// Required variants, requested for the full stylesheet.
    pub variants: Vec<String>,
    pub limit: usize,
    pub sort: SortOrder,
    /// `filter(font) -> boolean` from JS, read off the object by hand.
    #[serde(skip)]
    pub filter: Option<js_sys::Function>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            picker_id: String::new(),
            families: Vec::new(),
            categories: Vec::new(),
            scripts: vec!["latin".to_owned()],
            variants: vec!["regular".to_owned()],
            limit: 50,
            sort: SortOrder::Alphabet,
            filter: None,
        }
    }
}

impl Options {
    pub fn from_js(value: JsValue) -> Result<Self> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        let filter = js_sys::Reflect::get(&value, &JsValue::from_str("filter")).map_err(Error::js)?;
        let mut options: Options = serde_wasm_bindgen::from_value(value)?;
        if !filter.is_undefined() && !filter.is_null() {
            let filter = filter
                .dyn_into::<js_sys::Function>()
                .map_err(|_| Error::Options("filter must be a function".to_owned()))?;
            options.filter = Some(filter);
        }
        Ok(options)
    }

    /// Runs the JS `filter` on `font`. Fonts pass when no filter is set.
    pub fn accepts(&self, font: &Font) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };
        let value = match serde_wasm_bindgen::to_value(font) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("could not pass '{}' to filter: {err}", font.family);
                return false;
            }
        };
        match filter.call1(&JsValue::NULL, &value) {
            Ok(keep) => keep.is_truthy(),
            Err(err) => {
                log::warn!("filter threw for '{}': {}", font.family, Error::js(err));
                false
            }
        }
    }

    /// Appended to every id and class the picker generates.
    pub fn selector_suffix(&self) -> String {
        if self.picker_id.is_empty() {
            String::new()
        } else {
            format!("-{}", self.picker_id)
        }
    }
}
