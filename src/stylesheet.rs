use std::collections::HashMap;

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlStyleElement};

use crate::{
    error::{Error, Result},
    font::Font,
};

const CSS_ENDPOINT: &str = "https://fonts.googleapis.com/css";

/// Height of a dropdown row in the base styles.
pub const ITEM_HEIGHT: f64 = 35.0;
/// Rows visible at once in the expanded list.
const VISIBLE_ITEMS: f64 = 6.0;

/// Which of a font's stylesheets a DOM node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    /// Only the glyphs of the family name.
    Preview,
    /// All requested variants and scripts.
    Full,
}

impl SheetKind {
    fn as_str(self) -> &'static str {
        match self {
            SheetKind::Preview => "preview",
            SheetKind::Full => "full",
        }
    }
}

/// Joins query parameters onto `endpoint`, URI-encoding every value.
pub fn to_url(endpoint: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| {
            format!("{key}={}", String::from(js_sys::encode_uri_component(value)))
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{endpoint}?{query}")
}

/// Variant used to render a font's name in the list.
fn preview_variant(font: &Font) -> &str {
    if font.variants.iter().any(|v| v == "regular") || font.variants.is_empty() {
        "regular"
    } else {
        &font.variants[0]
    }
}

/// Query for a single request covering the previews of several fonts.
pub fn preview_query(fonts: &[&Font]) -> Vec<(&'static str, String)> {
    let family = fonts
        .iter()
        .map(|f| format!("{}:{}", f.family, preview_variant(f)))
        .collect::<Vec<_>>()
        .join("|");

    let mut text = String::new();
    for c in fonts.iter().flat_map(|f| f.family.chars()) {
        if !c.is_whitespace() && !text.contains(c) {
            text.push(c);
        }
    }

    vec![
        ("family", family),
        ("text", text),
        ("font-display", "swap".to_owned()),
    ]
}

/// Query for the complete stylesheet of one font.
///
/// Requests the wanted variants the font provides, or its preview variant if
/// it provides none of them.
pub fn full_query(font: &Font, scripts: &[String], variants: &[String]) -> Vec<(&'static str, String)> {
    let mut chosen: Vec<&str> = variants
        .iter()
        .filter(|v| font.variants.contains(v))
        .map(String::as_str)
        .collect();
    if chosen.is_empty() {
        chosen.push(preview_variant(font));
    }

    vec![
        ("family", format!("{}:{}", font.family, chosen.join(","))),
        ("subset", scripts.join(",")),
        ("font-display", "swap".to_owned()),
    ]
}

pub fn preview_url(fonts: &[&Font]) -> String {
    to_url(CSS_ENDPOINT, &preview_query(fonts))
}

pub fn full_url(font: &Font, scripts: &[String], variants: &[String]) -> String {
    to_url(CSS_ENDPOINT, &full_query(font, scripts, variants))
}

/// Splits a CSS API response into the `@font-face` rules of each family.
pub fn split_font_faces(css: &str) -> HashMap<String, String> {
    let mut faces: HashMap<String, String> = HashMap::new();
    let mut rest = css;
    while let Some(start) = rest.find("@font-face") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let rule = &rest[start..=start + len];
        rest = &rest[start + len + 1..];

        let Some(family) = face_family(rule) else {
            continue;
        };
        let entry = faces.entry(family).or_default();
        if !entry.is_empty() {
            entry.push('\n');
        }
        entry.push_str(rule);
    }
    faces
}

fn face_family(rule: &str) -> Option<String> {
    let decl = &rule[rule.find("font-family")? + "font-family".len()..];
    let value = decl.trim_start().strip_prefix(':')?;
    let value = &value[..value.find([';', '}'])?];
    Some(value.trim().trim_matches(['\'', '"']).to_owned())
}

/// Renders a list entry in its own font.
pub fn preview_rule(font: &Font, suffix: &str) -> String {
    format!(
        "#font-picker{suffix} .font-{}{suffix} {{ font-family: \"{}\"; }}",
        font.id, font.family
    )
}

/// Applies the active font to the dropdown button and to `.apply-font` elements.
pub fn active_rule(font: &Font, suffix: &str) -> String {
    format!(
        "#font-picker{suffix} .dropdown-font-family, .apply-font{suffix} {{ font-family: \"{}\"; }}",
        font.family
    )
}

/// Layout of the dropdown itself. The list only shows while `.expanded` and
/// scrolls within a fixed height.
pub fn base_rules(suffix: &str) -> String {
    let root = format!("#font-picker{suffix}");
    let max_height = ITEM_HEIGHT * VISIBLE_ITEMS;
    format!(
        "{root} {{ position: relative; display: inline-block; width: 200px; \
         box-shadow: 0 1px 3px rgba(0, 0, 0, 0.2); }}
{root} .dropdown-button {{ display: flex; align-items: center; justify-content: space-between; \
         height: {ITEM_HEIGHT}px; padding: 0 10px; background: #cbcbcb; cursor: pointer; }}
{root} .dropdown-font-family {{ margin: 0; overflow: hidden; white-space: nowrap; text-overflow: ellipsis; }}
{root} .dropdown-icon {{ margin: 0 0 0 10px; }}
{root} .dropdown-icon.loading::before {{ content: \"\\2026\"; }}
{root} .dropdown-icon.finished::before {{ content: \"\\25BE\"; }}
{root} .dropdown-icon.error::before {{ content: \"\\26A0\"; }}
{root} .font-list {{ display: none; position: absolute; z-index: 1; width: 100%; margin: 0; padding: 0; \
         list-style: none; background: #eaeaea; }}
{root} .font-list.expanded {{ display: block; max-height: {max_height}px; overflow-y: auto; }}
{root} .font-list li {{ height: {ITEM_HEIGHT}px; }}
{root} .font-button {{ width: 100%; height: 100%; padding: 0 10px; border: none; background: none; \
         text-align: left; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; cursor: pointer; }}
{root} .font-button:hover, {root} .font-button:focus {{ background: #dddddd; }}
{root} .font-button.active-font {{ background: #d1d1d1; }}"
    )
}

/// The `<style>` nodes a picker owns in the document head.
pub struct Stylesheets {
    document: Document,
    suffix: String,
}

impl Stylesheets {
    pub fn new(document: Document, suffix: String) -> Self {
        Self { document, suffix }
    }

    fn sheet_id(&self, kind: SheetKind, font_id: &str) -> String {
        format!("font-picker-{}-{font_id}{}", kind.as_str(), self.suffix)
    }

    /// Creates or replaces the stylesheet node of a font.
    pub fn insert(&self, kind: SheetKind, font: &Font, css: &str) -> Result<()> {
        let rules = format!("{css}\n{}", preview_rule(font, &self.suffix));
        self.set_style(&self.sheet_id(kind, &font.id), &rules)
    }

    pub fn remove(&self, kind: SheetKind, font_id: &str) {
        if let Some(node) = self.document.get_element_by_id(&self.sheet_id(kind, font_id)) {
            node.remove();
        }
    }

    pub fn set_base(&self) -> Result<()> {
        self.set_style(
            &format!("font-picker-base{}", self.suffix),
            &base_rules(&self.suffix),
        )
    }

    pub fn set_active(&self, font: &Font) -> Result<()> {
        self.set_style(
            &format!("font-picker-active{}", self.suffix),
            &active_rule(font, &self.suffix),
        )
    }

    fn set_style(&self, id: &str, css: &str) -> Result<()> {
        let style: HtmlStyleElement = match self.document.get_element_by_id(id) {
            Some(node) => node.dyn_into().map_err(|e| Error::js(e.into()))?,
            None => {
                let style: HtmlStyleElement = self
                    .document
                    .create_element("style")
                    .map_err(Error::js)?
                    .dyn_into()
                    .map_err(|e| Error::js(e.into()))?;
                style.set_id(id);
                self.document
                    .head()
                    .ok_or(Error::MissingDom("document head"))?
                    .append_child(&style)
                    .map_err(Error::js)?;
                style
            }
        };
        style.set_text_content(Some(css));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn font(family: &str, variants: &[&str]) -> Font {
        Font::new(
            family,
            None,
            vec!["latin".into()],
            variants.iter().map(|v| v.to_string()).collect(),
        )
    }

    #[test]
    fn preview_query_batches_families_and_dedups_text() {
        let open_sans = font("Open Sans", &["regular", "700"]);
        let noto = font("Noto Sans", &["700", "900"]);
        assert_eq!(
            preview_query(&[&open_sans, &noto]),
            vec![
                ("family", "Open Sans:regular|Noto Sans:700".to_owned()),
                ("text", "OpenSasNot".to_owned()),
                ("font-display", "swap".to_owned()),
            ]
        );
    }

    #[test]
    fn full_query_requests_supported_variants() {
        let roboto = font("Roboto", &["regular", "italic", "700"]);
        let scripts = vec!["latin".to_owned(), "greek".to_owned()];
        let query = full_query(&roboto, &scripts, &["700".into(), "900".into(), "regular".into()]);
        assert_eq!(query[0], ("family", "Roboto:700,regular".to_owned()));
        assert_eq!(query[1], ("subset", "latin,greek".to_owned()));
    }

    #[test]
    fn full_query_falls_back_to_preview_variant() {
        let bold_only = font("Bold Only", &["800"]);
        let query = full_query(&bold_only, &["latin".into()], &["regular".into()]);
        assert_eq!(query[0], ("family", "Bold Only:800".to_owned()));
    }

    #[test]
    fn splits_faces_by_family() {
        let css = "/* cyrillic */\n@font-face {\n  font-family: 'Open Sans';\n  font-weight: 400;\n  src: url(a.woff2) format('woff2');\n}\n\
                   /* latin */\n@font-face {\n  font-family: 'Open Sans';\n  font-weight: 400;\n  src: url(b.woff2) format('woff2');\n}\n\
                   @font-face {\n  font-family: \"Lora\";\n  src: url(c.woff2);\n}\n";
        let faces = split_font_faces(css);
        assert_eq!(faces.len(), 2);
        assert_eq!(faces["Open Sans"].matches("@font-face").count(), 2);
        assert!(faces["Open Sans"].contains("b.woff2"));
        assert!(faces["Lora"].ends_with('}'));
    }

    #[test]
    fn split_ignores_unterminated_and_anonymous_rules() {
        assert!(split_font_faces("@font-face { src: url(x); }").is_empty());
        assert!(split_font_faces("@font-face { font-family: 'A';").is_empty());
        assert!(split_font_faces("").is_empty());
    }

    #[test]
    fn base_rules_hide_collapsed_list_and_scroll_expanded_one() {
        let css = base_rules("-side");
        assert!(css.contains("#font-picker-side .font-list { display: none;"));
        assert!(css.contains(
            "#font-picker-side .font-list.expanded { display: block; max-height: 210px; overflow-y: auto; }"
        ));
        assert!(css.contains("#font-picker-side .font-list li { height: 35px; }"));
        assert!(!css.contains("#font-picker .font-list"));
    }

    #[test]
    fn rules_use_suffix() {
        let lato = font("Lato", &["regular"]);
        assert_eq!(
            preview_rule(&lato, "-side"),
            "#font-picker-side .font-lato-side { font-family: \"Lato\"; }"
        );
        assert_eq!(
            active_rule(&lato, ""),
            "#font-picker .dropdown-font-family, .apply-font { font-family: \"Lato\"; }"
        );
    }
}
