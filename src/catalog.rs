use log::{debug, info};
use serde::Deserialize;

use crate::{
    error::Result,
    fetch,
    font::{Font, FontList},
    options::{Category, Options, SortOrder},
};

const CATALOG_ENDPOINT: &str = "https://www.googleapis.com/webfonts/v1/webfonts";

#[derive(Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    items: Vec<CatalogItem>,
}

#[derive(Deserialize)]
struct CatalogItem {
    family: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    subsets: Vec<String>,
    #[serde(default)]
    variants: Vec<String>,
    kind: Option<String>,
}

impl From<CatalogItem> for Font {
    fn from(item: CatalogItem) -> Self {
        let mut font = Font::new(
            item.family,
            Category::from_name(&item.category),
            item.subsets,
            item.variants,
        );
        if let Some(kind) = item.kind {
            font.kind = kind;
        }
        font
    }
}

pub fn catalog_url(api_key: &str) -> String {
    format!(
        "{CATALOG_ENDPOINT}?sort=popularity&key={}",
        String::from(js_sys::encode_uri_component(api_key))
    )
}

/// Parses the catalog response body. Fonts keep the API's popularity order.
pub fn parse_catalog(body: &str) -> Result<Vec<Font>> {
    let response: CatalogResponse = serde_json::from_str(body)?;
    Ok(response.items.into_iter().map(Font::from).collect())
}

pub async fn fetch_catalog(api_key: &str) -> Result<Vec<Font>> {
    debug!("requesting font catalog");
    let fonts = parse_catalog(&fetch::get_text(&catalog_url(api_key)).await?)?;
    info!("font catalog lists {} families", fonts.len());
    Ok(fonts)
}

/// Selects the fonts a picker shows, in display order.
///
/// `accept` is the caller's own predicate, applied after the option filters.
///
/// The default family is always part of the result: it is taken from the
/// catalog even when the filters exclude it, or synthesized if the catalog
/// does not know it, and it is never cut off by `limit`.
pub fn filter_catalog<F>(
    catalog: &[Font],
    options: &Options,
    default_family: &str,
    accept: F,
) -> FontList
where
    F: Fn(&Font) -> bool,
{
    let mut fonts: Vec<Font> = catalog
        .iter()
        .filter(|font| {
            (options.families.is_empty() || options.families.contains(&font.family))
                && (options.categories.is_empty()
                    || font.category.is_some_and(|c| options.categories.contains(&c)))
                && font.supports_scripts(&options.scripts)
                && font.supports_variants(&options.variants)
                && accept(font)
        })
        .take(options.limit)
        .cloned()
        .collect();

    if !fonts.iter().any(|f| f.family == default_family) {
        let default = catalog
            .iter()
            .find(|f| f.family == default_family)
            .cloned()
            .unwrap_or_else(|| Font::fallback(default_family));
        if options.limit > 0 && fonts.len() >= options.limit {
            fonts.pop();
        }
        fonts.insert(0, default);
    }

    if options.sort == SortOrder::Alphabet {
        fonts.sort_by(|a, b| a.family.cmp(&b.family));
    }
    FontList::new(fonts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &str = r#"{
        "kind": "webfonts#webfontList",
        "items": [
            { "kind": "webfonts#webfont", "family": "Roboto", "category": "sans-serif",
              "variants": ["regular", "italic", "700"], "subsets": ["latin", "cyrillic", "greek"] },
            { "family": "Open Sans", "category": "sans-serif",
              "variants": ["regular", "700"], "subsets": ["latin", "cyrillic"] },
            { "family": "Lora", "category": "serif",
              "variants": ["regular", "italic"], "subsets": ["latin"] },
            { "family": "Pacifico", "category": "handwriting",
              "variants": ["regular"], "subsets": ["latin", "vietnamese"] },
            { "family": "Noto Sans JP", "category": "sans-serif",
              "variants": ["700"], "subsets": ["japanese"] },
            { "family": "Wavy", "category": "experimental",
              "variants": ["regular"], "subsets": ["latin"] }
        ]
    }"#;

    fn families(list: &FontList) -> Vec<&str> {
        list.iter().map(|f| f.family.as_str()).collect()
    }

    #[test]
    fn parses_items_in_popularity_order() {
        let fonts = parse_catalog(BODY).unwrap();
        assert_eq!(fonts.len(), 6);
        assert_eq!(fonts[1].family, "Open Sans");
        assert_eq!(fonts[1].id, "open-sans");
        assert_eq!(fonts[1].scripts, vec!["latin", "cyrillic"]);
        assert_eq!(fonts[4].category, Some(Category::SansSerif));
        assert_eq!(fonts[5].category, None);
    }

    #[test]
    fn empty_or_malformed_bodies() {
        assert!(parse_catalog("{}").unwrap().is_empty());
        assert!(parse_catalog("<html>").is_err());
        assert!(parse_catalog(r#"{ "items": [{ "category": "serif" }] }"#).is_err());
    }

    #[test]
    fn default_options_sort_alphabetically() {
        let catalog = parse_catalog(BODY).unwrap();
        let list = filter_catalog(&catalog, &Options::default(), "Open Sans", |_| true);
        assert_eq!(
            families(&list),
            vec!["Lora", "Open Sans", "Pacifico", "Roboto", "Wavy"]
        );
    }

    #[test]
    fn filters_by_category_and_script() {
        let catalog = parse_catalog(BODY).unwrap();
        let options = Options {
            categories: vec![Category::SansSerif],
            scripts: vec!["latin".into(), "cyrillic".into()],
            sort: SortOrder::Popularity,
            ..Default::default()
        };
        assert_eq!(families(&filter_catalog(&catalog, &options, "Roboto", |_| true)), vec!["Roboto", "Open Sans"]);
    }

    #[test]
    fn filters_by_families_and_variants() {
        let catalog = parse_catalog(BODY).unwrap();
        let options = Options {
            families: vec!["Lora".into(), "Pacifico".into(), "Roboto".into()],
            variants: vec!["italic".into()],
            ..Default::default()
        };
        assert_eq!(families(&filter_catalog(&catalog, &options, "Lora", |_| true)), vec!["Lora", "Roboto"]);
    }

    #[test]
    fn default_family_survives_filters_and_limit() {
        let catalog = parse_catalog(BODY).unwrap();
        let options = Options {
            categories: vec![Category::Serif, Category::Handwriting],
            limit: 2,
            sort: SortOrder::Popularity,
            ..Default::default()
        };
        let list = filter_catalog(&catalog, &options, "Roboto", |_| true);
        assert_eq!(families(&list), vec!["Roboto", "Lora"]);
        assert_eq!(list.get("Roboto").unwrap().variants.len(), 3);
    }

    #[test]
    fn applies_caller_predicate() {
        let catalog = parse_catalog(BODY).unwrap();
        let short_names = |font: &Font| font.family.len() <= 4;
        let list = filter_catalog(&catalog, &Options::default(), "Lora", short_names);
        assert_eq!(families(&list), vec!["Lora", "Wavy"]);
    }

    #[test]
    fn predicate_does_not_drop_default_family() {
        let catalog = parse_catalog(BODY).unwrap();
        let list = filter_catalog(&catalog, &Options::default(), "Open Sans", |_| false);
        assert_eq!(families(&list), vec!["Open Sans"]);
        assert_eq!(list.get("Open Sans").unwrap().scripts, vec!["latin", "cyrillic"]);
    }

    #[test]
    fn unknown_default_family_is_synthesized() {
        let catalog = parse_catalog(BODY).unwrap();
        let options = Options {
            families: vec!["Lora".into()],
            ..Default::default()
        };
        let list = filter_catalog(&catalog, &options, "My Brand", |_| true);
        assert_eq!(families(&list), vec!["Lora", "My Brand"]);
        assert_eq!(list.get("My Brand").unwrap().id, "my-brand");
    }
}
