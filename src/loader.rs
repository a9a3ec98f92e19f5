use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::{debug, warn};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use crate::{
    error::{Error, Result},
    fetch,
    font::Font,
    stylesheet::{self, SheetKind, Stylesheets},
};

/// Upper bound of families per preview request, keeps URLs short.
const PREVIEW_BATCH: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Slot {
    #[default]
    Missing,
    Pending,
    Loaded,
}

#[derive(Debug, Clone, Copy, Default)]
struct FontAssets {
    preview: Slot,
    full: Slot,
}

/// What has to happen before a font can become the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePlan {
    AlreadyFull,
    FullPending,
    /// The preview stylesheet is replaced once the full one arrives.
    UpgradeFromPreview,
    LoadFull,
}

/// How a caller waiting for a full stylesheet proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullStep {
    Done,
    /// Join the request already in flight.
    Await,
    Start,
}

/// Tracks which stylesheets each font has and decides what to request next.
///
/// A font never holds both stylesheets for long: a full stylesheet supersedes
/// the preview, and a preview arriving after the full stylesheet was requested
/// is dropped.
#[derive(Debug, Default)]
pub struct LoadPolicy {
    assets: HashMap<String, FontAssets>,
}

impl LoadPolicy {
    fn slot(&self, font_id: &str) -> FontAssets {
        self.assets.get(font_id).copied().unwrap_or_default()
    }

    fn slot_mut(&mut self, font_id: &str) -> &mut FontAssets {
        self.assets.entry(font_id.to_owned()).or_default()
    }

    /// Fonts that have no stylesheet and no request in flight.
    pub fn previews_needed<'a>(&self, fonts: &'a [Font]) -> Vec<&'a Font> {
        fonts
            .iter()
            .filter(|f| {
                let assets = self.slot(&f.id);
                assets.preview == Slot::Missing && assets.full == Slot::Missing
            })
            .collect()
    }

    pub fn plan_active(&self, font_id: &str) -> ActivePlan {
        let assets = self.slot(font_id);
        match (assets.full, assets.preview) {
            (Slot::Loaded, _) => ActivePlan::AlreadyFull,
            (Slot::Pending, _) => ActivePlan::FullPending,
            (Slot::Missing, Slot::Missing) => ActivePlan::LoadFull,
            (Slot::Missing, _) => ActivePlan::UpgradeFromPreview,
        }
    }

    /// `in_flight` tells whether a joinable request for the font exists.
    pub fn full_step(&self, font_id: &str, in_flight: bool) -> FullStep {
        match self.plan_active(font_id) {
            ActivePlan::AlreadyFull => FullStep::Done,
            ActivePlan::FullPending if in_flight => FullStep::Await,
            ActivePlan::FullPending | ActivePlan::UpgradeFromPreview | ActivePlan::LoadFull => {
                FullStep::Start
            }
        }
    }

    pub fn mark_pending(&mut self, font_id: &str, kind: SheetKind) {
        let assets = self.slot_mut(font_id);
        match kind {
            SheetKind::Preview => assets.preview = Slot::Pending,
            SheetKind::Full => assets.full = Slot::Pending,
        }
    }

    /// Records an arrived stylesheet. Returns whether it should be injected.
    ///
    /// Fonts forgotten while their request was in flight are ignored.
    pub fn mark_loaded(&mut self, font_id: &str, kind: SheetKind) -> bool {
        let Some(assets) = self.assets.get_mut(font_id) else {
            return false;
        };
        match kind {
            SheetKind::Preview if assets.full != Slot::Missing => {
                assets.preview = Slot::Missing;
                false
            }
            SheetKind::Preview => {
                assets.preview = Slot::Loaded;
                true
            }
            SheetKind::Full => {
                assets.full = Slot::Loaded;
                assets.preview = Slot::Missing;
                true
            }
        }
    }

    pub fn mark_failed(&mut self, font_id: &str, kind: SheetKind) {
        let Some(assets) = self.assets.get_mut(font_id) else {
            return;
        };
        match kind {
            SheetKind::Preview => assets.preview = Slot::Missing,
            SheetKind::Full => assets.full = Slot::Missing,
        }
    }

    /// Forgets a font, e.g. after it was removed from the list.
    pub fn forget(&mut self, font_id: &str) {
        self.assets.remove(font_id);
    }
}

/// Fetches stylesheets as the policy dictates and injects them.
pub struct Loader {
    policy: Rc<RefCell<LoadPolicy>>,
    sheets: Rc<Stylesheets>,
    /// Full stylesheet requests in flight, by font id. Later callers join them.
    in_flight: Rc<RefCell<HashMap<String, js_sys::Promise>>>,
    scripts: Vec<String>,
    variants: Vec<String>,
}

impl Loader {
    pub fn new(sheets: Stylesheets, scripts: Vec<String>, variants: Vec<String>) -> Self {
        Self {
            policy: Rc::default(),
            sheets: Rc::new(sheets),
            in_flight: Rc::default(),
            scripts,
            variants,
        }
    }

    pub fn sheets(&self) -> &Stylesheets {
        &self.sheets
    }

    /// Requests previews for those of `fonts` that have no stylesheet yet.
    pub async fn load_previews(&self, fonts: &[Font]) -> Result<()> {
        let needed: Vec<Font> = {
            let mut policy = self.policy.borrow_mut();
            let needed: Vec<Font> = policy.previews_needed(fonts).into_iter().cloned().collect();
            for font in &needed {
                policy.mark_pending(&font.id, SheetKind::Preview);
            }
            needed
        };

        let mut result = Ok(());
        for batch in needed.chunks(PREVIEW_BATCH) {
            if let Err(err) = self.load_preview_batch(batch).await {
                warn!("loading previews failed: {err}");
                result = Err(err);
            }
        }
        result
    }

    async fn load_preview_batch(&self, batch: &[Font]) -> Result<()> {
        let refs: Vec<&Font> = batch.iter().collect();
        debug!("loading previews of {} fonts", batch.len());
        let css = match fetch::get_text(&stylesheet::preview_url(&refs)).await {
            Ok(css) => css,
            Err(err) => {
                let mut policy = self.policy.borrow_mut();
                for font in batch {
                    policy.mark_failed(&font.id, SheetKind::Preview);
                }
                return Err(err);
            }
        };

        let faces = stylesheet::split_font_faces(&css);
        for font in batch {
            match faces.get(&font.family) {
                Some(face) => {
                    if self.policy.borrow_mut().mark_loaded(&font.id, SheetKind::Preview) {
                        self.sheets.insert(SheetKind::Preview, font, face)?;
                    }
                }
                None => {
                    debug!("no preview returned for '{}'", font.family);
                    self.policy.borrow_mut().mark_failed(&font.id, SheetKind::Preview);
                }
            }
        }
        Ok(())
    }

    /// Resolves once the full stylesheet of `font` is in the document.
    pub async fn load_full(&self, font: &Font) -> Result<()> {
        let joinable = self.in_flight.borrow().get(&font.id).cloned();
        let step = self.policy.borrow().full_step(&font.id, joinable.is_some());
        debug!("activating '{}': {step:?}", font.family);
        let request = match (step, joinable) {
            (FullStep::Done, _) => return Ok(()),
            (FullStep::Await, Some(request)) => request,
            _ => self.request_full(font),
        };
        JsFuture::from(request).await.map(|_| ()).map_err(Error::js)
    }

    fn request_full(&self, font: &Font) -> js_sys::Promise {
        self.policy.borrow_mut().mark_pending(&font.id, SheetKind::Full);
        let url = stylesheet::full_url(font, &self.scripts, &self.variants);
        let policy = self.policy.clone();
        let sheets = self.sheets.clone();
        let in_flight = self.in_flight.clone();
        let id = font.id.clone();
        let font = font.clone();

        let request = future_to_promise(async move {
            let result = fetch::get_text(&url).await;
            in_flight.borrow_mut().remove(&font.id);
            let css = match result {
                Ok(css) => css,
                Err(err) => {
                    policy.borrow_mut().mark_failed(&font.id, SheetKind::Full);
                    return Err(err.into());
                }
            };
            if policy.borrow_mut().mark_loaded(&font.id, SheetKind::Full) {
                sheets.insert(SheetKind::Full, &font, &css)?;
                sheets.remove(SheetKind::Preview, &font.id);
            }
            Ok(JsValue::UNDEFINED)
        });
        self.in_flight
            .borrow_mut()
            .insert(id, request.clone());
        request
    }

    pub fn forget(&self, font: &Font) {
        self.policy.borrow_mut().forget(&font.id);
        self.in_flight.borrow_mut().remove(&font.id);
        self.sheets.remove(SheetKind::Preview, &font.id);
        self.sheets.remove(SheetKind::Full, &font.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fonts(families: &[&str]) -> Vec<Font> {
        families.iter().map(|f| Font::fallback(f)).collect()
    }

    fn ids(fonts: Vec<&Font>) -> Vec<&str> {
        fonts.into_iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn pending_and_loaded_fonts_need_no_preview() {
        let list = fonts(&["Arvo", "Cabin", "Lato", "Lora"]);
        let mut policy = LoadPolicy::default();
        policy.mark_pending("arvo", SheetKind::Preview);
        policy.mark_pending("cabin", SheetKind::Preview);
        assert!(policy.mark_loaded("cabin", SheetKind::Preview));
        policy.mark_pending("lora", SheetKind::Full);
        assert_eq!(ids(policy.previews_needed(&list)), vec!["lato"]);
    }

    #[test]
    fn failed_preview_is_retried_on_next_pass() {
        let list = fonts(&["Arvo"]);
        let mut policy = LoadPolicy::default();
        policy.mark_pending("arvo", SheetKind::Preview);
        policy.mark_failed("arvo", SheetKind::Preview);
        assert_eq!(ids(policy.previews_needed(&list)), vec!["arvo"]);
    }

    #[test]
    fn plans_active_font() {
        let mut policy = LoadPolicy::default();
        assert_eq!(policy.plan_active("arvo"), ActivePlan::LoadFull);

        policy.mark_pending("arvo", SheetKind::Preview);
        assert_eq!(policy.plan_active("arvo"), ActivePlan::UpgradeFromPreview);
        policy.mark_loaded("arvo", SheetKind::Preview);
        assert_eq!(policy.plan_active("arvo"), ActivePlan::UpgradeFromPreview);

        policy.mark_pending("arvo", SheetKind::Full);
        assert_eq!(policy.plan_active("arvo"), ActivePlan::FullPending);
        assert!(policy.mark_loaded("arvo", SheetKind::Full));
        assert_eq!(policy.plan_active("arvo"), ActivePlan::AlreadyFull);
    }

    #[test]
    fn full_stylesheet_never_regresses_to_preview() {
        let mut policy = LoadPolicy::default();
        policy.mark_pending("lato", SheetKind::Preview);
        policy.mark_pending("lato", SheetKind::Full);
        assert!(policy.mark_loaded("lato", SheetKind::Full));
        assert!(!policy.mark_loaded("lato", SheetKind::Preview));
        assert_eq!(policy.plan_active("lato"), ActivePlan::AlreadyFull);
        assert!(policy.previews_needed(&fonts(&["Lato"])).is_empty());
    }

    #[test]
    fn preview_arriving_while_full_pending_is_dropped() {
        let mut policy = LoadPolicy::default();
        policy.mark_pending("lato", SheetKind::Preview);
        policy.mark_pending("lato", SheetKind::Full);
        assert!(!policy.mark_loaded("lato", SheetKind::Preview));
        policy.mark_failed("lato", SheetKind::Full);
        assert_eq!(policy.plan_active("lato"), ActivePlan::LoadFull);
    }

    #[test]
    fn full_load_waits_for_request_in_flight() {
        let mut policy = LoadPolicy::default();
        assert_eq!(policy.full_step("lato", false), FullStep::Start);
        policy.mark_pending("lato", SheetKind::Full);
        assert_eq!(policy.plan_active("lato"), ActivePlan::FullPending);
        assert_eq!(policy.full_step("lato", true), FullStep::Await);
        // Nothing to join: request again rather than report success.
        assert_eq!(policy.full_step("lato", false), FullStep::Start);
        policy.mark_loaded("lato", SheetKind::Full);
        assert_eq!(policy.full_step("lato", true), FullStep::Done);
    }

    #[test]
    fn failed_full_load_can_be_retried() {
        let mut policy = LoadPolicy::default();
        policy.mark_pending("lato", SheetKind::Preview);
        policy.mark_loaded("lato", SheetKind::Preview);
        policy.mark_pending("lato", SheetKind::Full);
        policy.mark_failed("lato", SheetKind::Full);
        assert_eq!(policy.full_step("lato", false), FullStep::Start);
        assert_eq!(policy.plan_active("lato"), ActivePlan::UpgradeFromPreview);
    }

    #[test]
    fn stylesheet_of_forgotten_font_is_not_injected() {
        let mut policy = LoadPolicy::default();
        policy.mark_pending("lato", SheetKind::Preview);
        policy.mark_pending("arvo", SheetKind::Full);
        policy.forget("lato");
        policy.forget("arvo");
        assert!(!policy.mark_loaded("lato", SheetKind::Preview));
        assert!(!policy.mark_loaded("arvo", SheetKind::Full));
        policy.mark_failed("arvo", SheetKind::Full);
        assert!(policy.assets.is_empty());
    }

    #[test]
    fn forget_resets_state() {
        let mut policy = LoadPolicy::default();
        policy.mark_pending("lato", SheetKind::Full);
        policy.mark_loaded("lato", SheetKind::Full);
        policy.forget("lato");
        assert_eq!(policy.previews_needed(&fonts(&["Lato"])).len(), 1);
        assert_eq!(policy.plan_active("lato"), ActivePlan::LoadFull);
    }
}
