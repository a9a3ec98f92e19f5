use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use gloo::{events::EventListener, timers::future::TimeoutFuture};
use log::{debug, error, info, warn};
use wasm_bindgen::JsValue;
use web_sys::{Document, Element};

use crate::{
    catalog,
    error::{Error, Result},
    font::{Font, FontList},
    loader::Loader,
    options::{Options, SortOrder},
    stylesheet::Stylesheets,
    viewport::{self, Throttle},
    widget::{self, Status, View},
};

/// Minimum time between two scroll-driven preview passes.
const SCROLL_THROTTLE_MS: f64 = 200.0;
/// Extra entries above and below the viewport whose previews are loaded too.
const OVERSCAN: usize = 3;

struct State {
    /// Everything the API returned, in popularity order.
    catalog: Vec<Font>,
    /// What the dropdown lists.
    fonts: FontList,
    active: Font,
    /// The last font whose full stylesheet arrived while it was active.
    applied: Option<String>,
    status: Status,
    expanded: bool,
    loaded: bool,
    mounted: bool,
}

impl State {
    fn new(default_family: &str) -> Self {
        Self {
            catalog: Vec::new(),
            fonts: FontList::default(),
            active: Font::fallback(default_family),
            applied: None,
            status: Status::Loading,
            expanded: false,
            loaded: false,
            mounted: false,
        }
    }

    /// Builds the list from the catalog and returns the default font.
    fn apply_catalog<F>(&mut self, catalog: Vec<Font>, options: &Options, accept: F) -> Font
    where
        F: Fn(&Font) -> bool,
    {
        let default_family = self.active.family.clone();
        self.fonts = catalog::filter_catalog(&catalog, options, &default_family, accept);
        self.catalog = catalog;
        if let Some(font) = self.fonts.get(&default_family) {
            self.active = font.clone();
        }
        self.loaded = true;
        self.active.clone()
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(Error::NotLoaded)
        }
    }

    /// Makes `family` active and collapses the list. Returns the new and the
    /// previously active font.
    fn select(&mut self, family: &str) -> Result<(Font, Font)> {
        self.ensure_loaded()?;
        let font = self
            .fonts
            .get(family)
            .cloned()
            .ok_or_else(|| Error::UnknownFamily(family.to_owned()))?;
        let previous = std::mem::replace(&mut self.active, font.clone());
        self.expanded = false;
        Ok((font, previous))
    }

    fn is_active(&self, family: &str) -> bool {
        self.active.family == family
    }

    /// Records that the stylesheet of `family` arrived. Returns whether
    /// listeners should hear about it: only for the still active font and only
    /// once per change.
    fn confirm(&mut self, family: &str) -> bool {
        if !self.is_active(family) || self.applied.as_deref() == Some(family) {
            return false;
        }
        self.applied = Some(family.to_owned());
        true
    }

    /// Returns false if the family is listed already.
    fn add(&mut self, family: &str, alphabetical: bool) -> Result<bool> {
        self.ensure_loaded()?;
        let font = self
            .catalog
            .iter()
            .find(|f| f.family == family)
            .cloned()
            .ok_or_else(|| Error::NotInCatalog(family.to_owned()))?;
        Ok(self.fonts.insert(font, alphabetical))
    }

    fn remove(&mut self, family: &str) -> Result<Font> {
        self.ensure_loaded()?;
        if self.is_active(family) {
            return Err(Error::RemoveActive(family.to_owned()));
        }
        self.fonts
            .remove(family)
            .ok_or_else(|| Error::UnknownFamily(family.to_owned()))
    }

    fn begin_mount(&mut self) -> Result<()> {
        if self.mounted {
            return Err(Error::AlreadyMounted);
        }
        self.mounted = true;
        Ok(())
    }
}

/// Shared core behind a `FontPicker` handle and its DOM listeners.
pub struct Picker {
    api_key: String,
    options: Options,
    suffix: String,
    state: RefCell<State>,
    loader: Loader,
    on_change: RefCell<Option<js_sys::Function>>,
    view: RefCell<Option<View>>,
    listeners: RefCell<Vec<EventListener>>,
    throttle: RefCell<Throttle>,
    trailing_scroll: Cell<bool>,
}

impl Picker {
    pub fn new(
        document: Document,
        api_key: String,
        default_family: String,
        options: Options,
        on_change: Option<js_sys::Function>,
    ) -> Rc<Self> {
        let suffix = options.selector_suffix();
        let loader = Loader::new(
            Stylesheets::new(document, suffix.clone()),
            options.scripts.clone(),
            options.variants.clone(),
        );
        Rc::new(Self {
            api_key,
            suffix,
            state: RefCell::new(State::new(&default_family)),
            options,
            loader,
            on_change: RefCell::new(on_change),
            view: RefCell::default(),
            listeners: RefCell::default(),
            throttle: RefCell::new(Throttle::new(SCROLL_THROTTLE_MS)),
            trailing_scroll: Cell::new(false),
        })
    }

    /// Fetches the catalog, builds the font list and loads the default font.
    pub async fn load(self: &Rc<Self>) -> Result<()> {
        self.set_status(Status::Loading);
        let catalog = match catalog::fetch_catalog(&self.api_key).await {
            Ok(catalog) => catalog,
            Err(err) => {
                error!("could not load the font catalog: {err}");
                self.set_status(Status::Error);
                return Err(err);
            }
        };

        let active = {
            let mut state = self.state.borrow_mut();
            let active = state.apply_catalog(catalog, &self.options, |font| self.options.accepts(font));
            info!("listing {} fonts, default '{}'", state.fonts.len(), active.family);
            active
        };
        self.render_list()?;

        let result = self.activate(&active).await;
        if !self.state.borrow().is_active(&active.family) {
            return result;
        }
        if let Err(err) = result {
            self.set_status(Status::Error);
            return Err(err);
        }
        // The default font is not a change.
        self.state.borrow_mut().confirm(&active.family);
        self.set_status(Status::Finished);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    pub fn fonts(&self) -> Vec<Font> {
        self.state.borrow().fonts.iter().cloned().collect()
    }

    pub fn active_font(&self) -> Font {
        self.state.borrow().active.clone()
    }

    pub fn set_on_change(&self, on_change: Option<js_sys::Function>) {
        *self.on_change.borrow_mut() = on_change;
    }

    /// Makes `family` the active font. Resolves once its full stylesheet is
    /// in place; selecting the same family again retries a failed load.
    pub async fn set_active_font(self: &Rc<Self>, family: &str) -> Result<()> {
        let (font, previous) = self.state.borrow_mut().select(family)?;
        self.with_view(|view| {
            view.set_label(&font.family);
            view.set_expanded(false)?;
            view.mark_active(&font.id)
        })?;
        debug!("active font '{}' -> '{}'", previous.family, font.family);

        self.set_status(Status::Loading);
        let result = self.activate(&font).await;
        if !self.state.borrow().is_active(&font.family) {
            debug!("'{}' was replaced while loading", font.family);
            return result;
        }
        if let Err(err) = result {
            warn!("could not load '{}': {err}", font.family);
            self.set_status(Status::Error);
            return Err(err);
        }
        self.set_status(Status::Finished);
        if self.state.borrow_mut().confirm(&font.family) {
            self.notify(&font);
        }
        Ok(())
    }

    async fn activate(&self, font: &Font) -> Result<()> {
        self.loader.sheets().set_active(font)?;
        self.loader.load_full(font).await
    }

    fn notify(&self, font: &Font) {
        let Some(on_change) = self.on_change.borrow().clone() else {
            return;
        };
        let value = match serde_wasm_bindgen::to_value(font) {
            Ok(value) => value,
            Err(err) => {
                error!("could not pass '{}' to onChange: {err}", font.family);
                return;
            }
        };
        if let Err(err) = on_change.call1(&JsValue::NULL, &value) {
            error!("onChange threw: {}", Error::js(err));
        }
    }

    /// Lists another catalog family.
    pub fn add_font(self: &Rc<Self>, family: &str) -> Result<()> {
        let added = self
            .state
            .borrow_mut()
            .add(family, self.options.sort == SortOrder::Alphabet)?;
        if !added {
            debug!("'{family}' is already listed");
            return Ok(());
        }
        self.render_list()
    }

    /// Removes a family from the list. The active font cannot be removed.
    pub fn remove_font(self: &Rc<Self>, family: &str) -> Result<()> {
        let font = self.state.borrow_mut().remove(family)?;
        self.loader.forget(&font);
        self.render_list()
    }

    /// Builds the widget inside `container` and wires its listeners.
    pub fn mount(self: &Rc<Self>, container: &Element) -> Result<()> {
        let document = container
            .owner_document()
            .ok_or(Error::MissingDom("document"))?;
        self.state.borrow_mut().begin_mount()?;
        self.loader.sheets().set_base()?;
        let view = View::build(&document, &self.suffix)?;
        container.append_child(view.root()).map_err(Error::js)?;
        view.set_label(&self.state.borrow().active.family);
        view.set_status(self.state.borrow().status);

        let mut listeners = Vec::new();

        let weak = Rc::downgrade(self);
        listeners.extend(widget::on_activate(view.button(), move |_| {
            if let Some(picker) = weak.upgrade() {
                picker.toggle_expanded();
            }
        }));

        let weak = Rc::downgrade(self);
        listeners.push(EventListener::new(view.list(), "scroll", move |_| {
            if let Some(picker) = weak.upgrade() {
                picker.on_scroll();
            }
        }));

        let weak: Weak<Self> = Rc::downgrade(self);
        listeners.push(EventListener::new(&document, "click", move |event| {
            let Some(picker) = weak.upgrade() else {
                return;
            };
            let outside = picker
                .view
                .borrow()
                .as_ref()
                .is_some_and(|view| !view.contains_target(event));
            if outside && picker.state.borrow().expanded {
                picker.set_expanded(false);
            }
        }));

        *self.listeners.borrow_mut() = listeners;
        *self.view.borrow_mut() = Some(view);
        if self.is_loaded() {
            self.render_list()?;
        }
        Ok(())
    }

    /// Entry listeners hold weak references, so the handle may go away first.
    fn render_list(self: &Rc<Self>) -> Result<()> {
        let state = self.state.borrow();
        let mut view = self.view.borrow_mut();
        let Some(view) = view.as_mut() else {
            return Ok(());
        };
        let picker = Rc::downgrade(self);
        view.render_list(state.fonts.as_slice(), &state.active.family, |entry, font| {
            let picker = picker.clone();
            let family = font.family.clone();
            widget::on_activate(entry, move |_| {
                if let Some(picker) = picker.upgrade() {
                    picker.select(family.clone());
                }
            })
        })
    }

    fn select(self: Rc<Self>, family: String) {
        self.set_expanded(false);
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = self.set_active_font(&family).await {
                error!("selecting '{family}' failed: {err}");
            }
        });
    }

    fn toggle_expanded(self: Rc<Self>) {
        let expanded = !self.state.borrow().expanded;
        self.set_expanded(expanded);
        if expanded {
            let index = {
                let state = self.state.borrow();
                state.fonts.position(&state.active.family)
            };
            if let Some(index) = index {
                self.with_view(|view| {
                    view.scroll_to(index);
                    Ok(())
                })
                .ok();
            }
            self.load_visible_previews();
        }
    }

    fn set_expanded(&self, expanded: bool) {
        self.state.borrow_mut().expanded = expanded;
        if let Err(err) = self.with_view(|view| view.set_expanded(expanded)) {
            warn!("could not toggle the font list: {err}");
        }
    }

    fn set_status(&self, status: Status) {
        self.state.borrow_mut().status = status;
        self.with_view(|view| {
            view.set_status(status);
            Ok(())
        })
        .ok();
    }

    fn with_view<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&View) -> Result<()>,
    {
        match self.view.borrow().as_ref() {
            Some(view) => f(view),
            None => Ok(()),
        }
    }

    fn on_scroll(self: Rc<Self>) {
        let now = js_sys::Date::now();
        if self.throttle.borrow_mut().ready(now) {
            self.load_visible_previews();
            return;
        }
        // One trailing pass so the final scroll position is covered.
        if self.trailing_scroll.replace(true) {
            return;
        }
        let wait = self.throttle.borrow().remaining(now).ceil() as u32;
        let weak = Rc::downgrade(&self);
        wasm_bindgen_futures::spawn_local(async move {
            TimeoutFuture::new(wait).await;
            if let Some(picker) = weak.upgrade() {
                picker.trailing_scroll.set(false);
                picker.throttle.borrow_mut().ready(js_sys::Date::now());
                picker.load_visible_previews();
            }
        });
    }

    /// Loads previews for the entries currently scrolled into view.
    fn load_visible_previews(self: Rc<Self>) {
        if !self.state.borrow().expanded {
            return;
        }
        let visible: Vec<Font> = {
            let state = self.state.borrow();
            let view = self.view.borrow();
            let Some(view) = view.as_ref() else {
                return;
            };
            let (scroll_top, height, item_height) = view.scroll_geometry();
            let range = viewport::visible_range(scroll_top, height, item_height, state.fonts.len(), OVERSCAN);
            state.fonts.as_slice()[range].to_vec()
        };
        if visible.is_empty() {
            return;
        }
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = self.loader.load_previews(&visible).await {
                warn!("font previews incomplete: {err}");
            }
        });
    }
}
