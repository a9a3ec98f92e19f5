use std::rc::Rc;

use log::LevelFilter;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

mod catalog;
mod error;
mod fetch;
mod font;
mod loader;
mod logging;
mod options;
mod picker;
mod stylesheet;
mod viewport;
mod widget;

pub use crate::{
    error::Error,
    font::{font_id, Font, FontList},
    options::{Category, Options, SortOrder, DEFAULT_FAMILY},
};
use crate::picker::Picker;

/// Installs the panic hook and the console logger.
#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init(LevelFilter::Info);
}

#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let level = logging::parse_level(level)
        .ok_or_else(|| Error::Options(format!("unknown log level '{level}'")))?;
    logging::init(level);
    Ok(())
}

/// The id used for a family in class names, e.g. `font-open-sans`.
#[wasm_bindgen(js_name = fontId)]
pub fn font_id_js(family: &str) -> String {
    font_id(family)
}

/// A dropdown listing Google Fonts.
///
/// The catalog request starts on construction; `ready()` resolves once the
/// list is built and the default font is loaded.
#[wasm_bindgen]
pub struct FontPicker {
    picker: Rc<Picker>,
    ready: js_sys::Promise,
}

#[wasm_bindgen]
impl FontPicker {
    #[wasm_bindgen(constructor)]
    pub fn new(
        api_key: String,
        default_family: Option<String>,
        options: JsValue,
        on_change: Option<js_sys::Function>,
    ) -> Result<FontPicker, JsValue> {
        init();

        let options = Options::from_js(options)?;
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or(Error::MissingDom("document"))?;
        let picker = Picker::new(
            document,
            api_key,
            default_family.unwrap_or_else(|| DEFAULT_FAMILY.to_owned()),
            options,
            on_change,
        );

        let loading = picker.clone();
        let ready = future_to_promise(async move {
            loading.load().await?;
            Ok(JsValue::UNDEFINED)
        });
        Ok(Self { picker, ready })
    }

    pub fn ready(&self) -> js_sys::Promise {
        self.ready.clone()
    }

    /// Appends the dropdown to `container`.
    pub fn mount(&self, container: &web_sys::Element) -> Result<(), JsValue> {
        Ok(self.picker.mount(container)?)
    }

    #[wasm_bindgen(js_name = getFonts)]
    pub fn get_fonts(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.picker.fonts())?)
    }

    #[wasm_bindgen(js_name = getActiveFont)]
    pub fn get_active_font(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.picker.active_font())?)
    }

    /// Resolves once the font's full stylesheet is in place.
    #[wasm_bindgen(js_name = setActiveFont)]
    pub fn set_active_font(&self, family: String) -> js_sys::Promise {
        let picker = self.picker.clone();
        future_to_promise(async move {
            picker.set_active_font(&family).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = addFont)]
    pub fn add_font(&self, family: &str) -> Result<(), JsValue> {
        Ok(self.picker.add_font(family)?)
    }

    #[wasm_bindgen(js_name = removeFont)]
    pub fn remove_font(&self, family: &str) -> Result<(), JsValue> {
        Ok(self.picker.remove_font(family)?)
    }

    #[wasm_bindgen(js_name = setOnChange)]
    pub fn set_on_change(&self, on_change: Option<js_sys::Function>) {
        self.picker.set_on_change(on_change);
    }
}
