use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

#[derive(Debug, Error)]
pub enum Error {
    #[error("request to '{url}' failed: {message}")]
    Network { url: String, message: String },
    #[error("request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed font catalog: {0}")]
    Catalog(#[from] serde_json::Error),
    #[error("invalid picker options: {0}")]
    Options(String),
    #[error("{0} is not available")]
    MissingDom(&'static str),
    #[error("font family '{0}' is not in the font list")]
    UnknownFamily(String),
    #[error("font family '{0}' is not in the catalog")]
    NotInCatalog(String),
    #[error("cannot remove the active font '{0}'")]
    RemoveActive(String),
    #[error("the picker is already mounted")]
    AlreadyMounted,
    #[error("font catalog has not been loaded yet")]
    NotLoaded,
    #[error("{0}")]
    Js(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Wraps an exception thrown on the JS side.
    pub fn js(value: JsValue) -> Self {
        Error::Js(
            value
                .as_string()
                .or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
                .unwrap_or_else(|| format!("{value:?}")),
        )
    }
}

impl From<Error> for JsValue {
    fn from(err: Error) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

impl From<serde_wasm_bindgen::Error> for Error {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        Error::Options(err.to_string())
    }
}
