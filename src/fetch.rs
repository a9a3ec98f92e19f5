use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{RequestInit, RequestMode, Response};

use crate::error::{Error, Result};

/// One-shot GET returning the response body as text.
pub async fn get_text(url: &str) -> Result<String> {
    let window = web_sys::window().ok_or(Error::MissingDom("window"))?;
    let network = |e| Error::Network {
        url: url.to_owned(),
        message: Error::js(e).to_string(),
    };

    let init = RequestInit::new();
    init.set_method("GET");
    init.set_mode(RequestMode::Cors);

    let response: Response = JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await
        .map_err(network)?
        .dyn_into()
        .map_err(Error::js)?;
    if !response.ok() {
        return Err(Error::Status {
            url: url.to_owned(),
            status: response.status(),
        });
    }

    JsFuture::from(response.text().map_err(Error::js)?)
        .await
        .map_err(network)?
        .as_string()
        .ok_or_else(|| Error::Js(format!("response body of '{url}' is not text")))
}
