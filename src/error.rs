//! Error type shared by configuration, content loading and the browser entry point.

/// Failures that can surface while booting the site.
///
/// Runtime interaction (opening, closing, scrolling) never produces one of
/// these; those paths degrade to no-ops instead.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("fallback case study `{0}` is not in the catalog")]
    UnknownFallback(String),
    #[error("required element `{0}` not found")]
    MissingElement(String),
    #[error("javascript error: {0}")]
    Js(String),
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for SiteError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        use wasm_bindgen::JsCast;

        let message = match value.dyn_ref::<js_sys::Error>() {
            Some(err) => String::from(err.message()),
            None => value.as_string().unwrap_or_else(|| format!("{value:?}")),
        };
        Self::Js(message)
    }
}

#[cfg(target_arch = "wasm32")]
impl From<SiteError> for wasm_bindgen::JsValue {
    fn from(err: SiteError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
