//! Errors raised by the host bindings.
//!
//! The conversion path itself cannot fail; everything here comes from talking
//! to the browser or the extension APIs.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// A browser global (`window`, `document`, `document.body`) is missing.
    #[error("browser global `{0}` is unavailable")]
    MissingGlobal(&'static str),

    /// A JavaScript call threw or a promise rejected.
    #[error("{context}: {message}")]
    Js {
        context: &'static str,
        message: String,
    },

    /// The preference store returned something that is not a boolean map.
    #[error("malformed preference payload: {0}")]
    Preference(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

impl PlatformError {
    pub fn js(context: &'static str, message: impl Into<String>) -> Self {
        Self::Js {
            context,
            message: message.into(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_js_value(context: &'static str, value: &wasm_bindgen::JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(value, &"message".into())
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{value:?}"));
        Self::js(context, message)
    }
}
