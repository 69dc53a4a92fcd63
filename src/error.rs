use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PresaleError {
    #[error("missing configuration: {}", .0.join(", "))]
    Config(Vec<&'static str>),

    #[error("{0}")]
    Http(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("a purchase is already in progress")]
    PurchaseInFlight,

    #[error("feed error: {0}")]
    Feed(String),
}

pub type Result<T> = std::result::Result<T, PresaleError>;

/// Best readable text of a thrown JS value: its `message`, the value itself
/// if it is a string, or its debug form.
pub fn js_message(value: &JsValue) -> String {
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
