use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PresaleError, Result};
use crate::model::{PresaleSnapshot, PurchaseRequest, PurchaseResult};

/// The presale backend. The backend owns phase accounting and settlement;
/// this side only reads the snapshot and forwards purchases.
#[allow(async_fn_in_trait)]
pub trait PresaleApi {
    async fn presale_data(&self) -> Result<PresaleSnapshot>;

    async fn buy_tokens(&self, request: &PurchaseRequest) -> Result<PurchaseResult>;
}

#[derive(Clone, Debug)]
pub struct HttpPresaleApi {
    base_url: String,
}

impl HttpPresaleApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self { base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

impl PresaleApi for HttpPresaleApi {
    async fn presale_data(&self) -> Result<PresaleSnapshot> {
        let url = self.endpoint("presale-data");
        debug!(%url, "fetching presale snapshot");

        let resp = Request::get(&url)
            .send()
            .await
            .map_err(|e| PresaleError::Http(e.to_string()))?;

        read_json(resp).await
    }

    async fn buy_tokens(&self, request: &PurchaseRequest) -> Result<PurchaseResult> {
        let url = self.endpoint("buy-tokens");
        let body = serde_json::to_string(request).map_err(|e| PresaleError::Decode(e.to_string()))?;
        debug!(%url, sol_amount = ?request.sol_amount, "submitting purchase");

        let resp = Request::post(&url)
            .header("Content-Type", "application/json")
            .body(body)
            .map_err(|e| PresaleError::Http(e.to_string()))?
            .send()
            .await
            .map_err(|e| PresaleError::Http(e.to_string()))?;

        read_json(resp).await
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let text = resp.text().await.map_err(|e| PresaleError::Http(e.to_string()))?;
    parse_body(status, &text)
}

/// The body is parsed whatever the status, the way a browser `fetch` caller
/// would. A body that does not parse is reported as the status when the
/// status was already a failure.
pub fn parse_body<T: DeserializeOwned>(status: u16, text: &str) -> Result<T> {
    match serde_json::from_str(text) {
        Ok(v) => Ok(v),
        Err(_) if !(200..300).contains(&status) => Err(PresaleError::Status(status)),
        Err(e) => Err(PresaleError::Decode(e.to_string())),
    }
}
