//! HTTP label service for the browser build.
//!
//! Each request runs on the browser event loop via `spawn_local`; the
//! completion is invoked from that task once the response is decoded.

use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use wasm_bindgen_futures::spawn_local;

use super::service::{Completion, LabelService, SaveLabelRequest};
use crate::error::SyncError;
use crate::model::SessionMeta;
use crate::store::LabelStore;

#[derive(Debug, Clone)]
pub struct HttpLabelService {
    base_url: String,
}

impl HttpLabelService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn network(e: gloo_net::Error) -> SyncError {
    SyncError::Network(e.to_string())
}

/// Map non-2xx responses to errors, then decode the JSON body.
async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, SyncError> {
    if resp.status() == 404 {
        return Err(SyncError::NotFound(what.to_string()));
    }
    if !resp.ok() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Status {
            status,
            message: body.trim().to_string(),
        });
    }
    let text = resp.text().await.map_err(network)?;
    serde_json::from_str(&text).map_err(|e| SyncError::Decode(e.to_string()))
}

async fn get_labels(url: String, image_id: String) -> Result<LabelStore, SyncError> {
    let resp = Request::get(&url).send().await.map_err(network)?;
    decode(resp, &format!("labels for '{}'", image_id)).await
}

async fn post_label(url: String, request: SaveLabelRequest) -> Result<(), SyncError> {
    let resp = Request::post(&url)
        .json(&request)
        .map_err(network)?
        .send()
        .await
        .map_err(network)?;
    if !resp.ok() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Status {
            status,
            message: body.trim().to_string(),
        });
    }
    Ok(())
}

async fn get_session(url: String, image_id: String) -> Result<SessionMeta, SyncError> {
    let resp = Request::get(&url).send().await.map_err(network)?;
    let meta: SessionMeta = decode(resp, &format!("session '{}'", image_id)).await?;
    meta.validate()?;
    Ok(meta)
}

impl LabelService for HttpLabelService {
    fn fetch_labels(&self, image_id: &str, done: Completion<LabelStore>) {
        let url = self.url(&format!("labels/{}", image_id));
        let image_id = image_id.to_string();
        spawn_local(async move {
            done(get_labels(url, image_id).await);
        });
    }

    fn save_label(&self, request: SaveLabelRequest, done: Completion<()>) {
        let url = self.url("save_label");
        spawn_local(async move {
            done(post_label(url, request).await);
        });
    }

    fn fetch_session(&self, image_id: &str, done: Completion<SessionMeta>) {
        let url = self.url(&format!("segments/{}", image_id));
        let image_id = image_id.to_string();
        spawn_local(async move {
            done(get_session(url, image_id).await);
        });
    }
}
