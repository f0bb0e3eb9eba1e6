//! HTTP client for the board service.

use super::{
    BoardId, BoardSummary, BoardUpdate, CreateBoard, ErrorBody, RemoteBoard, RemoteError, RemoteResult, RemoteStore,
    RenameBoard, UnfurlRequest, UpdateAck,
};
use crate::storage::BoxFuture;
use crate::unfurl::MediaLink;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// Header carrying the signed-in account.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// [`RemoteStore`] backed by the board service's REST API.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, account_id: &str) -> RemoteResult<Self> {
        let mut headers = HeaderMap::new();
        let account = HeaderValue::from_str(account_id).map_err(|_| RemoteError::Unauthorized)?;
        headers.insert(ACCOUNT_HEADER, account);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.ok();
            return Err(error_from_status(status, body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Server(format!("Malformed response: {}", e)))
    }

    async fn send_empty(&self, request: RequestBuilder) -> RemoteResult<()> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.ok();
            return Err(error_from_status(status, body));
        }
        Ok(())
    }
}

/// Map a failed response onto a [`RemoteError`].
pub fn error_from_status(status: StatusCode, body: Option<ErrorBody>) -> RemoteError {
    let message = body
        .map(|body| body.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    match status {
        StatusCode::FORBIDDEN => RemoteError::LimitReached(message),
        StatusCode::PAYLOAD_TOO_LARGE => RemoteError::PayloadTooLarge(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        _ => RemoteError::Server(format!("HTTP {}: {}", status.as_u16(), message)),
    }
}

impl RemoteStore for HttpRemoteStore {
    fn fetch_board(&self, id: BoardId) -> BoxFuture<'_, RemoteResult<RemoteBoard>> {
        let request = self.request(Method::GET, &format!("/api/boards/{}", id));
        Box::pin(async move { self.send(request).await })
    }

    fn list_boards(&self) -> BoxFuture<'_, RemoteResult<Vec<BoardSummary>>> {
        let request = self.request(Method::GET, "/api/boards");
        Box::pin(async move { self.send(request).await })
    }

    fn create_board(&self, request: CreateBoard) -> BoxFuture<'_, RemoteResult<RemoteBoard>> {
        let request = self.request(Method::POST, "/api/boards").json(&request);
        Box::pin(async move { self.send(request).await })
    }

    fn update_board(&self, id: BoardId, update: BoardUpdate) -> BoxFuture<'_, RemoteResult<UpdateAck>> {
        let request = self
            .request(Method::PUT, &format!("/api/boards/{}", id))
            .json(&update);
        Box::pin(async move { self.send(request).await })
    }

    fn rename_board(&self, id: BoardId, title: &str) -> BoxFuture<'_, RemoteResult<BoardSummary>> {
        let request = self
            .request(Method::PATCH, &format!("/api/boards/{}", id))
            .json(&RenameBoard {
                title: title.to_string(),
            });
        Box::pin(async move { self.send(request).await })
    }

    fn delete_board(&self, id: BoardId) -> BoxFuture<'_, RemoteResult<()>> {
        let request = self.request(Method::DELETE, &format!("/api/boards/{}", id));
        Box::pin(async move { self.send_empty(request).await })
    }

    fn resolve_media(&self, url: &str) -> BoxFuture<'_, RemoteResult<Option<MediaLink>>> {
        let request = self.request(Method::POST, "/api/unfurl").json(&UnfurlRequest {
            url: url.to_string(),
        });
        Box::pin(async move {
            match self.send::<MediaLink>(request).await {
                Ok(link) => Ok(Some(link)),
                Err(RemoteError::NotFound(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }
}
