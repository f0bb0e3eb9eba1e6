//! REST handlers for the board store.

use crate::state::AppState;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use visionboard_core::remote::{
    ACCOUNT_HEADER, BoardId, BoardSummary, BoardUpdate, CreateBoard, ErrorBody, RemoteBoard, RemoteError, RenameBoard,
    UnfurlRequest, UpdateAck,
};
use visionboard_core::unfurl::{MediaLink, UnfurlError, extract_media};

/// Errors returned by handlers, rendered as an [`ErrorBody`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Unfurl(#[from] UnfurlError),
    #[error("Missing x-account-id header")]
    MissingAccount,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Remote(RemoteError::LimitReached(_)) => StatusCode::FORBIDDEN,
            ApiError::Remote(RemoteError::PayloadTooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Remote(RemoteError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Remote(RemoteError::Unauthorized) | ApiError::MissingAccount => StatusCode::UNAUTHORIZED,
            ApiError::Remote(RemoteError::Network(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Remote(RemoteError::Server(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unfurl(UnfurlError::NoMedia) => StatusCode::NOT_FOUND,
            ApiError::Unfurl(UnfurlError::Fetch(_)) => StatusCode::BAD_GATEWAY,
            ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        let message = match self {
            ApiError::Remote(
                RemoteError::LimitReached(message)
                | RemoteError::PayloadTooLarge(message)
                | RemoteError::NotFound(message)
                | RemoteError::Network(message)
                | RemoteError::Server(message),
            ) => message.clone(),
            _ => self.to_string(),
        };
        ErrorBody {
            error: self.code().to_string(),
            message,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Remote(e) => e.code(),
            ApiError::Unfurl(UnfurlError::NoMedia) => "no_media",
            ApiError::Unfurl(UnfurlError::Fetch(_)) => "upstream",
            ApiError::MissingAccount => "unauthorized",
            ApiError::InvalidUrl(_) => "invalid_url",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// The signed-in account, taken from the account header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountId(pub String);

impl<S> FromRequestParts<S> for AccountId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();
        if account.is_empty() {
            return Err(ApiError::MissingAccount);
        }
        Ok(Self(account.to_owned()))
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/boards", get(list_boards).post(create_board))
        .route(
            "/api/boards/{id}",
            get(get_board).put(update_board).patch(rename_board).delete(delete_board),
        )
        .route("/api/unfurl", post(unfurl))
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

/// `GET /api/boards`, most recently updated first.
pub async fn list_boards(State(state): State<Arc<AppState>>, AccountId(account): AccountId) -> Json<Vec<BoardSummary>> {
    Json(state.repository(&account).list())
}

/// `POST /api/boards`
pub async fn create_board(
    State(state): State<Arc<AppState>>,
    AccountId(account): AccountId,
    Json(request): Json<CreateBoard>,
) -> Result<(StatusCode, Json<RemoteBoard>), ApiError> {
    let board = state.repository(&account).create(request, Utc::now())?;
    info!("Account {} created board {}", account, board.id);
    Ok((StatusCode::CREATED, Json(board)))
}

/// `GET /api/boards/{id}`
pub async fn get_board(
    State(state): State<Arc<AppState>>,
    AccountId(account): AccountId,
    Path(id): Path<BoardId>,
) -> Result<Json<RemoteBoard>, ApiError> {
    Ok(Json(state.repository(&account).get(id)?))
}

/// `PUT /api/boards/{id}`
pub async fn update_board(
    State(state): State<Arc<AppState>>,
    AccountId(account): AccountId,
    Path(id): Path<BoardId>,
    Json(update): Json<BoardUpdate>,
) -> Result<Json<UpdateAck>, ApiError> {
    let ack = state.repository(&account).update(id, update, Utc::now()).map_err(|e| {
        if e.is_quota() {
            warn!("Rejected update to board {}: {}", id, e);
        }
        e
    })?;
    Ok(Json(ack))
}

/// `PATCH /api/boards/{id}`
pub async fn rename_board(
    State(state): State<Arc<AppState>>,
    AccountId(account): AccountId,
    Path(id): Path<BoardId>,
    Json(request): Json<RenameBoard>,
) -> Result<Json<BoardSummary>, ApiError> {
    Ok(Json(state.repository(&account).rename(id, &request.title, Utc::now())?))
}

/// `DELETE /api/boards/{id}`
pub async fn delete_board(
    State(state): State<Arc<AppState>>,
    AccountId(account): AccountId,
    Path(id): Path<BoardId>,
) -> Result<StatusCode, ApiError> {
    state.repository(&account).delete(id)?;
    info!("Account {} deleted board {}", account, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Most of a page read when looking for preview tags.
pub const MAX_PAGE_BYTES: usize = 1024 * 1024;

/// `POST /api/unfurl`: fetch a page and return its preview media.
pub async fn unfurl(
    State(state): State<Arc<AppState>>,
    _account: AccountId,
    Json(request): Json<UnfurlRequest>,
) -> Result<Json<MediaLink>, ApiError> {
    let raw = request.url.trim();
    let url = match reqwest::Url::parse(raw) {
        Ok(url) if is_public_target(&url) => url,
        _ => return Err(ApiError::InvalidUrl(raw.to_string())),
    };

    let html = fetch_page(&state.http, url).await.map_err(|e| {
        warn!("Unfurl of {} failed: {}", raw, e);
        e
    })?;
    Ok(Json(extract_media(&html)?))
}

/// Whether `url` is an http(s) address outside loopback, private and link-local ranges.
///
/// Only literal addresses are checked; names are resolved by the client.
pub fn is_public_target(url: &reqwest::Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return false;
    }
    match host.parse::<IpAddr>() {
        Ok(ip) => is_public_ip(ip),
        Err(_) => true,
    }
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_public_ip(IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            let unique_local = first & 0xfe00 == 0xfc00;
            let link_local = first & 0xffc0 == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}

async fn fetch_page(client: &reqwest::Client, url: reqwest::Url) -> Result<String, UnfurlError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| UnfurlError::Fetch(e.to_string()))?;
    if !response.status().is_success() {
        return Err(UnfurlError::Fetch(format!("HTTP {}", response.status().as_u16())));
    }
    read_capped(response, MAX_PAGE_BYTES).await
}

/// Read at most `limit` bytes of the body. Preview tags live in the head, so the rest is dropped.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<String, UnfurlError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| UnfurlError::Fetch(e.to_string()))? {
        let room = limit - body.len();
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= limit {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::http::Request;
    use visionboard_core::card::Card;

    fn state_with(config: ServerConfig) -> Arc<AppState> {
        Arc::new(AppState::new(&config).unwrap())
    }

    fn state() -> Arc<AppState> {
        state_with(ServerConfig::default())
    }

    fn account(name: &str) -> AccountId {
        AccountId(name.to_string())
    }

    async fn create(state: &Arc<AppState>, owner: &str, title: &str) -> Result<RemoteBoard, ApiError> {
        let request = CreateBoard {
            title: title.to_string(),
            ..CreateBoard::default()
        };
        create_board(State(state.clone()), account(owner), Json(request))
            .await
            .map(|(_, Json(board))| board)
    }

    async fn body_of(error: ApiError) -> (StatusCode, ErrorBody) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_account_header_required() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = AccountId::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingAccount));

        let (mut parts, _) = Request::builder()
            .header(ACCOUNT_HEADER, "acct-1")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(AccountId::from_request_parts(&mut parts, &()).await.unwrap(), account("acct-1"));
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let state = state();
        let board = create(&state, "alice", "Dreams").await.unwrap();

        let Json(alice) = list_boards(State(state.clone()), account("alice")).await;
        let Json(bob) = list_boards(State(state.clone()), account("bob")).await;
        assert_eq!(alice.len(), 1);
        assert!(bob.is_empty());

        let err = get_board(State(state.clone()), account("bob"), Path(board.id)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_board_limit_is_forbidden() {
        let state = state();
        for i in 0..3 {
            create(&state, "alice", &format!("board {}", i)).await.unwrap();
        }
        let err = create(&state, "alice", "one too many").await.unwrap_err();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error, "limit_reached");
    }

    #[tokio::test]
    async fn test_update_returns_history() {
        let state = state();
        let board = create(&state, "alice", "Dreams").await.unwrap();
        let update = BoardUpdate {
            cards: Some(vec![Card::text(Default::default(), "travel")]),
            settings: None,
        };
        let Json(ack) = update_board(State(state.clone()), account("alice"), Path(board.id), Json(update))
            .await
            .unwrap();
        assert_eq!(ack.history.len(), 1);

        let Json(fetched) = get_board(State(state.clone()), account("alice"), Path(board.id)).await.unwrap();
        assert_eq!(fetched.cards.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_update_is_413() {
        let mut config = ServerConfig::default();
        config.limits.max_payload_bytes = 2000;
        let state = state_with(config);
        let board = create(&state, "alice", "Dreams").await.unwrap();

        let update = BoardUpdate {
            cards: Some(vec![Card::text(Default::default(), "x".repeat(5000))]),
            settings: None,
        };
        let err = update_board(State(state.clone()), account("alice"), Path(board.id), Json(update))
            .await
            .unwrap_err();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body.error, "payload_too_large");
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let state = state();
        let board = create(&state, "alice", "Dreams").await.unwrap();
        let rename = RenameBoard {
            title: "Goals".to_string(),
        };
        let Json(summary) = rename_board(State(state.clone()), account("alice"), Path(board.id), Json(rename))
            .await
            .unwrap();
        assert_eq!(summary.title, "Goals");

        let status = delete_board(State(state.clone()), account("alice"), Path(board.id)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let err = delete_board(State(state.clone()), account("alice"), Path(board.id)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unfurl_rejects_non_http_urls() {
        let request = UnfurlRequest {
            url: "javascript:alert(1)".to_string(),
        };
        let err = unfurl(State(state()), account("alice"), Json(request)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unfurl_rejects_internal_hosts() {
        for url in [
            "http://127.0.0.1:8080/admin",
            "http://localhost/",
            "http://api.localhost/",
            "http://[::1]/",
            "http://10.0.0.5/",
            "http://192.168.1.1/",
            "http://169.254.169.254/latest/meta-data/",
            "http://[::ffff:127.0.0.1]/",
            "http://0.0.0.0/",
        ] {
            let request = UnfurlRequest { url: url.to_string() };
            let err = unfurl(State(state()), account("alice"), Json(request)).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{url}");
        }
    }

    #[test]
    fn test_public_targets() {
        let public = |url: &str| is_public_target(&reqwest::Url::parse(url).unwrap());
        assert!(public("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(public("http://93.184.216.34/"));
        assert!(!public("ftp://example.com/"));
        assert!(!public("http://172.16.0.1/"));
        assert!(!public("http://[fd00::1]/"));
    }

    #[tokio::test]
    async fn test_page_body_is_capped() {
        let page = format!("<meta property=\"og:image\" content=\"https://x.test/a.jpg\">{}", "a".repeat(4096));
        let response = reqwest::Response::from(axum::http::Response::new(page));
        let html = read_capped(response, 1024).await.unwrap();
        assert_eq!(html.len(), 1024);
        assert!(html.starts_with("<meta"));
    }

    #[tokio::test]
    async fn test_error_codes() {
        let (status, body) = body_of(ApiError::Unfurl(UnfurlError::NoMedia)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "no_media");

        let (status, body) = body_of(ApiError::Unfurl(UnfurlError::Fetch("timeout".to_string()))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "upstream");

        let (status, body) = body_of(ApiError::MissingAccount).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error, "unauthorized");
    }
}
