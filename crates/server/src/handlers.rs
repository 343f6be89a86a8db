//! HTTP request handlers
//!
//! Every store or archive access runs on the blocking pool; SQLite calls never
//! block the async workers.

use std::io;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use shelfmark_core::{ArchiveReader, Bookmark, BookmarkStore, DataDir, ShelfmarkError, Tag};
use tracing::{debug, error};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<BookmarkStore>>,
    data: DataDir,
}

impl AppState {
    pub fn new(store: BookmarkStore, data: DataDir) -> Self {
        Self { store: Arc::new(Mutex::new(store)), data }
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&BookmarkStore) -> shelfmark_core::Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let store = store.lock().map_err(|_| ApiError::internal("bookmark store lock poisoned"))?;
            f(&store).map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Error returned by handlers, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, code: "NOT_FOUND", message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, code: "INTERNAL_ERROR", message: message.into() }
    }
}

impl From<ShelfmarkError> for ApiError {
    fn from(err: ShelfmarkError) -> Self {
        match err {
            ShelfmarkError::NotFound(what) => Self::not_found(format!("{what} not found")),
            ShelfmarkError::InvalidBookmarkId(_) | ShelfmarkError::InvalidIndex(_) => {
                Self { status: StatusCode::BAD_REQUEST, code: "BAD_REQUEST", message: err.to_string() }
            }
            ShelfmarkError::Io(e) if e.kind() == io::ErrorKind::NotFound => Self::not_found(e.to_string()),
            other => {
                error!(error = %other, "request failed");
                Self::internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse { code: self.code.to_string(), message: self.message };
        (self.status, Json(body)).into_response()
    }
}

fn check_id(id: i64) -> Result<i64, ApiError> {
    if id <= 0 {
        return Err(ShelfmarkError::InvalidBookmarkId(id).into());
    }
    Ok(id)
}

/// Query string of `GET /api/bookmarks`; `tags` is comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub tags: String,
}

impl SearchQuery {
    fn tag_list(&self) -> Vec<String> {
        self.tags.split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from).collect()
    }
}

pub async fn list_bookmarks(
    State(state): State<AppState>, Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    debug!(keyword = %query.keyword, tags = %query.tags, "bookmark search");
    let tags = query.tag_list();
    let bookmarks = state.with_store(move |store| store.search_bookmarks(false, &query.keyword, &tags)).await?;
    Ok(Json(bookmarks))
}

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.with_store(BookmarkStore::get_tags).await?))
}

/// Readable HTML of a bookmark wrapped in a minimal page.
pub async fn content(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Html<String>, ApiError> {
    let id = check_id(id)?;
    let Bookmark { title, content, html, .. } = state
        .with_store(move |store| store.get_bookmark(id, ""))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("bookmark {id} not found")))?;

    let body = if !html.is_empty() {
        html
    } else if !content.is_empty() {
        format!("<pre>{}</pre>", html_escape::encode_text(&content))
    } else {
        return Err(ApiError::not_found(format!("bookmark {id} has no cached content")));
    };

    let title = html_escape::encode_text(&title);
    Ok(Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1>\n{body}\n</body></html>"
    )))
}

pub async fn thumbnail(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, ApiError> {
    let id = check_id(id)?;
    let bytes = tokio::fs::read(state.data.thumbnail(id)).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ApiError::not_found(format!("thumbnail of bookmark {id} not found")),
        _ => ApiError::internal(e.to_string()),
    })?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

/// Relative links inside an archive resolve only below the trailing slash.
pub async fn archive_redirect(Path(id): Path<i64>) -> Redirect {
    Redirect::permanent(&format!("/bookmark/{id}/archive/"))
}

pub async fn archive_root(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, ApiError> {
    serve_archive(&state, id, String::new()).await
}

pub async fn archive_resource(
    State(state): State<AppState>, Path((id, name)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    serve_archive(&state, id, name).await
}

async fn serve_archive(state: &AppState, id: i64, name: String) -> Result<Response, ApiError> {
    let id = check_id(id)?;
    let path = state.data.archive(id);
    debug!(id, name = %name, "archive resource");

    let (body, content_type) = tokio::task::spawn_blocking(move || ArchiveReader::open(&path)?.read(&name))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    let content_type = if content_type.is_empty() { "application/octet-stream".to_string() } else { content_type };
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}
