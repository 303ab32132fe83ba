//! HTTP API and static frontend serving.
//!
//! Thin plumbing over the library store and the ingestion pipeline. The
//! scan route is the only one with interesting failure modes: a missing
//! vision backend is a 503, an upstream vision failure a 502; metadata and
//! cover problems never fail a request.

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Multipart, Path as AxumPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::library_store::{BookFilter, BookRecord, LibraryStore, NewBook};
use crate::metadata::MetadataSource;
use crate::pacing::CallPacer;
use crate::vision::{VisionError, VisionExtractor};

/// Uploads larger than this are rejected outright.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_PAGE_SIZE: usize = 200;

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn LibraryStore>,
    /// Absent when no vision backend is configured; scans then answer 503.
    pub extractor: Option<Arc<VisionExtractor>>,
    pub metadata: Arc<dyn MetadataSource>,
    pub pacer: Arc<dyn CallPacer>,
    pub upload_dir: PathBuf,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        warn!("Internal error: {:#}", e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
    }
}

impl From<VisionError> for ApiError {
    fn from(e: VisionError) -> Self {
        match e {
            VisionError::NotConfigured => Self::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            VisionError::Upstream { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, format!("Vision API error: {}", e))
            }
        }
    }
}

pub fn build_router(state: ServerState, frontend_dir_path: Option<String>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(get_health))
        .route("/scan", post(post_scan))
        .route("/books", get(get_books))
        .route("/books", post(post_book))
        .route("/books/{id}", delete(delete_book))
        .route("/sections", get(get_sections))
        .route("/export/csv", get(export_csv))
        .route("/export/json", get(export_json))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    let router = Router::new().nest("/api", api_routes);
    match frontend_dir_path {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

pub async fn run_server(
    state: ServerState,
    port: u16,
    frontend_dir_path: Option<String>,
) -> Result<()> {
    let router = build_router(state, frontend_dir_path);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Ready to serve at port {}!", port);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn get_health(State(state): State<ServerState>) -> Result<Json<serde_json::Value>, ApiError> {
    let backend = state
        .extractor
        .as_ref()
        .map(|e| e.backend_name())
        .unwrap_or("none");
    let total = state.store.count_books(&BookFilter::default())?;
    Ok(Json(json!({
        "status": "ok",
        "vision_backend": backend,
        "total_books": total,
        "hash": env!("GIT_HASH"),
    })))
}

async fn post_scan(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let extractor = state
        .extractor
        .as_ref()
        .ok_or_else(|| ApiError::from(VisionError::NotConfigured))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("file") {
            let media_type = field.content_type().unwrap_or_default().to_string();
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
            upload = Some((media_type, file_name, bytes));
            break;
        }
    }
    let (media_type, file_name, bytes) =
        upload.ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "file field required"))?;

    if !media_type.starts_with("image/") {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "File must be an image",
        ));
    }

    // Keep the upload for provenance before anything can fail.
    let saved_name = format!("{}_{}", chrono::Utc::now().timestamp(), file_name);
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(anyhow::Error::from)?;
    tokio::fs::write(state.upload_dir.join(&saved_name), &bytes)
        .await
        .map_err(anyhow::Error::from)?;

    let detected = extractor.extract(&bytes, &media_type).await?;
    if detected.is_empty() {
        return Ok(Json(json!({
            "books_added": 0,
            "detected": 0,
            "books": [],
            "message": "No books detected in image",
        })));
    }

    let mut added: Vec<BookRecord> = Vec::new();
    for candidate in &detected {
        state.pacer.pace().await;
        let meta = state
            .metadata
            .resolve(&candidate.title, candidate.author.as_deref())
            .await;

        let book = NewBook {
            title: meta.title,
            author: meta.author,
            isbn: meta.isbn,
            cover_url: meta.cover_url,
            description: meta.description,
            publisher: meta.publisher,
            publish_year: meta.publish_year,
            catalog_key: meta.catalog_key,
            section: None,
            source_image: Some(saved_name.clone()),
            owned: true,
        };
        match state.store.insert_book(&book) {
            Ok(record) => added.push(record),
            Err(e) => warn!("Failed to insert detected book {:?}: {:#}", candidate.title, e),
        }
    }

    Ok(Json(json!({
        "books_added": added.len(),
        "detected": detected.len(),
        "books": added,
    })))
}

#[derive(Debug, Deserialize)]
struct AddBookBody {
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
    section: Option<String>,
    owned: Option<bool>,
}

async fn post_book(
    State(state): State<ServerState>,
    Json(body): Json<AddBookBody>,
) -> Result<Json<BookRecord>, ApiError> {
    let title = body
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "title required"))?;
    let author = body
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());

    let meta = state.metadata.resolve(title, author).await;
    let book = NewBook {
        title: if meta.title.is_empty() {
            title.to_string()
        } else {
            meta.title
        },
        author: meta.author.or_else(|| author.map(str::to_string)),
        isbn: meta.isbn.or_else(|| {
            body.isbn
                .as_deref()
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .map(str::to_string)
        }),
        cover_url: meta.cover_url,
        description: meta.description,
        publisher: meta.publisher,
        publish_year: meta.publish_year,
        catalog_key: meta.catalog_key,
        section: body
            .section
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        source_image: None,
        owned: body.owned.unwrap_or(true),
    };

    let record = state.store.insert_book(&book)?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct BooksQuery {
    q: Option<String>,
    section: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn get_books(
    State(state): State<ServerState>,
    Query(query): Query<BooksQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filter = BookFilter {
        query: query.q,
        section: query.section,
        limit: Some(query.limit.unwrap_or(DEFAULT_PAGE_SIZE)),
        offset: query.offset.unwrap_or(0),
    };
    let books = state.store.find_books(&filter)?;
    let total = state.store.count_books(&filter)?;
    Ok(Json(json!({ "total": total, "books": books })))
}

async fn delete_book(
    State(state): State<ServerState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.store.delete_book(id)? {
        Ok(Json(json!({ "ok": true })))
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, "Book not found"))
    }
}

async fn get_sections(
    State(state): State<ServerState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sections = state.store.list_sections()?;
    Ok(Json(json!({ "sections": sections })))
}

async fn export_json(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let books = state.store.find_books(&BookFilter::default())?;
    let body = serde_json::to_string_pretty(&books).map_err(anyhow::Error::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=shelfscan-library.json",
            ),
        ],
        body,
    )
        .into_response())
}

const CSV_FIELDS: [&str; 13] = [
    "id",
    "title",
    "author",
    "isbn",
    "publisher",
    "publish_year",
    "description",
    "cover_url",
    "catalog_key",
    "section",
    "source_image",
    "owned",
    "added_at",
];

async fn export_csv(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let books = state.store.find_books(&BookFilter::default())?;

    let mut out = String::new();
    out.push_str(&CSV_FIELDS.join(","));
    out.push('\n');
    for book in &books {
        let row = [
            book.id.to_string(),
            book.title.clone(),
            book.author.clone().unwrap_or_default(),
            book.isbn.clone().unwrap_or_default(),
            book.publisher.clone().unwrap_or_default(),
            book.publish_year.map(|y| y.to_string()).unwrap_or_default(),
            book.description.clone().unwrap_or_default(),
            book.cover_url.clone().unwrap_or_default(),
            book.catalog_key.clone().unwrap_or_default(),
            book.section.clone().unwrap_or_default(),
            book.source_image.clone().unwrap_or_default(),
            (book.owned as i64).to_string(),
            book.added_at.to_string(),
        ];
        let escaped: Vec<String> = row.iter().map(|field| csv_escape(field)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=shelfscan-library.csv",
            ),
        ],
        out,
    )
        .into_response())
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
