use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    config::Config,
    status::{DownloadStatus, StatusRegistry},
    video_info::VideoInfo,
    worker::{self, DownloadJob},
    ytdlp::Ytdlp,
};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Shared handler state: configuration, the downloader handle and the
/// per-download status map.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ytdlp: Ytdlp,
    pub registry: StatusRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let ytdlp = Ytdlp::new(config.ytdlp_bin.clone());
        AppState {
            config,
            ytdlp,
            registry: StatusRegistry::new(),
        }
    }
}

/// JSON error response: `{"error": "..."}` with the matching status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/info", post(video_info))
        .route("/api/download", post(start_download))
        .route("/api/status/:id", get(download_status))
        .route("/api/update", post(update_ytdlp))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct InfoRequest {
    pub url: String,
}

/// List title, duration, uploader and downloadable formats for a URL.
/// Downloader errors come back as 502 with the tool's stderr.
async fn video_info(
    State(state): State<AppState>,
    Json(req): Json<InfoRequest>,
) -> Result<Json<VideoInfo>, ApiError> {
    let url = req.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("url is required"));
    }

    match state.ytdlp.fetch_info(url).await {
        Ok(info) => Ok(Json(info)),
        Err(e) => {
            error!("format listing failed for {}: {}", url, e);
            Err(ApiError::bad_gateway(e.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub format_id: String,
    #[serde(default)]
    pub convert_to_mp3: bool,
}

impl DownloadRequest {
    // Whitespace around either field would otherwise end up in yt-dlp's
    // -f/URL arguments
    fn into_job(self) -> DownloadJob {
        DownloadJob {
            url: self.url.trim().to_string(),
            format_id: self.format_id.trim().to_string(),
            convert_to_mp3: self.convert_to_mp3,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DownloadAccepted {
    pub id: Uuid,
}

/// Register a download and spawn its background task. Returns the id to
/// poll `/api/status/:id` with.
async fn start_download(
    State(state): State<AppState>,
    Json(req): Json<DownloadRequest>,
) -> Result<Json<DownloadAccepted>, ApiError> {
    if req.url.trim().is_empty() || req.format_id.trim().is_empty() {
        return Err(ApiError::bad_request("url and format_id are required"));
    }

    let id = state.registry.insert_queued().await;
    let job = req.into_job();
    info!("download {} queued ({}, format {})", id, job.url, job.format_id);
    tokio::spawn(worker::run(
        state.config.clone(),
        state.ytdlp.clone(),
        state.registry.clone(),
        id,
        job,
    ));

    Ok(Json(DownloadAccepted { id }))
}

async fn download_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DownloadStatus>, ApiError> {
    state
        .registry
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("unknown download id"))
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: String,
}

/// Run the downloader's self-update. Failure is reported in the body
/// rather than the status code, so the UI can show the tool's own message.
async fn update_ytdlp(State(state): State<AppState>) -> Json<UpdateResponse> {
    match state.ytdlp.update().await {
        Ok(message) => Json(UpdateResponse {
            success: true,
            message,
        }),
        Err(e) => {
            warn!("yt-dlp self-update failed: {}", e);
            Json(UpdateResponse {
                success: false,
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = Config {
            port: 0,
            download_dir: std::env::temp_dir().join("ytdl-web-test"),
            ytdlp_bin: "yt-dlp".into(),
            ffmpeg_bin: "ffmpeg".into(),
        };
        router(AppState::new(config))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("Could not build request"),
            )
            .await
            .expect("Request failed");
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn index_serves_the_page() {
        let res = test_router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("Could not build request"),
            )
            .await
            .expect("Request failed");
        assert_eq!(res.status(), StatusCode::OK);
        let content_type = res
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/html"));
    }

    #[tokio::test]
    async fn status_of_unknown_id_is_404() {
        let uri = format!("/api/status/{}", Uuid::new_v4());
        let res = test_router()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("Could not build request"),
            )
            .await
            .expect("Request failed");
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn info_rejects_blank_url() {
        let res = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/info")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"url":"   "}"#))
                    .expect("Could not build request"),
            )
            .await
            .expect("Request failed");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn download_request_is_trimmed_before_spawning() {
        let job = DownloadRequest {
            url: " https://www.youtube.com/watch?v=abc ".into(),
            format_id: " 140 ".into(),
            convert_to_mp3: true,
        }
        .into_job();
        assert_eq!(job.url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(job.format_id, "140");
        assert!(job.convert_to_mp3);
    }

    #[tokio::test]
    async fn download_rejects_missing_format_id() {
        let res = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/download")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"url":"https://www.youtube.com/watch?v=abc","format_id":""}"#,
                    ))
                    .expect("Could not build request"),
            )
            .await
            .expect("Request failed");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
