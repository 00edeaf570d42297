//! HTTP handlers: describe (`/get_info`) and fetch (`/download`).
//!
//! Every failure leaves as `{"error": "..."}` with a non-200 status.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::downloader::lifecycle::ascii_fallback;
use crate::downloader::{DownloadError, FormatSelector, VideoInfo};
use crate::server::AppState;

pub const NO_URL_MESSAGE: &str = "No URL provided";
pub const MISSING_PARAMS_MESSAGE: &str = "Missing parameters";

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Download(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format_id: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Describe a URL: metadata plus the normalized quality options
pub async fn get_info(
    State(state): State<AppState>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> Result<Json<VideoInfo>, ApiError> {
    // A body that isn't JSON is treated like one without a url
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let url = non_empty(request.url.as_deref()).ok_or(ApiError::BadRequest(NO_URL_MESSAGE))?;

    info!(engine = state.engine.name(), %url, "describe");

    let media = state.engine.extract_info(url).await.map_err(|e| {
        warn!(%url, error = %e, "extraction failed");
        e
    })?;

    Ok(Json(FormatSelector::describe(&media)))
}

/// Download the chosen rendition and stream it back as an attachment
pub async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadParams>, JsonRejection>,
) -> Result<Response, ApiError> {
    let params = payload.map(|Json(p)| p).unwrap_or_default();
    let (url, format_id) = match (
        non_empty(params.url.as_deref()),
        non_empty(params.format_id.as_deref()),
    ) {
        (Some(url), Some(format_id)) => (url, format_id),
        _ => return Err(ApiError::BadRequest(MISSING_PARAMS_MESSAGE)),
    };

    let file = state
        .lifecycle
        .materialize(url, format_id)
        .await
        .map_err(|e| {
            warn!(%url, %format_id, error = %e, "download failed");
            e
        })?;

    // Open before sweeping: the handle keeps the bytes even if the sweep unlinks the path
    let stream = state.lifecycle.open_stream(&file).await?;
    state.lifecycle.sweep().await;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(file.size));
    headers.insert(CONTENT_DISPOSITION, content_disposition(&file.filename));

    Ok((headers, Body::from_stream(stream)).into_response())
}

/// `attachment` with an ASCII `filename` and an RFC 5987 `filename*`
pub fn content_disposition(filename: &str) -> HeaderValue {
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(filename),
        urlencoding::encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::test_support::FakeEngine;
    use crate::downloader::{MediaEngine, MediaInfo, StreamDescriptor};
    use crate::server::{router, AppState};
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(dir: &TempDir, engine: Arc<FakeEngine>) -> axum::Router {
        let engine: Arc<dyn MediaEngine> = engine;
        router(AppState::new(
            engine,
            dir.path().to_path_buf(),
            Duration::from_secs(3600),
        ))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sample_info() -> MediaInfo {
        let video = |height, size| StreamDescriptor {
            format_id: format!("v{}", height),
            height: Some(height),
            vcodec: Some("avc1".to_string()),
            acodec: Some("none".to_string()),
            filesize: Some(size),
            ..Default::default()
        };
        MediaInfo {
            title: "Sample".to_string(),
            thumbnail: "https://img.test/t.jpg".to_string(),
            duration: 90,
            uploader: "Someone".to_string(),
            view_count: 12,
            formats: vec![
                video(1080, 5_000_000),
                video(720, 3_000_000),
                StreamDescriptor {
                    format_id: "a".to_string(),
                    vcodec: Some("none".to_string()),
                    acodec: Some("aac".to_string()),
                    filesize: Some(500_000),
                    ..Default::default()
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_get_info_missing_url() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, Arc::new(FakeEngine::default()))
            .oneshot(post_json("/get_info", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No URL provided");
    }

    #[tokio::test]
    async fn test_get_info_non_json_body() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/get_info")
            .body(Body::from("url=x"))
            .unwrap();
        let response = app(&dir, Arc::new(FakeEngine::default()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], NO_URL_MESSAGE);
    }

    #[tokio::test]
    async fn test_get_info_success() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(FakeEngine::default().with_info(sample_info()));
        let response = app(&dir, engine)
            .oneshot(post_json("/get_info", r#"{"url": "https://x.test/v"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["title"], "Sample");
        assert_eq!(body["view_count"], 12);

        let formats = body["formats"].as_array().unwrap();
        let resolutions: Vec<&str> = formats
            .iter()
            .map(|f| f["resolution"].as_str().unwrap())
            .collect();
        assert_eq!(resolutions, ["Best Available", "1080p", "720p", "Audio Only"]);
        assert_eq!(formats[0]["filesize"], 5_500_000);
        assert_eq!(formats[1]["vcodec"], "avc1");
        assert_eq!(formats[3]["filesize"], 500_000);
    }

    #[tokio::test]
    async fn test_get_info_engine_error() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(FakeEngine::default().failing("ERROR: Unsupported URL: x"));
        let response = app(&dir, engine)
            .oneshot(post_json("/get_info", r#"{"url": "x"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "ERROR: Unsupported URL: x");
    }

    #[tokio::test]
    async fn test_download_missing_parameters() {
        let dir = TempDir::new().unwrap();
        for body in [r#"{"url": "x"}"#, r#"{"format_id": "22"}"#, r#"{"url": "", "format_id": "22"}"#] {
            let response = app(&dir, Arc::new(FakeEngine::default()))
                .oneshot(post_json("/download", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], "Missing parameters");
        }
    }

    #[tokio::test]
    async fn test_download_streams_file_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let payload = vec![7u8; 20_000];
        let engine = Arc::new(
            FakeEngine::default()
                .writing("mp4", payload.clone())
                .titled("Café: live"),
        );
        let response = app(&dir, engine)
            .oneshot(post_json("/download", r#"{"url": "x", "format_id": "22"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers[CONTENT_LENGTH], "20000");
        assert_eq!(headers[CONTENT_TYPE], "application/octet-stream");
        assert_eq!(
            headers[CONTENT_DISPOSITION],
            "attachment; filename=\"Cafe live.mp4\"; filename*=UTF-8''Caf%C3%A9%20live.mp4"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), payload.as_slice());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("video_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_download_combinator_without_muxer_uses_best() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(
            FakeEngine::default()
                .without_muxer()
                .writing("mp4", b"x".to_vec()),
        );
        let response = app(&dir, engine.clone())
            .oneshot(post_json(
                "/download",
                r#"{"url": "x", "format_id": "bestvideo+bestaudio/best"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(engine.requests()[0].format, "best");
    }

    #[tokio::test]
    async fn test_download_audio_only() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(FakeEngine::default().writing("mp3", b"id3".to_vec()));
        let response = app(&dir, engine.clone())
            .oneshot(post_json("/download", r#"{"url": "x", "format_id": "bestaudio"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let request = &engine.requests()[0];
        assert!(request.audio_only);
        assert_eq!(request.format, "bestaudio/best");
        assert!(response.headers()[CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("Test Video.mp3"));
    }

    #[tokio::test]
    async fn test_download_survives_backdated_output() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(
            FakeEngine::default()
                .writing("mp3", b"id3-audio".to_vec())
                .backdated(Duration::from_secs(3 * 24 * 3600)),
        );
        let response = app(&dir, engine)
            .oneshot(post_json("/download", r#"{"url": "x", "format_id": "bestaudio"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_LENGTH], "9");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"id3-audio");
    }

    #[test]
    fn test_content_disposition_decomposes_accents() {
        let value = content_disposition("Café Déjà vu.mp4");
        assert!(value
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"Cafe Deja vu.mp4\";"));
    }

    #[tokio::test]
    async fn test_download_without_output_file() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, Arc::new(FakeEngine::default()))
            .oneshot(post_json("/download", r#"{"url": "x", "format_id": "22"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"],
            "File not found after download"
        );
    }

    #[tokio::test]
    async fn test_download_engine_error() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(FakeEngine::default().failing("ERROR: Private video"));
        let response = app(&dir, engine)
            .oneshot(post_json("/download", r#"{"url": "x", "format_id": "22"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "ERROR: Private video");
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let dir = TempDir::new().unwrap();
        let router = app(&dir, Arc::new(FakeEngine::default()));

        let index = router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(index.status(), StatusCode::OK);

        let health = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(health).await["status"], "ok");
    }

    #[test]
    fn test_content_disposition_ascii_title() {
        assert_eq!(
            content_disposition("plain.webm"),
            "attachment; filename=\"plain.webm\"; filename*=UTF-8''plain.webm"
        );
    }
}
