use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart,
    },
    http::{header, HeaderName, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::PipelineError;
use crate::pipeline::{process, ProcessOutput};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const X_FILENAME: HeaderName = HeaderName::from_static("x-filename");

const UPLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Diagnostic analytics</title>
</head>
<body>
<h1>Diagnostic analytics</h1>
<p>File name format: <code>{site}-{assessment}-*.xlsx</code></p>
<form id="upload">
<input type="file" name="file" accept=".xlsx,.xls,.csv" required>
<button type="submit">Process</button>
</form>
<p id="status"></p>
<script>
document.getElementById('upload').addEventListener('submit', async (event) => {
  event.preventDefault();
  const status = document.getElementById('status');
  status.textContent = 'Processing...';
  const response = await fetch('/api/process', { method: 'POST', body: new FormData(event.target) });
  if (response.ok) {
    const url = URL.createObjectURL(await response.blob());
    const link = document.createElement('a');
    link.href = url;
    link.download = response.headers.get('X-Filename') || 'result.xlsx';
    link.click();
    status.textContent = 'Done.';
  } else {
    const text = await response.text();
    try { status.textContent = JSON.parse(text).error; } catch (_) { status.textContent = text; }
  }
});
</script>
</body>
</html>
"#;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Upload(StatusCode, String),
    Pipeline(PipelineError),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload(status, _) => *status,
            ApiError::Pipeline(PipelineError::FilenameFormat { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(err) if err.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message)
            | ApiError::Upload(_, message)
            | ApiError::Internal(message) => message.clone(),
            ApiError::Pipeline(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        warn!(%status, error = %message, "request failed");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Upload(err.status(), err.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Upload(rejection.status(), rejection.body_text())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

pub fn router(config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(upload_page))
        .route("/health", get(|| async { "OK" }))
        .route("/api/process", post(process_upload))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let app = router(&config);
    info!(addr = %config.bind, max_upload_mb = config.max_upload_mb, "upload service listening");
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

async fn process_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart?;
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("file not found".to_string()))?;
    if filename.is_empty() {
        return Err(ApiError::BadRequest("no file selected".to_string()));
    }

    info!(filename = %filename, bytes = bytes.len(), "processing upload");
    let ProcessOutput { workbook, filename } =
        tokio::task::spawn_blocking(move || process(&bytes, &filename))
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))??;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
            (X_FILENAME, filename),
        ],
        workbook,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::pipeline::fixtures::questionnaire_xlsx;

    const BOUNDARY: &str = "diagnostic-boundary";

    fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn error_of(response: Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn upload_returns_workbook_with_filename_header() {
        let app = router(&ServerConfig::default());
        let response = app
            .oneshot(multipart_request("file", "5-31-Razvitie.xlsx", &questionnaire_xlsx()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-filename"], "Analytics_5-31.xlsx");
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_MIME);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn bad_filename_is_a_json_client_error() {
        let app = router(&ServerConfig::default());
        let response = app
            .oneshot(multipart_request("file", "bad.xlsx", &questionnaire_xlsx()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(error_of(response).await.contains("{site}-{assessment}"));
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = router(&ServerConfig::default());
        let response = app
            .oneshot(multipart_request("attachment", "5-31.xlsx", b"data"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_of(response).await, "file not found");
    }

    #[tokio::test]
    async fn unreadable_spreadsheet_is_unprocessable() {
        let app = router(&ServerConfig::default());
        let response = app
            .oneshot(multipart_request("file", "5-31.xlsx", b"not a workbook"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(error_of(response).await.starts_with("failed to read spreadsheet"));
    }

    #[tokio::test]
    async fn non_multipart_body_gets_json_error() {
        let app = router(&ServerConfig::default());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/process")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!error_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let config = ServerConfig {
            max_upload_mb: 1,
            ..ServerConfig::default()
        };
        let oversized = vec![b'x'; 2 * 1024 * 1024];
        let response = router(&config)
            .oneshot(multipart_request("file", "5-31.xlsx", &oversized))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!error_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn upload_page_is_served() {
        let app = router(&ServerConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
