use axum::{
    extract::{DefaultBodyLimit, Multipart, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::common::error::ProcessorError;
use crate::pipeline::{self, output, Mode};

/// Uploads above axum's 2 MiB default are expected for real workbooks.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Liveness message exposed at the root route.
async fn home() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "API do Leitor de Arquivos rodando!" }))
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "planilha-processor",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
struct ProcessQuery {
    /// Partition selector; a missing parameter is treated as an empty,
    /// invalid token
    #[serde(default)]
    mode: String,
}

/// Upload endpoint: validates the mode token before the multipart body is
/// consumed, parses the first sheet, runs the pipeline and answers with
/// the generated workbook.
async fn process_upload(Query(query): Query<ProcessQuery>, multipart: Multipart) -> Response {
    let mode = match Mode::from_token(&query.mode) {
        Ok(mode) => mode,
        Err(e) => return error_response(&e),
    };

    let upload = match read_upload(multipart).await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(&e),
    };

    match pipeline::process_workbook(&upload, mode) {
        Ok((bytes, summary)) => {
            info!(
                mode = mode.token(),
                total = summary.total,
                unique = summary.unique,
                duplicated = summary.duplicated,
                "planilha processada"
            );
            workbook_response(bytes, mode)
        }
        Err(e) => error_response(&e),
    }
}

/// Read the uploaded spreadsheet bytes from the `file` multipart field.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ProcessorError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProcessorError::Processing(format!("falha ao ler o upload: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(|e| {
                ProcessorError::Processing(format!("falha ao ler o arquivo enviado: {e}"))
            })?;
            return Ok(bytes.to_vec());
        }
    }

    Err(ProcessorError::Processing(
        "campo 'file' ausente no formulário".to_string(),
    ))
}

fn workbook_response(bytes: Vec<u8>, mode: Mode) -> Response {
    let disposition = format!("attachment; filename={}", mode.output_filename());
    (
        [
            (header::CONTENT_TYPE, output::XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// Map the error taxonomy onto the JSON `detail` payload: caller mistakes
/// are 400, everything else is 500.
fn error_response(error: &ProcessorError) -> Response {
    let status = match error {
        ProcessorError::InvalidMode(_) | ProcessorError::MissingColumn(_) => {
            StatusCode::BAD_REQUEST
        }
        ProcessorError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warn!(status = %status, "request rejected: {error}");
    (status, Json(serde_json::json!({ "detail": error.to_string() }))).into_response()
}

/// Create the HTTP server with all routes
pub fn create_server() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/processar", post(process_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(port: u16) -> anyhow::Result<()> {
    let app = create_server();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("📄 Upload:       POST http://localhost:{port}/processar?mode=audited");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
