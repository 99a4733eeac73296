//! HTTP 入口
//!
//! - `POST /scrape-case`：成功返回 PDF，失败返回 `{kind, message}`
//! - `GET /health`

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, ErrorKind};
use crate::models::{CaseQueryRequest, Report};
use crate::orchestrator::RequestHandler;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorResponse {
    fn from_error(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidQuery => StatusCode::BAD_REQUEST,
        ErrorKind::RetryExhausted => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::MalformedPage | ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::RenderError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind());
        (status, Json(ErrorResponse::from_error(&self))).into_response()
    }
}

fn pdf_response(report: Report) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, Report::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.file_name),
            ),
        ],
        report.bytes,
    )
        .into_response()
}

async fn scrape_case(
    State(handler): State<Arc<RequestHandler>>,
    body: Result<Json<CaseQueryRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) =
        body.map_err(|e| AppError::invalid_query(format!("请求体不是合法的 JSON: {}", e)))?;
    let report = handler.handle(request).await?;
    Ok(pdf_response(report))
}

async fn health() -> &'static str {
    "ok"
}

/// 构建路由
pub fn router(handler: Arc<RequestHandler>) -> Router {
    Router::new()
        .route("/scrape-case", post(scrape_case))
        .route("/health", get(health))
        .with_state(handler)
}

/// 监听配置的地址直到收到退出信号
pub async fn serve(config: &Config, handler: Arc<RequestHandler>) -> Result<()> {
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("listen_addr 不是合法地址: {}", config.listen_addr))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    info!("🌐 HTTP 服务已启动: http://{}", addr);

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    info!("👋 HTTP 服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
