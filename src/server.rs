//! HTTP surface: chat page, `/get` answer endpoint and a liveness probe.

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::query::QueryService;

const CHAT_PAGE: &str = include_str!("../templates/chat.html");

#[derive(Clone)]
struct AppState {
    service: Arc<QueryService>,
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    msg: String,
}

/// Builds the router around a shared query service.
pub fn router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/", get(chat_page))
        .route("/get", get(chat).post(chat))
        .route("/healthz", get(healthz))
        .with_state(AppState { service })
}

/// Serves `app` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    info!("medichat listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server shutdown")?;
    info!("medichat stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
}

async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn chat(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Result<String, (StatusCode, String)> {
    info!(msg = %form.msg, "chat request");
    let service = state.service.clone();
    let question = form.msg;
    let answer = tokio::task::spawn_blocking(move || service.answer(&question))
        .await
        .map_err(|err| internal_error(anyhow!("query task join error: {err}")))?
        .map_err(internal_error)?;
    info!(response = %answer, "chat response");
    Ok(answer)
}

fn internal_error(err: anyhow::Error) -> (StatusCode, String) {
    error!("chat request failed: {err:#}");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}
