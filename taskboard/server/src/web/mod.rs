use askama::Template;
use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::flash::FlashMessage;
use crate::task::api::create_api_router;
use crate::task::web::create_task_router;
use crate::task::{SeaOrmTaskStore, TaskState};

/// Custom error type for web handler operations.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Represents an error during template rendering.
    /// The specific `askama::Error` is captured as the source of this error.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);
        internal_error_response()
    }
}

/// Generic 500 page; never leaks the underlying error.
pub(crate) fn internal_error_response() -> Response {
    let user_facing_error_message =
        "An unexpected error occurred while processing your request. Please try again later.";
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!(
            "<h1>Internal Server Error</h1><p>{}</p>",
            user_facing_error_message
        )),
    )
        .into_response()
}

/// Redirect with `302 Found`, the status browsers expect after a form post here.
pub(crate) fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Builds the full application router around an already constructed task state.
pub fn create_app(task_state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(create_task_router(task_state.clone()))
        .merge(create_api_router(task_state))
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(SetSensitiveHeadersLayer::new([
                    header::COOKIE,
                    header::SET_COOKIE,
                ]))
                .layer(TraceLayer::new_for_http()),
        )
}

#[tracing::instrument(skip(config), fields(project_id = %config.project_id))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let store = SeaOrmTaskStore::new(db.clone(), config.project_id.clone());
    let task_state = Arc::new(TaskState::new(Arc::new(store), config.session_secret.clone()));
    let app = create_app(task_state);

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped, closing database connection");
    db.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("Failed to listen for SIGTERM: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

#[tracing::instrument]
pub async fn not_found_handler() -> Result<(StatusCode, Html<String>), WebError> {
    let html = NotFoundTemplate::new().render()?;
    Ok((StatusCode::NOT_FOUND, Html(html)))
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    messages: Vec<FlashMessage>,
}

impl NotFoundTemplate {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }
}
