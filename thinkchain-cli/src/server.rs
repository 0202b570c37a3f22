//! Web form and JSON endpoint

use crate::html::{render_page, PageView};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thinkchain_agent::{run_with, ChainOutput, FailurePolicy};
use thinkchain_gateway::params::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use thinkchain_gateway::{Error, ErrorKind, Model, ProviderConfig, SessionParams};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Read-only state shared by all handlers. Nothing from a submission is kept.
#[derive(Clone)]
pub struct AppState {
    provider: Arc<ProviderConfig>,
    policy: FailurePolicy,
}

impl AppState {
    pub fn new(provider: ProviderConfig, policy: FailurePolicy) -> Self {
        Self {
            provider: Arc::new(provider),
            policy,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/run", post(run_form))
        .route("/api/run", post(run_api))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn index() -> Response {
    page(StatusCode::OK, &PageView::default())
}

fn page(status: StatusCode, view: &PageView<'_>) -> Response {
    match render_page(view) {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            error!(error = %err, "failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
        }
    }
}

/// Raw form fields; numbers arrive as text so bad input can be reported on the page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RunForm {
    pub api_key: String,
    pub model: String,
    pub top_p: String,
    pub temperature: String,
    pub max_tokens: String,
    pub question: String,
}

impl RunForm {
    pub fn to_params(&self) -> Result<SessionParams, Error> {
        let model = if self.model.trim().is_empty() {
            Model::default()
        } else {
            self.model.parse()?
        };

        let params = SessionParams::new(self.api_key.trim())
            .with_model(model)
            .with_top_p(parse_field("top_p", &self.top_p, DEFAULT_TOP_P)?)
            .with_temperature(parse_field("temperature", &self.temperature, DEFAULT_TEMPERATURE)?)
            .with_max_tokens(parse_field("max_tokens", &self.max_tokens, DEFAULT_MAX_TOKENS)?);

        params.validate()?;
        Ok(params)
    }

    fn view(&self) -> PageView<'_> {
        PageView {
            model: self.model.parse().unwrap_or_default(),
            top_p: Some(self.top_p.clone()).filter(|s| !s.is_empty()),
            temperature: Some(self.temperature.clone()).filter(|s| !s.is_empty()),
            max_tokens: Some(self.max_tokens.clone()).filter(|s| !s.is_empty()),
            question: self.question.clone(),
            error: None,
            output: None,
        }
    }
}

fn parse_field<T: std::str::FromStr>(
    name: &'static str,
    raw: &str,
    default: T,
) -> Result<T, Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    raw.parse().map_err(|_| {
        Error::invalid_argument(name, format!("{} must be a number, got '{}'", name, raw))
    })
}

async fn run_form(State(state): State<AppState>, Form(form): Form<RunForm>) -> Response {
    let params = match form.to_params() {
        Ok(params) => params,
        Err(err) => {
            info!(error = %err, "rejected form submission");
            let mut view = form.view();
            view.error = Some(err.message().to_string());
            return page(StatusCode::BAD_REQUEST, &view);
        }
    };

    match run_with(state.provider.as_ref().clone(), params, &form.question, state.policy).await {
        Ok(output) => {
            let mut view = form.view();
            view.output = Some(&output);
            page(StatusCode::OK, &view)
        }
        Err(err) => {
            error!(error = %err, "failed to start chain");
            let err = ApiError::from(err);
            let mut view = form.view();
            view.error = Some(err.public_message());
            page(err.status(), &view)
        }
    }
}

/// JSON body for `/api/run`
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub api_key: String,
    #[serde(default)]
    pub model: Model,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub question: String,
    pub failure_policy: Option<FailurePolicy>,
}

fn default_top_p() -> f32 {
    DEFAULT_TOP_P
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

async fn run_api(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<ChainOutput>, ApiError> {
    let params = SessionParams::new(request.api_key)
        .with_model(request.model)
        .with_top_p(request.top_p)
        .with_temperature(request.temperature)
        .with_max_tokens(request.max_tokens);
    let policy = request.failure_policy.unwrap_or(state.policy);

    let config = state.provider.as_ref().clone();
    let output = run_with(config, params, &request.question, policy).await?;
    Ok(Json(output))
}

/// Setup failures; step failures are part of a normal response.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(Error),
    Internal(Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to the submitter
    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(err) => err.message().to_string(),
            ApiError::Internal(_) => "internal error, see server log".to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidArgument | ErrorKind::ConfigInvalid => ApiError::BadRequest(err),
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            error!(error = %err, "failed to start chain");
        }
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
