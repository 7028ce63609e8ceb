use crate::app::config::{Settings, SettingsStore};
use crate::app::error::{AppError, Result};
use crate::app::formatter::OutputGenerator;
use crate::app::models::{FileSection, GatheredFile, TreeNode};
use crate::app::qa::QaClient;
use crate::app::scanner::Scanner;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SettingsStore>,
    pub qa: QaClient,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/file_structure", get(file_structure))
        .route("/update_base_dir", post(update_base_dir))
        .route("/results", post(concatenate_files))
        .route("/concat_with_ai", post(concat_with_ai))
        .route("/ask", post(ask))
        .route("/settings", get(current_settings))
        .route("/test_endpoint", get(test_endpoint))
        .with_state(state)
}

pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Serving on http://{}", listener.local_addr()?);
    log::info!("Base directory: {:?}", state.store.base_dir());
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn file_structure(State(state): State<AppState>) -> Result<Json<Vec<TreeNode>>> {
    let config = state.store.enumeration_config();
    let enumeration = tokio::task::spawn_blocking(move || Scanner::new(&config).scan()).await??;
    Ok(Json(enumeration.nodes))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBaseDirForm {
    #[serde(default)]
    pub new_base_dir: String,
}

async fn update_base_dir(
    State(state): State<AppState>,
    Form(form): Form<UpdateBaseDirForm>,
) -> Response {
    let store = Arc::clone(&state.store);
    let raw = form.new_base_dir.clone();
    let outcome = tokio::task::spawn_blocking(move || store.update_base_dir(&raw))
        .await
        .map_err(AppError::from)
        .and_then(|result| result);

    match outcome {
        Ok(base_dir) => Json(json!({ "base_dir": base_dir })).into_response(),
        Err(err) => {
            log::warn!("Rejected base directory {:?}: {}", form.new_base_dir, err);
            let body = json!({ "error": format!("Error updating base directory: {}", err) });
            (err.status_code(), Json(body)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConcatRequest {
    #[serde(default)]
    pub selected_files: Vec<String>,
    #[serde(default)]
    pub include_line_numbers: bool,
}

#[derive(Debug, Serialize)]
pub struct ConcatResponse {
    pub content: String,
    pub selected_files: Vec<String>,
    pub include_line_numbers: bool,
    pub sections: Vec<FileSection>,
}

async fn concatenate_files(
    State(state): State<AppState>,
    Json(request): Json<ConcatRequest>,
) -> Result<Json<ConcatResponse>> {
    if request.selected_files.is_empty() {
        return Err(AppError::NoSelection);
    }

    let base_dir = state.store.base_dir();
    let ConcatRequest {
        selected_files,
        include_line_numbers,
    } = request;
    let (selected_files, result) = tokio::task::spawn_blocking(move || {
        let result = OutputGenerator::render(&base_dir, &selected_files, include_line_numbers);
        (selected_files, result)
    })
    .await?;

    Ok(Json(ConcatResponse {
        content: result.text,
        selected_files,
        include_line_numbers,
        sections: result.sections,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GatherRequest {
    #[serde(default)]
    pub selected_files: Vec<String>,
}

async fn concat_with_ai(
    State(state): State<AppState>,
    Json(request): Json<GatherRequest>,
) -> Result<Json<serde_json::Value>> {
    if request.selected_files.is_empty() {
        return Err(AppError::NoSelection);
    }

    let base_dir = state.store.base_dir();
    let file_data: Vec<GatheredFile> = tokio::task::spawn_blocking(move || {
        OutputGenerator::gather_strict(&base_dir, &request.selected_files)
    })
    .await??;

    Ok(Json(json!({ "file_data": file_data })))
}

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub question: Option<String>,
    pub content: Option<String>,
}

fn required(value: Option<String>, name: &'static str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingParameter(name))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<serde_json::Value>> {
    let api_key = required(request.api_key, "api_key")?;
    let model = required(request.model, "model")?;
    let question = required(request.question, "question")?;
    let content = required(request.content, "content")?;

    match state.qa.ask(&api_key, &model, &question, &content).await {
        Ok(response) => Ok(Json(json!({ "response": response }))),
        Err(err) => {
            log::error!("Q&A request to {} failed: {}", state.qa.endpoint(), err);
            Err(err)
        }
    }
}

async fn current_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.store.settings())
}

async fn test_endpoint() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "message": "Endpoint is working" })))
}
