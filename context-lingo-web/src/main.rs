use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use context_lingo::dom::Document;
use context_lingo::{CompiledCatalog, Session, SessionConfig};
use context_lingo_sync::{CatalogStore, Settings};

/// Snapshot location, overridable through the environment
const ENV_CATALOG: &str = "CONTEXT_LINGO_CATALOG";
const ENV_ADDR: &str = "CONTEXT_LINGO_ADDR";
const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Serialize, Deserialize)]
pub struct SwapRequest {
    pub html: String,
    #[serde(default)]
    pub percentage: Option<u8>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SwapResponse {
    pub html: String,
    pub substituted: usize,
    pub kept: usize,
    pub regions: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Clone)]
pub struct AppState {
    pub compiled: Arc<CompiledCatalog>,
    pub config: SessionConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let settings = Settings::load(None)?;
    settings.validate()?;

    let catalog_path = std::env::var(ENV_CATALOG).unwrap_or_else(|_| "catalog.json".to_string());
    let catalog = CatalogStore::new(&catalog_path)
        .load()
        .map_err(|e| format!("Failed to load catalog '{}': {}", catalog_path, e))?;
    let compiled = CompiledCatalog::compile(&catalog)?;
    info!("Loaded {} phrase(s) from {}", compiled.len(), catalog_path);

    let state = AppState {
        compiled: Arc::new(compiled),
        config: settings.session_config(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/swap", post(swap))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let addr = std::env::var(ENV_ADDR).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Preview server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn swap(
    State(state): State<AppState>,
    Json(request): Json<SwapRequest>,
) -> Result<Json<SwapResponse>, (StatusCode, Json<ErrorResponse>)> {
    swap_html(&state, request).map(Json).map_err(|error| {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
    })
}

/// Run one initial pass over `request.html` with a fresh session
fn swap_html(state: &AppState, request: SwapRequest) -> Result<SwapResponse, String> {
    let mut config = state.config.clone();
    if let Some(percentage) = request.percentage {
        config = config.with_percentage(percentage);
    }
    let mut session = Session::from_compiled(state.compiled.clone(), config, request.seed)
        .map_err(|e| format!("Invalid request: {}", e))?;

    let mut doc = Document::parse(&request.html);
    let report = session.run_initial_pass(&mut doc);
    info!(
        "Swapped {} of {} match(es) in {} region(s)",
        report.substituted,
        report.substituted + report.kept,
        report.regions
    );

    Ok(SwapResponse {
        html: doc.inner_html(doc.root()),
        substituted: report.substituted,
        kept: report.kept,
        regions: report.regions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_lingo::Catalog;

    fn state() -> AppState {
        let catalog = Catalog::from_pairs(vec![
            ("hello".to_string(), vec!["bonjour".to_string()]),
            ("thank you".to_string(), vec!["merci".to_string()]),
        ]);
        AppState {
            compiled: Arc::new(CompiledCatalog::compile(&catalog).unwrap()),
            config: SessionConfig::default(),
        }
    }

    fn request(html: &str, percentage: Option<u8>) -> SwapRequest {
        SwapRequest {
            html: html.to_string(),
            percentage,
            seed: Some(7),
        }
    }

    #[test]
    fn test_swap_substitutes_all() {
        let response = swap_html(&state(), request("<p>hello, thank you</p>", None)).unwrap();
        assert_eq!(response.substituted, 2);
        assert_eq!(response.kept, 0);
        assert_eq!(response.regions, 1);
        assert!(response.html.contains("bonjour"));
        assert!(response.html.contains("merci"));
    }

    #[test]
    fn test_swap_zero_percentage_keeps_text() {
        let response = swap_html(&state(), request("<p>hello</p>", Some(0))).unwrap();
        assert_eq!(response.substituted, 0);
        assert_eq!(response.kept, 1);
        assert!(!response.html.contains("bonjour"));
    }

    #[test]
    fn test_swap_without_matches() {
        let response = swap_html(&state(), request("<p>nothing here</p>", None)).unwrap();
        assert_eq!(response.regions, 0);
        assert!(response.html.contains("<p>nothing here</p>"));
    }

    #[test]
    fn test_swap_rejects_percentage() {
        assert!(swap_html(&state(), request("<p>hello</p>", Some(101))).is_err());
    }

    #[test]
    fn test_request_defaults() {
        let parsed: SwapRequest = serde_json::from_str(r#"{"html": "<p></p>"}"#).unwrap();
        assert!(parsed.percentage.is_none());
        assert!(parsed.seed.is_none());
    }

    #[tokio::test]
    async fn test_swap_handler_bad_request() {
        let result = swap(State(state()), Json(request("<p>hello</p>", Some(150)))).await;
        match result {
            Err((status, Json(body))) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(!body.error.is_empty());
            }
            Ok(_) => panic!("Expected 400"),
        }
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await, "ok");
    }
}
