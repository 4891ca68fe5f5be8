use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

mod health;
pub mod sdk;

pub use health::health;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let sdk_router = Router::new()
        .route("/evaluate", post(sdk::routes::evaluate))
        .route("/flags/{flag_id}/evaluate", post(sdk::routes::evaluate_one));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(
            "/api/sdk/tenants/{tenant_id}/projects/{project_id}",
            sdk_router,
        )
}

/// Full application: routes, state, CORS and request tracing.
pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    routes()
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
}

async fn root() -> &'static str {
    "Flag evaluation service"
}
