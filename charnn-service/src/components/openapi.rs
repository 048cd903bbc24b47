use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{
    generate::{GenerateOpenApi, GENERATE_PATH},
    metrics::{MetricsOpenApi, METRICS_PATH},
};
use crate::server::{HealthOpenApi, HEALTH_PATH};

pub const SWAGGER_UI_PATH: &str = "/swagger-ui";
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Text Generation Model",
        description = "Generates text in the style of Jack London",
        version = "0.0.1"
    ),
    nest(
        (path = HEALTH_PATH, api = HealthOpenApi),
        (path = METRICS_PATH, api = MetricsOpenApi),
        (path = GENERATE_PATH, api = GenerateOpenApi),
    ),
    tags(
        (name = "health", description = "Health check"),
        (name = "metrics", description = "Metrics"),
        (name = "generation", description = "Character-level text generation"),
    )
)]
pub(crate) struct ApiDoc;

pub fn openapi_routes() -> Router {
    Router::new().merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
}
