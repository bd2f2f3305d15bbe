use utoipa::OpenApi;

use crate::types::{ErrorResponse, HealthReport, UsageRecord, UsageReport};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::server::usage_handler,
        crate::server::health_handler,
    ),
    components(
        schemas(
            UsageRecord,
            UsageReport,
            HealthReport,
            ErrorResponse,
        )
    ),
    tags(
        (name = "copilot-usage", description = "Mock Copilot usage endpoints")
    ),
    info(
        title = "Copilot Usage API",
        version = "1.0",
        description = "Randomly generated, Copilot-style developer usage statistics",
        license(
            name = "BSD-3-Clause"
        )
    )
)]
pub struct ApiDoc;
