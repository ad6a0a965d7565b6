use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::align::status,
        super::api::align::set_tolerance,
        super::api::sensors::push_heading,
        super::api::sensors::push_position,
        super::api::logbook::list,
        super::api::logbook::reset,
        super::api::logbook::export,
    ),
    components(
        schemas(
            super::api::error::ErrorResponse,
            super::api::align::ToleranceRequest,
            super::api::sensors::HeadingUpdate,
            super::api::logbook::ExportResponse,
            crate::align::Tolerances,
            crate::align::AlignmentPhase,
            crate::align::AlignmentState,
            crate::logbook::LogEntry,
            crate::position::Coordinates,
            crate::session::AlignmentStatus,
            crate::telemetry::SignalLevel,
            crate::telemetry::TelemetrySample,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Satalign API",
        description = "Sensor ingest and alignment status for dish installation",
        version = "0.1.0"
    ),
    tags(
        (name = "align", description = "Alignment status and tolerance control"),
        (name = "sensors", description = "Orientation and position ingest"),
        (name = "log", description = "Installer log management")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
