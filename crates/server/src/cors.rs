use config::{AllowedOrigins, CorsConfig};
use http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Builds the CORS layer for the text and model endpoints.
///
/// Browsers must be able to POST JSON, so the methods and the `content-type`
/// header are always allowed. Credentials cannot be combined with a wildcard
/// origin, the request origin is mirrored instead.
pub(super) fn generate(
    CorsConfig {
        allow_origins,
        allow_credentials,
    }: &CorsConfig,
) -> CorsLayer {
    let mut cors_layer = CorsLayer::new()
        .allow_credentials(*allow_credentials)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if let Some(allow_origins) = allow_origins {
        cors_layer = cors_layer.allow_origin(match allow_origins {
            AllowedOrigins::Any if *allow_credentials => AllowOrigin::mirror_request(),
            AllowedOrigins::Any => AllowOrigin::any(),
            AllowedOrigins::Explicit(origins) => {
                let origins = origins.iter().filter_map(|origin| {
                    let origin = &origin[..url::Position::BeforePath];

                    match HeaderValue::from_str(origin) {
                        Ok(value) => Some(value),
                        Err(e) => {
                            log::warn!("Ignoring CORS origin '{origin}': {e}");
                            None
                        }
                    }
                });

                AllowOrigin::list(origins)
            }
        });
    }

    cors_layer
}
