#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::middleware::Cors;
use poem::{Endpoint, EndpointExt, Route};
use poem_openapi::OpenApiService;

use crate::utils::completion::NameGenerator;
use crate::utils::config::Config;

use self::generate_name::GenerateNameApi;
use self::version::VersionApi;
use self::welcome::WelcomeApi;

pub mod generate_name;
pub mod version;
pub mod welcome;

// ---------------------------------------------------------------------------
// make_app:
// ---------------------------------------------------------------------------
/** Assemble every endpoint, the OpenAPI documents and the CORS layer.  The
 * generator is shared by all requests for the life of the process.
 */
pub fn make_app(config: &Config, generator: Arc<dyn NameGenerator>) -> impl Endpoint {
    let server_url = format!("{}:{}", config.http_addr, config.http_port);

    let endpoints = (GenerateNameApi::new(generator), WelcomeApi, VersionApi);
    let api_service =
        OpenApiService::new(endpoints, config.title.clone(), env!("CARGO_PKG_VERSION"))
            .server(server_url);

    // Allow the generated openapi specs to be retrieved from the server.
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();
    let ui = api_service.swagger_ui();

    Route::new()
        .nest("/docs", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml)
        .nest("/", api_service)
        .with(make_cors(config))
}

// ---------------------------------------------------------------------------
// make_cors:
// ---------------------------------------------------------------------------
/** All methods and headers are allowed.  Origins are open unless the
 * configuration lists specific ones.
 */
pub fn make_cors(config: &Config) -> Cors {
    let cors = Cors::new().allow_credentials(true);
    if config.allows_any_origin() {
        return cors;
    }
    config.cors_origins
        .iter()
        .fold(cors, |cors, origin| cors.allow_origin(origin.as_str()))
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use poem::test::TestClient;
    use serde_json::json;

    use crate::utils::errors::Errors;

    struct Echo;

    #[async_trait]
    impl NameGenerator for Echo {
        async fn generate(&self, name: &str) -> Result<String, Errors> {
            Ok(name.chars().take(1).collect::<String>() + "（テスト）")
        }
    }

    const ALLOW_ORIGIN: &str = "access-control-allow-origin";

    #[tokio::test]
    async fn routes_are_mounted() {
        let cli = TestClient::new(make_app(&Config::new(), Arc::new(Echo)));

        let resp = cli.get("/").send().await;
        resp.assert_status_is_ok();

        let resp = cli.post("/api/generate-name")
            .body_json(&json!({"name": "山田太郎"}))
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({"new_name": "山（テスト）"})).await;

        let resp = cli.get("/spec").send().await;
        resp.assert_status_is_ok();
        let body = resp.0.into_body().into_string().await.unwrap();
        assert!(body.contains("/api/generate-name"));

        cli.get("/api/version").send().await.assert_status_is_ok();
    }

    #[tokio::test]
    async fn cors_open_by_default() {
        let cli = TestClient::new(make_app(&Config::new(), Arc::new(Echo)));
        let resp = cli.get("/")
            .header("Origin", "http://client.example")
            .send()
            .await;
        resp.assert_status_is_ok();
        assert!(resp.0.headers().contains_key(ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_method_and_header() {
        let cli = TestClient::new(make_app(&Config::new(), Arc::new(Echo)));
        let resp = cli.options("/api/generate-name")
            .header("Origin", "http://client.example")
            .header("Access-Control-Request-Method", "PATCH")
            .header("Access-Control-Request-Headers", "x-bathhouse-token")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_header(ALLOW_ORIGIN, "http://client.example");
        let allowed = resp.0.headers()
            .get("access-control-allow-headers")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        assert!(allowed.contains("x-bathhouse-token"));
    }

    #[tokio::test]
    async fn cors_restricted_by_config() {
        let config = Config {
            cors_origins: vec!["http://allowed.example".to_string()],
            ..Config::default()
        };
        let cli = TestClient::new(make_app(&config, Arc::new(Echo)));

        let resp = cli.get("/")
            .header("Origin", "http://allowed.example")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_header(ALLOW_ORIGIN, "http://allowed.example");

        let resp = cli.get("/")
            .header("Origin", "http://elsewhere.example")
            .send()
            .await;
        assert!(!resp.0.headers().contains_key(ALLOW_ORIGIN));
    }
}
