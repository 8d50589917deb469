#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, Object, ApiResponse };
use log::{error, info};

use crate::utils::completion::NameGenerator;
use crate::utils::errors::{Errors, HttpResult};
use crate::utils::yb_utils::{self, RequestDebug};

// Detail strings returned to callers.
const MSG_NAME_REQUIRED: &str = "Name is required.";
const MSG_BAD_BODY: &str = "Invalid request body:";
const MSG_INTERNAL_ERROR: &str = "An internal server error occurred.";

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct GenerateNameApi {
    generator: Arc<dyn NameGenerator>,
}

impl GenerateNameApi {
    pub fn new(generator: Arc<dyn NameGenerator>) -> Self {
        Self {generator}
    }
}

/// Name to be shortened.
#[derive(Object, Debug)]
pub struct ReqGenerateName
{
    /// The original, full name.
    name: Option<String>,
}

/// The name given in exchange.
#[derive(Object, Debug)]
pub struct RespGenerateName
{
    new_name: String,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqGenerateName {
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request body:");
        s.push_str("\n    name: ");
        s.push_str(self.name.as_deref().unwrap_or("<missing>"));
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
#[oai(bad_request_handler = "bad_request_handler")]
enum YbResponse {
    #[oai(status = 200)]
    Http200(Json<RespGenerateName>),
    #[oai(status = 400)]
    Http400(Json<HttpResult>),
    #[oai(status = 500)]
    Http500(Json<HttpResult>),
}

fn make_http_200(resp: RespGenerateName) -> YbResponse {
    YbResponse::Http200(Json(resp))
}
fn make_http_400(msg: String) -> YbResponse {
    YbResponse::Http400(Json(HttpResult::new(400.to_string(), msg)))
}
fn make_http_500(msg: String) -> YbResponse {
    YbResponse::Http500(Json(HttpResult::new(500.to_string(), msg)))
}

// Unparseable bodies get the same error shape as an empty name.
fn bad_request_handler(err: poem::Error) -> YbResponse {
    make_http_400(format!("{} {}", MSG_BAD_BODY, err))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl GenerateNameApi {
    /// Convert a full name into a short Yubaba-style name with its reading.
    #[oai(path = "/api/generate-name", method = "post")]
    async fn generate_name(&self, http_req: &Request, req: Json<ReqGenerateName>) -> YbResponse {
        yb_utils::debug_request(http_req, &req.0);

        match handle(self.generator.as_ref(), req.0.name.as_deref()).await {
            Ok(new_name) => make_http_200(RespGenerateName {new_name}),
            Err(Errors::InvalidInput(msg)) => make_http_400(msg),
            Err(e @ Errors::UpstreamFailure(_)) => make_http_500(e.to_string()),
            Err(e) => {
                error!("Unexpected error: {}", e);
                make_http_500(MSG_INTERNAL_ERROR.to_string())
            }
        }
    }
}

// ***************************************************************************
//                             Request Handler
// ***************************************************************************
// ---------------------------------------------------------------------------
// handle:
// ---------------------------------------------------------------------------
/** Validate the name and hand it, untrimmed, to the generator.  Blank and
 * missing names are rejected before the generator is called.
 */
pub async fn handle(generator: &dyn NameGenerator, name: Option<&str>) -> Result<String, Errors> {
    let name = match name {
        Some(n) if !n.trim().is_empty() => n,
        _ => return Err(Errors::InvalidInput(MSG_NAME_REQUIRED.to_string())),
    };

    let new_name = generator.generate(name).await?;
    info!("Renamed '{}' to '{}'.", name, new_name);
    Ok(new_name)
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use poem::http::StatusCode;
    use poem::test::TestClient;
    use poem::Route;
    use poem_openapi::OpenApiService;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // Returns a fixed reply and records what it was asked.
    struct StubGenerator {
        reply: Result<String, String>,
        calls: AtomicUsize,
        last_name: Mutex<Option<String>>,
    }

    impl StubGenerator {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {reply: Ok(reply.to_string()), calls: AtomicUsize::new(0), last_name: Mutex::new(None)})
        }
        fn failing(msg: &str) -> Arc<Self> {
            Arc::new(Self {reply: Err(msg.to_string()), calls: AtomicUsize::new(0), last_name: Mutex::new(None)})
        }
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NameGenerator for StubGenerator {
        async fn generate(&self, name: &str) -> Result<String, Errors> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_name.lock().unwrap() = Some(name.to_string());
            self.reply.clone().map_err(Errors::UpstreamFailure)
        }
    }

    // A generator that breaks the contract by returning a non-upstream error.
    struct BrokenGenerator;

    #[async_trait]
    impl NameGenerator for BrokenGenerator {
        async fn generate(&self, _name: &str) -> Result<String, Errors> {
            Err(Errors::IOError(std::io::Error::other("disk on fire")))
        }
    }

    fn client(generator: Arc<dyn NameGenerator>) -> TestClient<Route> {
        let api = OpenApiService::new(GenerateNameApi::new(generator), "test", "0");
        TestClient::new(Route::new().nest("/", api))
    }

    async fn body_string(resp: poem::test::TestResponse) -> String {
        resp.0.into_body().into_string().await.unwrap()
    }

    #[tokio::test]
    async fn handle_rejects_empty_without_calling_generator() {
        let stub = StubGenerator::ok("山（サン）");
        for name in [None, Some(""), Some("   ")] {
            let r = handle(stub.as_ref(), name).await;
            assert!(matches!(r, Err(Errors::InvalidInput(_))));
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn handle_passes_exact_name() {
        let stub = StubGenerator::ok("山（サン）");
        let r = handle(stub.as_ref(), Some(" 山田太郎 ")).await.unwrap();
        assert_eq!(r, "山（サン）");
        assert_eq!(stub.last_name.lock().unwrap().as_deref(), Some(" 山田太郎 "));
    }

    #[tokio::test]
    async fn generate_success() {
        let stub = StubGenerator::ok("山（サン）");
        let cli = client(stub.clone());
        let resp = cli.post("/api/generate-name")
            .body_json(&json!({"name": "山田太郎"}))
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({"new_name": "山（サン）"})).await;
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn generate_empty_name_is_400() {
        let stub = StubGenerator::ok("山（サン）");
        let cli = client(stub.clone());
        let resp = cli.post("/api/generate-name")
            .body_json(&json!({"name": ""}))
            .send()
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body = body_string(resp).await;
        assert!(body.contains(MSG_NAME_REQUIRED));
        assert!(body.contains("\"result_code\":\"400\""));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn generate_missing_name_is_400() {
        let stub = StubGenerator::ok("山（サン）");
        let cli = client(stub.clone());
        let resp = cli.post("/api/generate-name")
            .body_json(&json!({}))
            .send()
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains(MSG_NAME_REQUIRED));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn generate_malformed_body_is_400() {
        let stub = StubGenerator::ok("山（サン）");
        let cli = client(stub.clone());
        let resp = cli.post("/api/generate-name")
            .content_type("application/json")
            .body("{not json")
            .send()
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn generate_upstream_failure_is_500() {
        let stub = StubGenerator::failing("simulated transport error");
        let cli = client(stub);
        let resp = cli.post("/api/generate-name")
            .body_json(&json!({"name": "山田太郎"}))
            .send()
            .await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(resp).await;
        assert!(body.contains("Failed to generate name: simulated transport error"));
        assert!(!body.contains("new_name"));
    }

    #[tokio::test]
    async fn generate_unexpected_error_is_generic_500() {
        let cli = client(Arc::new(BrokenGenerator));
        let resp = cli.post("/api/generate-name")
            .body_json(&json!({"name": "山田太郎"}))
            .send()
            .await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(resp).await.contains(MSG_INTERNAL_ERROR));
    }
}
