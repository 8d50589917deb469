#![forbid(unsafe_code)]

use poem_openapi::{ OpenApi, payload::Json, Object };

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Yubaba AI API! Send a POST request to /api/generate-name.";

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct WelcomeApi;

#[derive(Object)]
struct RespWelcome
{
    message: String,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl WelcomeApi {
    /// Usage hint, independent of the completion API.
    #[oai(path = "/", method = "get")]
    async fn welcome(&self) -> Json<RespWelcome> {
        Json(RespWelcome {message: WELCOME_MESSAGE.to_string()})
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::test::TestClient;
    use poem::Route;
    use poem_openapi::OpenApiService;
    use serde_json::json;

    #[tokio::test]
    async fn welcome_is_fixed() {
        let api = OpenApiService::new(WelcomeApi, "test", "0");
        let cli = TestClient::new(Route::new().nest("/", api));
        let resp = cli.get("/").send().await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({"message": WELCOME_MESSAGE})).await;
    }
}
