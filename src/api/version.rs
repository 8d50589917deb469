#![forbid(unsafe_code)]

use poem_openapi::{ OpenApi, payload::Json, Object };

// From cargo.toml.
const YB_VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct VersionApi;

#[derive(Object)]
struct RespVersion
{
    result_code: String,
    result_msg: String,
    yubaba_version: String,
    git_branch: String,
    git_commit: String,
    git_dirty: String,
    source_ts: String,
    rustc_version: String,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl VersionApi {
    #[oai(path = "/api/version", method = "get")]
    async fn get_version(&self) -> Json<RespVersion> {
        Json(RespVersion::process())
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespVersion {
    fn process() -> RespVersion {
        Self {result_code: "0".to_string(),
              result_msg: "success".to_string(),
              yubaba_version: YB_VERSION.unwrap_or("unknown").to_string(),
              git_branch: env!("GIT_BRANCH").to_string(),
              git_commit: env!("GIT_COMMIT_SHORT").to_string(),
              git_dirty: env!("GIT_DIRTY").to_string(),
              source_ts: env!("SOURCE_TIMESTAMP").to_string(),
              rustc_version: env!("RUSTC_VERSION").to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// version_line:
// ---------------------------------------------------------------------------
/** One-line build summary for the startup log. */
pub fn version_line() -> String {
    format!("*** Running YUBABA={}, BRANCH={}, COMMIT={}, DIRTY={}, SRC_TS={}, RUSTC={}",
            YB_VERSION.unwrap_or("unknown"),
            env!("GIT_BRANCH"),
            env!("GIT_COMMIT_SHORT"),
            env!("GIT_DIRTY"),
            env!("SOURCE_TIMESTAMP"),
            env!("RUSTC_VERSION"))
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

    #[tokio::test]
    async fn version_reports_package() {
        let api = OpenApiService::new(VersionApi, "test", "0");
        let cli = TestClient::new(Route::new().nest("/", api));
        let resp = cli.get("/api/version").send().await;
        resp.assert_status_is_ok();
        let json = resp.json().await;
        let obj = json.value().object();
        obj.get("result_code").assert_string("0");
        obj.get("yubaba_version").assert_string(env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn version_line_has_package() {
        assert!(version_line().contains(env!("CARGO_PKG_VERSION")));
    }
}
