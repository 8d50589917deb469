#![forbid(unsafe_code)]

use poem_openapi::Object;
use thiserror::Error;

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("yubaba_server input parameters:\n{}", .0)]
    InputParms(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    /// The completion API credential is not available at startup.
    #[error("The OpenAI API key is not set. Assign it to the {} environment variable.", .0)]
    MissingApiKey(String),

    /// A .env file exists but can't be loaded.
    #[error("Unable to load the .env file: {}", .0)]
    DotEnvFile(String),

    /// The caller sent an unusable name.
    #[error("{}", .0)]
    InvalidInput(String),

    /// Anything that went wrong reaching or reading the completion API.
    #[error("Failed to generate name: {}", .0)]
    UpstreamFailure(String),
}

// ***************************************************************************
//                             HTTP Error Body
// ***************************************************************************
/// Body returned with every non-2xx response.
#[derive(Object, Debug)]
pub struct HttpResult
{
    pub result_code: String,
    pub detail: String,
}

impl HttpResult {
    pub fn new(result_code: String, detail: String) -> Self {
        Self {result_code, detail}
    }
}
