#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, error, LevelFilter};
use serde::Deserialize;
use std::{env, fs, path::Path};
use lazy_static::lazy_static;
use structopt::StructOpt;

use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::utils::{yb_utils, errors::Errors};
use crate::utils::completion::DEFAULT_OPENAI_BASE_URL;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the root directory.
const ENV_YB_ROOT_DIR      : &str = "YUBABA_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = "~/.yubaba";
const CONFIG_DIR           : &str = "/config";
const LOGS_DIR             : &str = "/logs";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml";  // relative to config dir
const YB_CONFIG_FILE       : &str = "/yubaba.toml"; // relative to config dir

// Credentials.
pub const ENV_OPENAI_API_KEY : &str = "OPENAI_API_KEY";

// Networking.
const DEFAULT_HTTP_ADDR    : &str = "http://localhost";
const DEFAULT_HTTP_PORT    : u16  = 8000;
pub const ANY_ORIGIN       : &str = "*";

// Used when no log4rs.yml is installed.
const DEFAULT_LOG_PATTERN  : &str = "{d(%Y-%m-%dT%H:%M:%S%.6f)} {h({l})} {t} - {m}{n}";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref YB_ARGS: YbArgs = init_yb_args();
}

// Calculate the data directories BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref YB_DIRS: YbDirs = init_yb_dirs();
}

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// YbDirs:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct YbDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// YbArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, StructOpt)]
#[structopt(name = "yb_args", about = "Command line arguments for the Yubaba name server.")]
pub struct YbArgs {
    /// Specify the server's root data directory.
    ///
    /// This directory holds the config and logs subdirectories.
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Create the data directories and then exit.
    ///
    /// The data directories will be rooted at a root directory calculated
    /// using the following priority order:
    ///
    ///   1. If set, the value of the YUBABA_ROOT_DIR environment,
    ///
    ///   2. Otherwise, if set, the value of the --root-dir command line argument,
    ///
    ///   3. Otherwise, ~/.yubaba
    ///
    #[structopt(short, long)]
    pub create_dirs_only: bool,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct RuntimeCtx {
    pub parms: Parms,
    pub yb_args: &'static YbArgs,
    pub yb_dirs: &'static YbDirs,
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
/// Contents of yubaba.toml.  Every key is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub http_port: u16,
    /// Allowed CORS origins; "*" allows any origin.
    pub cors_origins: Vec<String>,
    pub openai_base_url: String,
    pub tls_cert_file: Option<String>,
    pub tls_key_file: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Both the key and certificate files, or None to serve plain HTTP.
    pub fn tls_files(&self) -> Option<(String, String)> {
        match (&self.tls_key_file, &self.tls_cert_file) {
            (Some(key), Some(cert)) => Some((yb_utils::get_absolute_path(key),
                                             yb_utils::get_absolute_path(cert))),
            _ => None,
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == ANY_ORIGIN)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Yubaba AI API".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            cors_origins: vec![ANY_ORIGIN.to_string()],
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            tls_cert_file: None,
            tls_key_file: None,
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_yb_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
fn init_yb_args() -> YbArgs {
    let args = YbArgs::from_args();
    println!("{:?}", args);
    args
}

// ---------------------------------------------------------------------------
// init_yb_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories, creating any that don't exist. */
fn init_yb_dirs() -> YbDirs {
    let root_dir = get_root_dir();
    check_yb_dir(&root_dir, "root directory");

    let config_dir = root_dir.clone() + CONFIG_DIR;
    check_yb_dir(&config_dir, "config directory");

    let logs_dir = root_dir.clone() + LOGS_DIR;
    check_yb_dir(&logs_dir, "logs directory");

    YbDirs {root_dir, config_dir, logs_dir}
}

// ---------------------------------------------------------------------------
// check_yb_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that it's a directory.
 * If it doesn't exist, create it.
 *
 * Any failure results in a panic.
 */
fn check_yb_dir(dir: &str, msgname: &str) {
    let path = Path::new(dir);
    if !path.is_absolute() {
        panic!("The {} path must be absolute: {}", msgname, dir);
    }
    if path.exists() {
        if !path.is_dir() {
            panic!("The {} path must be a directory: {}", msgname, dir);
        }
    } else if let Err(e) = fs::create_dir_all(path) {
        panic!("{}", Errors::IOError(e));
    }
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir() -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    //
    let root_dir = env::var(ENV_YB_ROOT_DIR).unwrap_or_else(
        |_| {
            match YB_ARGS.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    yb_utils::get_absolute_path(&root_dir)
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Initialize log4rs from the config directory's log4rs.yml, or log to the
 * console at info level when that file is not installed.
 */
pub fn init_log() {
    let logconfig = init_log_config();
    if Path::new(&logconfig).exists() {
        if let Err(e) = log4rs::init_file(&logconfig, Default::default()) {
            println!("{}", e);
            panic!("{}", Errors::Log4rsInitialization(logconfig));
        }
        info!("Log4rs initialized using: {}", logconfig);
    } else {
        if let Err(e) = init_console_log() {
            panic!("{}", Errors::Log4rsInitialization(e.to_string()));
        }
        info!("Log4rs initialized to console, no file found at: {}", logconfig);
    }
}

// ---------------------------------------------------------------------------
// init_console_log:
// ---------------------------------------------------------------------------
fn init_console_log() -> Result<()> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN)))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// init_log_config:
// ---------------------------------------------------------------------------
fn init_log_config() -> String {
    YB_DIRS.config_dir.clone() + LOG4RS_CONFIG_FILE
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * config directory.  A missing file means default values.
 */
fn get_parms() -> Result<Parms> {
    let config_file = yb_utils::get_absolute_path(&(YB_DIRS.config_dir.clone() + YB_CONFIG_FILE));
    info!("{}", Errors::ReadingConfigFile(config_file.clone()));
    let contents = match fs::read_to_string(&config_file) {
        Ok(c) => c,
        Err(_) => {
            info!("Unable to read configuration at {}. Using default values.", config_file);
            return Ok(Parms { config_file: Default::default(), config: Config::new() });
        }
    };

    let config = parse_config(&contents, &config_file)?;
    Ok(Parms { config_file, config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
fn parse_config(contents: &str, config_file: &str) -> Result<Config> {
    match toml::from_str(contents) {
        Ok(c)  => Ok(c),
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file.to_string()), e);
            error!("{}", msg);
            Result::Err(anyhow!(msg))
        }
    }
}

// ---------------------------------------------------------------------------
// get_api_key:
// ---------------------------------------------------------------------------
/** Read the completion API credential once at startup.  The server must not
 * start without it.
 */
pub fn get_api_key() -> Result<String, Errors> {
    check_api_key(env::var(ENV_OPENAI_API_KEY).ok())
}

// ---------------------------------------------------------------------------
// load_dotenv:
// ---------------------------------------------------------------------------
/** Load ./.env into the environment.  Having no .env file is normal, but a
 * file that can't be read or parsed stops startup.
 */
pub fn load_dotenv() -> Result<(), Errors> {
    check_dotenv(dotenvy::dotenv().map(|_| ()))
}

fn check_dotenv(result: std::result::Result<(), dotenvy::Error>) -> Result<(), Errors> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(Errors::DotEnvFile(e.to_string())),
    }
}

fn check_api_key(value: Option<String>) -> Result<String, Errors> {
    match value {
        Some(k) if !k.trim().is_empty() => Ok(k.trim().to_string()),
        _ => Err(Errors::MissingApiKey(ENV_OPENAI_API_KEY.to_string())),
    }
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context() -> RuntimeCtx {
    // The application aborts if the configuration file can't be parsed.
    let parms = get_parms().expect("FAILED to read configuration file.");
    RuntimeCtx {parms, yb_args: &YB_ARGS, yb_dirs: &YB_DIRS}
}
