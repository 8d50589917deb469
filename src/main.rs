#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use lazy_static::lazy_static;
use log::{error, info};
use poem::listener::{Listener, RustlsCertificate, RustlsConfig, TcpListener};
use poem::Server;

// Yubaba Utilities
use crate::api::version::version_line;
use crate::utils::completion::{NameGenerator, OpenAiClient};
use crate::utils::config::{get_api_key, init_log, load_dotenv, init_runtime_context, RuntimeCtx, YB_ARGS, YB_DIRS};
use crate::utils::errors::Errors;

// Modules
mod api;
mod utils;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME : &str = "YubabaServer"; // for poem logging

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Lazily initialize the parameters variable so that is has a 'static lifetime.
// We exit if we can't read our parameters.
lazy_static! {
    static ref RUNTIME_CTX: RuntimeCtx = init_runtime_context();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<()> {
    // --------------- Initialize Server ---------------
    println!("Starting yubaba_server!");

    // Variables in ./.env are visible to everything below.  Logging isn't
    // configured yet, so a bad file is reported on stderr.
    load_dotenv().inspect_err(|e| eprintln!("{}", e))?;

    // Create the data directories and exit if that's all that was asked.
    if YB_ARGS.create_dirs_only {
        println!("Data directories created under {}", YB_DIRS.root_dir);
        return Ok(());
    }

    // Initialize logging and configuration.
    yb_init();

    // The completion client is created once and shared by all requests.
    // Without an API key the server refuses to start.
    let api_key = get_api_key().inspect_err(|e| error!("{}", e))?;
    let config = &RUNTIME_CTX.parms.config;
    let generator: Arc<dyn NameGenerator> =
        Arc::new(OpenAiClient::new(api_key, &config.openai_base_url));

    // --------------- Main Loop Set Up ---------------
    let app = api::make_app(config, generator);
    let addr = format!("{}{}", "0.0.0.0:", config.http_port);
    let listener = TcpListener::bind(addr.clone());
    let server = match config.tls_files() {
        Some((key, cert)) => {
            info!("Listening for HTTPS on {}.", addr);
            Server::new(
                listener.rustls(
                    RustlsConfig::new().fallback(
                        RustlsCertificate::new()
                            .key(std::fs::read(key)?)
                            .cert(std::fs::read(cert)?),
                    ),
                ).boxed(),
            )
        },
        None => {
            info!("Listening for HTTP on {}.", addr);
            Server::new(listener.boxed())
        },
    };

    // ------------------ Main Loop -------------------
    server
        .name(SERVER_NAME)
        .run_with_graceful_shutdown(app, shutdown_signal(), None)
        .await?;

    info!("yubaba_server stopped.");
    Ok(())
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// yb_init:
// ---------------------------------------------------------------------------
/** Initialize all subsystems other than those needed to configure the main
 * loop processor.
 */
fn yb_init() {
    // Configure our log.
    init_log();

    // Force the reading of input parameters and initialization of runtime context.
    info!("{}", Errors::InputParms(format!("{:#?}", *RUNTIME_CTX)));

    // Log build info.
    info!("{}", version_line());
}

// ---------------------------------------------------------------------------
// shutdown_signal:
// ---------------------------------------------------------------------------
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
