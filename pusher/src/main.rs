//! cfpush - Entry Point
//!
//! Pushes the artifact of a finished build to a Cloud Foundry style platform and
//! waits for the application to run.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cfpush::app::options::{AppOptions, BuildContext};
use cfpush::app::run::run;
use cfpush::console::StdoutConsole;
use cfpush::filesys::file::File;
use cfpush::logs::{init_logging, LogOptions};
use cfpush::platform::Credentials;
use cfpush::storage::settings::Settings;
use cfpush::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let settings_path = cli_args
        .get("settings")
        .cloned()
        .unwrap_or_else(|| "cfpush.json".to_string());
    let settings = match File::new(&settings_path).read_json::<Settings>().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file {}: {}", settings_path, e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.json_logs,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let build = build_context(&cli_args);
    let options = AppOptions::from_settings(&settings);
    let credentials = Credentials {
        username: settings.username.clone(),
        password: settings.password.clone(),
    };

    info!("Running cfpush {} with options: {:?}", version.version, options);
    match run(&options, credentials, build, &StdoutConsole, await_shutdown_signal()).await {
        Ok(outcome) if outcome.success => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("Failed to run the push: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Workspace, build name and build result from flags, then the environment
fn build_context(cli_args: &HashMap<String, String>) -> BuildContext {
    let workspace = cli_args
        .get("workspace")
        .cloned()
        .or_else(|| env::var("WORKSPACE").ok())
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let build_name = cli_args
        .get("build-name")
        .cloned()
        .or_else(|| env::var("JOB_NAME").ok())
        .unwrap_or_else(|| dir_name(&workspace));

    let build_succeeded = cli_args
        .get("build-result")
        .map(|r| !r.eq_ignore_ascii_case("failure"))
        .unwrap_or(true);

    BuildContext {
        workspace,
        build_name,
        build_succeeded,
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let sigterm = signal(SignalKind::terminate());
        let sigint = signal(SignalKind::interrupt());

        match (sigterm, sigint) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, cancelling push...");
                    }
                    _ = sigint.recv() => {
                        info!("SIGINT received, cancelling push...");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received, cancelling push...");
                    }
                }
            }
            _ => wait_for_ctrl_c().await,
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, cancelling push..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
