// Entrypoint for the crash sender.
// - Keeps `main` small: load configuration, set up the log file, run the
//   pipeline and turn the outcome into an exit code.
// - A panic anywhere in the pipeline is logged and reported as a failure.

use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use anyhow::Context;
use crash_sender::config::SenderConfig;
use crash_sender::logging::init_logger;
use crash_sender::{run, CrashReportClient};
use log::{error, info, warn};

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn main() -> ExitCode {
    let (config, rejected) = SenderConfig::from_env();
    for setting in &rejected {
        eprintln!("crash-sender: {}; using the default", setting);
    }

    // Logging problems are reported but never stop the upload.
    if let Err(e) = init_logger(&config).context("Failed to initialize logging") {
        eprintln!("crash-sender: {:#}", e);
    }
    info!("crash-sender {} started", env!("CARGO_PKG_VERSION"));
    for setting in &rejected {
        warn!("{}; using the default", setting);
    }

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let client = CrashReportClient::from_config(&config);
    let sent = panic::catch_unwind(AssertUnwindSafe(|| run(&args, &client))).unwrap_or_else(
        |payload| {
            error!("Unhandled panic: {}", panic_message(payload.as_ref()));
            false
        },
    );

    info!("crash-sender finished");
    log::logger().flush();

    if sent {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
