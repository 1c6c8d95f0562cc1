use std::process::ExitCode;

use sentinel_lib::{config, run_goal, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init();

    let goal = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if goal.trim().is_empty() {
        eprintln!("usage: sentinel <goal...>");
        return ExitCode::from(2);
    }

    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::from(2);
        }
    };

    let result = match run_goal(&cfg, goal.trim()).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "sentinel setup failed");
            return ExitCode::from(2);
        }
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "failed to serialize result"),
    }
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
