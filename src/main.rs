use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use campus_booking::command::{self, Command};
use campus_booking::config::Config;
use campus_booking::engine::LibrarySystem;
use campus_booking::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = Config::from_env();
    observability::init(config.metrics_port);

    let system = Arc::new(LibrarySystem::open(&config).await?);
    info!("campus booking engine ready");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  owner limits: {:?}", config.owner_limits);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => {
                info!("interrupt received");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let (response, quit) = match command::parse_command(&line) {
            Ok(cmd) => {
                let label = observability::command_label(&cmd);
                let quit = cmd == Command::Quit;
                let response = command::execute(&system, cmd).await;
                let status = if response["success"] == true { "ok" } else { "error" };
                metrics::counter!(observability::COMMANDS_TOTAL, "command" => label, "status" => status).increment(1);
                (response, quit)
            }
            Err(e) => (command::parse_failure(&e), false),
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
        if quit {
            break;
        }
    }

    if config.save_on_exit {
        system.try_save().await?;
    }
    info!("campus booking engine stopped");
    Ok(())
}
