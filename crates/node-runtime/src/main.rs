//! # Stepwire Node
//!
//! Runs one command through an in-process controller and executor and logs
//! every result as it arrives.
//!
//! ```text
//! stepwire-node                          # count_up 4
//! stepwire-node count_up 10
//! stepwire-node fail_after 2 '"bad input"'
//! stepwire-node sleep_steps 5 200
//! ```
//!
//! Arguments are parsed as JSON; anything that is not valid JSON is passed
//! as a string.

use anyhow::{Context, Result};
use futures::StreamExt;
use node_runtime::{builtin_registry, NodeConfig, NodeRuntime};
use serde_json::{json, Value};
use tracing::{error, info, warn, Instrument};

fn parse_args() -> (String, Vec<Value>) {
    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(command) => {
            let arguments = args
                .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
                .collect();
            (command, arguments)
        }
        None => ("count_up".to_string(), vec![json!(4)]),
    }
}

async fn run_command(runtime: &NodeRuntime, command: &str, arguments: Vec<Value>) -> Result<()> {
    let resulter = runtime
        .controller()
        .open(command, arguments, Vec::new())
        .await
        .context("Failed to issue request")?;
    let processing_id = resulter.processing_id();

    let mut results = std::pin::pin!(resulter.into_stream());
    while let Some(result) = results.next().await {
        match result {
            Ok(item) if item.done => info!(%processing_id, value = %item.value, "Final"),
            Ok(item) => info!(%processing_id, value = %item.value, "Step"),
            Err(e) => {
                warn!(%processing_id, error = %e, "Request failed");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env();
    sw_telemetry::init_logging(&config.telemetry).context("Failed to initialize logging")?;

    let (command, arguments) = parse_args();

    let runtime =
        NodeRuntime::start(&config, builtin_registry()).context("Failed to start node runtime")?;

    let span = sw_telemetry::component_span!("controller", "run", command = %command);
    tokio::select! {
        result = run_command(&runtime, &command, arguments).instrument(span) => {
            if let Err(e) = result {
                error!(error = %e, "Command run failed");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Interrupted");
        }
    }

    let report = runtime.shutdown().await.context("Shutdown failed")?;
    info!(
        dispatched = report.dispatcher.dispatched,
        steps = report.dispatcher.steps,
        delivered = report.registry.delivered,
        "Done"
    );
    Ok(())
}
