//! Lane risk entrypoint: reads one analysis request (JSON file argument or
//! stdin), runs the pipeline and prints the tagged outcome as one JSON line.

use chainrisk::{
    config::EngineConfig,
    logging::StructuredLogger,
    orchestrator::{AnalysisOutcome, Orchestrator},
    schema::AnalyzeRequest,
};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::info;

async fn read_request(arg: Option<String>) -> Result<AnalyzeRequest, Box<dyn std::error::Error + Send + Sync>> {
    let body = match arg {
        Some(path) if path != "-" => tokio::fs::read_to_string(path).await?,
        _ => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    Ok(serde_json::from_str(&body)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("CHAINRISK_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = EngineConfig::load_with_env(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(
        state_path = ?config.scoring.state_path,
        deadline_secs = config.timeouts.agent_timeout_secs,
        demo_fallback = config.orchestrator.demo_fallback,
        "lane risk engine starting"
    );

    let request = read_request(std::env::args().nth(1)).await?;
    let orchestrator = Orchestrator::from_config(&config)?;
    let outcome = orchestrator.analyze(request).await;

    StructuredLogger::emit_json(&outcome.to_json(), &mut std::io::stdout())?;

    if let AnalysisOutcome::Failed(e) = outcome {
        return Err(e.into());
    }
    Ok(())
}
