use anyhow::Context;
use clap::{Parser, ValueEnum};
use http_bridge::bridge::{default_bind_address, CalibrationBridge};
use smrcore::records::Frontend;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod http_bridge;
mod workflow;

/// Receiver paired with the primary one in split-mode telemetry.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum PartnerArg {
    Rec495,
    Rec549,
    Rec555,
    Rec572,
}

impl From<PartnerArg> for Frontend {
    fn from(arg: PartnerArg) -> Self {
        match arg {
            PartnerArg::Rec495 => Frontend::Rec495,
            PartnerArg::Rec549 => Frontend::Rec549,
            PartnerArg::Rec555 => Frontend::Rec555,
            PartnerArg::Rec572 => Frontend::Rec572,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Radiometer spectral calibration driver")]
struct Args {
    /// Generate synthetic telemetry and calibrate every scan in it
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    scans: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Generate split-mode telemetry with this receiver in the upper half
    #[arg(long, value_enum)]
    partner: Option<PartnerArg>,
    /// JSON-lines file receiving calibrated spectra
    #[arg(long, default_value = "tools/data/spectra.jsonl")]
    store: PathBuf,
    /// Keep the HTTP bridge alive for orchestrator requests
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            args.scans,
            args.seed,
            args.partner.map(Frontend::from),
            args.store,
        )
    };

    let runner = Arc::new(Runner::new(workflow_config));
    let bridge = args.serve.then(|| {
        CalibrationBridge::new(runner.clone(), args.bind.unwrap_or_else(default_bind_address))
    });

    if args.offline {
        let summary = runner.offline()?;
        println!(
            "Offline run -> {} of {} scans calibrated, {} records persisted, {} blocks skipped",
            summary.processed.len(),
            summary.outcomes.len(),
            summary.metrics.records_persisted,
            summary.metrics.blocks_skipped
        );
        for result in &summary.outcomes {
            println!("  scan {}: {:?}", result.scan, result.outcome);
        }
        if let Some(bridge) = &bridge {
            bridge.publish(&summary);
        }

        let report = format!(
            "file={} processed={} outcomes={} metrics={}\n",
            summary.file_id,
            summary.processed.len(),
            summary.outcomes.len(),
            serde_json::to_string(&summary.metrics)?
        );
        let report_path = PathBuf::from("tools/data/offline_calibration.log");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&report_path)
            .with_context(|| format!("opening {}", report_path.display()))?;
        file.write_all(report.as_bytes())?;
    }
    if let Some(bridge) = &bridge {
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
