//! InputRec headless demo entry point.
//!
//! Records a scripted input session on the in-memory host, persists it,
//! reloads it and replays it on a fixed tick.
//!
//! # Flow
//!
//! ```text
//! main()
//!  └─ load config             (--config, or the platform config file)
//!  └─ InputSession::new()     (MockInputHost + FileRecordRepository)
//!  └─ record                  scripted axis moves, one per step
//!  └─ save, then reload       (--records, or storage.record_path)
//!  └─ replay                  tick until ReplayFinished or Ctrl-C
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use inputrec_core::{
    input::{InputHost, RawEventKind},
    record::DeviceId,
};
use inputrec_session::application::session::{InputSession, SessionEvent};
use inputrec_session::infrastructure::host::mock::{MockControl, MockDevice, MockInputHost};
use inputrec_session::infrastructure::storage::{config, record_file::FileRecordRepository};

/// Axis values recorded by the demo, one per scripted step.
const SCRIPT: [f32; 5] = [0.1, 0.25, 0.5, 0.75, 1.0];

/// Host frames between scripted steps.
const TICKS_PER_STEP: u32 = 30;

#[derive(Debug, Parser)]
#[command(name = "inputrec", version, about = "Record and replay device input")]
struct Cli {
    /// Config file. Defaults to the platform config directory.
    #[arg(long, env = "INPUTREC_CONFIG")]
    config: Option<PathBuf>,

    /// Record file to write and replay. Overrides `storage.record_path`.
    #[arg(long)]
    records: Option<PathBuf>,

    /// Host frame interval in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_file_path().context("resolving config path")?,
    };
    let mut cfg = config::load_config(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    if let Some(records) = cli.records {
        cfg.storage.record_path = records;
    }

    // Initialise structured logging. `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.log_level)),
        )
        .init();

    info!("InputRec starting (config {})", config_path.display());

    let settings = cfg.session_settings();
    let target = settings.target_device;
    let host = Arc::new(MockInputHost::new());
    host.add_device(MockDevice::single_axis(target));
    let (mut session, mut events) = InputSession::new(
        Arc::clone(&host) as Arc<dyn InputHost>,
        Box::new(FileRecordRepository::new()),
        settings,
    );

    let tick = Duration::from_millis(cli.tick_ms.max(1));
    let dt = tick.as_secs_f64();
    let mut interval = tokio::time::interval(tick);

    // ── Record ────────────────────────────────────────────────────────────────
    session.start_recording().context("starting capture")?;
    for (step, value) in SCRIPT.into_iter().enumerate() {
        for _ in 0..TICKS_PER_STEP {
            interval.tick().await;
            host.advance(dt);
            host.poll();
        }
        host.queue_state(pressed(target, value), RawEventKind::Delta);
        host.poll();
        info!("scripted step {step}: axis = {value}");
    }
    session.stop_recording();

    // ── Persist ───────────────────────────────────────────────────────────────
    let saved = session.save_records(None).context("saving records")?;
    let loaded = session.load_records(None).context("reloading records")?;
    info!(
        "saved {saved} and reloaded {loaded} records via {}",
        session.settings().record_path.display()
    );

    // ── Replay ────────────────────────────────────────────────────────────────
    session.start_replay().context("starting replay")?;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                host.advance(dt);
                host.poll();
                session.tick(dt).context("replay tick")?;
            }
            Some(event) = events.recv() => {
                info!("session event: {event:?}");
                if let SessionEvent::ReplayFinished(summary) = event {
                    info!(
                        "replay complete: {} injected, {} failed",
                        summary.injected, summary.failed
                    );
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted; aborting replay");
                session.abort_replay().context("aborting replay")?;
                break;
            }
        }
    }

    for (index, event) in host.injected_events().iter().enumerate() {
        info!("injected #{index}: {:?}", event.values());
    }

    session.shutdown();
    info!("InputRec stopped");
    Ok(())
}

/// Device state with the gate held and the axis at `value`.
fn pressed(device_id: DeviceId, value: f32) -> MockDevice {
    MockDevice::new(
        device_id,
        vec![MockControl::button("gate", true), MockControl::axis("axis", value)],
    )
}
