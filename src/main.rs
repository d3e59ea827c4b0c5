//! FOOTSIES Training Server
//!
//! Waits for the configured agents, then runs the battle at a fixed
//! 60 Hz (or unpaced with `FOOTSIES_FAST_FORWARD`) until the match ends,
//! the frame limit is hit or Ctrl-C.

use anyhow::Context;
use tracing::{info, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use footsies::{
    TICK_RATE, VERSION,
    network::{TrainingConfig, TrainingServer},
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("FOOTSIES Training Server v{}", VERSION);

    let config = TrainingConfig::from_env();
    info!(
        training = config.training,
        discipline = %config.discipline,
        p1 = %config.p1,
        p2 = %config.p2,
        fast_forward = config.fast_forward,
        "configuration loaded"
    );
    if config.tick_rate != TICK_RATE {
        info!("Tick Rate: {} Hz (simulation assumes {} Hz)", config.tick_rate, TICK_RATE);
    }

    // Socket I/O runs here; the battle loop stays on this thread
    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let mut server = TrainingServer::new(config, runtime.handle().clone());
    server.shutdown_on_ctrl_c();

    server.setup().context("training setup failed")?;

    let outcome = server.run();
    server.close();

    match outcome {
        Ok(summary) => {
            info!("=== Session Results ===");
            info!("Frames: {}", summary.frames);
            info!("Rounds: p1 {} - p2 {}", summary.round_won[0], summary.round_won[1]);
            if let Some(winner) = summary.winner {
                info!("Winner: {}", winner);
            }
            info!("Final State Hash: {}", hex::encode(summary.final_hash));
            info!("Round Input Hash: {}", hex::encode(summary.input_hash));
            Ok(())
        }
        Err(e) => {
            error!("battle loop stopped: {}", e);
            Err(e).context("fatal network error")
        }
    }
}
