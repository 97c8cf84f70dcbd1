mod hub;
mod settings;

use std::{thread::sleep, time::Duration};

use anyhow::{anyhow, Result};
use clap::Parser;
use copresence::EngineBuilder;
use glam::{Quat, Vec3};
use log::{info, warn};

use crate::{
    hub::{HubStats, LoopbackSink, JOIN_STAGGER, LOCAL_USER_ID},
    settings::{Args, Settings},
};

pub fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let settings = Settings::from_args(&args)?;
    info!("[COPRESENCE_SIMULATOR] Starting with {settings:?}");

    let mut engine = EngineBuilder::new()
        .config(settings.copresence.clone())
        .build()?;

    let (to_hub, from_engine) = tokio::sync::mpsc::unbounded_channel();
    let hub = hub::spawn(
        settings.simulator.clone(),
        engine.session_events(),
        from_engine,
    );
    let mut sink = LoopbackSink::new(LOCAL_USER_ID, to_hub);

    let simulator = &settings.simulator;
    let tick = Duration::from_secs_f32(1.0 / simulator.tick_rate);
    // Everyone's stay, the last one's late arrival, and a few seconds of slack.
    let max_ticks = simulator.ticks
        + JOIN_STAGGER * simulator.participants as u64
        + simulator.tick_rate as u64 * 5;

    let mut ticks = 0;
    let mut event_errors = 0;
    let mut most_remote_heads = 0;
    loop {
        // Look around a little, as people do.
        let seconds = ticks as f32 / simulator.tick_rate;
        engine.set_viewer_pose(
            Vec3::new(0.0, 1.7, 0.0),
            Quat::from_rotation_y((seconds * 0.8).sin() * 0.6),
        )?;

        let tick_data = engine.update(&mut sink);
        ticks += 1;
        event_errors += tick_data.event_errors;
        most_remote_heads = most_remote_heads.max(tick_data.remote_heads);

        if tick_data.session_ended {
            info!("[COPRESENCE_SIMULATOR] Session ended after {ticks} ticks");
            break;
        }

        if ticks >= max_ticks {
            warn!("[COPRESENCE_SIMULATOR] Giving up on the session after {ticks} ticks");
            break;
        }

        sleep(tick);
    }

    // Hanging up lets the hub finish.
    let broadcasts = sink.sent();
    drop(sink);
    let stats: HubStats = hub
        .join()
        .map_err(|_| anyhow!("The session hub panicked"))??;

    info!(
        "[COPRESENCE_SIMULATOR] Sent {broadcasts} head poses ({} bytes), received {} poses from up to {most_remote_heads} participants, {event_errors} errors",
        stats.bytes_received, stats.poses_sent
    );

    Ok(())
}
