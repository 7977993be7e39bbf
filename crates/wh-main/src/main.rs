//! Warehouse simulator entry point.
//!
//! Configuration comes from the environment (see `wh_core::config` for the
//! full key list); `RUST_LOG` tunes verbosity.  Runs headless unless
//! `RENDER_TRANSPORT_URL` points at a listening renderer.
//!
//! Exit codes: 0 normal shutdown, 2 configuration error, 3 unrecoverable
//! planner failure.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wh_core::SimConfig;
use wh_render::{RenderObserver, TcpSink};
use wh_sim::{NoopObserver, Sim, SimBuilder, SimError};

/// Queued frames before the transport starts shedding the oldest.
const FRAME_QUEUE_CAPACITY: usize = 8;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match SimConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };
    info!(
        width = config.grid_width,
        height = config.grid_height,
        agents = config.num_agents,
        seed = config.seed,
        window = config.planning_window,
        "starting warehouse simulation"
    );

    let mut sim = match SimBuilder::new(config.clone()).build() {
        Ok(sim) => sim,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let result = match &config.render_url {
        Some(url) => match TcpSink::connect(url, FRAME_QUEUE_CAPACITY) {
            Ok(sink) => run_rendered(&mut sim, sink),
            Err(e) => {
                error!(%url, "renderer unavailable: {e}");
                return ExitCode::from(2);
            }
        },
        None => sim.run(&mut NoopObserver),
    };

    match result {
        Ok(()) => {
            let (stacked, carried, delivered) = sim.inventory.census();
            info!(
                ticks = sim.clock.current_tick.0,
                stacked, carried, delivered,
                "simulation finished"
            );
            ExitCode::SUCCESS
        }
        Err(e @ SimError::Stalled { .. }) => {
            error!("{e}");
            ExitCode::from(3)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_rendered(sim: &mut Sim, sink: TcpSink) -> Result<(), SimError> {
    let mut observer = RenderObserver::new(sink, sim.layout.clone());
    let result = sim.run(&mut observer);
    let sink = observer.into_sink();
    if sink.dropped_frames() > 0 {
        info!(dropped = sink.dropped_frames(), "renderer fell behind");
    }
    result
}
