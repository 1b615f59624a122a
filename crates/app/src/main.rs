//! paritylink-sim: run two parity data links against each other over a
//! simulated noisy wire and report what made it across.

mod config;
mod input_gen;

use std::process::ExitCode;

use paritylink_core::sim::{Side, Simulation};
use paritylink_core::{Error, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args).map_err(Error::Config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("run with --help for usage");
            return ExitCode::from(2);
        }
    };

    if config.print_config {
        config.print();
    }

    match run(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

/// Run the configured transfer; `Ok(false)` means a payload arrived damaged.
fn run(config: &Config) -> Result<bool> {
    let payload = load_payload(config)?;
    let mut sim = Simulation::new(config.variant, config.channel)?;

    info!(
        bytes = payload.len(),
        variant = %config.variant,
        flip_rate = config.channel.flip_rate,
        seed = config.channel.seed,
        "sending A -> B"
    );
    sim.send(Side::A, &payload)?;

    let reply = if config.duplex {
        let reply = input_gen::generate_sample_data(config.channel.seed.wrapping_add(1), config.sample_bytes);
        info!(bytes = reply.len(), "sending B -> A");
        sim.send(Side::B, &reply)?;
        Some(reply)
    } else {
        None
    };

    let moved = sim.pump();
    info!(bits = moved, "wire drained");

    let mut intact = check_delivery("A -> B", &payload, &sim.inbox(Side::B).concatenated());
    if let Some(reply) = &reply {
        intact &= check_delivery("B -> A", reply, &sim.inbox(Side::A).concatenated());
    }

    if config.print_stats {
        sim.link(Side::A).stats().print_summary("A");
        sim.link(Side::B).stats().print_summary("B");

        for (name, side) in [("a -> b", Side::A), ("b -> a", Side::B)] {
            let wire = sim.channel_stats(side);
            println!(
                "Wire {name}: {} bits sent, {} flipped ({:.4}%)",
                wire.bits_sent,
                wire.bits_flipped,
                wire.flip_rate() * 100.0
            );
        }
    }

    Ok(intact)
}

fn load_payload(config: &Config) -> Result<Vec<u8>> {
    if let Some(path) = &config.input_file {
        return Ok(std::fs::read(path)?);
    }
    if let Some(message) = &config.message {
        return Ok(message.as_bytes().to_vec());
    }
    Ok(input_gen::generate_sample_data(config.channel.seed, config.sample_bytes))
}

fn check_delivery(direction: &str, sent: &[u8], received: &[u8]) -> bool {
    if sent == received {
        info!(direction, bytes = sent.len(), "payload delivered intact");
        true
    } else {
        let first_diff = sent.iter().zip(received).position(|(a, b)| a != b);
        warn!(
            direction,
            sent = sent.len(),
            received = received.len(),
            first_diff = ?first_diff,
            "payload damaged in transit"
        );
        false
    }
}
