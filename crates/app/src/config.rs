//! Configuration for the paritylink simulator.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including randomized defaults that are reproducible with a seed).
//!
//! The tool works with zero arguments; every resolved value can be printed
//! with `--print-config` so a run can be repeated exactly.

use paritylink_core::channel::ChannelConfig;
use paritylink_core::link::LinkVariant;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

/// Complete configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Payload ===
    /// Input file path (None = use message or generate sample)
    pub input_file: Option<PathBuf>,

    /// Literal message to send instead of generated data
    pub message: Option<String>,

    /// Size of generated data in bytes
    pub sample_bytes: usize,

    // === Link ===
    /// Framing/ARQ strategy for both ends
    pub variant: LinkVariant,

    /// Wire impairments (A to B; the return path reuses them with another seed)
    pub channel: ChannelConfig,

    /// Whether B also sends a payload back to A
    pub duplex: bool,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print per-link statistics
    pub print_stats: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// Without `--seed` a time-based seed is used; with it every default and
    /// every bit flip is deterministic.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut input_file: Option<PathBuf> = None;
        let mut message: Option<String> = None;
        let mut seed: Option<u64> = None;
        let mut sample_bytes: Option<usize> = None;
        let mut flip_rate: Option<f64> = None;
        let mut variant = LinkVariant::default();
        let mut duplex = false;
        let mut print_config = false;
        let mut print_stats = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--in" => {
                    input_file = Some(PathBuf::from(value_of(args, &mut i, "a path")?));
                }
                "--message" => {
                    message = Some(value_of(args, &mut i, "a string")?.to_string());
                }
                "--seed" => {
                    seed = Some(value_of(args, &mut i, "a number")?.parse().map_err(|_| "invalid seed")?);
                }
                "--bytes" => {
                    sample_bytes = Some(value_of(args, &mut i, "a number")?.parse().map_err(|_| "invalid bytes")?);
                }
                "--flip-rate" => {
                    let rate: f64 = value_of(args, &mut i, "a number")?
                        .parse()
                        .map_err(|_| "invalid flip rate")?;
                    if !(0.0..=1.0).contains(&rate) {
                        return Err(format!("--flip-rate must be within 0.0-1.0, got {rate}"));
                    }
                    flip_rate = Some(rate);
                }
                "--clean" => {
                    flip_rate = Some(0.0);
                }
                "--variant" => {
                    variant = value_of(args, &mut i, "a name")?
                        .parse()
                        .map_err(|e: paritylink_core::error::SetupError| e.to_string())?;
                }
                "--duplex" => {
                    duplex = true;
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-stats" => {
                    print_stats = false;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        // Determine seed (explicit or time-based)
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default()
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let config = Config {
            input_file,
            message,
            sample_bytes: sample_bytes.unwrap_or_else(|| rng.gen_range(16..=256)),
            variant,
            channel: ChannelConfig {
                flip_rate: flip_rate.unwrap_or_else(|| {
                    // Bias toward clean wires
                    let r: f64 = rng.gen();
                    r * r * 0.001
                }),
                seed,
            },
            duplex,
            print_config,
            print_stats,
        };

        Ok(config)
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match (&self.input_file, &self.message) {
            (Some(path), _) => println!("Input file: {}", path.display()),
            (None, Some(message)) => println!("Message: {:?}", message),
            (None, None) => println!("Generated sample: {} bytes", self.sample_bytes),
        }
        println!("Variant: {}", self.variant);
        println!("Duplex: {}", self.duplex);
        println!();
        println!("=== Wire ===");
        println!("Seed: {}", self.channel.seed);
        println!("Flip rate: {:.5}%", self.channel.flip_rate * 100.0);
        println!();
    }
}

/// Advance past a flag and return its value.
fn value_of<'a>(args: &'a [String], i: &mut usize, what: &str) -> Result<&'a str, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires {what}"))
}

fn print_help() {
    println!("paritylink-sim: two parity data links over a simulated noisy wire");
    println!();
    println!("USAGE:");
    println!("    paritylink-sim [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --in <PATH>           Send the contents of a file");
    println!("    --message <TEXT>      Send a literal message");
    println!("    --bytes <N>           Size of generated sample (default: random 16-256)");
    println!("    --seed <N>            Random seed for determinism");
    println!();
    println!("    --flip-rate <RATE>    Per-bit flip probability 0.0-1.0 (default: random 0-0.001)");
    println!("    --clean               Perfect wire (same as --flip-rate 0)");
    println!("    --variant <NAME>      Link variant (default: parity)");
    println!("    --duplex              Also send a sample from B back to A");
    println!();
    println!("    --print-config        Print resolved configuration");
    println!("    --no-stats            Don't print link statistics");
    println!("    --help, -h            Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    paritylink-sim                               # Random defaults");
    println!("    paritylink-sim --seed 42                     # Deterministic run");
    println!("    paritylink-sim --message '{{hi}}' --clean      # Escaping on a perfect wire");
    println!("    paritylink-sim --flip-rate 0.01 --duplex     # Heavy noise both ways");
    println!();
}
