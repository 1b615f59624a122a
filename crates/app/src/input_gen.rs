//! Sample payload generation.
//!
//! When neither an input file nor a message is given, we generate a payload
//! that exercises the framing: plenty of reserved tag bytes alongside ordinary
//! text and random bytes.
//!
//! # Design
//!
//! Generated data has:
//! - Runs of reserved bytes (`{`, `}`, `\`, `~`, the negative response tag)
//! - Text-like sections using a small alphabet
//! - Random bytes covering the full byte range
//!
//! This makes escaping overhead visible in the link statistics.

use paritylink_core::framing::{ESCAPE, NEGATIVE_RESPONSE, RESPONSE, START, STOP};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const RESERVED: [u8; 5] = [START, STOP, ESCAPE, RESPONSE, NEGATIVE_RESPONSE];

/// Generate a sample payload with a mix of reserved and ordinary bytes.
///
/// The same `seed` and `size_bytes` always produce the same payload.
pub fn generate_sample_data(seed: u64, size_bytes: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(size_bytes);

    while data.len() < size_bytes {
        let chunk_size = rng.gen_range(1..=24).min(size_bytes - data.len());

        match rng.gen_range(0..10u8) {
            // 30% reserved bytes
            0..=2 => {
                for _ in 0..chunk_size {
                    data.push(RESERVED[rng.gen_range(0..RESERVED.len())]);
                }
            }

            // 40% text-like
            3..=6 => {
                let alphabet = b"abcdefghijklmnopqrstuvwxyz .!,\n";
                for _ in 0..chunk_size {
                    data.push(alphabet[rng.gen_range(0..alphabet.len())]);
                }
            }

            // 30% random bytes
            _ => {
                for _ in 0..chunk_size {
                    data.push(rng.gen());
                }
            }
        }
    }

    data
}
