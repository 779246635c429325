pub mod db;
pub mod money;

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Returns the current time as milliseconds since Unix epoch
pub fn unix_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as i64
}

/// Generates a random 128-bit identifier as a lowercase hex string
pub fn new_id() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}
