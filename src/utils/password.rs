use anyhow::{Context, Result};
use std::{env, sync::OnceLock};

/// bcrypt work factor; `BCRYPT_COST` lowers it for tests and dev machines.
fn cost() -> u32 {
    static COST: OnceLock<u32> = OnceLock::new();
    *COST.get_or_init(|| {
        env::var("BCRYPT_COST")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|c| (4..=31).contains(c))
            .unwrap_or(bcrypt::DEFAULT_COST)
    })
}

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, cost()).context("Failed to hash password")
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("Failed to verify password")
}
