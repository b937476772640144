use anyhow::Result;
use std::env;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Token lifetime in seconds.
    pub expiry: u64,
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;

        let expiry = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86_400); // 1 day

        Self::new(secret, expiry)
    }

    pub fn new(secret: String, expiry: u64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            ));
        }
        if expiry == 0 {
            return Err(anyhow::anyhow!("JWT_EXPIRATION must be positive"));
        }
        Ok(Self { secret, expiry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secret_rejected() {
        assert!(JwtConfig::new("short".into(), 60).is_err());
    }

    #[test]
    fn zero_expiry_rejected() {
        assert!(JwtConfig::new("x".repeat(40), 0).is_err());
    }

    #[test]
    fn valid_config_accepted() {
        let cfg = JwtConfig::new("x".repeat(40), 60).unwrap();
        assert_eq!(cfg.expiry, 60);
    }
}
