use super::parse_bool_env;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Route groups that get their own limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    All,
    Auth,
    PublicRead,
    Protected,
}

impl Group {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" | "global" => Some(Self::All),
            "auth" => Some(Self::Auth),
            "public" | "public_read" | "public-read" | "read" => Some(Self::PublicRead),
            "protected" | "write" => Some(Self::Protected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth: RateLimitRule,
    pub public_read: RateLimitRule,
    pub protected: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth: RateLimitRule::new(5, 10),
            public_read: RateLimitRule::new(30, 60),
            protected: RateLimitRule::new(10, 20),
        }
    }
}

impl RateLimitConfig {
    /// `RATE_LIMIT_CONFIG` is either `per:burst` for every group or a list
    /// such as `auth=5:10,public=30:60,protected=10:20`.
    pub fn from_env() -> Self {
        let mut cfg = Self {
            enabled: parse_bool_env("RATE_LIMIT_ENABLED", true),
            ..Self::default()
        };

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_overrides(&raw) {
                Ok(overrides) => {
                    for (group, rule) in overrides {
                        cfg.set(group, rule);
                    }
                }
                Err(err) => tracing::warn!("Ignoring RATE_LIMIT_CONFIG '{}': {}", raw, err),
            }
        }

        cfg
    }

    fn set(&mut self, group: Group, rule: RateLimitRule) {
        match group {
            Group::All => {
                self.auth = rule;
                self.public_read = rule;
                self.protected = rule;
            }
            Group::Auth => self.auth = rule,
            Group::PublicRead => self.public_read = rule,
            Group::Protected => self.protected = rule,
        }
    }
}

fn parse_overrides(raw: &str) -> Result<Vec<(Group, RateLimitRule)>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty value".to_string());
    }

    if !raw.contains('=') {
        return Ok(vec![(Group::All, parse_rule(raw)?)]);
    }

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (name, rule) = item
                .split_once('=')
                .ok_or_else(|| format!("'{}' is not name=per:burst", item))?;
            let group =
                Group::parse(name).ok_or_else(|| format!("unknown group '{}'", name.trim()))?;
            Ok((group, parse_rule(rule)?))
        })
        .collect()
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second, burst) = raw
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw.trim()))?;

    let per_second: u64 = per_second
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second.trim()))?;
    let burst_size: u32 = burst
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule::new(per_second, burst_size))
}
