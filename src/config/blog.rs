use std::{env, sync::OnceLock};

const DEFAULT_AVATAR_URL: &str = "/static/images/default-avatar.jpg";
const DEFAULT_POSTS_PER_PAGE: u64 = 5;

/// Site-level settings shared by the post and profile handlers.
#[derive(Debug, Clone)]
pub struct BlogConfig {
    pub posts_per_page: u64,
    pub default_avatar_url: String,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
        }
    }
}

impl BlogConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let posts_per_page = env::var("POSTS_PER_PAGE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .filter(|n: &u64| *n > 0)
            .unwrap_or(defaults.posts_per_page);

        let default_avatar_url = env::var("DEFAULT_AVATAR_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_avatar_url);

        Self {
            posts_per_page,
            default_avatar_url,
        }
    }
}

pub fn blog_config() -> &'static BlogConfig {
    static CONFIG: OnceLock<BlogConfig> = OnceLock::new();
    CONFIG.get_or_init(BlogConfig::from_env)
}
