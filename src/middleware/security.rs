use crate::config::parse_bool_env;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::{env, sync::OnceLock};

const DEFAULT_CSP_POLICY: &str = "default-src 'self'; base-uri 'self'; frame-ancestors 'none'; object-src 'none'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; connect-src 'self'";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

#[derive(Debug, Clone)]
struct SecurityHeadersConfig {
    csp: HeaderValue,
    enable_hsts: bool,
}

impl SecurityHeadersConfig {
    fn from_env() -> Self {
        let raw_csp = env::var("CSP_POLICY").unwrap_or_else(|_| DEFAULT_CSP_POLICY.to_string());
        Self {
            csp: parse_csp(&raw_csp),
            enable_hsts: parse_bool_env("ENABLE_HSTS", true),
        }
    }
}

fn parse_csp(raw: &str) -> HeaderValue {
    HeaderValue::from_str(raw).unwrap_or_else(|err| {
        tracing::warn!(
            "Invalid CSP_POLICY value ({}), falling back to default policy",
            err
        );
        HeaderValue::from_static(DEFAULT_CSP_POLICY)
    })
}

fn security_headers_config() -> &'static SecurityHeadersConfig {
    static CONFIG: OnceLock<SecurityHeadersConfig> = OnceLock::new();
    CONFIG.get_or_init(SecurityHeadersConfig::from_env)
}

fn apply_security_headers(headers: &mut HeaderMap, config: &SecurityHeadersConfig) {
    headers.insert("content-security-policy", config.csp.clone());
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    if config.enable_hsts {
        headers.insert(
            "strict-transport-security",
            HeaderValue::from_static(HSTS_VALUE),
        );
    }
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut(), security_headers_config());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_csp_falls_back_to_default() {
        assert_eq!(parse_csp("bad\nvalue"), DEFAULT_CSP_POLICY);
        assert_eq!(parse_csp("default-src 'none'"), "default-src 'none'");
    }

    #[test]
    fn hsts_follows_config() {
        let mut headers = HeaderMap::new();
        let config = SecurityHeadersConfig {
            csp: HeaderValue::from_static(DEFAULT_CSP_POLICY),
            enable_hsts: false,
        };
        apply_security_headers(&mut headers, &config);
        assert!(headers.get("strict-transport-security").is_none());
        assert_eq!(headers["x-frame-options"], "DENY");

        let config = SecurityHeadersConfig {
            enable_hsts: true,
            ..config
        };
        apply_security_headers(&mut headers, &config);
        assert_eq!(headers["strict-transport-security"], HSTS_VALUE);
    }
}
