use crate::error::{AppError, AppResult};

/// Turn a title into a URL slug: lowercase ASCII alphanumerics, with every
/// run of other characters collapsed into a single `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// A slug supplied by a client must already be in canonical form.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= 255 && slugify(slug) == slug
}

/// Use `explicit` when given (it must be canonical), otherwise derive one
/// from `source`.
pub fn resolve_slug(source: &str, explicit: Option<&str>) -> AppResult<String> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) if is_valid_slug(s) => Ok(s.to_string()),
        Some(_) => Err(AppError::Validation(
            "Slug may only contain lowercase letters, digits and single hyphens".to_string(),
        )),
        None => {
            let mut derived = slugify(source);
            derived.truncate(255);
            let derived = derived.trim_end_matches('-').to_string();
            if derived.is_empty() {
                Err(AppError::Validation(
                    "Cannot derive a slug from this title".to_string(),
                ))
            } else {
                Ok(derived)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_title() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
    }

    #[test]
    fn collapses_and_trims_separators() {
        assert_eq!(slugify("  --Rust   &  Axum--  "), "rust-axum");
    }

    #[test]
    fn drops_non_ascii() {
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn validity() {
        assert!(is_valid_slug("my-first-post"));
        assert!(!is_valid_slug("My First Post"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn resolve_derives_when_missing() {
        assert_eq!(resolve_slug("Web Development", None).unwrap(), "web-development");
        assert_eq!(resolve_slug("Web Development", Some("  ")).unwrap(), "web-development");
    }

    #[test]
    fn resolve_keeps_explicit_slug() {
        assert_eq!(resolve_slug("Web", Some("webdev")).unwrap(), "webdev");
    }

    #[test]
    fn resolve_rejects_bad_input() {
        assert!(resolve_slug("Web", Some("Web Dev")).is_err());
        assert!(resolve_slug("!!!", None).is_err());
    }

    #[test]
    fn resolve_caps_length() {
        let long = "a ".repeat(300);
        let slug = resolve_slug(&long, None).unwrap();
        assert!(slug.len() <= 255);
        assert!(is_valid_slug(&slug));
    }
}
