//! URL helpers for turning scraped hrefs into absolute links.

/// Extracts the scheme+host origin from a URL.
///
/// Given `"https://www.playstation.com/en-gr/ps-plus/whats-new/"`, returns
/// `"https://www.playstation.com"`. Falls back to splitting on `/` when the
/// input does not parse.
#[must_use]
pub fn extract_origin(url: &str) -> String {
    reqwest::Url::parse(url).map_or_else(
        |e| {
            tracing::warn!(url, error = %e, "could not parse URL; falling back to string split for origin");
            url.trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

/// Resolves `href` against `base`.
///
/// Absolute hrefs are returned as-is, relative ones are joined onto `base`.
/// Returns `None` for blank hrefs or when `base` is not a valid URL.
#[must_use]
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let base = reqwest::Url::parse(base).ok()?;
    base.join(href).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_origin_strips_path() {
        assert_eq!(
            extract_origin("https://www.playstation.com/en-gr/ps-plus/whats-new/"),
            "https://www.playstation.com"
        );
    }

    #[test]
    fn extract_origin_falls_back_on_garbage() {
        assert_eq!(extract_origin("not a url/x/y"), "not a url/x/y");
    }

    #[test]
    fn resolve_link_joins_root_relative_href() {
        assert_eq!(
            resolve_link("https://www.playstation.com", "/en-gr/games/stray/").as_deref(),
            Some("https://www.playstation.com/en-gr/games/stray/")
        );
    }

    #[test]
    fn resolve_link_keeps_absolute_href() {
        assert_eq!(
            resolve_link(
                "https://www.playstation.com",
                "https://store.playstation.com/en-gr/product/EP0001"
            )
            .as_deref(),
            Some("https://store.playstation.com/en-gr/product/EP0001")
        );
    }

    #[test]
    fn resolve_link_rejects_blank_href() {
        assert!(resolve_link("https://www.playstation.com", "   ").is_none());
    }
}
