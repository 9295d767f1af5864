// Splits the collection URL into the authority the transport connects to
// and the path it posts to.

const HTTP_PREFIX: &str = "http://";

/// Host/authority and request path derived from a raw URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub host: String,
    pub path: String,
}

/// Split `url` into host and path.
///
/// The scan starts right after the first `http://` found anywhere in the
/// string (or at the start when there is none), so an `http://` inside a
/// query value wins if it is the leftmost one. The host runs up to the first
/// `/`; the path is the rest, or `/` when there is no slash. Never fails: an
/// empty host falls back to the whole URL with path `/`.
pub fn split_url(url: &str) -> UrlParts {
    let start = url
        .find(HTTP_PREFIX)
        .map(|pos| pos + HTTP_PREFIX.len())
        .unwrap_or(0);
    let rest = &url[start..];

    let (host, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, "/"),
    };

    if host.is_empty() {
        return UrlParts {
            host: url.to_string(),
            path: "/".to_string(),
        };
    }

    UrlParts {
        host: host.to_string(),
        path: path.to_string(),
    }
}
