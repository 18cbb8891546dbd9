//! Header and cookie inspectors
//!
//! Pure, stateless classification over values the driver already captured.
//! Nothing here touches the browser; callers pass header strings or cookie
//! slices in and assert on the verdict.

use chromiumoxide::cdp::browser_protocol::network::Cookie;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NO_STORE_RE: Regex = Regex::new("(?i)no-store|no-cache").unwrap();
    static ref HSTS_MAX_AGE_RE: Regex = Regex::new(r"max-age=\d+").unwrap();
    static ref SESSIONISH_NAME_RE: Regex = Regex::new("(?i)session|sid|auth").unwrap();
    static ref HAS_ALPHA_RE: Regex = Regex::new("(?i)[a-z]").unwrap();
}

/// A `Cache-Control` value is safe for an authentication response when it
/// forbids storage outright, or is private and immediately stale.
pub fn cache_policy_is_safe(cache_control: &str) -> bool {
    NO_STORE_RE.is_match(cache_control)
        || (cache_control.contains("private") && cache_control.contains("max-age=0"))
}

/// A `Strict-Transport-Security` value counts as present when it carries a
/// numeric `max-age` directive.
pub fn hsts_present(value: &str) -> bool {
    HSTS_MAX_AGE_RE.is_match(value)
}

/// Best-effort session-cookie shape check: an explicitly session/auth-named
/// cookie, or an HTTP-only cookie with a longer-than-trivial alphabetic name.
/// A testing heuristic, not a precise identification rule; it can both
/// over- and under-match.
pub fn looks_like_session_cookie(name: &str, http_only: bool) -> bool {
    SESSIONISH_NAME_RE.is_match(name)
        || (http_only && name.len() > 8 && HAS_ALPHA_RE.is_match(name))
}

/// First cookie in the context that looks like the session cookie.
pub fn find_session_cookie(cookies: &[Cookie]) -> Option<&Cookie> {
    cookies
        .iter()
        .find(|c| looks_like_session_cookie(&c.name, c.http_only))
}
