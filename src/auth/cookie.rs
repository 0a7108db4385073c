//! Session cookie parsing and construction.

use axum::http::{HeaderMap, HeaderValue, header};

/// Cookie name for the access token (short-lived, 15 minutes).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token (long-lived, 7 days).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Build a `Set-Cookie` value for an auth cookie.
pub fn auth_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        name, value, max_age_secs, secure
    )
}

/// Build a `Set-Cookie` value that removes an auth cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    auth_cookie(name, "", 0, secure)
}

/// Append the two clearing `Set-Cookie` headers to a response.
pub fn append_cleared_session(headers: &mut HeaderMap, secure: bool) {
    for name in [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME] {
        if let Ok(value) = HeaderValue::from_str(&clear_cookie(name, secure)) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

/// The pair of cookies carrying a freshly issued session.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    pub access: String,
    pub refresh: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken=abc123"));

        assert_eq!(get_cookie(&headers, "accessToken"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; accessToken=abc123; refreshToken=xyz789"),
        );

        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), Some("abc123"));
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), None);
        assert_eq!(get_cookie(&HeaderMap::new(), ACCESS_COOKIE_NAME), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  accessToken = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), Some("abc123"));
    }

    #[test]
    fn test_auth_cookie_flags() {
        let cookie = auth_cookie(ACCESS_COOKIE_NAME, "tok", 900, false);
        assert_eq!(
            cookie,
            "accessToken=tok; HttpOnly; SameSite=Strict; Path=/; Max-Age=900"
        );

        let secure = auth_cookie(REFRESH_COOKIE_NAME, "tok", 604800, true);
        assert!(secure.ends_with("Max-Age=604800; Secure"));
    }

    #[test]
    fn test_cleared_session_sets_both_cookies() {
        let mut headers = HeaderMap::new();
        append_cleared_session(&mut headers, false);

        let cookies: Vec<&str> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
        assert!(cookies[0].starts_with("accessToken=;"));
        assert!(cookies[1].starts_with("refreshToken=;"));
    }
}
