use axum::http::HeaderMap;
use std::time::Duration;

pub const REFRESH_COOKIE: &str = "refreshToken";
pub const REFRESH_PATH: &str = "/api/refresh";

/// Refresh token travels only in this cookie, scoped to the refresh route.
pub fn refresh_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{REFRESH_COOKIE}={token}; HttpOnly; Secure; SameSite=Strict; Path={REFRESH_PATH}; Max-Age={}",
        max_age.as_secs()
    )
}

pub fn clear_refresh_cookie() -> String {
    format!("{REFRESH_COOKIE}=; HttpOnly; Secure; SameSite=Strict; Path={REFRESH_PATH}; Max-Age=0")
}

pub fn extract_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for cookie in header.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name.trim() == REFRESH_COOKIE {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn cookie_attributes() {
        let cookie = refresh_cookie("tok123", Duration::from_secs(604800));
        assert!(cookie.starts_with("refreshToken=tok123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/api/refresh"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn clearing_sets_zero_max_age() {
        let cookie = clear_refresh_cookie();
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Path=/api/refresh"));
    }

    #[test]
    fn extraction_finds_the_refresh_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "session=abc; refreshToken=tok456; other=1".parse().unwrap(),
        );
        assert_eq!(extract_refresh_cookie(&headers), Some("tok456".into()));
    }

    #[test]
    fn extraction_handles_missing_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_refresh_cookie(&headers), None);
        headers.insert(COOKIE, "session=abc".parse().unwrap());
        assert_eq!(extract_refresh_cookie(&headers), None);
    }
}
