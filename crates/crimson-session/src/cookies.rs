//! Session cookie encoding on top of `http` headers.

use cookie::Cookie;
use cookie::time::Duration;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sid::SessionId;

/// Find the session identifier carried by cookie `name` in `headers`.
///
/// Absent, empty and undecodable values all yield `None`.
pub fn read_session_id(headers: &HeaderMap, name: &str) -> Option<SessionId> {
    let raw = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|parsed| parsed.ok())
        .find(|c| c.name() == name)?
        .value()
        .to_string();

    if raw.is_empty() {
        return None;
    }
    match urlencoding::decode(&raw) {
        Ok(decoded) if !decoded.is_empty() => Some(SessionId::from(decoded.into_owned())),
        Ok(_) => None,
        Err(e) => {
            debug!(cookie = name, error = %e, "Ignoring undecodable session cookie");
            None
        }
    }
}

/// Cookie that hands `sid` to the client for `max_age_secs` seconds.
pub fn session_cookie(name: &str, sid: &SessionId, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((
        name.to_string(),
        urlencoding::encode(sid.as_str()).into_owned(),
    ))
    .path("/")
    .http_only(true)
    .max_age(Duration::seconds(max_age_secs))
    .build()
}

/// Cookie that makes the client drop `name` immediately.
pub fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), ""))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}

/// Encode `cookie` as a `Set-Cookie` header value.
pub fn header_value(cookie: &Cookie<'_>) -> Result<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string()).map_err(|e| Error::Cookie(e.to_string()))
}

/// Append an encoded `Set-Cookie` header.
pub fn append_set_cookie(headers: &mut HeaderMap, value: HeaderValue) {
    headers.append(SET_COOKIE, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for c in cookies {
            headers.append(COOKIE, HeaderValue::from_str(c).unwrap());
        }
        headers
    }

    #[test]
    fn test_read_among_other_cookies() {
        let headers = request(&["theme=dark; SESSION_ID=abc-123_x; lang=en"]);
        assert_eq!(
            read_session_id(&headers, "SESSION_ID"),
            Some(SessionId::from("abc-123_x"))
        );
    }

    #[test]
    fn test_read_across_multiple_headers() {
        let headers = request(&["theme=dark", "SESSION_ID=xyz"]);
        assert_eq!(
            read_session_id(&headers, "SESSION_ID"),
            Some(SessionId::from("xyz"))
        );
    }

    #[test]
    fn test_read_unescapes() {
        let headers = request(&["SESSION_ID=a%2Bb%3D"]);
        assert_eq!(
            read_session_id(&headers, "SESSION_ID"),
            Some(SessionId::from("a+b="))
        );
    }

    #[test]
    fn test_absent_empty_and_undecodable() {
        assert_eq!(read_session_id(&HeaderMap::new(), "SESSION_ID"), None);
        assert_eq!(read_session_id(&request(&["other=1"]), "SESSION_ID"), None);
        assert_eq!(read_session_id(&request(&["SESSION_ID="]), "SESSION_ID"), None);
        // %FF is not valid UTF-8 once decoded
        assert_eq!(read_session_id(&request(&["SESSION_ID=%FF"]), "SESSION_ID"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("SESSION_ID", &SessionId::from("a+b"), 3600);
        let rendered = cookie.to_string();

        assert!(rendered.starts_with("SESSION_ID=a%2Bb"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Max-Age=3600"));
    }

    #[test]
    fn test_removal_cookie_attributes() {
        let cookie = removal_cookie("SESSION_ID");
        let rendered = cookie.to_string();

        assert!(rendered.starts_with("SESSION_ID=;"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Expires="));
    }

    #[test]
    fn test_append_set_cookie() {
        let mut headers = HeaderMap::new();
        let value = header_value(&session_cookie("sid", &SessionId::from("v"), 5)).unwrap();
        append_set_cookie(&mut headers, value);

        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 1);
    }
}
