//! CSRF token service using the double-submit cookie pattern.
//!
//! No server-side session store: a token is issued as an HttpOnly cookie and
//! the client must echo the same value in a custom header on mutating
//! requests. A cross-origin attacker cannot read the cookie to forge the
//! header, which is the entire defense.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const COOKIE_NAME: &str = "csrf_tok";
pub const HEADER_NAME: &str = "x-csrf-token";

/// Generates a fresh token and the `Set-Cookie` value that carries it.
/// Returns `(token, cookie)`; the raw token goes back to the client in the
/// response body for later replay in the custom header.
pub fn issue() -> (String, String) {
    let token = hex::encode(rand::random::<[u8; 16]>());
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Secure",
        COOKIE_NAME, token
    );
    (token, cookie)
}

/// True only when the cookie value and the header value are both present and
/// byte-equal. Missing either one fails the check.
pub fn verify(headers: &HeaderMap) -> bool {
    let from_cookie = match cookie_value(headers, COOKIE_NAME) {
        Some(v) if !v.is_empty() => v,
        _ => return false,
    };
    let from_header = match headers.get(HEADER_NAME).and_then(|v| v.to_str().ok()) {
        Some(v) if !v.is_empty() => v,
        _ => return false,
    };
    from_cookie == from_header
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderValue;

    fn request_headers(cookie: &str, header: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !cookie.is_empty() {
            headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        if !header.is_empty() {
            headers.insert(HEADER_NAME, HeaderValue::from_str(header).unwrap());
        }
        headers
    }

    #[test]
    fn issued_token_is_32_hex_chars() {
        let (token, cookie) = issue();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(cookie.starts_with(&format!("{}={}", COOKIE_NAME, token)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn issued_tokens_are_unique() {
        let (a, _) = issue();
        let (b, _) = issue();
        assert_ne!(a, b);
    }

    #[test]
    fn round_trip_passes() {
        let (token, _) = issue();
        let headers = request_headers(&format!("{}={}", COOKIE_NAME, token), &token);
        assert!(verify(&headers));
    }

    #[test]
    fn cookie_is_found_among_other_cookies() {
        let (token, _) = issue();
        let cookie = format!("theme=dark; {}={}; lang=en", COOKIE_NAME, token);
        let headers = request_headers(&cookie, &token);
        assert!(verify(&headers));
    }

    #[test]
    fn single_character_mutation_fails() {
        let (token, _) = issue();
        let mut mutated = token.clone().into_bytes();
        mutated[0] = if mutated[0] == b'0' { b'1' } else { b'0' };
        let mutated = String::from_utf8(mutated).unwrap();

        let headers = request_headers(&format!("{}={}", COOKIE_NAME, token), &mutated);
        assert!(!verify(&headers));
        let headers = request_headers(&format!("{}={}", COOKIE_NAME, mutated), &token);
        assert!(!verify(&headers));
    }

    #[test]
    fn missing_cookie_or_header_fails() {
        let (token, _) = issue();
        assert!(!verify(&request_headers("", &token)));
        assert!(!verify(&request_headers(
            &format!("{}={}", COOKIE_NAME, token),
            ""
        )));
        assert!(!verify(&HeaderMap::new()));
    }
}
