//! Shared-credential gate for the dashboard pages.
//!
//! A browser either presents HTTP Basic credentials or a session cookie issued after a
//! successful Basic login. The cookie carries its own expiry and an HMAC over the username and
//! that expiry, keyed by the site password, so rotating the password invalidates every session.

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::config::GateSettings;

pub const SESSION_COOKIE: &str = "site_session";
const CHALLENGE: &str = "Basic realm=\"Opportunities\"";

/// Exact paths the gate never challenges: the list API is consumed by the page itself and by probes.
/// Anything below them, drafts included, stays behind the gate.
const OPEN_PATHS: &[&str] = &["/api/opportunities", "/healthz"];

#[derive(Debug)]
pub struct AccessGate {
    settings: GateSettings,
}

impl AccessGate {
    pub fn new(settings: GateSettings) -> Self {
        Self { settings }
    }

    pub fn is_open_path(path: &str) -> bool {
        let path = path.split('?').next().unwrap_or_default();
        OPEN_PATHS.iter().any(|p| path == *p || path.strip_suffix('/') == Some(*p))
    }

    /// `Authorization: Basic base64(user:pass)` with both halves matching.
    pub fn check_basic(&self, header: &str) -> bool {
        let Some(encoded) = header.strip_prefix("Basic ").map(str::trim) else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        match decoded.split_once(':') {
            Some((user, pass)) => user == self.settings.username && pass == self.settings.password,
            None => false,
        }
    }

    /// Cookie value `"<expiry_unix>.<hex hmac>"` valid for the configured session TTL.
    pub fn issue_session(&self, now_unix: u64) -> Option<String> {
        let expires = now_unix + self.settings.session_ttl.as_secs();
        let sig = self.sign(expires)?;
        Some(format!("{}.{}", expires, hex::encode(sig)))
    }

    pub fn verify_session(&self, value: &str, now_unix: u64) -> bool {
        let Some((expires, sig)) = value.split_once('.') else {
            return false;
        };
        let Ok(expires) = expires.parse::<u64>() else {
            return false;
        };
        if expires <= now_unix {
            return false;
        }
        let Ok(sig) = hex::decode(sig) else {
            return false;
        };
        match self.mac(expires) {
            Some(mac) => mac.verify_slice(&sig).is_ok(),
            None => false,
        }
    }

    pub fn session_cookie_header(&self, value: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            value,
            self.settings.session_ttl.as_secs()
        );
        if self.settings.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn mac(&self, expires: u64) -> Option<Hmac<Sha256>> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.settings.password.as_bytes()).ok()?;
        mac.update(format!("{}|{}", self.settings.username, expires).as_bytes());
        Some(mac)
    }

    fn sign(&self, expires: u64) -> Option<Vec<u8>> {
        Some(self.mac(expires)?.finalize().into_bytes().to_vec())
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

fn challenge() -> Response {
    let mut resp = (StatusCode::UNAUTHORIZED, "Authentication required").into_response();
    resp.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    resp
}

/// Axum middleware: let open paths and valid sessions through, upgrade a good Basic login to a
/// session cookie, challenge everything else.
pub async fn require_access(State(gate): State<Arc<AccessGate>>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if AccessGate::is_open_path(&path) {
        return next.run(req).await;
    }

    let now = unix_now();
    if session_cookie(req.headers()).is_some_and(|v| gate.verify_session(v, now)) {
        return next.run(req).await;
    }

    let basic_ok = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| gate.check_basic(v));
    if !basic_ok {
        debug!("Access gate challenge - path={}", path);
        return challenge();
    }

    let mut resp = next.run(req).await;
    match gate.issue_session(now).map(|v| gate.session_cookie_header(&v)) {
        Some(cookie) => match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                resp.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!("Session cookie not set - error={}", e),
        },
        None => warn!("Session cookie not set - error=could not key HMAC"),
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gate() -> AccessGate {
        AccessGate::new(GateSettings {
            username: "team".into(),
            password: "s3cret".into(),
            session_ttl: Duration::from_secs(6 * 60 * 60),
            secure_cookie: false,
        })
    }

    #[test]
    fn basic_credentials_must_match_exactly() {
        let g = gate();
        assert!(g.check_basic(&format!("Basic {}", STANDARD.encode("team:s3cret"))));
        assert!(!g.check_basic(&format!("Basic {}", STANDARD.encode("team:wrong"))));
        assert!(!g.check_basic(&format!("Basic {}", STANDARD.encode("team"))));
        assert!(!g.check_basic("Bearer abc"));
        assert!(!g.check_basic("Basic !!!not-base64"));
    }

    #[test]
    fn session_expires_after_ttl() {
        let g = gate();
        let now = 1_700_000_000;
        let value = g.issue_session(now).unwrap();
        assert!(g.verify_session(&value, now));
        assert!(g.verify_session(&value, now + 6 * 3600 - 1));
        assert!(!g.verify_session(&value, now + 6 * 3600));
    }

    #[test]
    fn tampered_or_foreign_sessions_are_rejected() {
        let g = gate();
        let now = 1_700_000_000;
        let value = g.issue_session(now).unwrap();
        let (exp, sig) = value.split_once('.').unwrap();

        // pushing the expiry forward breaks the signature
        let extended = format!("{}.{}", exp.parse::<u64>().unwrap() + 3600, sig);
        assert!(!g.verify_session(&extended, now));
        assert!(!g.verify_session("garbage", now));

        let rotated = AccessGate::new(GateSettings { password: "rotated".into(), ..g.settings.clone() });
        assert!(!rotated.verify_session(&value, now));
    }

    #[test]
    fn only_exact_open_paths_skip_the_gate() {
        assert!(AccessGate::is_open_path("/api/opportunities"));
        assert!(AccessGate::is_open_path("/api/opportunities?x=1"));
        assert!(!AccessGate::is_open_path("/api/opportunities/abc/draft"));
        assert!(!AccessGate::is_open_path("/opportunities/abc/draft"));
        assert!(AccessGate::is_open_path("/healthz"));
        assert!(!AccessGate::is_open_path("/api/opportunitiesx"));
        assert!(!AccessGate::is_open_path("/"));
    }

    #[test]
    fn cookie_header_carries_attributes() {
        let mut g = gate();
        let header = g.session_cookie_header("1.ab");
        assert!(header.starts_with("site_session=1.ab; Path=/; HttpOnly; SameSite=Lax; Max-Age=21600"));
        assert!(!header.contains("Secure"));
        g.settings.secure_cookie = true;
        assert!(g.session_cookie_header("1.ab").ends_with("; Secure"));
    }

    #[test]
    fn cookie_lookup_among_several() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; site_session=42.ff; other=1"));
        assert_eq!(session_cookie(&headers), Some("42.ff"));
    }
}
