use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::build_url;
use crate::error::ApiError;
use crate::model::CurrentUser;
use crate::token_store::{
    ACCESS_KEY, GROUPS_KEY, LOGIN_TIME_KEY, REFRESH_KEY, SESSION_KEYS, TokenStore, USERNAME_KEY,
};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Access tokens expiring within this many seconds are refreshed before use.
pub const EXPIRY_THRESHOLD_SECS: i64 = 60;

const REFRESH_PATH: &str = "/token/refresh/";
const LOGIN_PATH: &str = "/token/";
const CURRENT_USER_PATH: &str = "/league/user-roles/current_user/";

pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;

    fn now_millis(&self) -> i64 {
        self.now_unix() * 1000
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Decodes the payload segment of a JWT without checking the signature.
pub fn decode_jwt(token: &str) -> Option<Value> {
    let mut parts = token.trim().split('.');
    let _header = parts.next()?;
    let payload = parts.next()?;
    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized.as_bytes()).ok()?;
    let value: Value = serde_json::from_slice(&bytes).ok()?;
    value.is_object().then_some(value)
}

/// Expiry claim of a token, if it has a usable one.
pub fn token_expiry(token: &str) -> Option<i64> {
    let payload = decode_jwt(token)?;
    let exp = payload.get("exp")?.as_f64()?;
    if exp <= 0.0 {
        return None;
    }
    Some(exp as i64)
}

/// A token without a decodable payload or `exp` claim counts as expiring.
pub fn is_token_expiring_soon(token: &str, threshold_secs: i64, now_unix: i64) -> bool {
    match token_expiry(token) {
        Some(exp) => exp - now_unix < threshold_secs,
        None => true,
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
}

/// Session state plus the authenticated request path. Storage, transport and
/// clock are injected so refresh behaviour can be exercised without a
/// network or wall clock.
pub struct AuthSession {
    base: String,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    refresh_lock: Mutex<()>,
}

impl AuthSession {
    pub fn new(
        base: &str,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            transport,
            store,
            clock,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn url(&self, path: &str) -> String {
        build_url(&self.base, path)
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_KEY)
    }

    pub fn username(&self) -> Option<String> {
        self.store.get(USERNAME_KEY)
    }

    pub fn groups(&self) -> Vec<String> {
        self.store
            .get(GROUPS_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .unwrap_or_default()
    }

    pub fn login_time_millis(&self) -> Option<i64> {
        self.store.get(LOGIN_TIME_KEY)?.trim().parse().ok()
    }

    pub fn is_logged_in(&self) -> bool {
        self.access_token().is_some()
    }

    /// Seconds until the stored access token expires (negative once past).
    pub fn access_expires_in(&self) -> Option<i64> {
        let token = self.access_token()?;
        token_expiry(&token).map(|exp| exp - self.clock.now_unix())
    }

    pub fn is_token_expiring_soon(&self, token: &str, threshold_secs: i64) -> bool {
        is_token_expiring_soon(token, threshold_secs, self.clock.now_unix())
    }

    /// Exchanges the stored refresh token for a new access token. Any failure
    /// yields `None` and leaves storage untouched.
    pub fn refresh_token(&self) -> Option<String> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.refresh_locked()
    }

    fn refresh_locked(&self) -> Option<String> {
        let refresh = self.store.get(REFRESH_KEY)?;
        let request = HttpRequest::post_json(self.url(REFRESH_PATH), json!({ "refresh": refresh }));
        let resp = match self.transport.send(&request) {
            Ok(resp) => resp,
            Err(err) => {
                log::warn!("token refresh failed: {err}");
                return None;
            }
        };
        if !resp.is_success() {
            log::info!("token refresh rejected with http {}", resp.status);
            return None;
        }
        let parsed: RefreshResponse = match resp.json() {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("token refresh response unreadable: {err}");
                return None;
            }
        };
        if let Err(err) = self.store.set(ACCESS_KEY, &parsed.access) {
            log::warn!("storing refreshed access token failed: {err:#}");
        }
        log::debug!("access token refreshed");
        Some(parsed.access)
    }

    /// Single-flight refresh: a caller that finds a newer, still-valid access
    /// token once it holds the lock reuses it instead of refreshing again.
    fn refresh_unless_fresher(&self, seen: Option<&str>) -> Option<String> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(current) = self.store.get(ACCESS_KEY) {
            if Some(current.as_str()) != seen
                && !self.is_token_expiring_soon(&current, EXPIRY_THRESHOLD_SECS)
            {
                return Some(current);
            }
        }
        self.refresh_locked()
    }

    /// Sends `request` with the stored bearer token. Refreshes up front when
    /// the token is about to expire, and on a 401 refreshes and retries
    /// exactly once. When that refresh fails the original 401 is returned.
    pub fn fetch_with_auth(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut access = self.access_token();
        if let Some(token) = access.clone() {
            if self.is_token_expiring_soon(&token, EXPIRY_THRESHOLD_SECS) {
                if let Some(refreshed) = self.refresh_unless_fresher(Some(&token)) {
                    access = Some(refreshed);
                }
            }
        }

        let first = match access.as_deref() {
            Some(token) => request.with_header("Authorization", &format!("Bearer {token}")),
            None => request.clone(),
        };
        let resp = self.transport.send(&first)?;
        if resp.status != 401 {
            return Ok(resp);
        }

        let Some(new_access) = self.refresh_unless_fresher(access.as_deref()) else {
            return Ok(resp);
        };
        let retry = request.with_header("Authorization", &format!("Bearer {new_access}"));
        self.transport.send(&retry)
    }

    /// Authenticated request that must succeed; non-2xx becomes an error.
    pub fn send_checked(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.fetch_with_auth(request)?.error_for_status()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let request = HttpRequest::post_json(
            self.url(LOGIN_PATH),
            json!({ "username": username, "password": password }),
        );
        let resp = self.transport.send(&request)?;
        if !resp.is_success() {
            return Err(ApiError::Local(
                "Invalid username or password. Please try again.".to_string(),
            ));
        }
        let tokens: LoginResponse = resp.json()?;
        let now = self.clock.now_millis().to_string();
        for (key, value) in [
            (ACCESS_KEY, tokens.access.as_str()),
            (REFRESH_KEY, tokens.refresh.as_str()),
            (USERNAME_KEY, username),
            (LOGIN_TIME_KEY, now.as_str()),
        ] {
            self.store
                .set(key, value)
                .map_err(|err| ApiError::Local(format!("could not store session: {err:#}")))?;
        }
        log::info!("logged in as {username}");

        match self.current_user() {
            Ok(user) => log::info!("role for {}: {}", user.username, user.role()),
            Err(err) => log::warn!("could not load roles for {username}: {err}"),
        }
        Ok(())
    }

    /// Fetches the current user and records its permission names under
    /// `groups`.
    pub fn current_user(&self) -> Result<CurrentUser, ApiError> {
        if !self.is_logged_in() {
            return Err(ApiError::NotLoggedIn);
        }
        let resp = self.send_checked(&HttpRequest::get(self.url(CURRENT_USER_PATH)))?;
        let user: CurrentUser = resp.json()?;
        let groups = user.permission_names();
        let encoded = serde_json::to_string(&groups).map_err(|err| ApiError::Decode(err.to_string()))?;
        if let Err(err) = self.store.set(GROUPS_KEY, &encoded) {
            log::warn!("storing groups failed: {err:#}");
        }
        Ok(user)
    }

    /// Local gate: requires an access token and, when `allowed` is not empty,
    /// at least one of the stored groups.
    pub fn require_group(&self, allowed: &[&str]) -> bool {
        if !self.is_logged_in() {
            return false;
        }
        if allowed.is_empty() {
            return true;
        }
        let groups = self.groups();
        allowed.iter().any(|g| groups.iter().any(|have| have == g))
    }

    pub fn logout(&self) {
        for key in SESSION_KEYS {
            if let Err(err) = self.store.remove(key) {
                log::warn!("clearing {key} failed: {err:#}");
            }
        }
        log::info!("session cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("eyJhbGciOiJIUzI1NiJ9.{body}.sig")
    }

    #[test]
    fn expiring_rules() {
        let now = 1_700_000_000;
        assert!(is_token_expiring_soon("garbage", 60, now));
        assert!(is_token_expiring_soon("", 60, now));
        assert!(is_token_expiring_soon(&token_with(r#"{"sub":"1"}"#), 60, now));
        assert!(is_token_expiring_soon(
            &token_with(&format!(r#"{{"exp":{}}}"#, now + 59)),
            60,
            now
        ));
        assert!(!is_token_expiring_soon(
            &token_with(&format!(r#"{{"exp":{}}}"#, now + 60)),
            60,
            now
        ));
        assert!(!is_token_expiring_soon(
            &token_with(&format!(r#"{{"exp":{}}}"#, now + 3600)),
            60,
            now
        ));
    }

    #[test]
    fn payload_non_object_is_rejected() {
        assert!(decode_jwt(&token_with("[1,2]")).is_none());
        assert!(decode_jwt("onlyonepart").is_none());
    }
}
