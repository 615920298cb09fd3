use std::fmt;

use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::DashboardConfig;
use crate::credentials::{CredentialName, CredentialStore};

pub const SUBJECT_LOOKUP_SELECTIONS: &str = "basic,profile,bars,travel,faction,money,battlestats";
pub const SUBJECT_REFRESH_SELECTIONS: &str = "bars,money,travel,battlestats";
pub const SUBJECT_STATUS_SELECTIONS: &str = "basic,travel";
const WHOAMI_SELECTIONS: &str = "basic,profile,faction";
const KEY_PARAM: &str = "key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    MissingCredential(CredentialName),
    InvalidId(String),
    Transport(String),
    Remote(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::MissingCredential(CredentialName::Primary) => f.write_str(
                "API key not configured. Please enter your API key in the Settings tab.",
            ),
            FetchError::MissingCredential(CredentialName::Companion) => f.write_str(
                "FFScouter API key not configured. Please enter it in the Settings tab.",
            ),
            FetchError::InvalidId(raw) => {
                write!(f, "Invalid user ID: {raw}. User ID must be a number.")
            }
            FetchError::Transport(msg) | FetchError::Remote(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for FetchError {}

pub type FetchResult<T = Value> = Result<T, FetchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    Primary,
    Companion,
}

/// Rejects anything that is not a positive integer before a request is built.
pub fn validate_subject_id(raw: &str) -> FetchResult<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FetchError::InvalidId(trimmed.to_string()));
    }
    match trimmed.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(FetchError::InvalidId(trimmed.to_string())),
    }
}

pub fn build_url(base: &str, path: &str, query: &[(&str, String)], key: &str) -> FetchResult<Url> {
    let raw = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let params = query
        .iter()
        .map(|(k, v)| (*k, v.as_str()))
        .chain(std::iter::once((KEY_PARAM, key)));
    Url::parse_with_params(&raw, params)
        .map_err(|err| FetchError::Transport(format!("invalid request url {raw}: {err}")))
}

/// Copy of the url that is safe to log.
pub fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == KEY_PARAM {
                "KEY_HIDDEN".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

pub fn interpret_response(status: u16, body: &str, subject: Option<u64>) -> FetchResult {
    if !(200..300).contains(&status) {
        return Err(FetchError::Transport(format!("HTTP error! status: {status}")));
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|err| FetchError::Transport(format!("invalid JSON response: {err}")))?;
    unwrap_envelope(value, subject)
}

/// Both APIs report failures inside a 200 body under `error`.
pub fn unwrap_envelope(body: Value, subject: Option<u64>) -> FetchResult {
    let Some(error) = body.get("error").filter(|e| !e.is_null()) else {
        return Ok(body);
    };
    let message = error_message(error);
    if let Some(id) = subject {
        if message.contains("ID-entity") {
            return Err(FetchError::Remote(format!(
                "Permission denied: API key does not have access to user {id}. \
                 This may be due to insufficient API key permissions."
            )));
        }
    }
    Err(FetchError::Remote(message))
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => other
            .get("error")
            .or_else(|| other.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

/// Both remote APIs behind one credential-aware GET.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    api_base: String,
    companion_base: String,
    credentials: CredentialStore,
}

impl ApiClient {
    pub fn new(http: Client, config: &DashboardConfig, credentials: CredentialStore) -> Self {
        Self {
            http,
            api_base: config.api_base_url.clone(),
            companion_base: config.companion_base_url.clone(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn request(
        &self,
        api: Api,
        path: &str,
        query: &[(&str, String)],
        credential: CredentialName,
    ) -> FetchResult {
        self.get(api, path, query, credential, None)
    }

    fn get(
        &self,
        api: Api,
        path: &str,
        query: &[(&str, String)],
        credential: CredentialName,
        subject: Option<u64>,
    ) -> FetchResult {
        // Read fresh on every call so an edited settings field applies immediately.
        let key = self
            .credentials
            .get(credential)
            .ok_or(FetchError::MissingCredential(credential))?;
        let base = match api {
            Api::Primary => &self.api_base,
            Api::Companion => &self.companion_base,
        };
        let url = build_url(base, path, query, &key)?;
        debug!(url = %redact(&url), "GET");

        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|err| FetchError::Transport(err.without_url().to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|err| FetchError::Transport(err.without_url().to_string()))?;
        interpret_response(status, &body, subject)
    }

    pub fn whoami(&self) -> FetchResult {
        self.request(
            Api::Primary,
            "/user/",
            &[("selections", WHOAMI_SELECTIONS.to_string())],
            CredentialName::Primary,
        )
    }

    pub fn fetch_user(&self, raw_id: &str, selections: &str) -> FetchResult {
        let id = validate_subject_id(raw_id)?;
        self.get(
            Api::Primary,
            &format!("/user/{id}"),
            &[("selections", selections.to_string())],
            CredentialName::Primary,
            Some(id),
        )
    }

    pub fn fetch_user_stocks(&self, id: u64) -> FetchResult {
        self.fetch_user(&id.to_string(), "stocks")
    }

    pub fn fetch_stock_catalog(&self) -> FetchResult {
        self.request(
            Api::Primary,
            "/torn/",
            &[("selections", "stocks".to_string())],
            CredentialName::Primary,
        )
    }

    pub fn fetch_bounties(&self, offset: u32, limit: u32) -> FetchResult {
        self.request(
            Api::Primary,
            "/torn/bounties",
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
            CredentialName::Primary,
        )
    }

    /// `None` reads the members of the key owner's faction.
    pub fn fetch_faction_members(&self, faction_id: Option<u64>) -> FetchResult {
        let path = match faction_id {
            Some(id) => format!("/faction/{id}/members"),
            None => "/faction/members".to_string(),
        };
        self.request(Api::Primary, &path, &[], CredentialName::Primary)
    }

    pub fn fetch_wars(&self) -> FetchResult {
        self.request(Api::Primary, "/faction/wars", &[], CredentialName::Primary)
    }

    pub fn fetch_fair_fight(&self, ids: &[u64]) -> FetchResult {
        let targets = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.request(
            Api::Companion,
            "/get-stats",
            &[("targets", targets)],
            CredentialName::Companion,
        )
    }

    pub fn fetch_targets(&self, offset: u32, limit: u32, min_ff: f64, max_ff: f64) -> FetchResult {
        self.request(
            Api::Companion,
            "/get-targets",
            &[
                ("minff", format!("{min_ff:.2}")),
                ("maxff", format!("{max_ff:.2}")),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ],
            CredentialName::Companion,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subject_ids_must_be_positive_integers() {
        assert_eq!(validate_subject_id(" 3883628 "), Ok(3883628));
        assert!(matches!(validate_subject_id("12a"), Err(FetchError::InvalidId(_))));
        assert!(matches!(validate_subject_id("-4"), Err(FetchError::InvalidId(_))));
        assert!(matches!(validate_subject_id("0"), Err(FetchError::InvalidId(_))));
        assert!(matches!(validate_subject_id(""), Err(FetchError::InvalidId(_))));
    }

    #[test]
    fn key_travels_as_query_parameter() {
        let url = build_url(
            "https://api.torn.com/v2/",
            "/user/1",
            &[("selections", "basic,travel".to_string())],
            "secret",
        )
        .unwrap();
        assert_eq!(url.path(), "/v2/user/1");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("key".to_string(), "secret".to_string())));
        assert!(pairs.contains(&("selections".to_string(), "basic,travel".to_string())));
        assert!(!redact(&url).contains("secret"));
    }

    #[test]
    fn envelope_error_variants() {
        let nested = json!({"error": {"code": 2, "error": "Incorrect key"}});
        assert_eq!(
            unwrap_envelope(nested, None),
            Err(FetchError::Remote("Incorrect key".to_string()))
        );
        let opaque = json!({"error": {"code": 9}});
        assert_eq!(
            unwrap_envelope(opaque, None),
            Err(FetchError::Remote("{\"code\":9}".to_string()))
        );
        let ok = json!({"name": "x"});
        assert!(unwrap_envelope(ok, None).is_ok());
    }

    #[test]
    fn id_entity_error_becomes_permission_message() {
        let body = json!({"error": {"code": 7, "error": "Incorrect ID-entity relation"}});
        assert_eq!(
            unwrap_envelope(body.clone(), Some(42)),
            Err(FetchError::Remote(
                "Permission denied: API key does not have access to user 42. \
                 This may be due to insufficient API key permissions."
                    .to_string()
            ))
        );
        assert_eq!(
            unwrap_envelope(body, None),
            Err(FetchError::Remote("Incorrect ID-entity relation".to_string()))
        );
    }

    #[test]
    fn non_success_status_is_transport_error() {
        let err = interpret_response(503, "oops", None).unwrap_err();
        assert_eq!(err, FetchError::Transport("HTTP error! status: 503".to_string()));
    }
}
