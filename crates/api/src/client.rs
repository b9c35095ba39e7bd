//! Reference data clients.
//!
//! [`FixtureApi`] replays recorded responses from disk; [`HttpApi`] is a
//! blocking reqwest client (no Tokio runtime required) against a LUSID-style
//! REST API.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use gridcheck_recon::camel_case;

use crate::credentials::Secrets;
use crate::error::ApiError;
use crate::params::QueryParams;

// ── Record types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Scopes,
    Portfolios,
    Holdings,
    Transactions,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [Self::Scopes, Self::Portfolios, Self::Holdings, Self::Transactions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scopes => "scopes",
            Self::Portfolios => "portfolios",
            Self::Holdings => "holdings",
            Self::Transactions => "transactions",
        }
    }

    /// Parameters that identify the resource rather than filter it.
    pub fn path_params(&self) -> &'static [&'static str] {
        match self {
            Self::Scopes => &[],
            Self::Portfolios => &["scope"],
            Self::Holdings | Self::Transactions => &["scope", "code"],
        }
    }

    fn require<'a>(&self, params: &'a QueryParams, name: &str) -> Result<&'a str, ApiError> {
        params.text(name).filter(|s| !s.trim().is_empty()).ok_or_else(|| ApiError::MissingParam {
            call: self.as_str().to_string(),
            param: name.to_string(),
        })
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, ApiError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ApiError::UnknownCall(s.to_string()))
    }
}

// ── Contract ────────────────────────────────────────────────────────

/// One call per record type; returns the records as raw JSON objects.
pub trait ReferenceApi {
    fn fetch(&self, record_type: RecordType, params: &QueryParams) -> Result<Vec<serde_json::Value>, ApiError>;
}

/// `[...]` or `{"values": [...]}`.
fn values_of(body: serde_json::Value) -> Result<Vec<serde_json::Value>, String> {
    match body {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut map) => match map.remove("values") {
            Some(serde_json::Value::Array(items)) => Ok(items),
            _ => Err("expected a 'values' array".into()),
        },
        _ => Err("expected an array or an object with 'values'".into()),
    }
}

// ── Fixture client ──────────────────────────────────────────────────

/// Reads `<dir>/<record_type>.json`.
#[derive(Debug, Clone)]
pub struct FixtureApi {
    dir: PathBuf,
}

impl FixtureApi {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// `scope`/`code` either top-level or under `id`, in either spelling.
fn identifier<'a>(record: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    record
        .get(name)
        .or_else(|| record.get("id").and_then(|id| id.get(name)))
        .and_then(|v| v.as_str())
}

impl ReferenceApi for FixtureApi {
    fn fetch(&self, record_type: RecordType, params: &QueryParams) -> Result<Vec<serde_json::Value>, ApiError> {
        let path = self.dir.join(format!("{record_type}.json"));
        let fixture_err = |message: String| ApiError::Fixture { path: path.clone(), message };

        let text = std::fs::read_to_string(&path).map_err(|e| fixture_err(e.to_string()))?;
        let body: serde_json::Value = serde_json::from_str(&text).map_err(|e| fixture_err(e.to_string()))?;
        let records = values_of(body).map_err(fixture_err)?;
        let total = records.len();

        // Records that do not carry an identifier are not filtered on it.
        let records: Vec<_> = records
            .into_iter()
            .filter(|record| {
                record_type.path_params().iter().all(|name| match (params.text(name), identifier(record, name)) {
                    (Some(wanted), Some(actual)) => wanted == actual,
                    _ => true,
                })
            })
            .collect();

        log::debug!("fixture {}: {} of {total} records", path.display(), records.len());
        Ok(records)
    }
}

// ── HTTP client ─────────────────────────────────────────────────────

const MAX_RETRIES: u32 = 3;
const MAX_PAGES: usize = 1000;

/// LUSID-style REST client (blocking).
#[derive(Clone)]
pub struct HttpApi {
    http: reqwest::blocking::Client,
    api_url: String,
    token: String,
    initial_backoff: Duration,
}

impl HttpApi {
    pub fn new(secrets: Secrets) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("gridcheck/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ApiError::Http(e.to_string()))?;

        Ok(Self {
            http,
            api_url: secrets.api_url.trim_end_matches('/').to_string(),
            token: secrets.token,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// First retry wait; doubles on each further attempt.
    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    fn endpoint(&self, record_type: RecordType, params: &QueryParams) -> Result<String, ApiError> {
        let base = &self.api_url;
        Ok(match record_type {
            RecordType::Scopes => format!("{base}/api/scopes"),
            RecordType::Portfolios => {
                let scope = record_type.require(params, "scope")?;
                format!("{base}/api/portfolios/{scope}")
            }
            RecordType::Holdings => {
                let scope = record_type.require(params, "scope")?;
                let code = record_type.require(params, "code")?;
                format!("{base}/api/transactionportfolios/{scope}/{code}/holdings")
            }
            RecordType::Transactions => {
                let scope = record_type.require(params, "scope")?;
                let code = record_type.require(params, "code")?;
                format!("{base}/api/transactionportfolios/{scope}/{code}/transactions/$build")
            }
        })
    }

    /// Follows `nextPage` tokens until the listing is exhausted.
    fn list(&self, url: &str, query: &[(String, String)]) -> Result<Vec<serde_json::Value>, ApiError> {
        let mut all = Vec::new();
        let mut page: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let body = self.send_with_retry(|http| {
                let mut req = http.get(url).bearer_auth(&self.token).query(query);
                if let Some(ref token) = page {
                    req = req.query(&[("page", token.as_str())]);
                }
                req
            })?;

            page = body.get("nextPage").and_then(|v| v.as_str()).map(String::from);
            all.extend(values_of(body).map_err(ApiError::Decode)?);
            if page.is_none() {
                return Ok(all);
            }
        }
        Err(ApiError::Decode(format!("{url}: more than {MAX_PAGES} pages")))
    }

    /// Retries 429 and 5xx with exponential backoff, honoring Retry-After.
    fn send_with_retry(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, ApiError> {
        let mut backoff = self.initial_backoff;

        for attempt in 0..=MAX_RETRIES {
            let wait = match build_request(&self.http).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        return resp.json().map_err(|e| ApiError::Decode(e.to_string()));
                    }
                    let retryable = status == 429 || status >= 500;
                    if !retryable || attempt == MAX_RETRIES {
                        let body = resp.text().unwrap_or_default();
                        return Err(ApiError::Status { status, body });
                    }
                    resp.headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or(backoff)
                }
                Err(e) if attempt == MAX_RETRIES => return Err(ApiError::Http(e.to_string())),
                Err(e) => {
                    log::warn!("request failed ({e}), retrying");
                    backoff
                }
            };

            log::warn!("retry {}/{MAX_RETRIES} in {}ms", attempt + 1, wait.as_millis());
            thread::sleep(wait);
            backoff *= 2;
        }

        Err(ApiError::Http("retries exhausted".into()))
    }
}

impl ReferenceApi for HttpApi {
    fn fetch(&self, record_type: RecordType, params: &QueryParams) -> Result<Vec<serde_json::Value>, ApiError> {
        let url = self.endpoint(record_type, params)?;
        let filters = params.iter().filter(|(name, _)| !record_type.path_params().contains(name));

        let records = match record_type {
            // Query parameters of the build go in the body; only asAt stays in the URL.
            RecordType::Transactions => {
                let mut as_at = Vec::new();
                let mut body = serde_json::Map::new();
                for (name, value) in filters {
                    if name == "as_at" {
                        as_at.push(("asAt".to_string(), value.to_string()));
                    } else {
                        body.insert(camel_case(name), value.to_json());
                    }
                }
                let body = serde_json::Value::Object(body);
                let response = self.send_with_retry(|http| {
                    http.post(&url).bearer_auth(&self.token).query(&as_at).json(&body)
                })?;
                values_of(response).map_err(ApiError::Decode)?
            }
            _ => {
                let query: Vec<(String, String)> =
                    filters.map(|(name, value)| (camel_case(name), value.to_string())).collect();
                self.list(&url, &query)?
            }
        };

        log::info!("{record_type}: {} records from {}", records.len(), self.api_url);
        Ok(records)
    }
}
