use std::{collections::BTreeMap, time::Duration};

use crate::ConfigError;

/// Construction-time client configuration. Immutable once the client is built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Prefix joined with every request path. Empty means paths are absolute URLs.
    pub base_url: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Total attempts per call, including the first. Must be at least 1.
    pub retries: u32,
    /// Linear backoff unit in milliseconds.
    pub retry_delay_ms: u64,
    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Lifetime of cached read results in milliseconds.
    pub cache_ttl_ms: u64,
    /// Maximum cached entries. Zero disables caching.
    pub cache_capacity: usize,
    /// Optional upper bound across all attempts of one call.
    pub deadline_ms: Option<u64>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 10_000,
            retries: 3,
            retry_delay_ms: 1_000,
            headers: BTreeMap::new(),
            cache_ttl_ms: 300_000,
            cache_capacity: 1_000,
            deadline_ms: None,
        }
    }
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cache_ttl_ms(mut self, cache_ttl_ms: u64) -> Self {
        self.cache_ttl_ms = cache_ttl_ms;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Reads options from environment variables, starting from defaults.
    ///
    /// Reads:
    /// - `CONTENTAPI_BASE_URL`
    /// - `CONTENTAPI_TIMEOUT_MS`
    /// - `CONTENTAPI_RETRIES`
    /// - `CONTENTAPI_RETRY_DELAY_MS`
    /// - `CONTENTAPI_CACHE_TTL_MS`
    ///
    /// Unset variables keep their default. A set but non-numeric value is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(url) = lookup("CONTENTAPI_BASE_URL") {
            options.base_url = url.trim().to_owned();
        }
        if let Some(value) = parse_var(&lookup, "CONTENTAPI_TIMEOUT_MS")? {
            options.timeout_ms = value;
        }
        if let Some(value) = parse_var(&lookup, "CONTENTAPI_RETRIES")? {
            options.retries = value;
        }
        if let Some(value) = parse_var(&lookup, "CONTENTAPI_RETRY_DELAY_MS")? {
            options.retry_delay_ms = value;
        }
        if let Some(value) = parse_var(&lookup, "CONTENTAPI_CACHE_TTL_MS")? {
            options.cache_ttl_ms = value;
        }
        Ok(options)
    }

    /// Checks the invariants that cannot be expressed in the field types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::ZeroRetries(self.retries));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "timeout_ms",
            });
        }
        if self.deadline_ms == Some(0) {
            return Err(ConfigError::ZeroDuration {
                field: "deadline_ms",
            });
        }
        if !self.base_url.is_empty() {
            reqwest::Url::parse(&self.base_url).map_err(|err| ConfigError::BaseUrl {
                url: self.base_url.clone(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|_| ConfigError::Env {
        var: var.to_owned(),
        value: raw,
    })
}

/// Per-call adjustments layered over [`ClientOptions`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CallOptions {
    /// Overrides the per-attempt timeout. Zero keeps the client timeout.
    pub timeout_ms: Option<u64>,
    /// Lowers the attempt count for this call. Values above the client
    /// ceiling are clamped to it.
    pub retries: Option<u32>,
    /// Headers added to (or replacing) the client headers for this call.
    pub headers: BTreeMap<String, String>,
}

impl CallOptions {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attempt count for this call given the client ceiling.
    pub(crate) fn attempts(&self, ceiling: u32) -> u32 {
        self.retries.map_or(ceiling, |retries| retries.clamp(1, ceiling))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{CallOptions, ClientOptions};
    use crate::ConfigError;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let options = ClientOptions::default();
        assert_eq!(options.timeout_ms, 10_000);
        assert_eq!(options.retries, 3);
        assert_eq!(options.retry_delay_ms, 1_000);
        assert_eq!(options.cache_ttl_ms, 300_000);
        assert_eq!(options.cache_capacity, 1_000);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn env_overrides_defaults() {
        let options = ClientOptions::from_lookup(lookup(&[
            ("CONTENTAPI_BASE_URL", " https://api.example.com "),
            ("CONTENTAPI_RETRIES", "5"),
            ("CONTENTAPI_RETRY_DELAY_MS", "250"),
        ]))
        .expect("must load");
        assert_eq!(options.base_url, "https://api.example.com");
        assert_eq!(options.retries, 5);
        assert_eq!(options.retry_delay_ms, 250);
        assert_eq!(options.timeout_ms, 10_000);
    }

    #[test]
    fn non_numeric_retry_count_fails_fast() {
        let err = ClientOptions::from_lookup(lookup(&[("CONTENTAPI_RETRIES", "three")]))
            .expect_err("must fail");
        assert_eq!(
            err,
            ConfigError::Env {
                var: "CONTENTAPI_RETRIES".to_owned(),
                value: "three".to_owned()
            }
        );
    }

    #[test]
    fn validate_rejects_zero_retries_and_bad_url() {
        assert_eq!(
            ClientOptions::default().with_retries(0).validate(),
            Err(ConfigError::ZeroRetries(0))
        );
        assert!(matches!(
            ClientOptions::new("not a url").validate(),
            Err(ConfigError::BaseUrl { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_timeout_and_deadline() {
        assert_eq!(
            ClientOptions::default().with_timeout_ms(0).validate(),
            Err(ConfigError::ZeroDuration {
                field: "timeout_ms"
            })
        );
        assert_eq!(
            ClientOptions::default().with_deadline_ms(0).validate(),
            Err(ConfigError::ZeroDuration {
                field: "deadline_ms"
            })
        );
        assert!(ClientOptions::default().with_deadline_ms(1).validate().is_ok());
    }

    #[test]
    fn zero_timeout_from_env_fails_validation() {
        let options = ClientOptions::from_lookup(lookup(&[("CONTENTAPI_TIMEOUT_MS", "0")]))
            .expect("must load");
        assert!(matches!(
            options.validate(),
            Err(ConfigError::ZeroDuration { .. })
        ));
    }

    #[test]
    fn call_retries_never_exceed_ceiling() {
        assert_eq!(CallOptions::default().attempts(3), 3);
        assert_eq!(CallOptions::default().with_retries(10).attempts(3), 3);
        assert_eq!(CallOptions::default().with_retries(1).attempts(3), 1);
        assert_eq!(CallOptions::default().with_retries(0).attempts(3), 1);
    }
}
