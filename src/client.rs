use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use tokio::time::Instant;

use crate::{
    cache::{Clock, SystemClock, TtlCache},
    decode::{decode_data, encode_body, parse_body},
    hooks::{AttemptOutcome, RequestFinished, RequestHook, RequestStarted},
    normalize::normalize,
    params::cache_key,
    retry::{is_retryable, RetryPolicy},
    transport::{header_map, HttpRequest, Method, ReqwestTransport, Transport},
    ApiResult, CallOptions, ClientOptions, ConfigError, Params, RequestError, Result,
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Resilient client for a JSON content service.
///
/// Reads go through a TTL cache keyed by method, path and parameters; both
/// reads and writes go through bounded linear-backoff retry. Every failure
/// is returned as [`ApiResult::Failure`].
///
/// Cloning is cheap and clones share the cache and connection pool.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    cache: Arc<TtlCache<JsonValue>>,
    hooks: Arc<[Arc<dyn RequestHook>]>,
    headers: Arc<BTreeMap<String, String>>,
    policy: RetryPolicy,
    options: Arc<ClientOptions>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.options.base_url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .field("cache", &self.cache)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Assembles an [`ApiClient`] from options and optional collaborators.
pub struct ApiClientBuilder {
    options: ClientOptions,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
    hooks: Vec<Arc<dyn RequestHook>>,
}

impl ApiClientBuilder {
    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the clock used for cache expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Registers a hook invoked around every attempt.
    pub fn hook(mut self, hook: impl RequestHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Validates the configuration and builds the client.
    pub fn build(self) -> Result<ApiClient, ConfigError> {
        self.options.validate()?;

        let mut headers = BTreeMap::new();
        headers.insert("user-agent".to_owned(), USER_AGENT.to_owned());
        headers.insert("accept".to_owned(), "application/json".to_owned());
        for (name, value) in &self.options.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }
        header_map(&headers)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let mut policy = RetryPolicy::new(self.options.retries, self.options.retry_delay());
        if let Some(deadline_ms) = self.options.deadline_ms {
            policy = policy.with_deadline(Duration::from_millis(deadline_ms));
        }

        #[cfg(feature = "tracing")]
        let hooks = {
            let mut hooks = self.hooks;
            hooks.insert(0, Arc::new(crate::hooks::TracingHook));
            hooks
        };
        #[cfg(not(feature = "tracing"))]
        let hooks = self.hooks;

        Ok(ApiClient {
            transport,
            cache: Arc::new(TtlCache::with_clock(self.options.cache_capacity, clock)),
            hooks: hooks.into(),
            headers: Arc::new(headers),
            policy,
            options: Arc::new(self.options),
        })
    }
}

impl ApiClient {
    /// Creates a client for `base_url` with default options.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(ClientOptions::new(base_url)).build()
    }

    /// Creates a client from explicit options.
    pub fn with_options(options: ClientOptions) -> Result<Self, ConfigError> {
        Self::builder(options).build()
    }

    /// Creates a client from `CONTENTAPI_*` environment variables.
    ///
    /// See [`ClientOptions::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder(ClientOptions::from_env()?).build()
    }

    pub fn builder(options: ClientOptions) -> ApiClientBuilder {
        ApiClientBuilder {
            options,
            transport: None,
            clock: None,
            hooks: Vec::new(),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Performs a cached read.
    pub async fn get<T, P>(&self, path: &str, params: P) -> ApiResult<T>
    where
        T: DeserializeOwned,
        P: Into<Params>,
    {
        self.get_with(path, params, &CallOptions::default()).await
    }

    /// Performs a cached read with per-call options.
    ///
    /// A cache hit returns immediately without touching the network. On a
    /// miss the response JSON is cached only if the call succeeded.
    pub async fn get_with<T, P>(&self, path: &str, params: P, call: &CallOptions) -> ApiResult<T>
    where
        T: DeserializeOwned,
        P: Into<Params>,
    {
        let params = params.into();
        let key = cache_key(Method::Get.as_str(), path, &params);

        if let Some(cached) = self.cache.get(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %key, "cache hit");
            return self.finish(decode_data(cached));
        }

        let result = self.send(Method::Get, path, &params, None, call).await;
        let result = result.map(|json| {
            self.cache.set(key, json.clone(), self.options.cache_ttl());
            json
        });
        self.finish(result.and_then(decode_data))
    }

    /// Performs an uncached write with a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post_with(path, body, &CallOptions::default()).await
    }

    /// Performs an uncached write without a body.
    pub async fn post_empty<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let result = self
            .send(Method::Post, path, &Params::default(), None, &CallOptions::default())
            .await;
        self.finish(result.and_then(decode_data))
    }

    /// Performs an uncached write with per-call options.
    pub async fn post_with<T, B>(&self, path: &str, body: &B, call: &CallOptions) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = match encode_body(body) {
            Ok(body) => body,
            Err(err) => return self.finish(Err(err)),
        };
        let result = self
            .send(Method::Post, path, &Params::default(), Some(body), call)
            .await;
        self.finish(result.and_then(decode_data))
    }

    /// Drops every cached read result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of entries currently held by the read cache.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        body: Option<JsonValue>,
        call: &CallOptions,
    ) -> Result<JsonValue> {
        let url = self.url_for(path);
        let headers = self.headers_for(call)?;
        let query = params.to_query_pairs();
        let timeout = call
            .timeout_ms
            .filter(|timeout_ms| *timeout_ms > 0)
            .map_or_else(|| self.options.timeout(), Duration::from_millis);
        let policy = RetryPolicy {
            max_attempts: call.attempts(self.policy.max_attempts),
            ..self.policy
        };

        let started = Instant::now();
        policy
            .execute(
                move |attempt| {
                    let timeout = policy
                        .remaining(started.elapsed())
                        .map_or(timeout, |remaining| remaining.min(timeout));
                    let request = HttpRequest {
                        method,
                        url: url.clone(),
                        query: query.clone(),
                        headers: headers.clone(),
                        body: body.clone(),
                        timeout,
                    };
                    self.attempt(request, params, attempt)
                },
                is_retryable,
            )
            .await
    }

    async fn attempt(
        &self,
        request: HttpRequest,
        params: &Params,
        attempt: u32,
    ) -> Result<JsonValue> {
        let method = request.method;
        let url = request.url.clone();
        let started = Instant::now();

        {
            let event = RequestStarted {
                method,
                url: &url,
                params,
                body: request.body.as_ref(),
                attempt,
            };
            for hook in self.hooks.iter() {
                hook.on_request(&event);
            }
        }

        let result = self.transport.send(request).await;

        let description = result.as_ref().err().map(ToString::to_string);
        let outcome = match (&result, &description) {
            (Ok(response), _) => AttemptOutcome::Status(response.status),
            (Err(_), Some(description)) => AttemptOutcome::TransportFailure(description),
            (Err(_), None) => AttemptOutcome::TransportFailure(""),
        };
        let event = RequestFinished {
            method,
            url: &url,
            attempt,
            outcome,
            elapsed: started.elapsed(),
        };
        for hook in self.hooks.iter() {
            hook.on_response(&event);
        }

        let response = result?;
        if !response.is_success() {
            return Err(RequestError::Http {
                status: response.status,
                body: response.body,
            });
        }
        parse_body(&response.body)
    }

    fn finish<T>(&self, result: Result<T>) -> ApiResult<T> {
        match result {
            Ok(data) => ApiResult::Success { data },
            Err(err) => {
                let api_error = normalize(&err);

                #[cfg(feature = "tracing")]
                tracing::error!(
                    code = api_error.code,
                    message = %api_error.message,
                    details = ?api_error.details,
                    "api error"
                );

                api_error.into()
            }
        }
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.options.base_url, path)
    }

    fn headers_for(&self, call: &CallOptions) -> Result<BTreeMap<String, String>> {
        if call.headers.is_empty() {
            return Ok((*self.headers).clone());
        }
        let mut headers = (*self.headers).clone();
        for (name, value) in &call.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }
        header_map(&headers).map_err(|err| RequestError::Encode(err.to_string()))?;
        Ok(headers)
    }
}

/// Joins a base URL and a request path with exactly one slash.
///
/// Absolute `http(s)://` paths are returned unchanged.
pub fn join_url(base_url: &str, path: &str) -> String {
    if base_url.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    if path.is_empty() {
        return base_url.to_owned();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
