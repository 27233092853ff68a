//! `contentapi-http` is a resilient async HTTP client for JSON content services.
//!
//! [`ApiClient`] exposes two entry points:
//! - [`ApiClient::get`]: cached read with bounded retry
//! - [`ApiClient::post`]: uncached write with bounded retry
//!
//! Both return [`ApiResult`]; transport and backend failures are normalized
//! into [`ApiResult::Failure`] and never surface as raw errors.

pub mod cache;
mod client;
mod decode;
mod error;
pub mod hooks;
pub mod normalize;
mod options;
mod params;
pub mod retry;
pub mod transport;
mod types;
mod value;
mod wire;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use client::{join_url, ApiClient, ApiClientBuilder};
pub use error::{ConfigError, RequestError, TransportError};
pub use hooks::{AttemptOutcome, RequestFinished, RequestHook, RequestStarted};
pub use normalize::ApiError;
pub use options::{CallOptions, ClientOptions};
pub use params::{cache_key, Params};
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
pub use types::ApiResult;
pub use value::Value;

pub type Result<T, E = RequestError> = std::result::Result<T, E>;
