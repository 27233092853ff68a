use contentapi_http::{ApiClient, ApiResult, ClientOptions};
use serde_json::{json, Value as JsonValue};

/// Reads the live target from `CONTENTAPI_LIVE_BASE_URL` and the request
/// paths from `CONTENTAPI_LIVE_GET_PATH` / `CONTENTAPI_LIVE_POST_PATH`.
fn load_live_target() -> Result<(String, String, Option<String>), String> {
    let base_url = std::env::var("CONTENTAPI_LIVE_BASE_URL")
        .map_err(|_| "CONTENTAPI_LIVE_BASE_URL is required".to_owned())?;
    let get_path = std::env::var("CONTENTAPI_LIVE_GET_PATH").unwrap_or_else(|_| "/".to_owned());
    let post_path = std::env::var("CONTENTAPI_LIVE_POST_PATH").ok();
    if base_url.trim().is_empty() {
        return Err("CONTENTAPI_LIVE_BASE_URL is set but empty".to_owned());
    }
    Ok((base_url, get_path, post_path))
}

#[tokio::test]
async fn live_get_is_cached_and_post_is_not() {
    let (base_url, get_path, post_path) = match load_live_target() {
        Ok(values) => values,
        Err(_) => {
            eprintln!("skipping live test: CONTENTAPI_LIVE_BASE_URL not set");
            return;
        }
    };

    let api = ApiClient::with_options(
        ClientOptions::new(base_url)
            .with_retries(2)
            .with_retry_delay_ms(250),
    )
    .expect("client must build");

    let first: ApiResult<JsonValue> = api.get(&get_path, ()).await;
    if let ApiResult::Failure { message, code } = &first {
        panic!("live GET failed ({code}): {message}");
    }
    assert_eq!(api.cached_entries(), 1);

    let second: ApiResult<JsonValue> = api.get(&get_path, ()).await;
    assert_eq!(first, second);

    if let Some(post_path) = post_path {
        let _: ApiResult<JsonValue> = api.post(&post_path, &json!({"smoke": true})).await;
        assert_eq!(api.cached_entries(), 1);
    }
}
