use contentapi_http::{ApiClient, ApiResult, ClientOptions, Params};
use serde_json::{json, Value as JsonValue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = ClientOptions::from_env()?
        .with_retries(2)
        .with_retry_delay_ms(2_000);
    let api = ApiClient::with_options(options)?;

    let params = Params::new([("keyword", "tea")]).push("limit", 20);
    match api.get::<JsonValue, _>("/search/notes", params).await {
        ApiResult::Success { data } => println!("{data:#}"),
        ApiResult::Failure { message, code } => eprintln!("search failed ({code}): {message}"),
    }

    let created: ApiResult<JsonValue> = api
        .post("/notes", &json!({"title": "Tea notes", "content": "Oolong"}))
        .await;
    println!("{}", serde_json::to_string_pretty(&created)?);

    Ok(())
}
