#[doc(hidden)]
mod config;
pub mod cosmos;
#[doc(hidden)]
mod error;
#[doc(hidden)]
mod feed_store;
#[doc(hidden)]
mod models;
pub mod webhook;

pub use config::Config;
pub use error::Error;
pub use feed_store::FeedStore;
pub use models::*;

#[tokio::main]
async fn main() -> anyhow::Result<()>
{
	pretty_env_logger::init();

	// Prefer the config file if there is one, and fall back to the environment otherwise
	let config = match std::path::Path::new("config.yaml").exists()
	{
		true => Config::from_file("config.yaml")?,
		false => Config::from_env()?,
	};

	let gate = webhook::Gate::new(config.webhook);

	// Feed items are stored in Cosmos DB. The database and container are created on demand
	let feed_store: std::sync::Arc<dyn FeedStore> =
		std::sync::Arc::new(cosmos::Client::from_config(config.cosmos_db)?);

	let routes = routes(gate, feed_store, config.max_payload_size);

	log::info!("listening for incoming webhook events on {}", config.listen_address);
	warp::serve(routes).run(config.listen_address).await;

	Ok(())
}

/// All routes of this service, including the rejection handler.
///
/// # Arguments
/// - `gate`: Authenticates and filters webhook deliveries.
/// - `feed_store`: Where accepted feed items are appended.
/// - `max_payload_size`: Payloads larger than this many bytes are rejected.
fn routes(gate: webhook::Gate, feed_store: std::sync::Arc<dyn FeedStore>, max_payload_size: u64)
	-> impl warp::Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone
{
	use warp::Filter as _;

	// Only listen for requests to the root path
	warp::path::end()
		// Only listen for POST requests
		.and(warp::post())
		// Require a signature and retrieve it along with the event header and the raw payload
		.and(webhook::delivery(max_payload_size))
		// Relay handles to the gate and the feed store
		.and(warp::any().map(move || gate.clone()))
		.and(warp::any().map(move || feed_store.clone()))
		// Forward request to request handler
		.and_then(handle_webhook_event)
		.recover(handle_rejection)
}

/// Request handler for webhook deliveries.
///
/// # Arguments
/// - `provided_signature`: The `X-Hub-Signature-256` header.
/// - `event`: The `X-GitHub-Event` header, if present.
/// - `body`: The raw payload.
/// - `gate`: Authenticates and filters webhook deliveries.
/// - `feed_store`: Where accepted feed items are appended.
async fn handle_webhook_event(
	provided_signature: String,
	event: Option<String>,
	body: warp::hyper::body::Bytes,
	gate: webhook::Gate,
	feed_store: std::sync::Arc<dyn FeedStore>)
	-> Result<warp::reply::Response, warp::Rejection>
{
	use warp::Reply as _;

	let verdict = gate.handle(Some(provided_signature.as_str()), event.as_deref(), &body)
		.map_err(warp::reject::custom)?;

	let feed_item = match verdict
	{
		webhook::Verdict::Accepted(feed_item) => feed_item,
		// Events of other accounts aren’t errors, but there’s nothing new for the feed either
		webhook::Verdict::NotRelevant =>
			return Ok(warp::reply::with_status(warp::reply(),
				warp::http::StatusCode::NOT_MODIFIED).into_response()),
	};

	if let Err(error) = feed_store.add_feed_item(&feed_item).await
	{
		log::error!("could not store “{}” feed item for repository “{}”", feed_item.type_,
			feed_item.meta.repo);
		log::error!("{:?}", anyhow::Error::from(error));

		// Don’t leak any details about the storage backend to the caller
		let response = warp::reply::json(&ErrorResponse{error: "internal server error"});

		return Ok(warp::reply::with_status(response,
			warp::http::StatusCode::INTERNAL_SERVER_ERROR).into_response());
	}

	log::info!("stored “{}” feed item for repository “{}”", feed_item.type_, feed_item.meta.repo);

	let response = warp::reply::json(&InfoResponse{info: "stored feed item"});

	Ok(warp::reply::with_status(response, warp::http::StatusCode::OK).into_response())
}

/// Request handler for all requests that were rejected previously.
///
/// # Arguments
/// - `error`: Reasons for why this request was rejected by all routes.
async fn handle_rejection(error: warp::Rejection)
	-> Result<impl warp::Reply, std::convert::Infallible>
{
	let status_code;
	let message;

	if error.is_not_found()
	{
		status_code = warp::http::StatusCode::NOT_FOUND;
		message = "not found";
	}
	else if let Some(_) = error.find::<warp::reject::MethodNotAllowed>()
	{
		status_code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
		message = "method not allowed";
	}
	else if let Some(_) = error.find::<warp::reject::PayloadTooLarge>()
	{
		status_code = warp::http::StatusCode::BAD_REQUEST;
		message = "payload too large";
	}
	else if let Some(_) = error.find::<warp::reject::LengthRequired>()
	{
		status_code = warp::http::StatusCode::LENGTH_REQUIRED;
		message = "missing content length";
	}
	else if let Some(crate::Error::MissingPayloadSignature) = error.find()
	{
		status_code = warp::http::StatusCode::FORBIDDEN;
		message = "missing payload signature";
	}
	else if let Some(crate::Error::InvalidPayloadSignature) = error.find()
	{
		status_code = warp::http::StatusCode::FORBIDDEN;
		message = "invalid payload signature";
	}
	else if let Some(crate::Error::MissingEventHeader) = error.find()
	{
		status_code = warp::http::StatusCode::BAD_REQUEST;
		message = "missing webhook event header";
	}
	else if let Some(crate::Error::DecodePayloadBody(_)) = error.find()
	{
		status_code = warp::http::StatusCode::BAD_REQUEST;
		message = "malformed payload body";
	}
	// If users are able to trigger errors we did not anticipate, log the error chain so we can
	// inspect this more closely later
	else
	{
		status_code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
		message = "internal server error";

		log::error!("unhandled error: {:#?}", error);
	}

	let response = warp::reply::json(&ErrorResponse{error: message});

	Ok(warp::reply::with_status(response, status_code))
}

/// Response type acknowledging successfully handled webhook events (serialized to JSON).
#[derive(serde::Serialize)]
struct InfoResponse<'a>
{
	/// Info message with human-readable information about how this request was handled.
	info: &'a str,
}

/// Response type informing about errors while handling webhook events (serialized to JSON).
#[derive(serde::Serialize)]
struct ErrorResponse<'a>
{
	/// Error message with a human-readable explanation as to why this request failed.
	error: &'a str,
}

#[cfg(test)]
mod tests
{
	use crate::feed_store::tests::MemoryFeedStore;
	use crate::webhook::tests::{gate, push_payload, sign, TRACKED_LOGIN};

	async fn deliver(
		feed_store: std::sync::Arc<MemoryFeedStore>,
		signature: Option<&str>,
		event: &str,
		body: &[u8])
		-> warp::http::Response<warp::hyper::body::Bytes>
	{
		let routes = super::routes(gate(), feed_store, 1024 * 1024);

		let mut request = warp::test::request()
			.method("POST")
			.path("/")
			.header("x-github-event", event)
			.body(body.to_vec());

		if let Some(signature) = signature
		{
			request = request.header("x-hub-signature-256", signature);
		}

		request.reply(&routes).await
	}

	fn response_json(response: &warp::http::Response<warp::hyper::body::Bytes>)
		-> serde_json::Value
	{
		serde_json::from_slice(response.body()).unwrap()
	}

	#[tokio::test]
	async fn stores_events_of_tracked_sender()
	{
		let feed_store = std::sync::Arc::new(MemoryFeedStore::default());
		let body = push_payload(TRACKED_LOGIN);

		let response = deliver(feed_store.clone(), Some(sign(&body).as_str()), "push", &body).await;

		assert_eq!(response.status(), 200);

		let feed_items = feed_store.feed_items();
		assert_eq!(feed_items.len(), 1);
		assert_eq!(serde_json::to_value(&feed_items[0]).unwrap(), serde_json::json!({
			"type": "github-push",
			"url": "https://x",
			"description": "d",
			"meta": {
				"isFork": false,
				"isPrivate": true,
				"repo": "a/b",
			},
		}));
	}

	#[tokio::test]
	async fn rejects_missing_signature()
	{
		let feed_store = std::sync::Arc::new(MemoryFeedStore::default());
		let body = push_payload(TRACKED_LOGIN);

		let response = deliver(feed_store.clone(), None, "push", &body).await;

		assert_eq!(response.status(), 403);
		assert_eq!(response_json(&response)["error"], "missing payload signature");
		assert!(feed_store.feed_items().is_empty());
	}

	#[tokio::test]
	async fn rejects_invalid_signature()
	{
		let feed_store = std::sync::Arc::new(MemoryFeedStore::default());
		let body = push_payload(TRACKED_LOGIN);
		let signature = sign(b"some other payload");

		let response = deliver(feed_store.clone(), Some(signature.as_str()), "push", &body).await;

		assert_eq!(response.status(), 403);
		assert_eq!(response_json(&response)["error"], "invalid payload signature");
		assert!(feed_store.feed_items().is_empty());
	}

	#[tokio::test]
	async fn ignores_other_senders()
	{
		let feed_store = std::sync::Arc::new(MemoryFeedStore::default());
		let body = push_payload("someone-else");

		let response = deliver(feed_store.clone(), Some(sign(&body).as_str()), "push", &body).await;

		assert_eq!(response.status(), 304);
		assert!(feed_store.feed_items().is_empty());
	}

	#[tokio::test]
	async fn ignores_other_senders_without_repository()
	{
		let feed_store = std::sync::Arc::new(MemoryFeedStore::default());
		let body = serde_json::to_vec(&serde_json::json!({
			"zen": "Keep it logically awesome.",
			"hook_id": 1,
			"sender": {"login": "someone-else"},
			"organization": {"login": "octo-org", "url": "https://api.github.com/orgs/octo-org"},
		})).unwrap();

		let response = deliver(feed_store.clone(), Some(sign(&body).as_str()), "ping", &body).await;

		assert_eq!(response.status(), 304);
		assert!(feed_store.feed_items().is_empty());
	}

	#[tokio::test]
	async fn rejects_unsigned_requests_before_reading_the_body()
	{
		let feed_store: std::sync::Arc<dyn crate::FeedStore> =
			std::sync::Arc::new(MemoryFeedStore::default());
		let routes = super::routes(gate(), feed_store, 16);

		// Neither a content length nor a signature
		let response = warp::test::request()
			.method("POST")
			.path("/")
			.header("x-github-event", "push")
			.reply(&routes).await;
		assert_eq!(response.status(), 403);

		// A payload larger than allowed without a signature
		let response = warp::test::request()
			.method("POST")
			.path("/")
			.header("x-github-event", "push")
			.body(push_payload(TRACKED_LOGIN))
			.reply(&routes).await;
		assert_eq!(response.status(), 403);
	}

	#[tokio::test]
	async fn rejects_oversized_signed_payloads()
	{
		let feed_store: std::sync::Arc<dyn crate::FeedStore> =
			std::sync::Arc::new(MemoryFeedStore::default());
		let routes = super::routes(gate(), feed_store, 16);
		let body = push_payload(TRACKED_LOGIN);

		let response = warp::test::request()
			.method("POST")
			.path("/")
			.header("x-github-event", "push")
			.header("x-hub-signature-256", sign(&body))
			.body(body)
			.reply(&routes).await;
		assert_eq!(response.status(), 400);
		assert_eq!(response_json(&response)["error"], "payload too large");
	}

	#[tokio::test]
	async fn hides_storage_errors()
	{
		let feed_store = std::sync::Arc::new(MemoryFeedStore::failing());
		let body = push_payload(TRACKED_LOGIN);

		let response = deliver(feed_store.clone(), Some(sign(&body).as_str()), "push", &body).await;

		assert_eq!(response.status(), 500);
		assert_eq!(response_json(&response), serde_json::json!({"error": "internal server error"}));
	}

	#[tokio::test]
	async fn rejects_malformed_payload()
	{
		let feed_store = std::sync::Arc::new(MemoryFeedStore::default());
		let body = br#"{"sender": {"login": "octocat"}}"#;

		let response = deliver(feed_store.clone(), Some(sign(body).as_str()), "push", body).await;

		assert_eq!(response.status(), 400);
		assert!(feed_store.feed_items().is_empty());
	}

	#[tokio::test]
	async fn rejects_other_methods_and_paths()
	{
		let feed_store: std::sync::Arc<dyn crate::FeedStore> =
			std::sync::Arc::new(MemoryFeedStore::default());
		let routes = super::routes(gate(), feed_store, 1024 * 1024);

		let response = warp::test::request().method("GET").path("/").reply(&routes).await;
		assert_eq!(response.status(), 405);

		let response = warp::test::request().method("POST").path("/hooks").reply(&routes).await;
		assert_eq!(response.status(), 404);
	}
}
