/// All errors that may occur during initialization or while handling requests.
#[derive(Debug, thiserror::Error)]
pub enum Error
{
	#[error("could not read config file")]
	ReadConfigFile(#[source] std::io::Error),
	#[error("could not parse config file")]
	ParseConfigFile(#[source] serde_yaml::Error),
	#[error("missing environment variable {0}")]
	MissingEnvironmentVariable(&'static str),
	#[error("invalid value in environment variable {name}: {message}")]
	InvalidEnvironmentVariable
	{
		name: &'static str,
		message: String,
	},

	#[error("could not create HTTP client")]
	CreateHttpClient(#[source] reqwest::Error),

	#[error("could not decode Cosmos DB account key")]
	DecodeCosmosDbKey(#[source] base64::DecodeError),
	#[error("could not parse URL")]
	ParseUrl(#[source] url::ParseError),
	#[error("could not make Cosmos DB request")]
	MakeCosmosDbRequest(#[source] reqwest::Error),
	#[error("received Cosmos DB error (status code {status_code}): {response_body}")]
	ReceivedCosmosDbError
	{
		status_code: reqwest::StatusCode,
		url: url::Url,
		response_body: String,
	},

	#[error("could not decode payload body")]
	DecodePayloadBody(#[source] serde_json::Error),
	#[error("missing payload signature")]
	MissingPayloadSignature,
	#[error("invalid payload signature")]
	InvalidPayloadSignature,
	#[error("missing webhook event header")]
	MissingEventHeader,
}

// Allow this crate’s error type to be used for failed HTTP responses
impl warp::reject::Reject for Error
{
}
