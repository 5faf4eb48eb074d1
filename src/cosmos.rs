/// Configuration of the Cosmos DB client.
#[derive(Debug, serde::Deserialize)]
pub struct Config
{
	/// The URI of the Cosmos DB account (example: <https://example-account.documents.azure.com/>).
	pub endpoint: url::Url,
	/// Primary or secondary key of the Cosmos DB account, base64-encoded as shown in the Azure
	/// portal.
	pub key: String,
	/// ID of the database holding the feed container. The database is created if absent.
	pub database_id: String,
	/// ID of the container feed items are stored in. The container is created if absent.
	pub container_id: String,
}

impl Config
{
	/// Read the Cosmos DB configuration from named variables (see [crate::Config::from_lookup]).
	pub fn from_lookup<F>(lookup: &F) -> Result<Self, crate::Error>
	where
		F: Fn(&str) -> Option<String>
	{
		let endpoint = crate::config::required_variable(lookup, "COSMOS_DB_ENDPOINT")?;
		let endpoint = url::Url::parse(&endpoint)
			.map_err(|error| crate::Error::InvalidEnvironmentVariable
			{
				name: "COSMOS_DB_ENDPOINT",
				message: error.to_string(),
			})?;

		Ok(Self
		{
			endpoint,
			key: crate::config::required_variable(lookup, "COSMOS_DB_KEY")?,
			database_id: crate::config::required_variable(lookup, "COSMOS_DB_ID")?,
			container_id: crate::config::required_variable(lookup, "COSMOS_FEED_CONTAINER")?,
		})
	}
}

/// Version of the Cosmos DB REST API this client speaks.
#[doc(hidden)]
const API_VERSION: &str = "2018-12-31";

/// A minimal Cosmos DB client for the SQL API, authenticating with the account key.
///
/// The client only knows how to create databases, containers, and documents, which is all the
/// activity feed needs. Requests are not retried.
///
/// The client can safely be shared between threads.
#[derive(Clone)]
pub struct Client
{
	#[doc(hidden)]
	config: std::sync::Arc<Config>,
	#[doc(hidden)]
	reqwest_client: reqwest::Client,
	#[doc(hidden)]
	key: std::sync::Arc<Vec<u8>>,
}

impl Client
{
	/// Initialize a new Cosmos DB client with a given configuration.
	pub fn from_config(config: Config) -> Result<Self, crate::Error>
	{
		use base64::Engine as _;

		let key = base64::engine::general_purpose::STANDARD.decode(config.key.trim())
			.map_err(crate::Error::DecodeCosmosDbKey)?;

		let reqwest_client = reqwest::ClientBuilder::new()
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build().map_err(crate::Error::CreateHttpClient)?;

		Ok(Self
		{
			config: std::sync::Arc::new(config),
			reqwest_client,
			key: std::sync::Arc::new(key),
		})
	}

	/// Create the configured database unless it already exists.
	pub async fn create_database_if_not_exists(&self) -> Result<(), crate::Error>
	{
		let body = CreateResourceRequest
		{
			id: &self.config.database_id,
			partition_key: None,
		};

		ignore_conflict(self.post("dbs", "", "dbs", &body, None).await)
	}

	/// Create the configured container unless it already exists. New containers are partitioned
	/// by document ID.
	pub async fn create_container_if_not_exists(&self) -> Result<(), crate::Error>
	{
		let database_link = format!("dbs/{}", self.config.database_id);

		let body = CreateResourceRequest
		{
			id: &self.config.container_id,
			partition_key: Some(PartitionKeyDefinition
			{
				paths: &["/id"],
				kind: "Hash",
			}),
		};

		ignore_conflict(
			self.post("colls", &database_link, &format!("{database_link}/colls"), &body, None).await)
	}

	/// Store a feed item as a new document with a freshly generated ID.
	pub async fn create_document(&self, feed_item: &crate::FeedItem) -> Result<(), crate::Error>
	{
		let container_link =
			format!("dbs/{}/colls/{}", self.config.database_id, self.config.container_id);

		let document = Document
		{
			id: uuid::Uuid::new_v4(),
			feed_item,
		};

		let partition_key = serde_json::json!([document.id]).to_string();

		self.post("docs", &container_link, &format!("{container_link}/docs"), &document,
			Some(partition_key.as_str())).await
	}

	/// Make an authenticated POST request to the Cosmos DB REST API.
	///
	/// # Arguments
	/// - `resource_type`: The type of the resource being created (`dbs`, `colls`, or `docs`).
	/// - `resource_link`: Path of the parent resource, used for signing the request.
	/// - `path`: The request path relative to the account endpoint.
	/// - `body`: A serializable type containing the request body.
	/// - `partition_key`: JSON-encoded partition key of the created document, if any.
	async fn post<B>(
		&self,
		resource_type: &str,
		resource_link: &str,
		path: &str,
		body: &B,
		partition_key: Option<&str>)
		-> Result<(), crate::Error>
	where
		B: serde::Serialize,
	{
		let url = self.config.endpoint.join(path).map_err(crate::Error::ParseUrl)?;

		let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
		let authorization = authorization_token(&self.key, &reqwest::Method::POST, resource_type,
			resource_link, &date);

		let mut request = self.reqwest_client.post(url)
			.header("authorization", authorization)
			.header("x-ms-date", &date)
			.header("x-ms-version", API_VERSION)
			.json(body);

		if let Some(partition_key) = partition_key
		{
			request = request.header("x-ms-documentdb-partitionkey", partition_key);
		}

		let response = request.send().await.map_err(crate::Error::MakeCosmosDbRequest)?;

		if !response.status().is_success()
		{
			let status_code = response.status();
			let url = response.url().to_owned();

			// Decode the body for debugging purposes
			let response_body = response.text().await.map_err(crate::Error::MakeCosmosDbRequest)?;

			return Err(crate::Error::ReceivedCosmosDbError{status_code, url, response_body});
		}

		Ok(())
	}
}

#[async_trait::async_trait]
impl crate::FeedStore for Client
{
	async fn add_feed_item(&self, feed_item: &crate::FeedItem) -> Result<(), crate::Error>
	{
		self.create_database_if_not_exists().await?;
		self.create_container_if_not_exists().await?;
		self.create_document(feed_item).await
	}
}

/// Treat the creation of a resource that already exists as success.
#[doc(hidden)]
fn ignore_conflict(result: Result<(), crate::Error>) -> Result<(), crate::Error>
{
	match result
	{
		Err(crate::Error::ReceivedCosmosDbError{status_code, ..})
			if status_code == reqwest::StatusCode::CONFLICT => Ok(()),
		result => result,
	}
}

/// Compute the value of the `authorization` header for a request signed with the account key.
///
/// [1]: <https://learn.microsoft.com/en-us/rest/api/cosmos-db/access-control-on-cosmosdb-resources>
/// The signature is an HMAC-SHA256 over the lowercase method, the lowercase resource type, the
/// resource link, and the lowercase date, each terminated by a newline and followed by an empty
/// line, as explained in the [documentation][1].
#[doc(hidden)]
fn authorization_token(
	key: &[u8],
	method: &reqwest::Method,
	resource_type: &str,
	resource_link: &str,
	date: &str)
	-> String
{
	use base64::Engine as _;
	use hmac::Mac as _;

	let string_to_sign = format!("{}\n{}\n{}\n{}\n\n", method.as_str().to_lowercase(),
		resource_type.to_lowercase(), resource_link, date.to_lowercase());

	let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(key)
		.expect("this call is infallible because HMAC supports keys of arbitrary size");

	mac.update(string_to_sign.as_bytes());

	let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
	let token = format!("type=master&ver=1.0&sig={signature}");

	url::form_urlencoded::byte_serialize(token.as_bytes()).collect()
}

/// Request body for creating a database or container.
#[doc(hidden)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateResourceRequest<'a>
{
	/// ID of the database or container to create.
	id: &'a str,
	/// How documents are distributed across partitions, only for containers.
	#[serde(skip_serializing_if = "Option::is_none")]
	partition_key: Option<PartitionKeyDefinition<'a>>,
	// We don’t need to set the other optional fields, so ignore them
}

/// Partition key of a new container.
#[doc(hidden)]
#[derive(serde::Serialize)]
struct PartitionKeyDefinition<'a>
{
	/// JSON paths of the document properties making up the partition key.
	paths: &'a [&'a str],
	/// The partitioning scheme (`Hash` for regular containers).
	kind: &'a str,
}

/// A feed item as stored in the container.
#[doc(hidden)]
#[derive(serde::Serialize)]
struct Document<'a>
{
	/// Unique document ID, also used as the partition key.
	id: uuid::Uuid,
	/// The feed item, whose fields are stored at the top level of the document.
	#[serde(flatten)]
	feed_item: &'a crate::FeedItem,
}
