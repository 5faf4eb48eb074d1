/// Configuration for authenticating and filtering incoming webhook events.
#[derive(Debug, serde::Deserialize)]
pub struct Config
{
	/// The webhook secret configured on GitHub, used to verify that incoming payloads actually
	/// come from GitHub.
	pub secret: String,
	/// The handle of the GitHub account whose activity is recorded. Events caused by anyone else
	/// are ignored.
	pub tracked_login: String,
}

impl Config
{
	/// Read the webhook configuration from named variables (see [crate::Config::from_lookup]).
	pub fn from_lookup<F>(lookup: &F) -> Result<Self, crate::Error>
	where
		F: Fn(&str) -> Option<String>
	{
		Ok(Self
		{
			secret: crate::config::required_variable(lookup, "GITHUB_WEBHOOK_SECRET")?,
			tracked_login: crate::config::required_variable(lookup, "GITHUB_USERNAME")?,
		})
	}
}

/// Outcome of a webhook delivery that passed authentication.
#[derive(Debug, Eq, PartialEq)]
pub enum Verdict
{
	/// The event was caused by the tracked account and should be stored.
	Accepted(crate::FeedItem),
	/// The event was caused by someone else, so there’s nothing to store.
	NotRelevant,
}

/// Authenticates webhook deliveries, filters them to the tracked account, and turns them into
/// feed items.
///
/// The gate holds no mutable state and can be shared between concurrent request handlers.
#[derive(Clone)]
pub struct Gate
{
	#[doc(hidden)]
	config: std::sync::Arc<Config>,
}

impl Gate
{
	pub fn new(config: Config) -> Self
	{
		Self
		{
			config: std::sync::Arc::new(config),
		}
	}

	/// Handle a single webhook delivery.
	///
	/// The signature is checked before anything else, and the payload is only decoded once it is
	/// known to come from GitHub.
	///
	/// # Arguments
	/// - `provided_signature`: Value of the `X-Hub-Signature-256` header, if present.
	/// - `event`: Value of the `X-GitHub-Event` header, if present.
	/// - `body`: The raw request body exactly as received.
	pub fn handle(&self, provided_signature: Option<&str>, event: Option<&str>, body: &[u8])
		-> Result<Verdict, crate::Error>
	{
		verify_payload_signature(provided_signature, body, &self.config.secret)?;

		let event = event.ok_or(crate::Error::MissingEventHeader)?;

		// Look at the sender first, as events of other accounts may have any shape
		let sender: crate::SenderPayload = serde_json::from_slice(body)
			.map_err(crate::Error::DecodePayloadBody)?;

		if sender.sender.login != self.config.tracked_login
		{
			log::debug!("ignoring “{event}” event caused by “{}”", sender.sender.login);
			return Ok(Verdict::NotRelevant);
		}

		let payload: crate::EventPayload = serde_json::from_slice(body)
			.map_err(crate::Error::DecodePayloadBody)?;

		let activity = crate::ActivityItem::from_payload(event, &payload);

		Ok(Verdict::Accepted(activity.into()))
	}
}

/// Verify a webhook event payload by checking the provided signature.
///
/// # Arguments
/// - `provided_signature`: Value of the `X-Hub-Signature-256` header, if present.
/// - `payload`: The raw request body the signature was computed over.
/// - `secret`: The shared webhook secret.
pub fn verify_payload_signature(provided_signature: Option<&str>, payload: &[u8], secret: &str)
	-> Result<(), crate::Error>
{
	// Require a payload signature. If none is provided, reject the request
	let provided_signature = match provided_signature
	{
		Some(provided_signature) => provided_signature,
		None =>
		{
			log::warn!("received payload without signature");
			return Err(crate::Error::MissingPayloadSignature);
		},
	};

	use hmac::Mac as _;

	// Compute the expected signature
	let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes())
		.expect("this call is infallible because HMAC supports keys of arbitrary size");

	mac.update(payload);

	let expected_signature = mac.finalize().into_bytes();
	let expected_signature = format!("sha256={}", hex::encode(&expected_signature));

	// Compare the provided signature with what we expect it to be. Use a secure string wrapper that
	// compares lengths first and then all bytes in constant time to prevent timing attacks
	let provided_signature = secstr::SecStr::from(provided_signature);
	let expected_signature = secstr::SecStr::from(expected_signature);

	if provided_signature == expected_signature
	{
		log::debug!("successfully verified payload signature");
		Ok(())
	}
	else
	{
		log::warn!("received payload with invalid signature");
		Err(crate::Error::InvalidPayloadSignature)
	}
}

/// [warp] filter extracting everything the [Gate] needs from a webhook delivery: the payload
/// signature header, the event name header (optional, so that the gate decides how to treat its
/// absence), and the raw body.
///
/// Deliveries without a signature are rejected before the body is looked at, so that they are
/// refused as unauthenticated no matter their size or transfer encoding.
///
/// # Arguments
/// - `max_payload_size`: Payloads larger than this many bytes are rejected.
pub fn delivery(max_payload_size: u64)
	-> impl warp::Filter<Extract = (String, Option<String>, warp::hyper::body::Bytes),
		Error = warp::Rejection> + Clone
{
	use warp::Filter as _;

	warp::header::optional::<String>("x-hub-signature-256")
		// Require the payload signature header before anything else
		.and_then(|provided_signature: Option<String>| async move
		{
			provided_signature.ok_or_else(||
			{
				log::warn!("received payload without signature");
				warp::reject::custom(crate::Error::MissingPayloadSignature)
			})
		})
		.and(warp::header::optional::<String>("x-github-event"))
		// Reject payloads larger than configured
		.and(warp::body::content_length_limit(max_payload_size))
		.and(warp::body::bytes())
}
