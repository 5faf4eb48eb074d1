#[derive(Debug, serde::Deserialize)]
/// Top-level configuration of this application.
///
/// The configuration is read once at startup and then handed to the webhook gate and the feed
/// store when they are constructed. Nothing in this crate reads configuration from the process
/// environment after that.
pub struct Config
{
	/// Address to listen on for incoming webhook deliveries (optional, default: 127.0.0.1:2342).
	#[serde(default = "default_listen_address")]
	pub listen_address: std::net::SocketAddr,
	/// Maximum accepted payload size in bytes (optional, default: 1 MiB).
	#[serde(default = "default_max_payload_size")]
	pub max_payload_size: u64,
	/// Configuration options for authenticating and filtering webhook events.
	pub webhook: crate::webhook::Config,
	/// Configuration options for the Cosmos DB container the feed is stored in.
	pub cosmos_db: crate::cosmos::Config,
}

#[doc(hidden)]
fn default_listen_address() -> std::net::SocketAddr
{
	([127, 0, 0, 1], 2342).into()
}

#[doc(hidden)]
fn default_max_payload_size() -> u64
{
	1024 * 1024
}

impl Config
{
	/// Attempt to read and parse the configuration from a YAML file.
	///
	/// # Arguments
	/// `path`: Path to the configuration file in YAML format.
	pub fn from_file<P>(path: P) -> Result<Self, crate::Error>
	where
		P: AsRef<std::path::Path>
	{
		let file = std::fs::File::open(&path).map_err(crate::Error::ReadConfigFile)?;
		serde_yaml::from_reader(&file).map_err(crate::Error::ParseConfigFile)
	}

	/// Read the configuration from the process environment.
	pub fn from_env() -> Result<Self, crate::Error>
	{
		Self::from_lookup(&|name: &str| std::env::var(name).ok())
	}

	/// Build the configuration from named variables.
	///
	/// # Arguments
	/// `lookup`: Returns the value of a variable by name, if set.
	pub fn from_lookup<F>(lookup: &F) -> Result<Self, crate::Error>
	where
		F: Fn(&str) -> Option<String>
	{
		let listen_address = match optional_variable(lookup, "LISTEN_ADDRESS")
		{
			Some(value) => value.parse().map_err(
				|error: std::net::AddrParseError| crate::Error::InvalidEnvironmentVariable
				{
					name: "LISTEN_ADDRESS",
					message: error.to_string(),
				})?,
			None => default_listen_address(),
		};

		let max_payload_size = match optional_variable(lookup, "MAX_PAYLOAD_SIZE")
		{
			Some(value) => value.parse().map_err(
				|error: std::num::ParseIntError| crate::Error::InvalidEnvironmentVariable
				{
					name: "MAX_PAYLOAD_SIZE",
					message: error.to_string(),
				})?,
			None => default_max_payload_size(),
		};

		Ok(Self
		{
			listen_address,
			max_payload_size,
			webhook: crate::webhook::Config::from_lookup(lookup)?,
			cosmos_db: crate::cosmos::Config::from_lookup(lookup)?,
		})
	}
}

/// Look up a variable, treating empty values as unset.
pub(crate) fn optional_variable<F>(lookup: &F, name: &str) -> Option<String>
where
	F: Fn(&str) -> Option<String>
{
	lookup(name).filter(|value| !value.is_empty())
}

/// Look up a variable that must be set to a non-empty value.
pub(crate) fn required_variable<F>(lookup: &F, name: &'static str) -> Result<String, crate::Error>
where
	F: Fn(&str) -> Option<String>
{
	optional_variable(lookup, name).ok_or(crate::Error::MissingEnvironmentVariable(name))
}
