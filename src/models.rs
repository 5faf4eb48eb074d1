/// Partial user data model as included in webhook event payloads.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User
{
	/// The user’s handle.
	pub login: String,
	// We don’t need the other fields, so ignore them
}

/// Partial organization data model as included in webhook event payloads.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PayloadOrganization
{
	/// The organization’s handle.
	pub login: String,
	/// API URL of the organization.
	pub url: String,
	// We don’t need the other fields, so ignore them
}

/// Partial repository data model as included in webhook event payloads.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Repository
{
	/// Whether the repository is a fork.
	pub fork: bool,
	/// Whether the repository is private.
	pub private: bool,
	/// The name of the repository including its owner (example: `octocat/hello-world`).
	pub full_name: String,
	/// User-facing URL of the repository.
	pub html_url: String,
	/// The repository description, which may be unset.
	#[serde(default)]
	pub description: Option<String>,
	// We don’t need the other fields, so ignore them
}

/// Any object in a webhook event payload that we only need the user-facing URL of, such as
/// discussions, comments, and issues.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Linked
{
	/// User-facing URL of the object.
	pub html_url: String,
	// We don’t need the other fields, so ignore them
}

/// The part of a webhook event payload shared by all event types: who caused the event.
///
/// Decoding only this much allows ignoring events of other accounts regardless of their shape.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SenderPayload
{
	/// Record of the user causing this event.
	pub sender: User,
	// We don’t need the other fields, so ignore them
}

/// Webhook event payload as provided by the GitHub server.
///
/// This covers the fields shared by all event types we record. Event-specific objects are
/// optional and only used to pick the most specific URL for the feed.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EventPayload
{
	/// Record of the user causing this event.
	pub sender: User,
	/// The repository for which this event is reported.
	pub repository: Repository,
	/// The organization owning the repository, if any.
	#[serde(default)]
	pub organization: Option<PayloadOrganization>,
	/// The type of Git ref object, only present for ref creation and deletion events.
	#[serde(default)]
	pub ref_type: Option<String>,
	/// The discussion this event relates to, if any.
	#[serde(default)]
	pub discussion: Option<Linked>,
	/// The comment this event relates to, if any.
	#[serde(default)]
	pub comment: Option<Linked>,
	/// The issue or pull request this event relates to, if any.
	#[serde(default)]
	pub issue: Option<Linked>,
	// We don’t need the other fields, so ignore them
}

impl EventPayload
{
	/// The most specific user-facing URL for this event.
	///
	/// Starts from the repository URL. A discussion overrides it unless there is also a comment, in
	/// which case the comment does. An issue overrides all of these.
	pub fn display_url(&self) -> &str
	{
		let mut url = self.repository.html_url.as_str();

		match (&self.discussion, &self.comment)
		{
			(Some(discussion), None) => url = discussion.html_url.as_str(),
			(_, Some(comment)) => url = comment.html_url.as_str(),
			(None, None) => (),
		}

		if let Some(issue) = &self.issue
		{
			url = issue.html_url.as_str();
		}

		url
	}
}

/// Organization an activity took place in.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Organization
{
	/// The organization’s handle.
	pub name: String,
	/// API URL of the organization.
	pub url: String,
}

/// Normalized record of a single activity of the tracked account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActivityItem
{
	/// The webhook event name (example: `push`).
	pub event: String,
	/// Whether the repository is a fork.
	pub is_fork: bool,
	/// Whether the repository is private.
	pub is_private: bool,
	/// The name of the repository including its owner.
	pub repo: String,
	/// The most specific user-facing URL for this activity.
	pub url: String,
	/// The repository description, if set.
	pub description: Option<String>,
	/// The organization owning the repository, if any.
	pub organization: Option<Organization>,
	/// The type of Git ref object, only set for ref creation and deletion events.
	pub ref_type: Option<String>,
}

impl ActivityItem
{
	/// Normalize a webhook event payload.
	///
	/// # Arguments
	/// - `event`: The event name as sent in the `X-GitHub-Event` header.
	/// - `payload`: The decoded webhook event payload.
	pub fn from_payload(event: &str, payload: &EventPayload) -> Self
	{
		Self
		{
			event: event.to_owned(),
			is_fork: payload.repository.fork,
			is_private: payload.repository.private,
			repo: payload.repository.full_name.clone(),
			url: payload.display_url().to_owned(),
			description: payload.repository.description.clone(),
			organization: payload.organization.as_ref().map(|organization| Organization
			{
				name: organization.login.clone(),
				url: organization.url.clone(),
			}),
			ref_type: payload.ref_type.clone(),
		}
	}
}

/// Feed item as persisted in the feed store (serialized to JSON).
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeedItem
{
	/// Source and kind of the activity (example: `github-push`).
	#[serde(rename = "type")]
	pub type_: String,
	/// The most specific user-facing URL for this activity.
	pub url: String,
	/// The repository description, serialized as `null` if unset.
	pub description: Option<String>,
	/// Source-specific details.
	pub meta: FeedItemMeta,
}

/// Source-specific details of a feed item.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemMeta
{
	/// Whether the repository is a fork.
	pub is_fork: bool,
	/// Whether the repository is private.
	pub is_private: bool,
	/// The name of the repository including its owner.
	pub repo: String,
	/// The organization owning the repository, omitted if there is none.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub organization: Option<Organization>,
	/// The type of Git ref object, omitted for events other than ref creation and deletion.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ref_type: Option<String>,
}

impl From<ActivityItem> for FeedItem
{
	fn from(activity: ActivityItem) -> Self
	{
		Self
		{
			type_: format!("github-{}", activity.event),
			url: activity.url,
			description: activity.description,
			meta: FeedItemMeta
			{
				is_fork: activity.is_fork,
				is_private: activity.is_private,
				repo: activity.repo,
				organization: activity.organization,
				ref_type: activity.ref_type,
			},
		}
	}
}
