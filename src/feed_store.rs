/// A place to append feed items to.
///
/// Implementations must turn every storage failure into an error value instead of panicking, so
/// that a failed write only ever affects the request that caused it.
#[async_trait::async_trait]
pub trait FeedStore: Send + Sync
{
	/// Make sure the backing storage exists and append a new feed item to it.
	async fn add_feed_item(&self, feed_item: &crate::FeedItem) -> Result<(), crate::Error>;
}
