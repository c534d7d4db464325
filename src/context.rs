use anyhow::Result;
use async_trait::async_trait;

use crate::data_models::ReplyOptions;

/// The part of an incoming chat command the handlers need: the arguments that
/// followed the command, and a way to answer it.
#[async_trait]
pub trait CommandContext: Send + Sync {
    fn arguments(&self) -> &[String];

    async fn reply(&self, text: &str, options: ReplyOptions) -> Result<()>;
}
