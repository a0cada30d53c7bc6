pub mod discord;

use async_trait::async_trait;

use crate::error::Result;

pub use discord::DiscordNotifier;

/// Single-destination text channel. `Ok` means the channel accepted the
/// message; there is no other acknowledgment.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}
