//! Discord bot REST client for posting picks to one channel.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::notify::NotificationSink;

/// Discord rejects message content longer than this.
const MAX_CONTENT_LEN: usize = 2000;

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Posts to `POST /channels/{id}/messages` with a bot token.
///
/// One attempt per message: a retry after an ambiguous failure (timeout after
/// the server accepted the post) would double-post.
pub struct DiscordNotifier {
    client: reqwest::Client,
    api_url: String,
    token: String,
    channel_id: String,
    dry_run: bool,
}

impl DiscordNotifier {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: cfg.discord_api_url.trim_end_matches('/').to_string(),
            token: cfg.discord_token.clone(),
            channel_id: cfg.discord_channel_id.clone(),
            dry_run: cfg.dry_run,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", self.api_url, self.channel_id)
    }
}

#[async_trait]
impl NotificationSink for DiscordNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        if text.chars().count() > MAX_CONTENT_LEN {
            return Err(AppError::Notify(format!(
                "message exceeds {MAX_CONTENT_LEN} characters"
            )));
        }

        if self.dry_run {
            info!(channel_id = %self.channel_id, "[DRY RUN] Would send Discord message:\n{text}");
            return Ok(());
        }

        debug!(channel_id = %self.channel_id, "Sending Discord channel message");
        let response = self
            .client
            .post(self.messages_url())
            .header("Authorization", format!("Bot {}", self.token))
            .json(&CreateMessage { content: text })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Notify(format!("Discord returned {}: {body}", status.as_u16())))
    }
}
