use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Thin sendMessage client. Anything but a 2xx with `ok=true` is a
/// `Delivery` error, so callers never stamp notified_at on a lost message.
pub struct TelegramClient {
    client: Client,
    token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(token: String, chat_id: String, user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            token,
            chat_id,
        }
    }

    /// Build from TG_TOKEN / TG_CHAT_ID. None means delivery is unconfigured
    /// and the caller should fall back to a dry run.
    pub fn from_env(user_agent: &str) -> Option<Self> {
        let token = std::env::var("TG_TOKEN").ok().filter(|s| !s.is_empty())?;
        let chat_id = std::env::var("TG_CHAT_ID").ok().filter(|s| !s.is_empty())?;
        Some(Self::new(token, chat_id, user_agent))
    }

    pub async fn send_message(&self, text: &str, markdown: bool) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: markdown.then_some("Markdown"),
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, self.token))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Delivery(format!("unreadable response: {e}")))?;

        if !status.is_success() || !body.ok {
            return Err(AppError::Delivery(format!(
                "sendMessage failed (HTTP {}): {}",
                status,
                body.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        Ok(())
    }
}
