//! Outbound notification channel and its Telegram implementation.

use async_trait::async_trait;
use chrono::Utc;
use pendle_core::{AnalysisResult, Chain};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification API returned HTTP {0}")]
    Api(u16),
}

/// Generic "send message" channel. The monitor only needs this contract;
/// Telegram is one concrete backend.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotificationError>;
}

/// Telegram Bot API channel.
pub struct TelegramChannel {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Build from TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID.
    /// Returns None when either is missing or empty.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        if bot_token.is_empty() || chat_id.is_empty() {
            return None;
        }
        let chat_id_prefix: String = chat_id.chars().take(6).collect();
        info!("telegram notifications enabled (chat_id: {chat_id_prefix})");
        Some(Self::new(bot_token, chat_id))
    }
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    async fn send(&self, text: &str) -> Result<(), NotificationError> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );
        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "HTML"),
            ("disable_web_page_preview", "false"),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Api(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Format one combined alert message for the markets being notified.
pub fn format_alert_message(
    chain: Chain,
    alerting: &[&AnalysisResult],
    suppressed_count: usize,
) -> String {
    let mut msg = format!(
        "🚨 <b>Pendle Market Alert</b>\n\n\
         📊 <b>Chain:</b> {}\n\
         ⚠️ <b>Alert Count:</b> {} markets\n",
        chain,
        alerting.len()
    );
    if suppressed_count > 0 {
        msg.push_str(&format!(
            "⏭️ <b>Skipped (cached):</b> {} markets\n",
            suppressed_count
        ));
    }
    msg.push('\n');

    for (i, analysis) in alerting.iter().enumerate() {
        let market = &analysis.market;
        msg.push_str(&format!(
            "📈 <b>Market #{}:</b> {}\n\
             \u{20}  📊 <b>Decline Rate:</b> {:.2}%/day (avg: {:.2}%)\n\
             \u{20}  💰 <b>Volume (USD):</b> ${:.0}\n\
             \u{20}  📈 <b>Implied APY:</b> {:.2}%\n\
             \u{20}  📅 <b>Maturity:</b> {}\n\
             \u{20}  🔗 <a href='{}'>View Market</a>\n\n",
            i + 1,
            market.name,
            analysis.latest_daily_decline_rate.abs(),
            analysis.average_decline_rate.abs(),
            analysis.volume_usd,
            analysis.average_implied_apy * 100.0,
            market.expiry.format("%Y-%m-%d"),
            market.trade_url(),
        ));
    }

    msg.push_str(&format!(
        "⏰ <b>Analysis Time:</b> {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    msg
}
