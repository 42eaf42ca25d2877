//! Where the finished briefing goes

use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::{DeliveryConfig, EmailConfig, SinkKind, TelegramConfig};
use crate::http::{build_client, redact};
use crate::{MorningBotError, Result};

#[async_trait]
pub trait DeliverySink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, message: &str) -> Result<()>;
}

/// Build the sink selected in the delivery section
pub fn sink_from_config(
    config: &DeliveryConfig,
    today: NaiveDate,
    timeout_seconds: u32,
) -> Result<Box<dyn DeliverySink>> {
    Ok(match config.sink {
        SinkKind::Console => Box::new(ConsoleSink::stdout()),
        SinkKind::Telegram => Box::new(TelegramSink::new(&config.telegram, timeout_seconds)?),
        SinkKind::Email => Box::new(EmailSink::new(&config.email, today)?),
    })
}

/// Prints the briefing
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }
}

#[async_trait]
impl DeliverySink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| MorningBotError::delivery("console writer lock poisoned"))?;
        writeln!(out, "{message}")?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Bot API `sendMessage` to a single chat
pub struct TelegramSink {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(config: &TelegramConfig, timeout_seconds: u32) -> Result<Self> {
        let bot_token = config
            .bot_token
            .clone()
            .ok_or_else(|| MorningBotError::config("delivery.telegram.bot_token is not set"))?;
        let chat_id = config
            .chat_id
            .clone()
            .ok_or_else(|| MorningBotError::config("delivery.telegram.chat_id is not set"))?;

        Ok(Self {
            client: build_client(timeout_seconds)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    #[instrument(skip_all, fields(chat_id = %self.chat_id))]
    async fn deliver(&self, message: &str) -> Result<()> {
        let url = self.send_message_url();
        debug!("Telegram request URL: {}", redact(&url, &self.bot_token));

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text: message,
            })
            .send()
            .await
            .map_err(|e| MorningBotError::delivery(format!("Telegram request failed: {}", e.without_url())))?;

        // error replies carry the reason in the JSON body, not only the status
        let reply: TelegramResponse = response
            .json()
            .await
            .map_err(|e| MorningBotError::delivery(format!("Unreadable Telegram reply: {}", e.without_url())))?;
        check_reply(reply)?;

        info!(
            "Delivered briefing to Telegram in {:.3}s",
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

fn check_reply(reply: TelegramResponse) -> Result<()> {
    if reply.ok {
        Ok(())
    } else {
        Err(MorningBotError::delivery(format!(
            "Telegram rejected the message: {}",
            reply.description.unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

/// Plain-text mail through an SMTP relay
pub struct EmailSink {
    transport: SmtpTransport,
    from: String,
    to: String,
    subject: String,
}

impl EmailSink {
    pub fn new(config: &EmailConfig, today: NaiveDate) -> Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| MorningBotError::config("delivery.email.smtp_host is not set"))?;
        let from = config
            .from
            .clone()
            .ok_or_else(|| MorningBotError::config("delivery.email.from is not set"))?;
        let to = config
            .to
            .clone()
            .ok_or_else(|| MorningBotError::config("delivery.email.to is not set"))?;

        let mut builder = SmtpTransport::relay(host)
            .map_err(|e| MorningBotError::config(format!("Invalid SMTP relay '{host}': {e}")))?;
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
            subject: email_subject(today),
        })
    }

    fn build_message(&self, body: &str) -> Result<Message> {
        Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MorningBotError::config(format!("Invalid from address: {e}")))?,
            )
            .to(self
                .to
                .parse()
                .map_err(|e| MorningBotError::config(format!("Invalid to address: {e}")))?)
            .subject(self.subject.clone())
            .body(body.to_string())
            .map_err(|e| MorningBotError::delivery(format!("Failed to build e-mail: {e}")))
    }
}

#[async_trait]
impl DeliverySink for EmailSink {
    fn name(&self) -> &str {
        "email"
    }

    #[instrument(skip_all, fields(to = %self.to))]
    async fn deliver(&self, message: &str) -> Result<()> {
        let email = self.build_message(message)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| MorningBotError::delivery(format!("E-mail task failed: {e}")))?
            .map_err(|e| MorningBotError::delivery(format!("Failed to send e-mail: {e}")))?;

        info!("Sent briefing e-mail to {}", self.to);
        Ok(())
    }
}

fn email_subject(today: NaiveDate) -> String {
    format!("Morning briefing {}", today.format("%Y-%m-%d"))
}
