//! Email adapter: OTP login, outbound mail and Gmail inbox reads.

use std::sync::Arc;

use anvik_core::SmtpSettings;
use anvik_models::{ChatId, User};
use anvik_persistence::UserStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rand::Rng;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{json_or_error, IntegrationError, Result};
use crate::google::GoogleOAuth;

/// Lifetime of a login code.
pub const OTP_TTL_MINUTES: i64 = 5;

/// Wrong codes allowed before the pending OTP is discarded.
pub const MAX_OTP_ATTEMPTS: u32 = 5;

/// Gmail v1 API root.
pub const GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Display name on outbound mail.
pub const SENDER_NAME: &str = "Anvik Assistant";

/// One message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub reply_to: Option<String>,
}

/// Delivers mail from the bot's own account.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

/// [`MailSender`] over SMTP with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", SENDER_NAME, settings.user)
            .parse()
            .map_err(|e| IntegrationError::Smtp(format!("Invalid from address: {}", e)))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| IntegrationError::Smtp(format!("Failed to create transport: {}", e)))?
            .credentials(Credentials::new(settings.user.clone(), settings.pass.clone()))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| IntegrationError::InvalidInput(format!("Invalid recipient: {}", e)))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject);
        if let Some(reply_to) = mail.reply_to {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|e| IntegrationError::InvalidInput(format!("Invalid reply-to: {}", e)))?;
            builder = builder.reply_to(reply_to);
        }
        let message = builder
            .body(mail.body)
            .map_err(|e| IntegrationError::Smtp(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| IntegrationError::Smtp(format!("Failed to send email: {}", e)))?;
        Ok(())
    }
}

/// Header summary of one inbox message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSummary {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub date: String,
}

/// Read access to the user's Gmail inbox.
#[async_trait]
pub trait GmailApi: Send + Sync {
    /// Latest `max` messages, newest first.
    async fn recent_messages(&self, access_token: &str, max: u32) -> Result<Vec<EmailSummary>>;
}

#[derive(Debug, Deserialize)]
struct MessageList {
    messages: Option<Vec<MessageRef>>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageMetadata {
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    headers: Option<Vec<Header>>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

/// [`GmailApi`] over HTTPS using metadata-only message reads.
pub struct HttpGmailApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGmailApi {
    pub fn new() -> Self {
        Self::with_base_url(GMAIL_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn summary(&self, access_token: &str, id: &str) -> Result<EmailSummary> {
        let url = format!("{}/users/me/messages/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Date"),
            ])
            .send()
            .await?;
        let json = json_or_error("Gmail", response).await?;
        let meta: MessageMetadata = serde_json::from_value(json).map_err(|e| IntegrationError::Provider {
            service: "Gmail",
            status: 200,
            body: e.to_string(),
        })?;

        let mut summary = EmailSummary {
            id: id.to_string(),
            subject: "(No Subject)".to_string(),
            from: "(Unknown)".to_string(),
            date: String::new(),
        };
        for header in meta.payload.and_then(|p| p.headers).unwrap_or_default() {
            match header.name.as_str() {
                "Subject" => summary.subject = header.value,
                "From" => summary.from = header.value,
                "Date" => summary.date = header.value,
                _ => {}
            }
        }
        Ok(summary)
    }
}

impl Default for HttpGmailApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GmailApi for HttpGmailApi {
    async fn recent_messages(&self, access_token: &str, max: u32) -> Result<Vec<EmailSummary>> {
        let url = format!("{}/users/me/messages", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("maxResults", max.to_string())])
            .send()
            .await?;
        let json = json_or_error("Gmail", response).await?;
        let list: MessageList = serde_json::from_value(json).map_err(|e| IntegrationError::Provider {
            service: "Gmail",
            status: 200,
            body: e.to_string(),
        })?;

        let mut out = Vec::new();
        for msg in list.messages.unwrap_or_default().iter().take(max as usize) {
            out.push(self.summary(access_token, &msg.id).await?);
        }
        Ok(out)
    }
}

/// Six-digit login code; always six characters.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

enum VerifyOutcome {
    NoCode,
    Expired,
    Mismatch,
    TooManyAttempts,
    Verified(String),
}

/// OTP login, outbound mail and inbox listing.
pub struct EmailAdapter {
    users: Arc<UserStore>,
    mailer: Option<Arc<dyn MailSender>>,
    gmail: Arc<dyn GmailApi>,
    google: Arc<GoogleOAuth>,
}

impl EmailAdapter {
    /// `mailer` is `None` when no SMTP account is configured.
    pub fn new(
        users: Arc<UserStore>,
        mailer: Option<Arc<dyn MailSender>>,
        gmail: Arc<dyn GmailApi>,
        google: Arc<GoogleOAuth>,
    ) -> Self {
        Self {
            users,
            mailer,
            gmail,
            google,
        }
    }

    /// Mails a fresh code to `email` and records it on the user.
    pub async fn send_login_otp(&self, chat_id: &ChatId, email: &str) -> String {
        self.send_login_otp_at(chat_id, email, Utc::now()).await
    }

    pub async fn send_login_otp_at(&self, chat_id: &ChatId, email: &str, now: DateTime<Utc>) -> String {
        let email = email.trim();
        if email.parse::<Address>().is_err() {
            return "❌ Please enter a valid email.".to_string();
        }
        let Some(mailer) = &self.mailer else {
            return "⚠️ Email is not configured on this server.".to_string();
        };

        let code = generate_otp();
        let expires = (now + Duration::minutes(OTP_TTL_MINUTES)).timestamp_millis();
        let stored_code = code.clone();
        let address = email.to_string();
        let saved = self
            .users
            .update(chat_id, move |user| {
                if user.email.as_deref() != Some(address.as_str()) {
                    user.email_verified = false;
                }
                user.email = Some(address);
                user.email_otp = Some(stored_code);
                user.email_otp_expires = Some(expires);
                user.email_otp_attempts = 0;
            })
            .await;
        if let Err(e) = saved {
            error!(chat_id = %chat_id, error = %e, "Failed to store OTP");
            return "❌ Failed to send OTP email. Please try again later.".to_string();
        }

        let mail = OutgoingMail {
            to: email.to_string(),
            subject: "Your Anvik Login OTP".to_string(),
            body: format!("Your OTP is: {}\nValid for {} minutes.", code, OTP_TTL_MINUTES),
            reply_to: None,
        };
        match mailer.send(mail).await {
            Ok(()) => {
                info!(chat_id = %chat_id, "Login OTP sent");
                format!("📩 OTP sent to *{}*.\nPlease enter: `verify otp <code>`", email)
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "OTP mail failed");
                "❌ Failed to send OTP email. Please try again later.".to_string()
            }
        }
    }

    /// Checks `code` against the stored OTP.
    pub async fn verify_login_otp(&self, chat_id: &ChatId, code: &str) -> String {
        self.verify_login_otp_at(chat_id, code, Utc::now()).await
    }

    pub async fn verify_login_otp_at(&self, chat_id: &ChatId, code: &str, now: DateTime<Utc>) -> String {
        let now_ms = now.timestamp_millis();
        let entered = code.trim().to_string();

        let outcome = self
            .users
            .update(chat_id, move |user: &mut User| {
                let Some(expected) = user.email_otp.clone() else {
                    return VerifyOutcome::NoCode;
                };
                if user.email_otp_expires.map_or(true, |exp| now_ms > exp) {
                    user.clear_otp();
                    return VerifyOutcome::Expired;
                }
                if expected != entered {
                    user.email_otp_attempts += 1;
                    if user.email_otp_attempts >= MAX_OTP_ATTEMPTS {
                        user.clear_otp();
                        return VerifyOutcome::TooManyAttempts;
                    }
                    return VerifyOutcome::Mismatch;
                }
                user.email_verified = true;
                user.clear_otp();
                VerifyOutcome::Verified(user.email.clone().unwrap_or_default())
            })
            .await;

        match outcome {
            Ok(VerifyOutcome::NoCode) => "❌ No OTP generated.".to_string(),
            Ok(VerifyOutcome::Expired) => "⏳ OTP expired. Send again: login email <your email>".to_string(),
            Ok(VerifyOutcome::Mismatch) => "❌ Invalid OTP.".to_string(),
            Ok(VerifyOutcome::TooManyAttempts) => {
                warn!(chat_id = %chat_id, "OTP discarded after repeated wrong codes");
                "🚫 Too many wrong codes. Send again: login email <your email>".to_string()
            }
            Ok(VerifyOutcome::Verified(email)) => {
                info!(chat_id = %chat_id, "Email verified");
                format!("🎉 Email *{}* verified successfully!", email)
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "OTP verification failed");
                "⚠️ Internal error. Try again later.".to_string()
            }
        }
    }

    /// Sends mail on the user's behalf from the bot account.
    pub async fn send_user_email(&self, chat_id: &ChatId, to: &str, subject: &str, body: &str) -> String {
        let user = self.users.get(chat_id).await;
        let Some(user) = user.filter(|u| u.email_verified) else {
            return "⚠️ Verify email first: `login email <your email>`".to_string();
        };
        let to = to.trim();
        if to.parse::<Address>().is_err() {
            return "❌ Please enter a valid recipient email.".to_string();
        }
        if body.trim().is_empty() {
            return "Usage: send email <address> <message>".to_string();
        }
        let Some(mailer) = &self.mailer else {
            return "⚠️ Email is not configured on this server.".to_string();
        };

        let mail = OutgoingMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            reply_to: user.email.clone(),
        };
        match mailer.send(mail).await {
            Ok(()) => {
                info!(chat_id = %chat_id, "User email sent");
                format!("📤 Email sent to *{}* successfully!", to)
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "User email failed");
                format!("❌ Failed to send email: {}", e)
            }
        }
    }

    /// Lists the latest `max` inbox messages.
    pub async fn get_recent_emails(&self, chat_id: &ChatId, max: u32) -> String {
        let not_connected = "⚠️ Please connect Google first using \"connect google\"".to_string();
        let Some(user) = self.users.get(chat_id).await else {
            return not_connected;
        };
        let token = match self.google.access_token(&user).await {
            Ok(token) => token,
            Err(IntegrationError::NotConnected(_)) => return not_connected,
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Google token lookup failed");
                return format!("❌ Gmail API error: {}", e);
            }
        };

        match self.gmail.recent_messages(&token, max).await {
            Ok(messages) => format_emails(&messages),
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Gmail list failed");
                format!("❌ Gmail API error: {}", e)
            }
        }
    }
}

/// Numbered inbox summary for a chat reply.
pub fn format_emails(messages: &[EmailSummary]) -> String {
    if messages.is_empty() {
        return "📭 No emails found.".to_string();
    }
    let mut out = String::from("📬 *Your latest emails:*\n\n");
    for (i, m) in messages.iter().enumerate() {
        out.push_str(&format!("{}. *{}*\n   From: {}\n", i + 1, m.subject, m.from));
        if !m.date.is_empty() {
            out.push_str(&format!("   Date: {}\n", m.date));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}
