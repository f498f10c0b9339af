//! Explicit dependency context shared by the router, the HTTP server and
//! the transport.

use std::sync::Arc;

use anvik_core::{IntentClassifier, OAuthClient, Settings};
use anvik_integrations::{
    CalendarAdapter, CalendarApi, EmailAdapter, GmailApi, GoogleOAuth, HttpCalendarApi,
    HttpGmailApi, HttpNotionApi, MailSender, NotionAdapter, NotionApi, NotionOAuth, Notifier,
    ReminderScheduler, SmtpMailer,
};
use anvik_persistence::{ReminderStore, UserStore};
use tracing::warn;

/// Everything needed to build an [`AnvikContext`].
///
/// Vendor seams are trait objects so tests can pass fakes.
pub struct Services {
    pub users: Arc<UserStore>,
    pub reminders: Arc<ReminderStore>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub calendar_api: Arc<dyn CalendarApi>,
    pub notion_api: Arc<dyn NotionApi>,
    pub gmail_api: Arc<dyn GmailApi>,
    pub mailer: Option<Arc<dyn MailSender>>,
    pub notifier: Arc<dyn Notifier>,
    pub google_client: Option<OAuthClient>,
    pub notion_client: Option<OAuthClient>,
    pub base_url: String,
}

impl Services {
    /// Production wiring: HTTP clients for every vendor, SMTP if configured.
    pub fn from_settings(
        settings: &Settings,
        users: Arc<UserStore>,
        reminders: Arc<ReminderStore>,
        classifier: Arc<dyn IntentClassifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mailer = settings.smtp.as_ref().and_then(|smtp| match SmtpMailer::new(smtp) {
            Ok(m) => Some(Arc::new(m) as Arc<dyn MailSender>),
            Err(e) => {
                warn!(error = %e, "SMTP relay unusable, email sending disabled");
                None
            }
        });

        Self {
            users,
            reminders,
            classifier,
            calendar_api: Arc::new(HttpCalendarApi::new()),
            notion_api: Arc::new(HttpNotionApi::new()),
            gmail_api: Arc::new(HttpGmailApi::new()),
            mailer,
            notifier,
            google_client: settings.google.clone(),
            notion_client: settings.notion.clone(),
            base_url: settings.base_url.clone(),
        }
    }
}

/// Shared handles used while routing a message.
pub struct AnvikContext {
    pub users: Arc<UserStore>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub google: Arc<GoogleOAuth>,
    pub notion_oauth: Arc<NotionOAuth>,
    pub calendar: CalendarAdapter,
    pub notion: NotionAdapter,
    pub email: EmailAdapter,
    pub reminders: ReminderScheduler,
    pub base_url: String,
}

impl AnvikContext {
    pub fn new(services: Services) -> Self {
        let Services {
            users,
            reminders,
            classifier,
            calendar_api,
            notion_api,
            gmail_api,
            mailer,
            notifier,
            google_client,
            notion_client,
            base_url,
        } = services;

        let google = Arc::new(GoogleOAuth::new(google_client, Arc::clone(&users)));
        let notion_oauth = Arc::new(NotionOAuth::new(notion_client, Arc::clone(&users)));

        Self {
            calendar: CalendarAdapter::new(Arc::clone(&users), Arc::clone(&google), calendar_api),
            notion: NotionAdapter::new(Arc::clone(&users), notion_api),
            email: EmailAdapter::new(Arc::clone(&users), mailer, gmail_api, Arc::clone(&google)),
            reminders: ReminderScheduler::new(reminders, Arc::clone(&users), notifier),
            users,
            classifier,
            google,
            notion_oauth,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Link that starts the Notion connection for a chat.
    pub fn notion_connect_url(&self, chat_id: &anvik_models::ChatId) -> String {
        format!("{}/auth/notion?state={}", self.base_url, chat_id)
    }
}
