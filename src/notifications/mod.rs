//! Outgoing mail: the dashboard report, the daily low-stock alert and
//! password reset links.
//!
//! Handlers never wait on SMTP. [`Notifier`] spawns every send onto its own
//! task and only logs failures.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::entities::{stationery, user};
use crate::errors::ServiceError;
use crate::services::reports::DashboardSummary;

pub mod templates;

pub const DASHBOARD_SUBJECT: &str = "Dashboard Report";
pub const LOW_STOCK_SUBJECT: &str = "Low Stock Alert";
pub const PASSWORD_RESET_SUBJECT: &str = "Reset Your Password";

/// A message with plain text and HTML alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), ServiceError>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let from = cfg
            .mail_from()
            .ok_or_else(|| ServiceError::MailError("no sender address configured".into()))?
            .parse::<Mailbox>()
            .map_err(|e| ServiceError::MailError(format!("invalid sender address: {}", e)))?;

        let builder = if cfg.mail_use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.mail_server)
        } else if cfg.mail_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.mail_server)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &cfg.mail_server,
            ))
        }
        .map_err(|e| ServiceError::MailError(e.to_string()))?;

        let mut builder = builder.port(cfg.mail_port);
        if let (Some(username), Some(password)) = (&cfg.mail_username, &cfg.mail_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), ServiceError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject.clone());
        for to in &email.to {
            let mailbox = to
                .parse::<Mailbox>()
                .map_err(|e| ServiceError::MailError(format!("invalid recipient {}: {}", to, e)))?;
            builder = builder.to(mailbox);
        }
        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))
            .map_err(|e| ServiceError::MailError(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ServiceError::MailError(e.to_string()))?;
        Ok(())
    }
}

/// Writes mail to the log; used when SMTP is not configured
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), ServiceError> {
        info!(
            to = ?email.to,
            subject = %email.subject,
            body = %email.text_body,
            "mail delivery not configured; message logged instead"
        );
        Ok(())
    }
}

/// Keeps every message in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), ServiceError> {
        let mut sent = self
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sent.push(email);
        Ok(())
    }
}

/// SMTP when credentials are configured, otherwise the logging mailer
pub fn mailer_from_config(cfg: &AppConfig) -> Arc<dyn Mailer> {
    if !cfg.mail_configured() {
        info!("mail username not set; outgoing mail will be logged");
        return Arc::new(LogMailer);
    }
    match SmtpMailer::from_config(cfg) {
        Ok(mailer) => {
            info!(server = %cfg.mail_server, port = cfg.mail_port, "SMTP mailer configured");
            Arc::new(mailer)
        }
        Err(err) => {
            warn!(error = %err, "SMTP mailer unavailable; outgoing mail will be logged");
            Arc::new(LogMailer)
        }
    }
}

/// Builds messages and hands them to the mailer in the background
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    config: Arc<AppConfig>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, config: Arc<AppConfig>) -> Self {
        Self { mailer, config }
    }

    /// Sends on a detached task; failures are logged
    pub fn dispatch(&self, email: OutgoingEmail) -> JoinHandle<()> {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            let subject = email.subject.clone();
            let recipients = email.to.len();
            match mailer.send(email).await {
                Ok(()) => info!(%subject, recipients, "email sent"),
                Err(err) => error!(%subject, error = %err, "failed to send email"),
            }
        })
    }

    #[instrument(skip(self, summary))]
    pub fn send_dashboard_report(&self, to: Vec<String>, summary: &DashboardSummary) -> JoinHandle<()> {
        let (text_body, html_body) = templates::dashboard_report(summary);
        self.dispatch(OutgoingEmail {
            to,
            subject: DASHBOARD_SUBJECT.to_string(),
            text_body,
            html_body,
        })
    }

    /// Mails configured admins about items under their threshold.
    /// Returns `None` when nothing is low or nobody would receive it.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub fn send_low_stock_alert(&self, items: &[stationery::Model]) -> Option<JoinHandle<()>> {
        if items.is_empty() {
            info!("no stationery below threshold; alert skipped");
            return None;
        }
        let recipients = self.config.admin_recipients();
        if recipients.is_empty() {
            warn!("low stock detected but no admin recipients are configured");
            return None;
        }
        let (text_body, html_body) = templates::low_stock_alert(items);
        Some(self.dispatch(OutgoingEmail {
            to: recipients,
            subject: LOW_STOCK_SUBJECT.to_string(),
            text_body,
            html_body,
        }))
    }

    #[instrument(skip(self, user, token), fields(user_id = user.id))]
    pub fn send_password_reset(&self, user: &user::Model, token: &str) -> JoinHandle<()> {
        let link = format!(
            "{}/auth/reset_password/{}",
            self.config.public_base_url.trim_end_matches('/'),
            token
        );
        let minutes = (self.config.reset_token_ttl_secs / 60).max(1);
        let (text_body, html_body) = templates::password_reset(&user.username, &link, minutes);
        self.dispatch(OutgoingEmail {
            to: vec![user.email.clone()],
            subject: PASSWORD_RESET_SUBJECT.to_string(),
            text_body,
            html_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notifier(admins: &str) -> (Notifier, RecordingMailer) {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "unit-test-secret".into(),
            "test".into(),
        );
        cfg.admin_emails = admins.into();
        let recorder = RecordingMailer::new();
        (
            Notifier::new(Arc::new(recorder.clone()), Arc::new(cfg)),
            recorder,
        )
    }

    fn low_item() -> stationery::Model {
        stationery::Model {
            id: 1,
            item_type: "A4".into(),
            quantity: 10,
            unit: "reams".into(),
            threshold: 15,
            location: "Main Office".into(),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn low_stock_alert_goes_to_admins() {
        let (notifier, recorder) = notifier("head@lab.test, it@lab.test");
        notifier
            .send_low_stock_alert(&[low_item()])
            .expect("alert dispatched")
            .await
            .unwrap();

        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, LOW_STOCK_SUBJECT);
        assert_eq!(sent[0].to, vec!["head@lab.test", "it@lab.test"]);
        assert!(sent[0]
            .text_body
            .contains("A4: 10 reams remaining (Threshold: 15)"));
    }

    #[tokio::test]
    async fn low_stock_alert_skipped_without_items() {
        let (notifier, recorder) = notifier("head@lab.test");
        assert!(notifier.send_low_stock_alert(&[]).is_none());
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn low_stock_alert_skipped_without_recipients() {
        let (notifier, recorder) = notifier("  , ");
        assert!(notifier.send_low_stock_alert(&[low_item()]).is_none());
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn reset_mail_links_to_token() {
        let (notifier, recorder) = notifier("");
        let user = user::Model {
            id: 3,
            username: "sara".into(),
            email: "sara@lab.test".into(),
            password_hash: String::new(),
            role: crate::entities::UserRole::Staff,
            is_active: true,
            last_seen: None,
            created_at: Utc::now(),
        };
        notifier.send_password_reset(&user, "tok123").await.unwrap();

        let sent = recorder.sent();
        assert_eq!(sent[0].to, vec!["sara@lab.test"]);
        assert!(sent[0]
            .text_body
            .contains("http://localhost:8080/auth/reset_password/tok123"));
    }
}
