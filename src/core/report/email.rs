//! Alert email delivery via SMTP.
//!
//! [`SmtpNotifier`] wraps the blocking `lettre` SMTP transport (STARTTLS on
//! port 587). Without an SMTP host the monitor uses [`LogOnlyNotifier`].

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{info, warn};

use super::Notifier;
use crate::core::config::EmailSettings;
use crate::error::{ReefError, Result};

const SMTP_PORT: u16 = 587;

pub struct SmtpNotifier {
    settings: EmailSettings,
    status_link: String,
}

impl SmtpNotifier {
    /// `status_link` is appended to each mail so the reader can check the
    /// live status.
    pub fn new<S: Into<String>>(settings: EmailSettings, status_link: S) -> Self {
        Self {
            settings,
            status_link: status_link.into(),
        }
    }

    pub fn compose_body(&self, alerts: &[String], status: &str) -> String {
        compose_body(alerts, status, &self.status_link)
    }

    fn build_message(&self, alerts: &[String], status: &str) -> Result<Message> {
        let from: Mailbox = self
            .settings
            .from
            .parse()
            .map_err(|e| ReefError::email(format!("invalid sender {:?}: {}", self.settings.from, e)))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(self.settings.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.settings.recipients {
            let to: Mailbox = recipient
                .parse()
                .map_err(|e| ReefError::email(format!("invalid recipient {:?}: {}", recipient, e)))?;
            builder = builder.to(to);
        }

        builder
            .body(self.compose_body(alerts, status))
            .map_err(|e| ReefError::email(e.to_string()))
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&mut self, alerts: &[String], status: &str) -> Result<()> {
        if self.settings.recipients.is_empty() {
            warn!("No alert recipients configured; dropping {} alerts", alerts.len());
            return Ok(());
        }

        let message = self.build_message(alerts, status)?;
        let mailer = SmtpTransport::starttls_relay(&self.settings.smtp_host)
            .map_err(|e| ReefError::email(e.to_string()))?
            .port(SMTP_PORT)
            .credentials(Credentials::new(
                self.settings.from.clone(),
                self.settings.smtp_password.clone(),
            ))
            .build();

        mailer
            .send(&message)
            .map_err(|e| ReefError::email(e.to_string()))?;

        info!(
            "Alert email sent to {}",
            self.settings.recipients.join(", ")
        );
        Ok(())
    }
}

/// Used when no SMTP relay is configured
#[derive(Debug, Default)]
pub struct LogOnlyNotifier;

impl Notifier for LogOnlyNotifier {
    fn notify(&mut self, alerts: &[String], _status: &str) -> Result<()> {
        for alert in alerts {
            warn!("{}", alert);
        }
        Ok(())
    }
}

fn compose_body(alerts: &[String], status: &str, link: &str) -> String {
    format!(
        "{}\n\n{}\n{}\n",
        alerts.join("\n"),
        status.replace(';', "\n"),
        link
    )
}
