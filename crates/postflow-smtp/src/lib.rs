//! # Postflow SMTP
//!
//! Outbound mail over SMTP (async lettre, STARTTLS relay). Implements the
//! `Mailer` trait: one message, all campaign recipients in a single batch.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use postflow_core::config::SmtpConfig;
use postflow_core::error::{PostflowError, Result};
use postflow_core::traits::Mailer;

/// SMTP mailer — relay host, port, and credentials from config.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Build one plain-text message addressed to every recipient.
    fn build_message(&self, subject: &str, body: &str, recipients: &[String]) -> Result<Message> {
        if recipients.is_empty() {
            return Err(PostflowError::Mail("no recipients".into()));
        }

        let from_name = self.config.display_name.as_deref().unwrap_or("Postflow");
        let from_mailbox: Mailbox = format!("{from_name} <{}>", self.config.email)
            .parse()
            .map_err(|e| PostflowError::Mail(format!("Invalid from: {e}")))?;

        let mut builder = Message::builder()
            .from(from_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        for recipient in recipients {
            let to_mailbox: Mailbox = recipient
                .parse()
                .map_err(|e| PostflowError::Mail(format!("Invalid to '{recipient}': {e}")))?;
            builder = builder.to(to_mailbox);
        }

        builder
            .body(body.to_string())
            .map_err(|e| PostflowError::Mail(format!("Build email: {e}")))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: &str, recipients: &[String]) -> Result<()> {
        let email = self.build_message(subject, body, recipients)?;

        let creds = Credentials::new(self.config.email.clone(), self.config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| PostflowError::Mail(format!("SMTP relay: {e}")))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| PostflowError::Mail(format!("SMTP send: {e}")))?;

        tracing::info!("📤 Email sent to {} recipient(s)", recipients.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            email: "sender@example.com".into(),
            password: "secret".into(),
            display_name: Some("Campaigns".into()),
        })
    }

    #[test]
    fn test_build_message_multiple_recipients() {
        let m = mailer();
        let msg = m
            .build_message(
                "Weekly digest",
                "Hello!",
                &["a@example.com".into(), "b@example.com".into()],
            )
            .unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert!(raw.contains("Weekly digest"));
    }

    #[test]
    fn test_build_message_rejects_empty_recipients() {
        let m = mailer();
        assert!(m.build_message("s", "b", &[]).is_err());
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let m = mailer();
        let err = m
            .build_message("s", "b", &["not an address".into()])
            .unwrap_err();
        assert!(err.to_string().contains("not an address"));
    }
}
