//! SMTP email notifier via `lettre` with TLS support.
//!
//! Delivers change alerts as emails through an SMTP server.
//! Supports STARTTLS and implicit TLS connections.

use std::sync::Arc;

use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::settings::EmailChannel;
use crate::templating::{TemplateRenderer, DEFAULT_BODY_TEMPLATE};
use crate::traits::{ChangeAlert, Notifier, NotifyError};

/// Sends change alerts as emails via SMTP.
///
/// The body is rendered from [`DEFAULT_BODY_TEMPLATE`], so emails carry
/// the target label, URL, category, and a diff link when one exists.
#[derive(Debug)]
pub struct EmailNotifier {
    /// Async SMTP transport for sending emails.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Sender mailbox.
    from: Mailbox,
    /// Recipient mailboxes.
    to: Vec<Mailbox>,
    /// Renderer for the body template.
    renderer: Arc<TemplateRenderer>,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from channel settings.
    ///
    /// - `smtp_port` defaults to 587; port 465 always uses implicit TLS.
    /// - `tls`: `None` or `Some(true)` enables STARTTLS on other ports.
    ///
    /// SMTP credentials are resolved from the `SMTP_USERNAME` and
    /// `SMTP_PASSWORD` environment variables. If both are set, they are
    /// passed to the transport; otherwise the connection is unauthenticated.
    pub fn from_config(
        channel: &EmailChannel,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, NotifyError> {
        let from_mailbox: Mailbox = channel
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let to_mailboxes: Vec<Mailbox> = channel
            .to
            .iter()
            .map(|addr| {
                addr.parse()
                    .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if to_mailboxes.is_empty() {
            return Err(NotifyError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let port = channel.smtp_port.unwrap_or(587);
        let use_tls = channel.tls.unwrap_or(true);

        // Port 465 uses implicit TLS; everything else uses STARTTLS when TLS is enabled.
        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&channel.smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&channel.smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&channel.smtp_host).port(port)
        };

        // Attach credentials from environment if available.
        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let transport = builder.build();

        Ok(Self {
            transport,
            from: from_mailbox,
            to: to_mailboxes,
            renderer,
        })
    }

    fn body(&self, alert: &ChangeAlert) -> Result<String, NotifyError> {
        self.renderer.render(DEFAULT_BODY_TEMPLATE, alert)
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    /// Send an alert email to all configured recipients.
    async fn send(&self, alert: &ChangeAlert) -> Result<(), NotifyError> {
        let mut message_builder = Message::builder().from(self.from.clone());

        for recipient in &self.to {
            message_builder = message_builder.to(recipient.clone());
        }

        let email = message_builder
            .subject(&alert.title)
            .body(self.body(alert)?)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            subject = %alert.title,
            recipients = self.to.len(),
            "alert delivered"
        );

        Ok(())
    }

    /// Returns `"email"`.
    fn channel_name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_core::ChangeCategory;

    fn channel(port: Option<u16>, tls: Option<bool>, from: &str, to: &[&str]) -> EmailChannel {
        EmailChannel {
            enabled: true,
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: port,
            tls,
            from: from.to_string(),
            to: to.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn renderer() -> Arc<TemplateRenderer> {
        Arc::new(TemplateRenderer::new())
    }

    #[test]
    fn parse_email_with_display_name() {
        let mailbox: Result<Mailbox, _> = "Alice <alice@example.com>".parse();
        assert!(mailbox.is_ok());
        let mb = mailbox.unwrap();
        assert_eq!(mb.email.to_string(), "alice@example.com");
    }

    #[test]
    fn from_config_valid() {
        let notifier = EmailNotifier::from_config(
            &channel(
                Some(587),
                Some(true),
                "alerts@example.com",
                &["admin@example.com"],
            ),
            renderer(),
        );
        assert!(notifier.is_ok());
    }

    #[test]
    fn from_config_invalid_from_address() {
        let result = EmailNotifier::from_config(
            &channel(None, None, "bad-address", &["a@example.com"]),
            renderer(),
        );
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("configuration error"), "got: {err}");
    }

    #[test]
    fn from_config_invalid_to_address() {
        let result = EmailNotifier::from_config(
            &channel(None, None, "alerts@example.com", &["not-valid"]),
            renderer(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn from_config_empty_recipients() {
        let result = EmailNotifier::from_config(
            &channel(None, None, "alerts@example.com", &[]),
            renderer(),
        );
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("at least one recipient"), "got: {err}");
    }

    #[test]
    fn channel_name_is_email() {
        let notifier = EmailNotifier::from_config(
            &channel(
                Some(587),
                Some(true),
                "alerts@example.com",
                &["admin@example.com"],
            ),
            renderer(),
        )
        .unwrap();
        assert_eq!(notifier.channel_name(), "email");
    }

    #[test]
    fn from_config_implicit_tls_port() {
        let notifier = EmailNotifier::from_config(
            &channel(
                Some(465),
                None,
                "alerts@example.com",
                &["admin@example.com"],
            ),
            renderer(),
        );
        assert!(notifier.is_ok());
    }

    #[test]
    fn from_config_no_tls() {
        let notifier = EmailNotifier::from_config(
            &channel(
                Some(25),
                Some(false),
                "alerts@example.com",
                &["admin@example.com"],
            ),
            renderer(),
        );
        assert!(notifier.is_ok());
    }

    #[test]
    fn body_is_rendered_from_default_template() {
        let notifier = EmailNotifier::from_config(
            &channel(None, None, "alerts@example.com", &["admin@example.com"]),
            renderer(),
        )
        .unwrap();

        let alert = ChangeAlert {
            title: "Change detected".into(),
            message: "first-view change on landing".into(),
            target_label: "landing".into(),
            target_url: "https://example.com/lp".into(),
            category: ChangeCategory::FirstView,
            diff_artifact_url: Some("https://cdn.example.com/diff.png".into()),
        };

        let body = notifier.body(&alert).unwrap();
        assert!(body.contains("first-view change on landing"));
        assert!(body.contains("https://example.com/lp"));
        assert!(body.contains("https://cdn.example.com/diff.png"));
    }
}
