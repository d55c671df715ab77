//! Outgoing mail for contact form notifications

use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::MailConfig;
use crate::models::ContactMessage;

pub struct Mailer {
    config: MailConfig,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Notify the office about a new contact message.
    ///
    /// Without SMTP settings the message is only logged.
    pub async fn notify_contact(&self, contact: &ContactMessage) -> Result<()> {
        let (subject, body) = contact_notification(contact);

        let (Some(host), Some(to)) = (self.config.smtp_host.as_deref(), self.config.notify_to.as_deref())
        else {
            tracing::info!(
                "Contact message from {} <{}> (mail not configured): {}",
                contact.name,
                contact.email,
                subject
            );
            return Ok(());
        };
        if host.is_empty() {
            tracing::info!("Contact message from {} (mail not configured)", contact.email);
            return Ok(());
        }

        let mut builder = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(to.parse().map_err(|e| anyhow!("Invalid notify address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        if let Ok(reply_to) = contact.email.parse() {
            builder = builder.reply_to(reply_to);
        }
        let email = builder
            .body(body)
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.config.smtp_port);
        if let (Some(user), Some(pass)) = (&self.config.smtp_username, &self.config.smtp_password) {
            transport = transport.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport
            .build()
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        tracing::info!("Sent contact notification for message {}", contact.id);
        Ok(())
    }
}

/// Subject and plain-text body of a contact notification
pub fn contact_notification(contact: &ContactMessage) -> (String, String) {
    let subject = match &contact.subject {
        Some(subject) => format!("[Contact] {}", subject),
        None => format!("[Contact] Message from {}", contact.name),
    };

    let mut body = format!("From: {} <{}>\n", contact.name, contact.email);
    if let Some(phone) = &contact.phone {
        body.push_str(&format!("Phone: {}\n", phone));
    }
    if let Some(slug) = &contact.property_slug {
        body.push_str(&format!("Property: {}\n", slug));
    }
    body.push('\n');
    body.push_str(&contact.message);
    body.push('\n');

    (subject, body)
}
