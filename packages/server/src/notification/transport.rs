use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};
use tracing::info;

use super::template::RenderedMessage;
use crate::config::{NotificationConfig, SmtpConfig, TransportKind};

/// Delivery-channel failure. Never fatal to the operation that queued the
/// message; the dispatcher records it on the delivery row.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),

    /// Channel-specific failure from other notifier implementations.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// A rendered message addressed to one recipient.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub to_name: String,
    pub to_address: String,
    pub content: RenderedMessage,
}

/// Channel that hands a message to its recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), NotificationError>;

    fn name(&self) -> &'static str;
}

/// Sends through an SMTP relay. Port 465 uses implicit TLS, other ports STARTTLS.
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, sender_name: &str) -> Result<Self, NotificationError> {
        let mut builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        }
        .port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from: Mailbox::new(Some(sender_name.to_owned()), config.from_address.parse()?),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), NotificationError> {
        let to = Mailbox::new(
            Some(message.to_name.clone()),
            message.to_address.trim().parse()?,
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.content.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.content.text.clone(),
                message.content.html.clone(),
            ))
            .map_err(|e| NotificationError::Build(e.to_string()))?;

        self.mailer.send(email).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Logs the message instead of sending it. Development default.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), NotificationError> {
        info!(
            to = %message.to_address,
            subject = %message.content.subject,
            "Confirmation email (log transport):\n{}",
            message.content.text
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Build the notifier selected by configuration.
pub fn from_config(config: &NotificationConfig) -> Result<Arc<dyn Notifier>, NotificationError> {
    match (config.transport, &config.smtp) {
        (TransportKind::Smtp, Some(smtp)) => Ok(Arc::new(SmtpNotifier::new(smtp, &config.club_name)?)),
        (TransportKind::Smtp, None) => Err(NotificationError::Build(
            "smtp transport selected without smtp settings".into(),
        )),
        (TransportKind::Log, _) => Ok(Arc::new(LogNotifier)),
    }
}
