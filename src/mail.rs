//! Outbound mail delivery.
//!
//! Two transports: `log` (default) prints the message instead of sending
//! it, `smtp` delivers through a relay via lettre. Handlers only ever see
//! the trait, so enquiry tests run with a recording stub.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub cc: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<()>;
}

/// Builds the transport selected by `mail.mode`.
pub fn transport_from_config(config: &MailConfig) -> Result<Box<dyn MailTransport>> {
    match config.mode.as_str() {
        "smtp" => Ok(Box::new(SmtpMail::new(config)?)),
        _ => Ok(Box::new(LogMail)),
    }
}

/// Prints outbound mail to stdout; the development default.
pub struct LogMail;

#[async_trait]
impl MailTransport for LogMail {
    async fn send(&self, mail: &OutboundMail) -> Result<()> {
        println!(
            "mail (log mode): to={} cc={} subject={:?}",
            mail.to, mail.cc, mail.subject
        );
        println!("{}", mail.body);
        Ok(())
    }
}

/// Delivers through an SMTP relay.
pub struct SmtpMail {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMail {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_relay)
            .with_context(|| format!("Invalid SMTP relay: {}", config.smtp_relay))?
            .build();
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("Invalid mail.from address: {}", config.from))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMail {
    async fn send(&self, mail: &OutboundMail) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse().context("Invalid To address")?)
            .subject(&mail.subject);
        if !mail.cc.is_empty() {
            builder = builder.cc(mail.cc.parse().context("Invalid Cc address")?);
        }
        let message = builder
            .body(mail.body.clone())
            .context("Failed to build mail message")?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}
