//! Outgoing mail
//!
//! Without a relay configured mail is only written to the log.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "Mail (not delivered):\n{}", email.body);
        Ok(())
    }
}

/// Posts every mail as JSON to a relay service.
pub struct HttpMailer {
    http: reqwest::Client,
    url: String,
}

impl HttpMailer {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        self.http
            .post(&self.url)
            .json(email)
            .send()
            .await?
            .error_for_status()?;
        info!(to = %email.to, subject = %email.subject, "Mail sent via relay");
        Ok(())
    }
}

pub fn password_reset_email(from: &str, to: &str, link: &str) -> Email {
    Email {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        body: format!(
            "We received a request to reset your password.\n\n\
             Open the link below to choose a new one. It expires in 3 days.\n\n{}\n\n\
             If you did not ask for this, you can ignore this mail.",
            link
        ),
    }
}
