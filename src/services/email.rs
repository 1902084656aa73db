// src/services/email.rs
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sesv2::config::Region;
use aws_sdk_sesv2::types::{Body as SesBody, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::config::AppConfig;
use crate::common::helpers::{safe_email_log, safe_token_log};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SES send failed: {0}")]
    Send(String),
}

/// A fully rendered HTML email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivers rendered messages. Implementations never retry.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, from: &str, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// AWS SES v2, credentials from the default provider chain
pub struct SesTransport {
    client: SesClient,
}

impl SesTransport {
    pub async fn new(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let aws_config = loader.load().await;

        Self {
            client: SesClient::new(&aws_config),
        }
    }
}

#[async_trait]
impl MailTransport for SesTransport {
    async fn deliver(&self, from: &str, email: &OutgoingEmail) -> Result<(), MailError> {
        let destination = Destination::builder()
            .to_addresses(email.to.clone())
            .build();

        let subject_content = Content::builder()
            .data(&email.subject)
            .charset("UTF-8")
            .build()
            .map_err(|e| MailError::Build(format!("subject: {}", e)))?;

        let body_content = Content::builder()
            .data(&email.html)
            .charset("UTF-8")
            .build()
            .map_err(|e| MailError::Build(format!("body: {}", e)))?;

        let message = Message::builder()
            .subject(subject_content)
            .body(SesBody::builder().html(body_content).build())
            .build();

        let result = self
            .client
            .send_email()
            .from_email_address(from)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, to = %safe_email_log(&email.to), "Failed to send email via SES");
                MailError::Send(e.to_string())
            })?;

        info!(
            to = %safe_email_log(&email.to),
            message_id = ?result.message_id(),
            "Email sent successfully via SES"
        );
        Ok(())
    }
}

/// Development transport: nothing leaves the process.
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, from: &str, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(
            to = %safe_email_log(&email.to),
            subject = %email.subject,
            "Email delivery skipped (log transport)"
        );
        debug!(from = %from, html = %email.html, "Email body");
        Ok(())
    }
}

/// Renders account emails and hands them to the configured transport.
pub struct EmailService {
    transport: Arc<dyn MailTransport>,
    base_url: String,
    from: String,
    no_reply: String,
}

impl EmailService {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        base_url: impl Into<String>,
        from: impl Into<String>,
        no_reply: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            from: from.into(),
            no_reply: no_reply.into(),
        }
    }

    pub fn from_config(transport: Arc<dyn MailTransport>, config: &AppConfig) -> Self {
        Self::new(
            transport,
            config.base_url.clone(),
            config.email_from.clone(),
            config.email_no_reply.clone(),
        )
    }

    pub fn confirmation_link(&self, token: &str) -> String {
        format!("{}/confirm-email?token={}", self.base_url, token)
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.base_url, token)
    }

    pub async fn send_confirmation_email(&self, to: &str, token: &str) -> Result<(), MailError> {
        let link = self.confirmation_link(token);
        debug!(
            to = %safe_email_log(to),
            token = %safe_token_log(token),
            "Sending confirmation email"
        );

        let email = OutgoingEmail {
            to: to.to_string(),
            subject: "Email Confirmation".to_string(),
            html: format!(
                r#"<p>Please confirm your email by clicking on the following link:</p>
<a href="{link}">{link}</a>"#
            ),
        };
        self.transport.deliver(&self.from, &email).await
    }

    pub async fn send_password_reset_email(&self, to: &str, token: &str) -> Result<(), MailError> {
        let link = self.reset_link(token);
        self.send_email(OutgoingEmail {
            to: to.to_string(),
            subject: "Password Reset Request".to_string(),
            html: format!(
                r#"<p>You requested a password reset. Click the link below to reset your password:</p>
<a href="{link}">{link}</a>
<p>If you didn't request this, you can ignore this email.</p>"#
            ),
        })
        .await
    }

    /// Sends an arbitrary message from the no-reply address.
    pub async fn send_email(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.transport.deliver(&self.no_reply, &email).await
    }
}
