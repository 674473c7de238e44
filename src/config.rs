use std::env;

use crate::error::{MailerError, Result};

/// Email providers the transport layer knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailProvider {
    SendGrid,
}

impl EmailProvider {
    /// Parse the `EMAIL_PROVIDER` value. Unknown providers are a fatal
    /// configuration error surfaced as a non-zero exit by the CLI.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "sendgrid" => Ok(EmailProvider::SendGrid),
            other => Err(MailerError::Config(format!(
                "Unknown email provider '{other}'. Set EMAIL_PROVIDER to 'sendgrid'"
            ))),
        }
    }
}

/// Email transport configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub from_email: String,
    pub sendgrid_api_key: String,
}

impl EmailConfig {
    /// Load and validate transport configuration from environment variables
    /// (a `.env` file is honored when present via `dotenv`).
    pub fn from_env() -> Result<Self> {
        let provider_name = env::var("EMAIL_PROVIDER").unwrap_or_else(|_| "sendgrid".to_string());
        let provider = EmailProvider::parse(&provider_name)?;

        let from_email = env::var("FROM_EMAIL").unwrap_or_default();
        if from_email.is_empty() {
            return Err(MailerError::Config(
                "FROM_EMAIL is required to send email".to_string(),
            ));
        }

        let sendgrid_api_key = env::var("SENDGRID_API_KEY").unwrap_or_default();
        if sendgrid_api_key.is_empty() {
            return Err(MailerError::Config(
                "SENDGRID_API_KEY is required for the SendGrid provider".to_string(),
            ));
        }

        Ok(EmailConfig {
            provider,
            from_email,
            sendgrid_api_key,
        })
    }
}
