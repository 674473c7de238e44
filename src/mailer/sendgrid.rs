//! SendGrid v3 mail-send client.

use serde_json::json;

use super::EmailSender;
use crate::config::EmailConfig;
use crate::error::{MailerError, Result};

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Sends mail through the SendGrid HTTP API.
pub struct SendGridSender {
    client: reqwest::blocking::Client,
    api_key: String,
    from_email: String,
}

impl SendGridSender {
    pub fn new(api_key: impl Into<String>, from_email: impl Into<String>) -> Self {
        SendGridSender {
            client: reqwest::blocking::Client::new(),
            api_key: api_key.into(),
            from_email: from_email.into(),
        }
    }

    pub fn from_config(config: &EmailConfig) -> Self {
        Self::new(config.sendgrid_api_key.clone(), config.from_email.clone())
    }
}

impl EmailSender for SendGridSender {
    fn send_email(&self, to_email: &str, subject: &str, body_html: &str) -> Result<()> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": to_email }] }],
            "from": { "email": self.from_email },
            "subject": subject,
            "content": [{ "type": "text/html", "value": body_html }],
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()?;

        // SendGrid answers 202 when the message is accepted for delivery
        let status = response.status();
        if status.as_u16() == 202 {
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            Err(MailerError::EmailSend(format!(
                "SendGrid returned {status}: {body}"
            )))
        }
    }
}
