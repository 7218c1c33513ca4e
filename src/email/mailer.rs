use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::MailerConfig;
use crate::error::{AppError, Result};

/// Seam for the outgoing mail transport. Success or failure is reported
/// synchronously; the queue records the outcome either way.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mail delivery through an HTTP mail API.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &MailerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("mailer.api_key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<()> {
        let request = SendMailRequest {
            from: &self.from,
            to: recipient,
            subject,
            html: html_body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService {
                service: "mail API",
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_shape() {
        let request = SendMailRequest {
            from: "digest@newsbrief.example",
            to: "reader@example.com",
            subject: "Today's AI news digest",
            html: "<html></html>",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["from"], "digest@newsbrief.example");
        assert_eq!(value["to"], "reader@example.com");
        assert_eq!(value["subject"], "Today's AI news digest");
        assert_eq!(value["html"], "<html></html>");
    }

    #[test]
    fn test_missing_api_key_is_a_config_error() {
        let config = MailerConfig::default();
        assert!(matches!(
            HttpMailer::new(&config),
            Err(AppError::Config(_))
        ));
    }
}
