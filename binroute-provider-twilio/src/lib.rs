//! Notification provider sending SMS through the Twilio Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use binroute_core::ports::{NotificationPort, PortError};

const BASE_URL: &str = "https://api.twilio.com/2010-04-01";

/// Error body returned by Twilio on 4xx/5xx
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<u32>,
    message: String,
}

/// Account credentials and sender number.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Account SID, also the basic-auth user.
    pub account_sid: String,
    /// Auth token.
    pub auth_token: String,
    /// Sending phone number.
    pub from_number: String,
}

/// Notification port sending SMS via Twilio.
pub struct TwilioNotifier {
    client: Client,
    config: TwilioConfig,
}

impl TwilioNotifier {
    /// Create a notifier bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, config: TwilioConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "{BASE_URL}/Accounts/{}/Messages.json",
            self.config.account_sid
        )
    }
}

#[async_trait]
impl NotificationPort for TwilioNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), PortError> {
        debug!(%recipient, "sending sms");

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", recipient),
                ("From", self.config.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        Err(delivery_error(status.as_u16(), &body))
    }
}

/// Turn a failed Twilio response into a [`PortError::Notification`].
#[must_use]
pub fn delivery_error(status: u16, body: &str) -> PortError {
    let detail = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            code: Some(code),
            message,
        }) => format!("{code} {message}"),
        Ok(ErrorResponse {
            code: None,
            message,
        }) => message,
        Err(_) => format!("HTTP {status}"),
    };
    PortError::Notification(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(err: PortError) -> String {
        match err {
            PortError::Notification(detail) => detail,
            other => format!("unexpected {other}"),
        }
    }

    #[test]
    fn error_body_code_and_message_are_kept() {
        let body = r#"{"code": 21211, "message": "The 'To' number +91000 is not a valid phone number.", "more_info": "https://www.twilio.com/docs/errors/21211", "status": 400}"#;
        assert_eq!(
            detail(delivery_error(400, body)),
            "21211 The 'To' number +91000 is not a valid phone number."
        );
    }

    #[test]
    fn non_json_body_falls_back_to_status() {
        assert_eq!(detail(delivery_error(503, "Service Unavailable")), "HTTP 503");
    }

    #[test]
    fn messages_url_contains_account() {
        let notifier = TwilioNotifier::new(
            Client::new(),
            TwilioConfig {
                account_sid: "AC123".to_owned(),
                auth_token: "secret".to_owned(),
                from_number: "+15005550006".to_owned(),
            },
        );
        assert_eq!(
            notifier.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
