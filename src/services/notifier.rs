// src/services/notifier.rs

//! Change alerts over SMS.
//!
//! Formats a change summary and hands it to an [`SmsTransport`]. Delivery is
//! best-effort: the notifier never returns an error from [`Notifier::notify`],
//! it reports the outcome instead. Without credentials it stays disabled and
//! never contacts a transport.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Change, DestinationRecord, SmsConfig};

/// Header line of every alert.
pub const ALERT_TAG: &str = "🛫 TUSTUS FLIGHT ALERT";

/// Destinations listed in an alert before the remainder is summarized.
const PREVIEW_LIMIT: usize = 5;

/// Outbound "send a text message" capability.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Send `body` and return the transport-assigned delivery id.
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String>;
}

/// Twilio Messages API transport.
pub struct TwilioTransport {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
    message: Option<String>,
}

impl TwilioTransport {
    pub fn new(
        client: reqwest::Client,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base: api_base.into(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[async_trait]
impl SmsTransport for TwilioTransport {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let payload: Option<MessageResponse> = serde_json::from_str(&text).ok();

        if status.is_success() {
            payload
                .and_then(|p| p.sid)
                .ok_or_else(|| AppError::sms("response did not include a message sid"))
        } else {
            let reason = payload
                .and_then(|p| p.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            Err(AppError::sms(reason))
        }
    }
}

/// Outcome of one alert attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent { delivery_id: String, phone: String },
    Failed { error: String, phone: String },
    Disabled { reason: String },
}

/// Which SMS settings are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifierStatus {
    pub configured: bool,
    pub has_account_sid: bool,
    pub has_auth_token: bool,
    pub has_from_number: bool,
    pub has_alert_number: bool,
}

/// Formats change alerts and sends them through the configured transport.
pub struct Notifier {
    transport: Option<Arc<dyn SmsTransport>>,
    from_number: Option<String>,
    alert_number: Option<String>,
    details_url: String,
    status: NotifierStatus,
}

impl Notifier {
    /// Build from configuration; missing credentials leave it disabled.
    pub fn from_config(config: &SmsConfig, client: reqwest::Client) -> Self {
        let transport: Option<Arc<dyn SmsTransport>> =
            match (&config.account_sid, &config.auth_token) {
                (Some(sid), Some(token)) => {
                    log::info!("SMS notifications enabled");
                    Some(Arc::new(TwilioTransport::new(
                        client,
                        sid.as_str(),
                        token.as_str(),
                        config.api_base.as_str(),
                    )))
                }
                _ => {
                    log::warn!("SMS notifications disabled - missing transport credentials");
                    None
                }
            };

        Self {
            status: NotifierStatus {
                configured: transport.is_some(),
                has_account_sid: config.account_sid.is_some(),
                has_auth_token: config.auth_token.is_some(),
                has_from_number: config.from_number.is_some(),
                has_alert_number: config.alert_number.is_some(),
            },
            transport,
            from_number: config.from_number.clone(),
            alert_number: config.alert_number.clone(),
            details_url: config.details_url.clone(),
        }
    }

    /// Use an explicit transport, e.g. a test double.
    pub fn with_transport(
        transport: Arc<dyn SmsTransport>,
        from_number: impl Into<String>,
        alert_number: impl Into<String>,
    ) -> Self {
        Self {
            transport: Some(transport),
            from_number: Some(from_number.into()),
            alert_number: Some(alert_number.into()),
            details_url: SmsConfig::default().details_url,
            status: NotifierStatus {
                configured: true,
                has_account_sid: true,
                has_auth_token: true,
                has_from_number: true,
                has_alert_number: true,
            },
        }
    }

    /// A notifier that never sends anything.
    pub fn disabled() -> Self {
        Self::from_config(&SmsConfig::default(), reqwest::Client::new())
    }

    /// A transport exists.
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// A transport and both phone numbers are set.
    pub fn can_deliver(&self) -> bool {
        self.transport.is_some() && self.from_number.is_some() && self.alert_number.is_some()
    }

    pub fn alert_number(&self) -> Option<&str> {
        self.alert_number.as_deref()
    }

    pub fn status(&self) -> NotifierStatus {
        self.status
    }

    /// Send a change alert to the alert number.
    pub async fn notify(
        &self,
        changes: &[Change],
        destinations: &[DestinationRecord],
    ) -> NotifyOutcome {
        let (Some(transport), Some(from), Some(to)) =
            (&self.transport, &self.from_number, &self.alert_number)
        else {
            log::warn!("SMS not sent - missing configuration");
            return NotifyOutcome::Disabled {
                reason: "SMS not configured".to_string(),
            };
        };

        let timestamp = local_timestamp();
        let message = format_alert(changes, destinations, &timestamp, &self.details_url);
        log::debug!("Sending alert:\n{}", message);

        match transport.send(from, to, &message).await {
            Ok(delivery_id) => {
                log::info!("SMS sent successfully: {}", delivery_id);
                NotifyOutcome::Sent {
                    delivery_id,
                    phone: to.clone(),
                }
            }
            Err(e) => {
                log::error!("SMS sending failed: {}", e);
                NotifyOutcome::Failed {
                    error: e.to_string(),
                    phone: to.clone(),
                }
            }
        }
    }

    /// Send a diagnostic message to `phone`, or to the alert number.
    pub async fn send_test(&self, phone: Option<&str>, message: Option<&str>) -> Result<String> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| AppError::sms("SMS not configured - missing transport credentials"))?;
        let from = self
            .from_number
            .as_deref()
            .ok_or_else(|| AppError::sms("SMS not configured - missing sending number"))?;
        let to = phone.or(self.alert_number.as_deref()).ok_or_else(|| {
            AppError::validation("No phone number given and no alert number configured")
        })?;

        let body = match message {
            Some(message) => message.to_string(),
            None => format!(
                "🧪 Test SMS from Flight Monitor\n{}\n\nSMS alerts are working correctly!",
                local_timestamp()
            ),
        };

        transport.send(from, to, &body).await
    }
}

/// Render an alert. Deterministic for fixed inputs.
pub fn format_alert(
    changes: &[Change],
    destinations: &[DestinationRecord],
    timestamp: &str,
    details_url: &str,
) -> String {
    let mut lines = vec![
        ALERT_TAG.to_string(),
        timestamp.to_string(),
        String::new(),
        "CHANGES DETECTED:".to_string(),
    ];
    lines.extend(changes.iter().map(|change| format!("• {}", change)));

    lines.push(String::new());
    lines.push(format!("CURRENT DESTINATIONS ({}):", destinations.len()));
    lines.extend(
        destinations
            .iter()
            .take(PREVIEW_LIMIT)
            .map(|dest| format!("✈️ {} - {}", dest.display_name, dest.price)),
    );
    if destinations.len() > PREVIEW_LIMIT {
        lines.push(format!("... and {} more", destinations.len() - PREVIEW_LIMIT));
    }

    lines.push(String::new());
    lines.push(format!("View details: {}", details_url));
    lines.join("\n")
}

fn local_timestamp() -> String {
    Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NOT_AVAILABLE, SourceHint};
    use crate::pipeline::fixtures::RecordingTransport;

    fn destination(name: &str, price: &str) -> DestinationRecord {
        DestinationRecord {
            local_name: name.to_lowercase(),
            display_name: name.to_string(),
            price: price.to_string(),
            departure_date: NOT_AVAILABLE.to_string(),
            return_date: NOT_AVAILABLE.to_string(),
            occurrences: 1,
            source: SourceHint::BodyText,
        }
    }

    #[test]
    fn test_format_alert_golden() {
        let changes = vec![
            Change::Added("Crete".into()),
            Change::PriceChanged {
                name: "Eilat".into(),
                old: "₪300".into(),
                new: "₪350".into(),
            },
        ];
        let destinations = vec![destination("Eilat", "₪350"), destination("Crete", NOT_AVAILABLE)];

        let message = format_alert(
            &changes,
            &destinations,
            "6/1/2025, 9:30:00 AM",
            "https://www.tustus.co.il/Arkia/Home",
        );

        assert_eq!(
            message,
            "🛫 TUSTUS FLIGHT ALERT\n\
             6/1/2025, 9:30:00 AM\n\
             \n\
             CHANGES DETECTED:\n\
             • + Added: Crete\n\
             • 💰 Eilat: ₪300 → ₪350\n\
             \n\
             CURRENT DESTINATIONS (2):\n\
             ✈️ Eilat - ₪350\n\
             ✈️ Crete - N/A\n\
             \n\
             View details: https://www.tustus.co.il/Arkia/Home"
        );
    }

    #[test]
    fn test_format_alert_summarizes_remainder() {
        let names = ["Eilat", "Crete", "Athens", "Rhodes", "Larnaca", "Rome", "Milan"];
        let destinations: Vec<_> = names
            .iter()
            .map(|name| destination(name, "₪100"))
            .collect();

        let message = format_alert(&[Change::Added("Milan".into())], &destinations, "ts", "url");

        assert!(message.contains("CURRENT DESTINATIONS (7):\n"));
        assert!(message.contains("✈️ Larnaca - ₪100\n... and 2 more\n"));
        assert!(!message.contains("Rome -"));
    }

    #[tokio::test]
    async fn test_disabled_without_credentials() {
        let notifier = Notifier::disabled();
        assert!(!notifier.is_configured());
        assert!(!notifier.status().configured);

        let outcome = notifier.notify(&[Change::Added("Eilat".into())], &[]).await;
        assert!(matches!(outcome, NotifyOutcome::Disabled { .. }));
    }

    #[tokio::test]
    async fn test_configured_without_numbers_is_disabled() {
        let config = SmsConfig {
            account_sid: Some("AC1".into()),
            auth_token: Some("token".into()),
            ..SmsConfig::default()
        };
        let notifier = Notifier::from_config(&config, reqwest::Client::new());

        assert!(notifier.is_configured());
        assert!(!notifier.status().has_alert_number);
        let outcome = notifier.notify(&[Change::Added("Eilat".into())], &[]).await;
        assert!(matches!(outcome, NotifyOutcome::Disabled { .. }));
    }

    #[tokio::test]
    async fn test_notify_sends_formatted_alert() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::with_transport(transport.clone(), "+1000", "+2000");

        let outcome = notifier
            .notify(&[Change::Added("Eilat".into())], &[destination("Eilat", "₪300")])
            .await;

        assert_eq!(
            outcome,
            NotifyOutcome::Sent {
                delivery_id: "SM1".into(),
                phone: "+2000".into(),
            }
        );
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].0, "+1000");
        assert_eq!(sent[0].1, "+2000");
        assert!(sent[0].2.starts_with(ALERT_TAG));
        assert!(sent[0].2.contains("• + Added: Eilat\n"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported_not_raised() {
        let transport = Arc::new(RecordingTransport::failing());
        let notifier = Notifier::with_transport(transport, "+1000", "+2000");

        let outcome = notifier.notify(&[Change::Removed("Rome".into())], &[]).await;
        assert!(matches!(
            outcome,
            NotifyOutcome::Failed { ref error, .. } if error.contains("queue overflow")
        ));
    }

    #[tokio::test]
    async fn test_send_test_uses_override_phone() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::with_transport(transport.clone(), "+1000", "+2000");

        let sid = notifier.send_test(Some("+3000"), Some("hello")).await.unwrap();
        assert_eq!(sid, "SM1");

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].1, "+3000");
        assert_eq!(sent[0].2, "hello");
    }

    #[tokio::test]
    async fn test_send_test_unconfigured_errors() {
        let result = Notifier::disabled().send_test(None, None).await;
        assert!(matches!(result, Err(AppError::Sms(_))));
    }

    #[test]
    fn test_twilio_messages_url() {
        let transport = TwilioTransport::new(
            reqwest::Client::new(),
            "AC123",
            "token",
            "https://api.twilio.com/",
        );
        assert_eq!(
            transport.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
