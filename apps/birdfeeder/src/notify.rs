//! # Notify Module
//!
//! Alerts for detections, delivered through Pushover with the frame
//! attached.

use crate::error::AppError;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// Public Pushover API.
pub const PUSHOVER_API: &str = "https://api.pushover.net";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub sound: String,
    pub attachment: Vec<u8>,
}

impl Alert {
    /// A "Bird Detected" alert for `label`, with the frame attached.
    #[must_use]
    pub fn detection(label: impl Into<String>, jpeg: Vec<u8>) -> Self {
        Self {
            title: String::from("Bird Detected"),
            message: label.into(),
            sound: String::from("intermission"),
            attachment: jpeg,
        }
    }
}

/// Alert delivery.
pub trait Notifier {
    fn notify(&self, alert: &Alert) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Pushover application token plus recipient user key.
#[derive(Clone, PartialEq, Eq)]
pub struct PushoverCredentials {
    pub user_key: String,
    pub api_token: String,
}

// Keys stay out of logs.
impl std::fmt::Debug for PushoverCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverCredentials")
            .field("user_key", &"***")
            .field("api_token", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: i64,
    #[serde(default)]
    errors: Vec<String>,
}

/// Pushover message client.
#[derive(Debug, Clone)]
pub struct PushoverNotifier {
    base_url: String,
    credentials: PushoverCredentials,
    client: reqwest::Client,
}

impl PushoverNotifier {
    pub fn new(credentials: PushoverCredentials) -> Result<Self, AppError> {
        Self::with_base_url(PUSHOVER_API, credentials)
    }

    /// Point at a different API host (tests, proxies).
    pub fn with_base_url(
        base_url: impl Into<String>,
        credentials: PushoverCredentials,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }
}

impl Notifier for PushoverNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), AppError> {
        let url = format!("{}/1/messages.json", self.base_url);

        let attachment = Part::bytes(alert.attachment.clone())
            .file_name("capture.jpg")
            .mime_str("image/jpeg")?;

        let form = Form::new()
            .text("token", self.credentials.api_token.clone())
            .text("user", self.credentials.user_key.clone())
            .text("title", alert.title.clone())
            .text("message", alert.message.clone())
            .text("sound", alert.sound.clone())
            .part("attachment", attachment);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: Option<PushoverResponse> = serde_json::from_str(&body).ok();
        match parsed {
            Some(reply) if status.is_success() && reply.status == 1 => Ok(()),
            Some(reply) if !reply.errors.is_empty() => Err(AppError::Notify(format!(
                "{status}: {}",
                reply.errors.join("; ")
            ))),
            _ => Err(AppError::Notify(format!("{status}: {}", body.trim()))),
        }
    }
}
