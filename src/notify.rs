//! Owner notifications delivered to an optional webhook.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::validation::{self, Validate};

pub const MAX_NOTIFY_TITLE_LEN: usize = 200;
pub const MAX_NOTIFY_CONTENT_LEN: usize = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub content: String,
}

impl Validate for Notification {
    fn validate(&self) -> Result<(), AppError> {
        validation::required("title", &self.title, MAX_NOTIFY_TITLE_LEN)?;
        validation::required("content", &self.content, MAX_NOTIFY_CONTENT_LEN)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: bool,
}

#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(http: reqwest::Client, webhook_url: Option<String>) -> Self {
        Self { http, webhook_url }
    }

    /// Never fails: delivery problems are logged and reported as
    /// `delivered: false`.
    pub async fn notify_owner(&self, notification: &Notification) -> Delivery {
        let Some(url) = self.webhook_url.as_deref() else {
            tracing::info!(
                title = %notification.title,
                "owner notification (no webhook configured)"
            );
            return Delivery { delivered: false };
        };

        let result = self
            .http
            .post(url)
            .json(notification)
            .send()
            .await
            .and_then(|res| res.error_for_status());

        match result {
            Ok(_) => {
                tracing::info!(title = %notification.title, "owner notification delivered");
                Delivery { delivered: true }
            }
            Err(e) => {
                tracing::warn!(error = %e, "owner notification failed");
                Delivery { delivered: false }
            }
        }
    }
}
