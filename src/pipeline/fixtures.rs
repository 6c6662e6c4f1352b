//! Test doubles for pipeline collaborators.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::services::SmsTransport;
use crate::utils::http::PageFetcher;

/// Fetcher that replays scripted responses; the last one repeats.
pub(crate) struct ScriptedFetcher {
    responses: Mutex<Vec<std::result::Result<String, String>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedFetcher {
    pub(crate) fn new(responses: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn pages(pages: &[&str]) -> Self {
        Self::new(pages.iter().map(|p| Ok(p.to_string())).collect())
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = {
            let responses = self.responses.lock().unwrap();
            responses.get(call).or(responses.last()).cloned()
        };

        match response {
            Some(Ok(markup)) => Ok(markup),
            Some(Err(message)) => Err(AppError::fetch(url, message)),
            None => Ok(String::new()),
        }
    }
}

/// Transport double that records sent messages.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    pub(crate) sent: Mutex<Vec<(String, String, String)>>,
    pub(crate) fail: bool,
}

impl RecordingTransport {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SmsTransport for RecordingTransport {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String> {
        if self.fail {
            return Err(AppError::sms("queue overflow"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((from.to_string(), to.to_string(), body.to_string()));
        Ok(format!("SM{}", sent.len()))
    }
}

/// Markup snippet for one offer on the target page.
pub(crate) fn offer(local_name: &str, price: Option<&str>) -> String {
    format!(
        r#"<div class="deal"><h3>טיסה ל{}</h3><span class="price">{}</span></div>"#,
        local_name,
        price.unwrap_or("")
    )
}
