// HTTP access to the caption CDN

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;

/// Raw CDN response; status handling is left to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedTextResponse {
    pub status: u16,
    pub body: String,
}

impl TimedTextResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait TimedTextClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<TimedTextResponse>;
}

pub struct ReqwestTimedTextClient {
    client: Client,
}

impl ReqwestTimedTextClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TimedTextClient for ReqwestTimedTextClient {
    async fn get(&self, url: &str) -> Result<TimedTextResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TimedTextResponse { status, body })
    }
}
