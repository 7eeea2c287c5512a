//! InfluxDB v2 HTTP 写入实现
//!
//! `POST {url}/api/v2/write?org=..&bucket=..&precision=ms`，请求体为 line protocol。

use crate::error::StoreError;
use crate::line_protocol::encode_points;
use crate::traits::PointSink;
use async_trait::async_trait;
use domain::Point;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

/// InfluxDB 认证方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfluxAuth {
    None,
    Token(String),
    /// 已 base64 编码的 `user:password`。
    Basic(String),
}

impl InfluxAuth {
    fn header_value(&self) -> Option<String> {
        match self {
            InfluxAuth::None => None,
            InfluxAuth::Token(token) => Some(format!("Token {}", token)),
            InfluxAuth::Basic(credential) => Some(format!("Basic {}", credential)),
        }
    }
}

/// InfluxDB 写入配置。
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub auth: InfluxAuth,
    pub timeout: Duration,
}

/// InfluxDB 写入器。
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: reqwest::Client,
    write_url: String,
    org: String,
    bucket: String,
    auth_header: Option<String>,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| StoreError::Client(err.to_string()))?;
        Ok(Self {
            client,
            write_url: format!("{}/api/v2/write", config.url.trim_end_matches('/')),
            org: config.org,
            bucket: config.bucket,
            auth_header: config.auth.header_value(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl PointSink for InfluxSink {
    async fn write_points(&self, points: &[Point]) -> Result<(), StoreError> {
        if points.is_empty() {
            return Ok(());
        }
        let body = encode_points(points);
        let mut request = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ms"),
            ])
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);
        if let Some(auth) = &self.auth_header {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Transient(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            debug!(target: "bridge.storage", points = points.len(), "influx_write_ok");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StoreError::Transient(format!(
                "http {}: {}",
                status.as_u16(),
                body
            )));
        }
        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
