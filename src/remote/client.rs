//! HTTP client for the platform API

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};

use super::RemoteApi;
use super::error::RemoteError;
use crate::config::Config;
use crate::counters::CounterKind;
use crate::progress::snapshot;
use crate::progress::{AttemptAck, ChapterSnapshot, CourseContent, UnreadCounts, VideoKind};

/// Platform API client
pub struct HttpRemote {
    /// HTTP client
    client: Client,
    /// API root, without trailing slash
    base_url: String,
    /// Bearer token issued by the auth layer
    token: Option<String>,
}

impl HttpRemote {
    /// Fallback when a 429 carries no usable Retry-After header
    const DEFAULT_RETRY_AFTER: u64 = 60;

    /// Create a client for the given API root
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), token })
    }

    /// Create a client from the application config
    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        Self::new(&config.api_base_url, config.api_token.clone(), timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value, RemoteError> {
        let request = self.authorize(self.client.get(self.url(path)));
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, RemoteError> {
        let request = self.authorize(self.client.post(self.url(path))).json(body);
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        // Acks are often empty
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Map HTTP failures onto [`RemoteError`]
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(HttpRemote::DEFAULT_RETRY_AFTER);
        return Err(RemoteError::RateLimited { retry_after_seconds: retry_after });
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(RemoteError::Unauthorized);
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(RemoteError::ApiError { status: status.as_u16(), message });
    }

    Ok(response)
}

impl RemoteApi for HttpRemote {
    async fn fetch_chapter_progress(
        &self,
        learner_id: &str,
        chapter_id: &str,
    ) -> Result<ChapterSnapshot, RemoteError> {
        let path = format!("learners/{learner_id}/chapters/{chapter_id}/progress");
        let value = self.get_json(&path).await?;
        Ok(snapshot::parse_chapter_snapshot(&value)?)
    }

    async fn submit_video_watched(
        &self,
        learner_id: &str,
        chapter_id: &str,
        video_id: &str,
        kind: VideoKind,
    ) -> Result<(), RemoteError> {
        let body = json!({ "videoId": video_id, "kind": kind.as_str() });
        let path = format!("learners/{learner_id}/chapters/{chapter_id}/watched");
        self.post_json(&path, &body).await?;
        Ok(())
    }

    async fn submit_slides_viewed(
        &self,
        learner_id: &str,
        chapter_id: &str,
    ) -> Result<(), RemoteError> {
        let path = format!("learners/{learner_id}/chapters/{chapter_id}/slides-viewed");
        self.post_json(&path, &json!({})).await?;
        Ok(())
    }

    async fn submit_quiz_attempt(
        &self,
        learner_id: &str,
        chapter_id: &str,
        score_percent: f64,
    ) -> Result<AttemptAck, RemoteError> {
        let body = json!({ "scorePercent": score_percent });
        let path = format!("learners/{learner_id}/chapters/{chapter_id}/quiz-attempts");
        let value = self.post_json(&path, &body).await?;
        Ok(snapshot::parse_attempt_ack(&value)?)
    }

    async fn fetch_unread_counts(&self, learner_id: &str) -> Result<UnreadCounts, RemoteError> {
        let value = self.get_json(&format!("learners/{learner_id}/unread-counts")).await?;
        Ok(snapshot::parse_unread_counts(&value)?)
    }

    async fn submit_mark_read(
        &self,
        learner_id: &str,
        kind: CounterKind,
        item_id: &str,
    ) -> Result<(), RemoteError> {
        let path = format!("learners/{learner_id}/{}/{item_id}/read", kind.as_str());
        self.post_json(&path, &json!({})).await?;
        Ok(())
    }

    async fn fetch_course_content(&self, course_id: &str) -> Result<CourseContent, RemoteError> {
        let value = self.get_json(&format!("courses/{course_id}/content")).await?;
        Ok(snapshot::parse_course_content(&value)?)
    }
}
