use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use super::envelope::{CourseData, EnrollmentData, Envelope, ModulesData, ProfileData};
use super::CourseBackend;
use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::models::{Course, Enrollment, Module, UserProfile};
use crate::session::{Credentials, Session};
use crate::types::{CourseId, LessonId};

/// HTTP client for the LMS backend. Attaches the session's bearer token to
/// every call that needs one.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    /// Client carrying the session's access token, if any
    pub fn for_session(config: &ApiConfig, session: &Session) -> Result<Self, ClientError> {
        Ok(Self::new(config)?.with_token(session.token()))
    }

    pub fn with_token(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        tracing::debug!(%method, %url, "api request");
        self.http.request(method, url)
    }

    fn authorized(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ClientError::auth("not logged in; run `lms auth login` first"))?;
        Ok(self.request(method, segments).bearer_auth(token))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Envelope<Value>>(&body)
                .ok()
                .and_then(|e| e.message);
            tracing::debug!(status = status.as_u16(), ?message, "api request rejected");
            return Err(ClientError::from_status(status.as_u16(), message));
        }

        Ok(body.to_vec())
    }

    fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Envelope<T>, ClientError> {
        let envelope: Envelope<T> =
            serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))?;

        if envelope.is_rejected() {
            let message = envelope
                .message
                .unwrap_or_else(|| "request was not successful".to_string());
            return Err(ClientError::server(200, message));
        }

        Ok(envelope)
    }

    async fn fetch_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let body = self.execute(request).await?;
        Self::decode::<T>(&body)?
            .data
            .ok_or_else(|| ClientError::Decode("response carried no data".to_string()))
    }

    async fn fetch_message(&self, request: RequestBuilder) -> Result<Option<String>, ClientError> {
        let body = self.execute(request).await?;
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Self::decode::<Value>(&body)?.message)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials, ClientError> {
        let request = self
            .request(Method::POST, &["auth", "login"])
            .json(&json!({ "email": email, "password": password }));
        self.fetch_data(request).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Option<String>, ClientError> {
        let request = self
            .request(Method::POST, &["auth", "register"])
            .json(&json!({ "name": name, "email": email, "password": password }));
        self.fetch_message(request).await
    }

    /// Best-effort server-side logout
    pub async fn logout(&self) -> Result<(), ClientError> {
        let mut request = self.request(Method::POST, &["auth", "logout"]);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }
        self.fetch_message(request).await.map(|_| ())
    }

    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        let request = self.authorized(Method::GET, &["auth", "profile"])?;
        let body = self.execute(request).await?;

        if let Some(data) = Self::decode::<ProfileData>(&body)?.data {
            return Ok(data.into_profile());
        }
        serde_json::from_slice::<UserProfile>(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn course(&self, course: &CourseId) -> Result<Course, ClientError> {
        let request = self.authorized(Method::GET, &["courses", course.as_str()])?;
        let data: CourseData = self.fetch_data(request).await?;
        Ok(data.course)
    }

    /// An empty body (including 204), `data: null`, `data: {}` and
    /// `enrollment: null` all mean the learner is not enrolled
    fn enrollment_from_body(body: &[u8]) -> Result<Enrollment, ClientError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ClientError::NotEnrolled);
        }
        Self::decode::<EnrollmentData>(body)?
            .data
            .and_then(|d| d.enrollment)
            .ok_or(ClientError::NotEnrolled)
    }

    fn expect_enrollment(data: EnrollmentData) -> Result<Enrollment, ClientError> {
        data.enrollment
            .ok_or_else(|| ClientError::Decode("response carried no enrollment".to_string()))
    }
}

#[async_trait]
impl CourseBackend for ApiClient {
    async fn course_modules(&self, course: &CourseId) -> Result<Vec<Module>, ClientError> {
        let request = self.authorized(Method::GET, &["modules", "course", course.as_str()])?;
        let data: ModulesData = self.fetch_data(request).await?;
        Ok(data.modules)
    }

    async fn enrollment(&self, course: &CourseId) -> Result<Enrollment, ClientError> {
        let request = self.authorized(
            Method::GET,
            &["enrollments", "courses", course.as_str(), "enrollment"],
        )?;

        match self.execute(request).await {
            Ok(body) => Self::enrollment_from_body(&body),
            Err(ClientError::Server { status: 404, .. }) => Err(ClientError::NotEnrolled),
            Err(e) => Err(e),
        }
    }

    async fn enroll(&self, course: &CourseId) -> Result<Enrollment, ClientError> {
        let request = self.authorized(
            Method::POST,
            &["enrollments", "courses", course.as_str(), "enroll"],
        )?;
        Self::expect_enrollment(self.fetch_data(request).await?)
    }

    async fn complete_lesson(
        &self,
        course: &CourseId,
        lesson: &LessonId,
    ) -> Result<Enrollment, ClientError> {
        let request = self.authorized(
            Method::PATCH,
            &[
                "enrollments",
                "courses",
                course.as_str(),
                "lessons",
                lesson.as_str(),
                "complete",
            ],
        )?;
        Self::expect_enrollment(self.fetch_data(request).await?)
    }
}
