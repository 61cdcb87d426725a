use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{
    Article, ArticleEnvelope, ArticlesEnvelope, LoginCredentials, ProfileUpdate,
    RegistrationRequest, TagsEnvelope, User, UserEnvelope,
};
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Bearer token shared between the API client and whoever owns the session.
///
/// The handle is passed in explicitly when the client is built; cloning it
/// shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    token: Arc<Mutex<Option<String>>>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.lock().await = Some(token.into());
    }

    pub async fn clear_token(&self) {
        *self.token.lock().await = None;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_credentials(config, Credentials::new())
    }

    pub fn with_credentials(config: &ClientConfig, credentials: Credentials) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        self.credentials.set_token(token).await;
    }

    pub async fn clear_token(&self) {
        self.credentials.clear_token().await;
    }

    pub async fn token(&self) -> Option<String> {
        self.credentials.token().await
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `<base>/articles/<slug>[/<suffix>]` with the slug percent-encoded as a
    /// single path segment.
    fn article_url(&self, slug: &str, suffix: Option<&str>) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.url("/articles"))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?;
            segments.push(slug);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    async fn add_auth_header(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.token().await {
            Some(token) => request.header(AUTHORIZATION, format!("Token {}", token)),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        tracing::debug!("{} {}", method, path);

        let response = match self.add_auth_header(request).await.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{} {} failed before a response arrived: {}", method, path, e);
                return Err(ClientError::Network(e));
            }
        };

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text)
                .map_err(|e| ClientError::Decode(format!("{} {}: {}", method, path, e)))
        } else {
            let err = ClientError::from_response(status, &text);
            tracing::warn!("{} {} -> {}: {}", method, path, status, err);
            Err(err)
        }
    }

    /// `GET /articles`, optionally narrowed by the server to one tag.
    pub async fn list_articles(&self, tag: Option<&str>) -> Result<Vec<Article>, ClientError> {
        let mut request = self.client.get(self.url("/articles"));
        if let Some(tag) = tag {
            request = request.query(&[("tag", tag)]);
        }

        let envelope: ArticlesEnvelope = self.send("GET", "/articles", request).await?;
        Ok(envelope.articles)
    }

    pub async fn get_article(&self, slug: &str) -> Result<Article, ClientError> {
        let url = self.article_url(slug, None)?;
        let path = url.path().to_string();
        let request = self.client.get(url);

        let envelope: ArticleEnvelope = self.send("GET", &path, request).await?;
        Ok(envelope.article)
    }

    pub async fn list_tags(&self) -> Result<Vec<String>, ClientError> {
        let request = self.client.get(self.url("/tags"));

        let envelope: TagsEnvelope = self.send("GET", "/tags", request).await?;
        Ok(envelope.tags)
    }

    /// `POST /users/login`. On success the returned token becomes the active one.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, ClientError> {
        let user = self.authenticate(credentials).await?;
        self.set_token(user.token.clone()).await;
        Ok(user)
    }

    /// `POST /users`. On success the returned token becomes the active one.
    pub async fn register(&self, registration: &RegistrationRequest) -> Result<User, ClientError> {
        let user = self.create_user(registration).await?;
        self.set_token(user.token.clone()).await;
        Ok(user)
    }

    // Login without touching the token; the auth store sets it with the user.
    pub(crate) async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<User, ClientError> {
        let request = self
            .client
            .post(self.url("/users/login"))
            .json(&UserEnvelope { user: credentials });

        let envelope: UserEnvelope<User> = self.send("POST", "/users/login", request).await?;
        Ok(envelope.user)
    }

    pub(crate) async fn create_user(
        &self,
        registration: &RegistrationRequest,
    ) -> Result<User, ClientError> {
        let request = self
            .client
            .post(self.url("/users"))
            .json(&UserEnvelope { user: registration });

        let envelope: UserEnvelope<User> = self.send("POST", "/users", request).await?;
        Ok(envelope.user)
    }

    /// `PUT /user`. Anonymous calls are rejected by the server, not here.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let request = self
            .client
            .put(self.url("/user"))
            .json(&UserEnvelope { user: update });

        let envelope: UserEnvelope<User> = self.send("PUT", "/user", request).await?;
        Ok(envelope.user)
    }

    /// Returns the server's article after the change; use its counts as-is.
    pub async fn favorite_article(&self, slug: &str) -> Result<Article, ClientError> {
        let url = self.article_url(slug, Some("favorite"))?;
        let path = url.path().to_string();
        let request = self.client.post(url);

        let envelope: ArticleEnvelope = self.send("POST", &path, request).await?;
        Ok(envelope.article)
    }

    pub async fn unfavorite_article(&self, slug: &str) -> Result<Article, ClientError> {
        let url = self.article_url(slug, Some("favorite"))?;
        let path = url.path().to_string();
        let request = self.client.delete(url);

        let envelope: ArticleEnvelope = self.send("DELETE", &path, request).await?;
        Ok(envelope.article)
    }
}
