use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

// ==================== Модели статей ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub following: bool,
}

/// A single article. `slug` is its identity and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(default)]
    pub tag_list: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub favorited: bool,
    #[serde(default)]
    pub favorites_count: u64,
    pub author: Profile,
}

impl Article {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_list.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Self { name }
    }
}

// ==================== Модели пользователей ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub token: String,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if is_blank(&self.email) || is_blank(&self.password) {
            return Err(ClientError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        if is_blank(&self.username) || is_blank(&self.email) || is_blank(&self.password) {
            return Err(ClientError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial user for `PUT /user`. Fields left as `None` are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.bio.is_none()
            && self.image.is_none()
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.is_empty() {
            return Err(ClientError::Validation("Nothing to update".to_string()));
        }
        if self.username.as_deref().is_some_and(is_blank)
            || self.email.as_deref().is_some_and(is_blank)
        {
            return Err(ClientError::Validation(
                "Username and email are required".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ==================== Конверты ответов ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleEnvelope {
    pub article: Article,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesEnvelope {
    pub articles: Vec<Article>,
    #[serde(default)]
    pub articles_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsEnvelope {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}
