//! Shared fixtures for the wiremock-backed integration tests.

#![allow(dead_code)]

use std::time::Duration;

use realworld_client::ClientConfig;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const JAKE_TOKEN: &str = "jwt.jake.token";

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(format!("{}/api", server.uri()))
}

pub fn article_json(slug: &str, tags: &[&str], favorited: bool, favorites_count: u64) -> Value {
    json!({
        "slug": slug,
        "title": format!("Article {}", slug),
        "description": "Ever wonder how?",
        "body": "It takes a Jacobian",
        "tagList": tags,
        "createdAt": "2016-02-18T03:22:56.637Z",
        "updatedAt": "2016-02-18T03:48:35.824Z",
        "favorited": favorited,
        "favoritesCount": favorites_count,
        "author": {
            "username": "jake",
            "bio": "I work at statefarm",
            "image": "https://i.stack.imgur.com/xHWG8.jpg",
            "following": false
        }
    })
}

pub fn articles_body(articles: Vec<Value>) -> Value {
    let count = articles.len();
    json!({ "articles": articles, "articlesCount": count })
}

pub fn user_json(username: &str, token: &str) -> Value {
    json!({
        "user": {
            "email": format!("{}@example.com", username),
            "token": token,
            "username": username,
            "bio": null,
            "image": null
        }
    })
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}
