//! API client against a mock RealWorld server.

mod common;

use common::{article_json, articles_body, config_for, user_json, JAKE_TOKEN};
use realworld_client::models::{LoginCredentials, ProfileUpdate, RegistrationRequest};
use realworld_client::{ApiClient, ClientConfig, ClientError};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn list_articles_passes_tag_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("tag", "dragons"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(articles_body(vec![article_json("a", &["dragons"], false, 0)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));
    let articles = api.list_articles(Some("dragons")).await.unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].slug, "a");
    assert_eq!(articles[0].tag_list, vec!["dragons"]);
}

#[tokio::test]
async fn get_article_and_tags() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/articles/how-to-train-your-dragon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "article": article_json("how-to-train-your-dragon", &[], true, 3) }),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "tags": ["reactjs", "angularjs"] })),
        )
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));

    let article = api.get_article("how-to-train-your-dragon").await.unwrap();
    assert!(article.favorited);
    assert_eq!(article.favorites_count, 3);

    let tags = api.list_tags().await.unwrap();
    assert_eq!(tags, vec!["reactjs", "angularjs"]);
}

#[tokio::test]
async fn login_token_is_attached_to_later_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .and(body_partial_json(json!({
            "user": { "email": "jake@jake.jake", "password": "jakejake" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("jake", JAKE_TOKEN)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/articles/a/favorite"))
        .and(header("Authorization", format!("Token {}", JAKE_TOKEN).as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "article": article_json("a", &[], true, 1) })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));
    assert_eq!(api.token().await, None);

    let user = api
        .login(&LoginCredentials::new("jake@jake.jake", "jakejake"))
        .await
        .unwrap();
    assert_eq!(user.token, JAKE_TOKEN);
    assert_eq!(api.token().await.as_deref(), Some(JAKE_TOKEN));

    let article = api.favorite_article("a").await.unwrap();
    assert!(article.favorited);
}

#[tokio::test]
async fn register_sets_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(user_json("newbie", "jwt.newbie")))
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));
    let user = api
        .register(&RegistrationRequest {
            username: "newbie".into(),
            email: "newbie@example.com".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    assert_eq!(user.username, "newbie");
    assert_eq!(api.token().await.as_deref(), Some("jwt.newbie"));
}

#[tokio::test]
async fn anonymous_requests_carry_no_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(articles_body(vec![])))
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));
    api.list_articles(None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn failed_login_does_not_touch_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "errors": { "email or password": ["is invalid"] } })),
        )
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));
    api.set_token("previous").await;

    let err = api
        .login(&LoginCredentials::new("jake@jake.jake", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(err.to_string(), "email or password is invalid");
    assert_eq!(api.token().await.as_deref(), Some("previous"));
}

#[tokio::test]
async fn unauthorized_profile_update_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));
    let err = api
        .update_profile(&ProfileUpdate {
            bio: Some("hi".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Request failed with status 401");
}

#[tokio::test]
async fn unfavorite_uses_delete_and_server_counts() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/articles/a/favorite"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "article": article_json("a", &[], false, 41) })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));
    let article = api.unfavorite_article("a").await.unwrap();

    assert!(!article.favorited);
    assert_eq!(article.favorites_count, 41);
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let api = ApiClient::new(&ClientConfig::new("http://127.0.0.1:1/api"));

    let err = api.list_tags().await.unwrap_err();
    assert!(err.is_network(), "unexpected error: {:?}", err);
    assert!(err.to_string().starts_with("Network error"));
}

#[tokio::test]
async fn malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));
    let err = api.list_tags().await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn slug_is_percent_encoded_into_one_segment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/articles/what%3Fx=1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "article": article_json("what?x=1", &[], false, 0) })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/articles/a%2Fb/favorite"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "article": article_json("a/b", &[], true, 1) })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&config_for(&server));

    let article = api.get_article("what?x=1").await.unwrap();
    assert_eq!(article.slug, "what?x=1");

    let article = api.favorite_article("a/b").await.unwrap();
    assert_eq!(article.slug, "a/b");
    assert!(article.favorited);
}
