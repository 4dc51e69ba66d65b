use crate::support::{client_for, POSTS, REFRESH};
use cms_client::{
    CallDescriptor, CallResult, CallStatus, CredentialPair, ErrorKind, NormalizedError,
    GENERIC_ERROR_MESSAGE,
};
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_valid_credential_returns_data() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", POSTS)
        .match_header("authorization", "Bearer a1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 1, "title": "x"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server.url(), Some(CredentialPair::new("a1", "r1")));
    let result = client.execute(&CallDescriptor::get(POSTS)).await;

    assert_eq!(result, CallResult::Success(json!({"id": 1, "title": "x"})));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_expired_credential_refresh_and_retry() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", POSTS)
        .match_header("authorization", "Bearer a1")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "Given token not valid for any token type", "code": "token_not_valid"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH)
        .match_body(Matcher::Json(json!({"refresh": "r1"})))
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access": "a2", "refresh": "r2"}"#)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", POSTS)
        .match_header("authorization", "Bearer a2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 1, "title": "x"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server.url(), Some(CredentialPair::new("a1", "r1")));
    let result = client.execute(&CallDescriptor::get(POSTS)).await;

    assert_eq!(result.status(), CallStatus::Success);
    assert_eq!(result.data(), Some(&json!({"id": 1, "title": "x"})));
    assert_eq!(client.store().current(), Some(CredentialPair::new("a2", "r2")));
    rejected.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn test_refresh_rejected_expires_session() {
    for refresh_status in [401, 400] {
        let mut server = Server::new_async().await;
        server
            .mock("GET", POSTS)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Given token not valid for any token type"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH)
            .with_status(refresh_status)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Token is invalid or expired"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url(), Some(CredentialPair::new("a1", "r1")));
        let result = client.execute(&CallDescriptor::get(POSTS)).await;

        assert_eq!(result, CallResult::Failed(NormalizedError::SessionExpired));
        assert_eq!(client.store().current(), None);
        assert!(!client.session().is_authenticated);
        refresh.assert_async().await;
    }
}

#[tokio::test]
async fn test_field_validation_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/auth/register/")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"email": ["Enter a valid email."]}"#)
        .create_async()
        .await;

    let client = client_for(&server.url(), None);
    let descriptor =
        CallDescriptor::post("/api/auth/register/", &json!({"email": "not-an-email"})).unwrap();
    let result = client.execute(&descriptor).await;

    let error = result.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::FieldError);
    assert_eq!(
        error.fields().unwrap().get("email").map(String::as_str),
        Some("Enter a valid email.")
    );
}

#[tokio::test]
async fn test_form_error_from_detail() {
    let mut server = Server::new_async().await;
    server
        .mock("PATCH", "/api/admin/posts/3/")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "Invalid input."}"#)
        .create_async()
        .await;

    let client = client_for(&server.url(), Some(CredentialPair::new("a1", "r1")));
    let descriptor = CallDescriptor::patch("/api/admin/posts/3/", &json!({"title": ""})).unwrap();
    let result = client.execute(&descriptor).await;

    assert_eq!(
        result,
        CallResult::Failed(NormalizedError::form("Invalid input."))
    );
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    // nothing listens on port 1
    let client = client_for("http://127.0.0.1:1", Some(CredentialPair::new("a1", "r1")));
    let result = client.execute(&CallDescriptor::get(POSTS)).await;

    assert_eq!(result.status(), CallStatus::Failed);
    assert_eq!(result.error().map(NormalizedError::kind), Some(ErrorKind::NetworkError));
    assert!(client.session().is_authenticated);
}

#[tokio::test]
async fn test_second_401_is_final() {
    let mut server = Server::new_async().await;
    let resource = server
        .mock("GET", POSTS)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "Given token not valid for any token type"}"#)
        .expect(2)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access": "a2"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server.url(), Some(CredentialPair::new("a1", "r1")));
    let result = client.execute(&CallDescriptor::get(POSTS)).await;

    assert_eq!(result, CallResult::Failed(NormalizedError::SessionExpired));
    assert_eq!(client.store().current(), None);
    resource.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_anonymous_401_is_not_session_expired() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/blog/search/")
        .match_query(Matcher::UrlEncoded("q".into(), "rust".into()))
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "Authentication credentials were not provided."}"#)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH)
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server.url(), None);
    let result = client
        .execute(&CallDescriptor::get("/api/blog/search/?q=rust"))
        .await;

    assert_eq!(
        result,
        CallResult::Failed(NormalizedError::form(
            "Authentication credentials were not provided."
        ))
    );
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_html_error_page_is_generic() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", POSTS)
        .with_status(502)
        .with_header("content-type", "text/html")
        .with_body("<html><body>Bad Gateway</body></html>")
        .create_async()
        .await;

    let client = client_for(&server.url(), None);
    let result = client.execute(&CallDescriptor::get(POSTS)).await;

    assert_eq!(
        result,
        CallResult::Failed(NormalizedError::form(GENERIC_ERROR_MESSAGE))
    );
}

#[tokio::test]
async fn test_no_content_is_success() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/api/admin/posts/3/")
        .with_status(204)
        .create_async()
        .await;

    let client = client_for(&server.url(), Some(CredentialPair::new("a1", "r1")));
    let result = client
        .execute(&CallDescriptor::delete("/api/admin/posts/3/"))
        .await;

    assert_eq!(result, CallResult::Success(serde_json::Value::Null));
}
