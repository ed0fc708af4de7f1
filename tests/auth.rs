pub mod common;

use reqwest::StatusCode;

#[tokio::test]
async fn retrieves_admin_access_token() {
    let base = common::spawn().await;
    let client = common::Client::new(&base).auth("admin", "admin123").await;
    assert!(client.auth_token.is_some());
}

#[tokio::test]
async fn rejects_wrong_admin_password() {
    let base = common::spawn().await;
    let status = common::Client::new(&base)
        .try_auth("admin", "wrong")
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn assignee_signs_in_with_any_password() {
    let base = common::spawn().await;
    let client = common::Client::new(&base).auth("jdoe", "anything").await;
    assert!(client.auth_token.is_some());
}

#[tokio::test]
async fn rejects_unknown_and_closed_only_names() {
    let base = common::spawn().await;
    for login in ["nobody", "retired", "OldCo"] {
        let status = common::Client::new(&base)
            .try_auth(login, "password")
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN, "{login}");
    }
}

#[tokio::test]
async fn no_one_signs_in_when_tickets_are_unavailable() {
    let base = common::spawn_with(locate_desk::store::StaticSource::new(
        "garbage", "garbage",
    ))
    .await;

    let status = common::Client::new(&base)
        .try_auth("jdoe", "anything")
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let client = common::Client::new(&base).auth("admin", "admin123").await;
    assert!(client.auth_token.is_some());
}
