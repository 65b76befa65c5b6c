use super::*;

#[test]
fn store_errors_map_to_statuses() {
    assert_eq!(store_error_to_status(&StoreError::NotFound("x".into())), StatusCode::NOT_FOUND);
    assert_eq!(store_error_to_status(&StoreError::EmptyUpload), StatusCode::BAD_REQUEST);
    let io = StoreError::Io(std::io::Error::other("disk"));
    assert_eq!(store_error_to_status(&io), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn monster_errors_map_to_statuses() {
    assert_eq!(monster_error_to_status(&MonsterError::InvalidSlug("../x".into())), StatusCode::BAD_REQUEST);
    assert_eq!(
        monster_error_to_status(&MonsterError::HttpClientBuild("tls".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn healthz_is_ok() {
    assert_eq!(healthz().await, StatusCode::OK);
}

#[tokio::test]
async fn error_bodies_are_json() {
    let resp = StoreError::NotFound("abc".into()).into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "map not found: abc");
}
