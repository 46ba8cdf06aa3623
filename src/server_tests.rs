use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use super::*;

/// Directory with eight P-521 keys: two advertised signing, two advertised
/// exchange, and dot-file (hidden) variants of both kinds.
const FIXTURE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/keys");

const ADV_SIGN_THP: &str = "gBfy4H9saMo_gNPHa3likYI35B3qpQF6T9hx2STv9AM";
const ADV_SIGN_THP_SHA1: &str = "RYjQm8m2w66RxQKhDiNEcqfHRz4";
const HIDDEN_SIGN_THP: &str = "1Cs1leoS1bY1DdjTvCfL4uSyoUYhb0WUvmlULq3qGo8";
const ADV_EXC_THP: &str = "qk2zqOUpYc8O4-9lGl2fo-G13rvFMgQfIeAOznSW2kE";
const HIDDEN_EXC_THP: &str = "sPcEkkfupkOgLNQKI-BbrTyVCCFnMRI3atpwHKNM6OY";

/// A blinded client point for the `qk2z...` exchange key, with the exact
/// bytes its recovery must produce.
const ECMR_CLIENT: &str = r#"{"alg":"ECMR","crv":"P-521","kty":"EC","x":"AF7RviLGsmFmC0RFjYPFXVPoWAnb2q2kuypuENrWhEsQRAcdkybO3ZUAWnEBg5xEnMZsORY5QFUXlDDjIckMJbv3","y":"AL0AvCk-VR3FWbNCv-w9by852QT25W3lArz_0MvtkbHAd5YpD5SMmvc7F3VbTeTQ6GdoVa_e_QvhaRo_VFWG1bwm"}"#;
const ECMR_EXPECTED: &str = r#"{"alg":"ECMR","crv":"P-521","key_ops":["deriveKey"],"kty":"EC","x":"AIeSQU4k-MgGlxEkA9B8QxYKf-AX7_M8zuSfWNYk5hb71oeR6qQAmSSFSpAyGnVKqpQW4JGX3_LmEWUqoB3neVO0","y":"ARLnlRkm260cXJqhOf8N6AP3rwnf3sDJHWfYMyBdRT6ud1FxlOMLOmrxdSb1zDZxfxZ7pv08A9r2aCqKtfjUa2Nt"}"#;

fn fixture_router() -> (Router, Arc<KeySet>) {
    let keys = Arc::new(KeySet::load(FIXTURE_DIR).unwrap());
    (router(keys.clone()), keys)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_owned());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn test_default_advertisement() {
    let (router, keys) = fixture_router();
    let (status, content_type, body) = send(router, get("/adv")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/jose+json"));
    assert_eq!(body, keys.default_advertisement());
}

#[tokio::test]
async fn test_default_advertisement_trailing_slash() {
    let (router, keys) = fixture_router();
    let (status, _, body) = send(router, get("/adv/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, keys.default_advertisement());
}

#[tokio::test]
async fn test_advertised_signing_key_serves_default() {
    let (router, keys) = fixture_router();
    let (status, _, body) = send(router, get(&format!("/adv/{ADV_SIGN_THP}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, keys.default_advertisement());
}

#[tokio::test]
async fn test_lookup_works_under_every_hash() {
    let (router, keys) = fixture_router();
    let (status, _, body) = send(router, get(&format!("/adv/{ADV_SIGN_THP_SHA1}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, keys.default_advertisement());
}

#[tokio::test]
async fn test_hidden_signing_key_advertisement() {
    let (router, keys) = fixture_router();
    let (status, content_type, body) = send(router, get(&format!("/adv/{HIDDEN_SIGN_THP}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/jose+json"));
    assert_ne!(body.as_slice(), keys.default_advertisement());

    // both advertised signers plus the hidden one
    let adv: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(adv["signatures"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_exchange_keys_are_not_advertised() {
    let (router, _) = fixture_router();
    for thp in [ADV_EXC_THP, HIDDEN_EXC_THP] {
        let (status, _, body) = send(router.clone(), get(&format!("/adv/{thp}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn test_unknown_thumbprint() {
    let (router, _) = fixture_router();
    let (status, _, body) = send(router, get("/adv/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_recover() {
    let (router, _) = fixture_router();
    let (status, content_type, body) =
        send(router, post(&format!("/rec/{ADV_EXC_THP}"), ECMR_CLIENT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/jwk+json"));
    assert_eq!(body, ECMR_EXPECTED.as_bytes());
}

#[tokio::test]
async fn test_recover_hidden_exchange_key() {
    // hidden exchange keys still perform recovery, they are only missing
    // from the advertisement
    let (router, keys) = fixture_router();
    let client: josekit::jwk::Jwk = serde_json::from_str(ECMR_CLIENT).unwrap();
    assert!(keys.recover_key(HIDDEN_EXC_THP, &client).is_ok());
    let (status, _, _) = send(
        router,
        post(&format!("/rec/{HIDDEN_EXC_THP}"), ECMR_CLIENT),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_recover_unknown_key() {
    let (router, _) = fixture_router();
    let (status, _, body) = send(router, post("/rec/does-not-exist", ECMR_CLIENT)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_recover_signing_key_is_not_found() {
    let (router, _) = fixture_router();
    let (status, _, _) = send(router, post(&format!("/rec/{ADV_SIGN_THP}"), ECMR_CLIENT)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recover_body_limit() {
    let (router, _) = fixture_router();

    let oversized = vec![b'x'; MAX_RECOVERY_BODY + 1];
    let (status, _, _) = send(router.clone(), post("/rec/anything", oversized)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    // exactly at the limit the body is read and fails as garbage instead
    let at_limit = vec![b'x'; MAX_RECOVERY_BODY];
    let (status, _, _) = send(router, post("/rec/anything", at_limit)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recover_bad_algorithm_does_not_leak_key_existence() {
    let (router, _) = fixture_router();
    let client = ECMR_CLIENT.replace("ECMR", "ES512");

    let (status, _, _) = send(
        router.clone(),
        post(&format!("/rec/{ADV_EXC_THP}"), client.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(router, post("/rec/does-not-exist", client)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recover_malformed_body() {
    let (router, _) = fixture_router();
    let (status, _, _) = send(router, post(&format!("/rec/{ADV_EXC_THP}"), "{oops")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_routes_and_methods() {
    let (router, _) = fixture_router();

    let (status, _, _) = send(router.clone(), get("/something-else")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(router.clone(), post("/adv", "")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(router, get(&format!("/rec/{ADV_EXC_THP}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
