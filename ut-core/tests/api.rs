use mockito::Matcher;
use serde_json::json;
use ut_core::{
    ErrorCode, FileUploadData, HttpUploadApi, PrepareUploadRequest, UploadApi, UtConfig,
    UPLOADTHING_VERSION,
};

fn request() -> PrepareUploadRequest {
    PrepareUploadRequest {
        files: vec![FileUploadData {
            name: "me.png".to_string(),
            size: 1000,
            file_type: "image/png".to_string(),
            custom_id: None,
        }],
        route_config: json!({ "image": { "maxFileSize": "4MB", "maxFileCount": 1, "minFileCount": 1 } }),
        metadata: json!({ "userId": "u_1" }),
        callback_url: "https://my.app/api/uploadthing".to_string(),
        callback_slug: "avatar".to_string(),
    }
}

#[tokio::test]
async fn prepare_upload_sends_credentials_and_camel_case_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v6/prepareUpload")
        .match_header("x-uploadthing-api-key", "sk_live_123")
        .match_header("x-uploadthing-version", UPLOADTHING_VERSION)
        .match_header("x-uploadthing-be-adapter", "test")
        .match_body(Matcher::PartialJson(json!({
            "callbackUrl": "https://my.app/api/uploadthing",
            "callbackSlug": "avatar",
            "metadata": { "userId": "u_1" }
        })))
        .with_status(200)
        .with_body(json!([{ "key": "k1", "url": "https://ingest.test/k1", "name": "me.png" }]).to_string())
        .create_async()
        .await;

    let api = HttpUploadApi::new("sk_live_123", format!("{}/", server.url()), "test");
    let presigned = api.prepare_upload(request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(presigned.len(), 1);
    assert_eq!(presigned[0].key, "k1");
}

#[tokio::test]
async fn api_failures_are_classified_by_status() {
    let cases = [
        (400, ErrorCode::BadRequest),
        (403, ErrorCode::Forbidden),
        (404, ErrorCode::NotFound),
        (413, ErrorCode::FileLimitExceeded),
        (502, ErrorCode::UrlGenerationFailed),
    ];

    for (status, code) in cases {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v6/prepareUpload")
            .with_status(status)
            .with_body(json!({ "error": "nope" }).to_string())
            .create_async()
            .await;

        let api = HttpUploadApi::new("sk", server.url(), "test");
        let err = api.prepare_upload(request()).await.unwrap_err();
        assert_eq!(err.code, code, "status {status}");
        assert_eq!(err.message, "nope");
    }
}

#[tokio::test]
async fn report_failure_accepts_empty_bodies() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v6/failureCallback")
        .match_body(Matcher::Json(json!({ "fileKey": "k1" })))
        .with_status(200)
        .create_async()
        .await;

    let api = HttpUploadApi::new("sk", server.url(), "test");
    api.report_failure("k1").await.unwrap();
    mock.assert_async().await;
}

#[test]
fn from_config_requires_a_secret() {
    let err = HttpUploadApi::from_config(&UtConfig::new().snapshot(), "test").unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingEnv);

    let api = HttpUploadApi::from_config(
        &UtConfig::new()
            .with("secret", "sk")
            .with("api.url", "https://api.example.com/")
            .snapshot(),
        "test",
    )
    .unwrap();
    assert_eq!(api.base_url(), "https://api.example.com");
}
