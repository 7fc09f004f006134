use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use ut_core::fetch::{create_route_handler, create_uploadthing, FetchArgs};
use ut_core::{
    sign_payload, CreateBuilderOptions, FileRouter, PrepareUploadRequest, PresignedUpload,
    RouteConfig, RouteHandlerOptions, RouteLimits, UploadApi, UploadError, UtConfig, UtResult,
};

const SECRET: &str = "sk_test_dispatch";

/// Records what the protocol sends to UploadThing.
#[derive(Default)]
struct FakeApi {
    prepared: Mutex<Vec<PrepareUploadRequest>>,
    failures: Mutex<Vec<String>>,
}

#[async_trait]
impl UploadApi for FakeApi {
    async fn prepare_upload(&self, request: PrepareUploadRequest) -> UtResult<Vec<PresignedUpload>> {
        let presigned = request
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| PresignedUpload {
                key: format!("key_{i}"),
                url: format!("https://fake.ingest/{i}"),
                name: f.name.clone(),
                custom_id: f.custom_id.clone(),
            })
            .collect();
        self.prepared.lock().unwrap().push(request);
        Ok(presigned)
    }

    async fn report_failure(&self, file_key: &str) -> UtResult<()> {
        self.failures.lock().unwrap().push(file_key.to_string());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct AlbumInput {
    #[validate(length(min = 1))]
    album: String,
}

struct Fixture {
    api: Arc<FakeApi>,
    completed: Arc<AtomicUsize>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            api: Arc::new(FakeApi::default()),
            completed: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn router(&self) -> FileRouter<FetchArgs> {
        let f = create_uploadthing(None);
        let strict = create_uploadthing(Some(CreateBuilderOptions::new().error_formatter(|err| {
            Some(json!({ "hint": format!("check your {}", err.code.as_str().to_lowercase()) }))
        })));

        let completed = Arc::clone(&self.completed);
        let avatar = f
            .route(RouteConfig::new().image(RouteLimits::new().max_file_size("1MB")))
            .middleware(|args| async move {
                let user = args
                    .adapter
                    .req
                    .header("x-user-id")
                    .ok_or_else(|| UploadError::forbidden("Sign in first").into_anyhow())?
                    .to_string();
                Ok(json!({ "userId": user }))
            })
            .on_upload_complete(move |args| {
                let completed = Arc::clone(&completed);
                async move {
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({ "uploadedBy": args.metadata["userId"], "key": args.file.key }))
                }
            });

        let completed = Arc::clone(&self.completed);
        let broken = f
            .route(RouteConfig::new().blob(RouteLimits::new()))
            .middleware(|_args| async move {
                Err::<Value, _>(anyhow::anyhow!("database is down"))
            })
            .on_upload_complete(move |_args| {
                let completed = Arc::clone(&completed);
                async move {
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });

        let album = f
            .route(RouteConfig::new().image(RouteLimits::new().max_file_count(4).min_file_count(2)))
            .input::<AlbumInput>()
            .middleware(|args| async move {
                let input: AlbumInput = args.input_as()?;
                Ok(ut_core::Metadata::new(json!({ "album": input.album })).with_custom_id(0, "cover"))
            })
            .on_upload_complete(|_args| async move { Ok(()) });

        let strict_route = strict
            .route(RouteConfig::new().pdf(RouteLimits::new()))
            .on_upload_complete(|_args| async move { Ok(()) });

        FileRouter::builder()
            .route("avatar", avatar)
            .route("broken", broken)
            .route("album", album)
            .route("strict", strict_route)
            .build()
            .unwrap()
    }

    fn handler(
        &self,
    ) -> impl Fn(http::Request<Bytes>) -> futures::future::BoxFuture<'static, http::Response<Bytes>> {
        let errors = Arc::clone(&self.errors);
        let api: Arc<dyn UploadApi> = self.api.clone();
        create_route_handler(
            RouteHandlerOptions::new(self.router())
                .config(UtConfig::new().with("secret", SECRET).with("url", "https://my.app/api/uploadthing"))
                .api(api)
                .on_upload_error(move |args| {
                    let errors = Arc::clone(&errors);
                    async move {
                        errors.lock().unwrap().push(format!("{}:{}", args.slug, args.file_key));
                        Ok(())
                    }
                }),
        )
        .unwrap()
    }
}

fn post(uri: &str, body: Value) -> http::Request<Bytes> {
    http::Request::post(uri)
        .header("content-type", "application/json")
        .header("x-user-id", "u_42")
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

fn webhook(body: &Value, signature: &str) -> http::Request<Bytes> {
    http::Request::post("/api/uploadthing")
        .header("uploadthing-hook", "callback")
        .header("x-uploadthing-signature", signature)
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

async fn json_of(res: http::Response<Bytes>) -> (http::StatusCode, Value) {
    let status = res.status();
    (status, serde_json::from_slice(res.body()).unwrap())
}

fn image(name: &str, size: u64) -> Value {
    json!({ "name": name, "size": size, "type": "image/png" })
}

#[tokio::test]
async fn get_lists_every_route() {
    let fx = Fixture::new();
    let handler = fx.handler();

    let (status, body) = json_of(
        handler(http::Request::get("/api/uploadthing").body(Bytes::new()).unwrap()).await,
    )
    .await;

    assert_eq!(status, 200);
    let slugs: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["album", "avatar", "broken", "strict"]);
    assert_eq!(body["data"][1]["config"]["image"]["maxFileSize"], "1MB");
}

#[tokio::test]
async fn upload_returns_presigned_urls_and_forwards_metadata() {
    let fx = Fixture::new();
    let handler = fx.handler();

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=upload&slug=avatar",
            json!({ "files": [image("me.png", 1000)], "input": null }),
        ))
        .await,
    )
    .await;

    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"][0]["key"], "key_0");
    assert_eq!(body["data"][0]["url"], "https://fake.ingest/0");

    let prepared = fx.api.prepared.lock().unwrap();
    assert_eq!(prepared.len(), 1);
    assert_eq!(prepared[0].metadata, json!({ "userId": "u_42" }));
    assert_eq!(prepared[0].callback_slug, "avatar");
    assert_eq!(prepared[0].callback_url, "https://my.app/api/uploadthing");
}

#[tokio::test]
async fn unknown_action_is_rejected_for_every_route() {
    let fx = Fixture::new();
    let handler = fx.handler();

    for slug in ["avatar", "broken", "album", "strict"] {
        let (status, body) = json_of(
            handler(post(
                &format!("/api/uploadthing?actionType=explode&slug={slug}"),
                json!({}),
            ))
            .await,
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
    assert!(fx.api.prepared.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_route_is_a_bad_request() {
    let fx = Fixture::new();
    let handler = fx.handler();

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=upload&slug=nope",
            json!({ "files": [image("a.png", 1)] }),
        ))
        .await,
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn middleware_failure_is_500_and_nothing_completes() {
    let fx = Fixture::new();
    let handler = fx.handler();

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=upload&slug=broken",
            json!({ "files": [{ "name": "a.bin", "size": 10, "type": "application/octet-stream" }] }),
        ))
        .await,
    )
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
    assert!(!body.to_string().contains("database is down"));
    assert!(fx.api.prepared.lock().unwrap().is_empty());
    assert_eq!(fx.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn middleware_upload_errors_keep_their_code() {
    let fx = Fixture::new();
    let handler = fx.handler();

    let req = http::Request::post("/api/uploadthing?actionType=upload&slug=avatar")
        .body(Bytes::from(json!({ "files": [image("a.png", 1)] }).to_string()))
        .unwrap();
    let (status, body) = json_of(handler(req).await).await;

    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    assert_eq!(body["error"]["message"], "Sign in first");
}

#[tokio::test]
async fn metadata_survives_a_handler_restart() {
    let fx = Fixture::new();
    let (status, _) = json_of(
        fx.handler()(post(
            "/api/uploadthing?actionType=upload&slug=avatar",
            json!({ "files": [image("me.png", 1000)] }),
        ))
        .await,
    )
    .await;
    assert_eq!(status, 200);

    let metadata = fx.api.prepared.lock().unwrap()[0].metadata.clone();

    // A fresh handler instance, as if the webhook hit another process.
    let other = Fixture::new();
    let webhook_body = json!({
        "status": "uploaded",
        "slug": "avatar",
        "metadata": metadata,
        "file": {
            "key": "key_0",
            "name": "me.png",
            "size": 1000,
            "type": "image/png",
            "ufsUrl": "https://app.ufs.sh/f/key_0"
        }
    });
    let signature = sign_payload(webhook_body.to_string().as_bytes(), SECRET).unwrap();
    let (status, body) = json_of(other.handler()(webhook(&webhook_body, &signature)).await).await;

    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"], json!({ "uploadedBy": "u_42", "key": "key_0" }));
    assert_eq!(other.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn webhooks_with_bad_signatures_are_rejected() {
    let fx = Fixture::new();
    let handler = fx.handler();
    let body = json!({
        "status": "uploaded",
        "slug": "avatar",
        "metadata": { "userId": "attacker" },
        "file": { "key": "k", "name": "x.png", "size": 1 }
    });

    let forged = sign_payload(body.to_string().as_bytes(), "sk_wrong").unwrap();
    let (status, res) = json_of(handler(webhook(&body, &forged)).await).await;
    assert_eq!(status, 400);
    assert_eq!(res["error"]["message"], "Invalid signature");

    let (status, _) = json_of(handler(webhook(&body, "")).await).await;
    assert_eq!(status, 400);
    assert_eq!(fx.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn webhooks_with_an_unknown_status_are_rejected() {
    let fx = Fixture::new();
    let body = json!({
        "status": "failed",
        "slug": "avatar",
        "metadata": { "userId": "u_42" },
        "file": { "key": "k", "name": "x.png", "size": 1, "type": "image/png" }
    });

    let signature = sign_payload(body.to_string().as_bytes(), SECRET).unwrap();
    let (status, res) = json_of(fx.handler()(webhook(&body, &signature)).await).await;

    assert_eq!(status, 400);
    assert_eq!(res["error"]["code"], "BAD_REQUEST");
    assert!(res["error"]["message"].as_str().unwrap().contains("\"failed\""));
    assert_eq!(fx.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn file_limits_are_enforced_after_middleware() {
    let fx = Fixture::new();
    let handler = fx.handler();

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=upload&slug=avatar",
            json!({ "files": [image("huge.png", 2 * 1024 * 1024)] }),
        ))
        .await,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "FILE_LIMIT_EXCEEDED");

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=upload&slug=avatar",
            json!({ "files": [{ "name": "a.mp4", "size": 10, "type": "video/mp4" }] }),
        ))
        .await,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "FILE_LIMIT_EXCEEDED");
    assert!(fx.api.prepared.lock().unwrap().is_empty());
}

#[tokio::test]
async fn input_is_validated_and_custom_ids_applied() {
    let fx = Fixture::new();
    let handler = fx.handler();
    let files = json!([image("cover.png", 10), image("back.png", 10)]);

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=upload&slug=album",
            json!({ "files": files, "input": { "album": "" } }),
        ))
        .await,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "Invalid input");
    assert!(body["error"]["data"]["album"].is_array());

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=upload&slug=album",
            json!({ "files": files, "input": { "album": "summer" } }),
        ))
        .await,
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"][0]["customId"], "cover");

    let prepared = fx.api.prepared.lock().unwrap();
    assert_eq!(prepared[0].files[0].custom_id.as_deref(), Some("cover"));
    assert_eq!(prepared[0].files[1].custom_id, None);
    assert_eq!(prepared[0].metadata["album"], "summer");
}

#[tokio::test]
async fn failure_action_reports_and_runs_the_error_hook() {
    let fx = Fixture::new();
    let handler = fx.handler();

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=failure&slug=avatar",
            json!({ "fileKey": "key_7" }),
        ))
        .await,
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["data"], Value::Null);
    assert_eq!(*fx.api.failures.lock().unwrap(), vec!["key_7".to_string()]);
    assert_eq!(*fx.errors.lock().unwrap(), vec!["avatar:key_7".to_string()]);
}

#[tokio::test]
async fn error_formatter_shapes_error_data() {
    let fx = Fixture::new();
    let handler = fx.handler();

    let (status, body) = json_of(
        handler(post(
            "/api/uploadthing?actionType=upload&slug=strict",
            json!({ "files": [image("not-a-pdf.png", 1)] }),
        ))
        .await,
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "FILE_LIMIT_EXCEEDED");
    assert_eq!(body["error"]["data"]["hint"], "check your file_limit_exceeded");
}
