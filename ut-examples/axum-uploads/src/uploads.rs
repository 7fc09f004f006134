use serde::{Deserialize, Serialize};
use serde_json::json;
use ut_axum::{create_uploadthing, AxumArgs};
use ut_core::{FileRouter, Metadata, RouteConfig, RouteLimits, UploadError, UtResult};
use validator::Validate;

/// Client-supplied input of the `document` route.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DocumentInput {
    #[validate(length(min = 1, max = 120))]
    pub folder: String,
}

/// Stand-in for real auth: the caller's id comes from `x-user-id`.
fn user_id(args: &AxumArgs) -> anyhow::Result<String> {
    args.headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| UploadError::forbidden("Missing x-user-id header").into_anyhow())
}

pub fn file_router() -> UtResult<FileRouter<AxumArgs>> {
    let f = create_uploadthing(None);

    let image = f
        .route(
            RouteConfig::new()
                .image(RouteLimits::new().max_file_size("4MB").max_file_count(4)),
        )
        .middleware(|args| async move {
            let user = user_id(&args.adapter)?;
            Ok(json!({ "userId": user }))
        })
        .on_upload_complete(|args| async move {
            tracing::info!(user = %args.metadata["userId"], url = %args.file.ufs_url, "image stored");
            Ok(json!({ "uploadedBy": args.metadata["userId"] }))
        });

    let document = f
        .route(
            RouteConfig::new()
                .pdf(RouteLimits::new().max_file_size("16MB"))
                .text(RouteLimits::new().max_file_size("1MB").max_file_count(3)),
        )
        .input::<DocumentInput>()
        .middleware(|args| async move {
            let user = user_id(&args.adapter)?;
            let input: DocumentInput = args.input_as()?;
            if input.folder.contains("..") {
                ut_core::bail_ut!(bad_request, "Folder {:?} is not allowed", input.folder);
            }
            Ok(Metadata::new(json!({ "userId": user, "folder": input.folder })))
        })
        .on_upload_complete(|args| async move {
            tracing::info!(folder = %args.metadata["folder"], key = %args.file.key, "document stored");
            Ok(())
        });

    FileRouter::builder()
        .route("imageUploader", image)
        .route("documentUploader", document)
        .build()
}
