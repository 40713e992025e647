use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::S3Config;

/// Handle of an uploaded image: the store-side id used for deletion plus the
/// public URL persisted alongside the owning record.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, body: Bytes, content_type: &str) -> anyhow::Result<StoredImage>;
    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

/// Only JPEG and PNG are accepted for avatars and product photos.
pub fn is_allowed_image(content_type: &str) -> bool {
    content_type.starts_with("image/jpeg") || content_type.starts_with("image/png")
}

pub const MAX_IMAGE_BYTES: usize = 3 * 1024 * 1024;

fn extension_for(content_type: &str) -> &'static str {
    if content_type.starts_with("image/png") {
        "png"
    } else {
        "jpg"
    }
}

/// S3-compatible image store (MinIO in development).
#[derive(Clone)]
pub struct S3ImageStore {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3ImageStore {
    pub async fn new(config: &S3Config) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(&self, body: Bytes, content_type: &str) -> anyhow::Result<StoredImage> {
        let key = format!("{}.{}", Uuid::new_v4(), extension_for(content_type));
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        let url = format!("{}/{}/{}", self.public_url, self.bucket, key);
        Ok(StoredImage { id: key, url })
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_jpeg_and_png() {
        assert!(is_allowed_image("image/jpeg"));
        assert!(is_allowed_image("image/png"));
        assert!(!is_allowed_image("image/gif"));
        assert!(!is_allowed_image("application/pdf"));
    }

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
    }
}
