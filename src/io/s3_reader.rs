use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::Client;
use bytes::Bytes;
use url::Url;

use super::range_reader::check_range;
use super::RangeReader;
use crate::error::IoError;

/// Bucket and key of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    /// Parse an `s3://bucket/key` URL.
    pub fn from_url(url: &Url) -> Result<Self, IoError> {
        if url.scheme() != "s3" {
            return Err(IoError::S3(format!("not an s3:// URL: {}", url)));
        }
        let bucket = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(IoError::S3(format!("missing bucket in {}", url))),
        };
        let key = url.path().trim_start_matches('/');
        if key.is_empty() {
            return Err(IoError::S3(format!("missing object key in {}", url)));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// [`RangeReader`] over an S3 object.
///
/// One ranged GET per read. Directory decoding issues many small reads, so
/// this is normally wrapped in a [`BlockCache`](super::BlockCache).
#[derive(Clone)]
pub struct S3RangeReader {
    client: Client,
    object: ObjectRef,
    size: u64,
    identifier: String,
}

impl S3RangeReader {
    /// Look up the object size with a HEAD request.
    pub async fn open(client: Client, object: ObjectRef) -> Result<Self, IoError> {
        let identifier = object.to_string();

        let size = client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| classify_head_error(e, &identifier))?
            .content_length()
            .map_or(0, |len| len.max(0) as u64);

        Ok(Self {
            client,
            object,
            size,
            identifier,
        })
    }

    pub async fn from_url(client: Client, url: &Url) -> Result<Self, IoError> {
        Self::open(client, ObjectRef::from_url(url)?).await
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    async fn fetch(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.object.bucket)
            .key(&self.object.key)
            .range(http_range(offset, len))
            .send()
            .await
            .map_err(|e| IoError::S3(format!("{}: {}", self.identifier, e)))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;
        Ok(body.into_bytes())
    }
}

/// Inclusive HTTP byte range for `len > 0` bytes at `offset`.
fn http_range(offset: u64, len: usize) -> String {
    format!("bytes={}-{}", offset, offset + len as u64 - 1)
}

fn classify_head_error<R>(err: SdkError<HeadObjectError, R>, identifier: &str) -> IoError
where
    R: std::fmt::Debug,
{
    match err.as_service_error() {
        Some(service) if service.is_not_found() => IoError::NotFound(identifier.to_string()),
        _ => IoError::S3(format!("{}: {}", identifier, err)),
    }
}

#[async_trait]
impl RangeReader for S3RangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;
        if len == 0 {
            return Ok(Bytes::new());
        }

        let data = self.fetch(offset, len).await?;
        // A short body means the object shrank after HEAD
        if data.len() != len {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }
        Ok(data)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Build an S3 client for `region`.
///
/// Passing an endpoint targets an S3-compatible service such as MinIO and
/// turns on path-style addressing.
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));
    if let Some(endpoint) = endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    Client::from_conf(
        aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(endpoint_url.is_some())
            .build(),
    )
}
