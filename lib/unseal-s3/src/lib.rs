use bytes::Bytes;
use futures::stream;
use log::{debug, error};
use unseal_storage::{
    ByteStream, Error as StorageError, Key, ObjectInfo, Result as StorageResult,
};

use rusoto_core::{
    credential::StaticProvider,
    request::{HttpClient, TlsError},
    Region, RusotoError,
};
use rusoto_s3::{
    DeleteObjectError, DeleteObjectRequest, GetObjectError, GetObjectRequest,
    ListObjectsV2Error, ListObjectsV2Request, Object as S3Object, S3Client, S3,
};

use async_trait::async_trait;

pub struct Store {
    bucket: String,
    s3: S3Client,
}

/// Static access key pair. Without one the default AWS provider chain
/// (environment, profile, instance role) is used.
pub struct Credentials {
    pub key_id: String,
    pub secret: String,
}

impl Store {
    pub fn new(
        bucket: &str,
        credentials: Option<Credentials>,
        region: Region,
    ) -> Result<Store, TlsError> {
        let client = match credentials {
            Some(c) => {
                let creds = StaticProvider::new(c.key_id, c.secret, None, None);
                let dispatcher = HttpClient::new()?;
                S3Client::new_with(dispatcher, creds, region)
            }
            None => S3Client::new(region),
        };

        Ok(Store {
            bucket: bucket.to_string(),
            s3: client,
        })
    }
}

fn translate_err<E: std::fmt::Debug>(err: RusotoError<E>) -> StorageError {
    match err {
        RusotoError::HttpDispatch(e) => {
            error!("Request failed: {}", e);
            StorageError::NetworkError
        }
        RusotoError::Credentials(e) => {
            error!("Credentials rejected: {}", e);
            StorageError::AccessDenied
        }
        RusotoError::Unknown(ref r) if r.status.as_u16() == 403 => StorageError::AccessDenied,
        _ => {
            error!("Unexpected error: {:?}", err);
            StorageError::UnknownError
        }
    }
}

fn translate_list_objects_err(err: RusotoError<ListObjectsV2Error>) -> StorageError {
    use ListObjectsV2Error::NoSuchBucket;
    use RusotoError::Service;

    match err {
        Service(NoSuchBucket(_)) => StorageError::NoSuchObject,
        e => translate_err(e),
    }
}

fn translate_get_object_err(err: RusotoError<GetObjectError>) -> StorageError {
    use GetObjectError::NoSuchKey;
    use RusotoError::Service;

    match err {
        Service(NoSuchKey(_)) => StorageError::NoSuchObject,
        e => translate_err(e),
    }
}

fn translate_delete_object_err(err: RusotoError<DeleteObjectError>) -> StorageError {
    translate_err(err)
}

#[async_trait]
impl unseal_storage::Store for Store {
    async fn list_contents(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        debug!("Fetching listing for {:?}", prefix);
        fn object_from_content(obj: S3Object) -> ObjectInfo {
            ObjectInfo {
                key: Key::from(obj.key.unwrap_or_default()),
                size: obj.size.unwrap_or(0),
            }
        }

        let mut result = vec![];
        let mut continuation_token = None;
        loop {
            let req = ListObjectsV2Request {
                bucket: self.bucket.clone(),
                continuation_token,
                prefix: Some(prefix.to_string()),
                ..ListObjectsV2Request::default()
            };

            let response = self
                .s3
                .list_objects_v2(req)
                .await
                .map_err(translate_list_objects_err)?;

            if let Some(objects) = response.contents {
                result.extend(objects.into_iter().map(object_from_content));
            }

            if !response.is_truncated.unwrap_or(false) {
                break;
            }

            continuation_token = response.next_continuation_token;
        }

        Ok(result)
    }

    async fn get(&self, key: &Key) -> StorageResult<ByteStream> {
        let req = GetObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            ..GetObjectRequest::default()
        };

        let response = self
            .s3
            .get_object(req)
            .await
            .map_err(translate_get_object_err)?;

        match response.body {
            Some(body) => Ok(Box::pin(body)),
            None => Ok(Box::pin(stream::empty::<std::io::Result<Bytes>>())),
        }
    }

    async fn delete(&self, key: &Key) -> StorageResult<()> {
        let req = DeleteObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            ..DeleteObjectRequest::default()
        };

        self.s3
            .delete_object(req)
            .await
            .map(|_| ())
            .map_err(translate_delete_object_err)
    }
}
