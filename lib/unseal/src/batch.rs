use std::{io, sync::Arc};

use log::{error, info, warn};
use tokio::fs;

use crate::{
    crypto::PrivateKey,
    decode::{decode_to_dir, OutputOptions, Report},
    names,
    storage::{Key, ObjectInfo, Store},
    DecodeError,
};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Only objects under this prefix are decoded.
    pub prefix: String,

    /// Remove an object from the store once it has been decoded and
    /// verified.
    pub delete_on_success: bool,

    pub output: OutputOptions,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub verified: Vec<Key>,
    pub failed: Vec<(Key, DecodeError)>,
    pub skipped: Vec<Key>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Decodes every sealed object in a store, one at a time. A failed object
/// is rolled back and recorded; it never stops the rest of the batch.
pub struct Batch {
    store: Arc<dyn Store>,
    key: Arc<PrivateKey>,
    options: BatchOptions,
}

impl Batch {
    pub fn new(store: Arc<dyn Store>, key: Arc<PrivateKey>, options: BatchOptions) -> Batch {
        Batch {
            store,
            key,
            options,
        }
    }

    /// Only a failure to list the store is fatal.
    pub async fn run(&self) -> Result<BatchReport, DecodeError> {
        let objects = self.store.list_contents(&self.options.prefix).await?;

        let mut report = BatchReport::default();
        let mut pending = Vec::with_capacity(objects.len());
        for obj in objects {
            if self.should_decode(&obj).await {
                pending.push(obj.key);
            } else {
                report.skipped.push(obj.key);
            }
        }

        info!("Found {} uploads to process", pending.len());

        for key in pending {
            match self.decode_one(&key).await {
                Ok(r) => {
                    info!(" Finished {} ({} file(s), digest {})", key, r.outputs, r.verified.digest_hex());
                    if self.options.delete_on_success {
                        self.delete(&key).await;
                    }
                    report.verified.push(key);
                }
                Err(e) => {
                    error!(" Giving up on {}: {}", key, e);
                    report.failed.push((key, e));
                }
            }
        }

        info!(
            "FINISHED: {} verified, {} failed, {} skipped",
            report.verified.len(),
            report.failed.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    async fn should_decode(&self, obj: &ObjectInfo) -> bool {
        if obj.key.as_str().ends_with('/') {
            return false;
        }

        let dir = self
            .options
            .output
            .root
            .join(names::output_dir_name(obj.key.as_str()));
        match fs::metadata(&dir).await {
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Skipping {}: cannot inspect {:?}: {}", obj.key, dir, e);
                false
            }
        }
    }

    async fn decode_one(&self, key: &Key) -> Result<Report, DecodeError> {
        let input = self.store.get(key).await?;
        decode_to_dir(key.as_str(), input, &self.key, &self.options.output).await
    }

    async fn delete(&self, key: &Key) {
        match self.store.delete(key).await {
            Ok(_) => info!(" Deleted {} from store", key),
            Err(e) => error!("Failed deleting {} from store: {}", key, e),
        }
    }
}
