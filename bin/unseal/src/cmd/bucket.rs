use std::sync::Arc;

use crate::cli::BucketOpts;
use crate::config::Config;
use log::{error, info};
use unseal::{Batch, BatchOptions};
use unseal_s3::{Credentials, Store};

pub async fn decode_bucket(cfg: &Config, args: BucketOpts) -> Result<(), ()> {
    let key = cfg.private_key().map_err(|e| {
        error!("Cannot load private key: {}", e);
    })?;

    let bucket = cfg.bucket_name().map_err(|e| error!("{}", e))?;
    let region = cfg.region().map_err(|e| error!("{}", e))?;
    let credentials = cfg.credentials.as_ref().map(|c| Credentials {
        key_id: c.access_key_id.clone(),
        secret: c.secret_key.clone(),
    });

    info!("Listing s3://{}/{}", bucket, args.prefix);
    let store = Store::new(bucket, credentials, region).map_err(|e| {
        error!("Failed to create S3 client: {}", e);
    })?;

    let batch = Batch::new(
        Arc::new(store),
        Arc::new(key),
        BatchOptions {
            prefix: args.prefix,
            delete_on_success: cfg.delete_on_success,
            output: cfg.output_options(),
        },
    );

    let report = batch.run().await.map_err(|e| {
        error!("Listing failed with error: {}", e);
    })?;

    for (key, e) in report.failed.iter() {
        error!("  FAILED {}: {}", key, e);
    }
    info!(
        "Summary: {} verified, {} failed, {} skipped",
        report.verified.len(),
        report.failed.len(),
        report.skipped.len()
    );

    if report.is_success() {
        Ok(())
    } else {
        Err(())
    }
}
