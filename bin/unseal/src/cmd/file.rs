use crate::cli::FileOpts;
use crate::config::Config;
use log::{error, info};

pub async fn decode_file(cfg: &Config, args: FileOpts) -> Result<(), ()> {
    let key = cfg.private_key().map_err(|e| {
        error!("Cannot load private key: {}", e);
    })?;
    let options = cfg.output_options();

    let decoded = if args.raw {
        unseal::decode_raw(&args.input, &key, &options).await
    } else {
        unseal::decode_file(&args.input, &key, &options).await
    };

    match decoded {
        Ok(report) => {
            info!(
                "FINISHED: {} file(s) in {:?}, digest {}",
                report.outputs,
                report.location,
                report.verified.digest_hex()
            );
            Ok(())
        }
        Err(e) if e.is_corruption() => {
            error!("{:?} is corrupt: {}", args.input, e);
            Err(())
        }
        Err(e) => {
            error!("Decoding {:?} failed: {}", args.input, e);
            Err(())
        }
    }
}
