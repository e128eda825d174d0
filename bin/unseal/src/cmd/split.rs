use crate::cli::SplitOpts;
use crate::config::Config;
use log::error;

pub async fn split_file(cfg: &Config, args: SplitOpts) -> Result<(), ()> {
    unseal::split_body(&args.input, &cfg.output_options())
        .await
        .map(|_| ())
        .map_err(|e| {
            error!("Splitting {:?} failed: {}", args.input, e);
        })
}
