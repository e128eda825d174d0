use gumdrop::Options;
use std::path::PathBuf;

#[derive(Debug, Options)]
pub enum Command {
    #[options(help = "Decode a local sealed file")]
    File(FileOpts),

    #[options(help = "Decode every sealed upload in the configured bucket")]
    Bucket(BucketOpts),

    #[options(help = "Split the body written by `file --raw` into its parts")]
    Split(SplitOpts),
}

#[derive(Debug, Options)]
pub struct FileOpts {
    #[options(free, required, help = "The sealed file to decode")]
    pub input: PathBuf,

    #[options(help = "Write the header and body as-is instead of extracting parts")]
    pub raw: bool,

    help: bool,
}

#[derive(Debug, Options)]
pub struct BucketOpts {
    #[options(help = "Only decode objects whose key starts with PREFIX", meta = "PREFIX")]
    pub prefix: String,

    help: bool,
}

#[derive(Debug, Options)]
pub struct SplitOpts {
    #[options(free, required, help = "A body file written by `file --raw`")]
    pub input: PathBuf,

    help: bool,
}

#[derive(Debug, Options)]
pub struct Args {
    #[options(help = "Use config file", meta = "PATH", default = "unseal.toml")]
    pub config_file: PathBuf,

    #[options(help = "Be more verbose")]
    pub verbose: bool,

    #[options(help = "Print help message and exit")]
    help: bool,

    #[options(command)]
    pub cmd: Option<Command>,
}
