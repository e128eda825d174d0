use log::{debug, error};
use rusoto_core::Region;
use serde::Deserialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use unseal::crypto::{KeyPadding, PrivateKey};
use unseal::OutputOptions;

#[derive(Debug, Deserialize, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    Oaep,
    Pkcs1,
}

impl Default for Padding {
    fn default() -> Self {
        Padding::Oaep
    }
}

impl From<Padding> for KeyPadding {
    fn from(p: Padding) -> KeyPadding {
        match p {
            Padding::Oaep => KeyPadding::Oaep,
            Padding::Pkcs1 => KeyPadding::Pkcs1,
        }
    }
}

#[derive(Debug, Deserialize, Eq, PartialEq, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_key: String,
}

#[derive(Debug, Deserialize, Eq, PartialEq, Clone)]
pub struct Config {
    /// Needed by every command that decrypts.
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    #[serde(default)]
    pub padding: Padding,

    #[serde(default)]
    pub bucket_name: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub credentials: Option<Credentials>,

    #[serde(default)]
    pub overwrite_existing: bool,

    #[serde(default)]
    pub delete_on_success: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            private_key_path: None,
            padding: Padding::default(),
            bucket_name: None,
            region: default_region(),
            credentials: None,
            overwrite_existing: false,
            delete_on_success: false,
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigErr {
    File(io::Error),
    Format(String),
    Key(String),
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErr::File(e) => write!(f, "cannot read file: {}", e),
            ConfigErr::Format(msg) => write!(f, "invalid config: {}", msg),
            ConfigErr::Key(msg) => write!(f, "unusable private key: {}", msg),
        }
    }
}

impl Config {
    /// Loads and checks the RSA key named by `private_key_path`.
    pub fn private_key(&self) -> Result<PrivateKey, ConfigErr> {
        let path = self
            .private_key_path
            .as_ref()
            .ok_or_else(|| ConfigErr::Format("private_key_path is not set".to_string()))?;
        debug!("Loading private key from {:?}", path);
        let pem = fs::read(path).map_err(ConfigErr::File)?;
        PrivateKey::from_pem(&pem, self.padding.into()).map_err(|e| ConfigErr::Key(e.to_string()))
    }

    pub fn region(&self) -> Result<Region, ConfigErr> {
        self.region
            .parse::<Region>()
            .map_err(|e| ConfigErr::Format(format!("region {:?}: {}", self.region, e)))
    }

    pub fn bucket_name(&self) -> Result<&str, ConfigErr> {
        self.bucket_name
            .as_deref()
            .ok_or_else(|| ConfigErr::Format("bucket_name is not set".to_string()))
    }

    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            root: self.output_dir.clone(),
            overwrite_existing: self.overwrite_existing,
        }
    }
}

pub fn load(filename: &Path) -> Result<Config, ConfigErr> {
    debug!("Loading config from {:?}", filename);
    let mut f = File::open(filename).map_err(ConfigErr::File)?;
    let mut content = String::new();

    f.read_to_string(&mut content).map_err(ConfigErr::File)?;

    parse(&content)
}

/// Like `load`, but a missing file yields the defaults.
pub fn load_or_default(filename: &Path) -> Result<Config, ConfigErr> {
    match load(filename) {
        Err(ConfigErr::File(e)) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No config at {:?}, using defaults", filename);
            Ok(Config::default())
        }
        other => other,
    }
}

fn parse(text: &str) -> Result<Config, ConfigErr> {
    debug!("Parsing config content");

    toml::from_str::<Config>(text).map_err(|e| {
        error!("Parsing error: {}", e);
        ConfigErr::Format(e.to_string())
    })
}
