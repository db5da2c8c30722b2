use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("home directory could not be determined; set CIRRUS_HOME")]
    HomeDirNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
