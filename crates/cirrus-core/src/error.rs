use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("invalid blueprint: {0}")]
    InvalidBlueprint(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
