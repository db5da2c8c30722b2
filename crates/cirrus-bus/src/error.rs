use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("no listeners subscribed to the command channel")]
    NoListeners,

    #[error("malformed command: {0}")]
    MalformedCommand(String),
}

pub type Result<T> = std::result::Result<T, BusError>;
