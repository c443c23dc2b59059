use sluice_engine::error::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
