use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Parameter {name}={value} out of range [{min}, {max}]")]
    ParameterOutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("Invalid target security level: {0} bits")]
    InvalidSecurityLevel(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Profile parse error: {0}")]
    ProfileParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
