#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("layout needs a parent or at least one root")]
    MissingScope,
    #[error("unknown cell: {0}")]
    UnknownCell(String),
    #[error("invalid layout option `{option}`: {value}")]
    InvalidConfig { option: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
