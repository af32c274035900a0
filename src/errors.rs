use thiserror::Error;
use std::num::ParseIntError;

#[derive(Error, Debug)]
pub enum DataStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Config parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Config writing error: {0}")]
    TomlWriteError(#[from] toml::ser::Error),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Parse int error: {0}")]
    ParseIntError(#[from] ParseIntError),

    /// 文件长度不是记录长度的整数倍
    #[error("Format error in {path}: {reason}")]
    FormatError { path: String, reason: String },

    /// 数据源返回非成功状态，可重试
    #[error("Source error [{code}]: {message}")]
    SourceError { code: String, message: String },

    #[error("Source retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Exchange error: {0}")]
    ExchangeError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DataStoreError {
    pub fn source_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        DataStoreError::SourceError {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 只有数据源的临时错误才值得重试
    pub fn is_transient(&self) -> bool {
        matches!(self, DataStoreError::SourceError { .. })
    }
}

pub type Result<T> = std::result::Result<T, DataStoreError>;

// 用于从字符串创建错误
impl From<String> for DataStoreError {
    fn from(s: String) -> Self {
        DataStoreError::Unknown(s)
    }
}

// 用于从&str创建错误
impl From<&str> for DataStoreError {
    fn from(s: &str) -> Self {
        DataStoreError::Unknown(s.to_string())
    }
}
