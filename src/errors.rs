use std::fmt;

use crate::transport::TransportError;

/// Caller-facing failure categories
///
/// Every internal error collapses into one of these before it reaches a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    PermissionDenied,
    Transport,
    Persistence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRelayError {
    Validation(String),
    SizeLimitExceeded(String),
    NotFound(String),
    PermissionDenied(String),
    Transport(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    Config(String),
}

impl LinkRelayError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkRelayError::Validation(_) => "E001",
            LinkRelayError::SizeLimitExceeded(_) => "E002",
            LinkRelayError::NotFound(_) => "E003",
            LinkRelayError::PermissionDenied(_) => "E004",
            LinkRelayError::Transport(_) => "E005",
            LinkRelayError::DatabaseConfig(_) => "E006",
            LinkRelayError::DatabaseConnection(_) => "E007",
            LinkRelayError::DatabaseOperation(_) => "E008",
            LinkRelayError::FileOperation(_) => "E009",
            LinkRelayError::Serialization(_) => "E010",
            LinkRelayError::Config(_) => "E011",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            LinkRelayError::Validation(_) => "Validation Error",
            LinkRelayError::SizeLimitExceeded(_) => "Size Limit Exceeded",
            LinkRelayError::NotFound(_) => "Resource Not Found",
            LinkRelayError::PermissionDenied(_) => "Permission Denied",
            LinkRelayError::Transport(_) => "Transport Error",
            LinkRelayError::DatabaseConfig(_) => "Database Configuration Error",
            LinkRelayError::DatabaseConnection(_) => "Database Connection Error",
            LinkRelayError::DatabaseOperation(_) => "Database Operation Error",
            LinkRelayError::FileOperation(_) => "File Operation Error",
            LinkRelayError::Serialization(_) => "Serialization Error",
            LinkRelayError::Config(_) => "Configuration Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LinkRelayError::Validation(msg)
            | LinkRelayError::SizeLimitExceeded(msg)
            | LinkRelayError::NotFound(msg)
            | LinkRelayError::PermissionDenied(msg)
            | LinkRelayError::Transport(msg)
            | LinkRelayError::DatabaseConfig(msg)
            | LinkRelayError::DatabaseConnection(msg)
            | LinkRelayError::DatabaseOperation(msg)
            | LinkRelayError::FileOperation(msg)
            | LinkRelayError::Serialization(msg)
            | LinkRelayError::Config(msg) => msg,
        }
    }

    /// 映射到对外暴露的错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkRelayError::Validation(_) | LinkRelayError::SizeLimitExceeded(_) => {
                ErrorKind::Validation
            }
            LinkRelayError::NotFound(_) => ErrorKind::NotFound,
            LinkRelayError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            LinkRelayError::Transport(_) => ErrorKind::Transport,
            LinkRelayError::DatabaseConfig(_)
            | LinkRelayError::DatabaseConnection(_)
            | LinkRelayError::DatabaseOperation(_)
            | LinkRelayError::FileOperation(_)
            | LinkRelayError::Serialization(_)
            | LinkRelayError::Config(_) => ErrorKind::Persistence,
        }
    }

    /// 格式化为彩色输出
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LinkRelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinkRelayError {}

// 便捷的构造函数
impl LinkRelayError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::Validation(msg.into())
    }

    pub fn size_limit_exceeded<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::SizeLimitExceeded(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::NotFound(msg.into())
    }

    pub fn permission_denied<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::PermissionDenied(msg.into())
    }

    pub fn transport<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::Transport(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::Serialization(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        LinkRelayError::Config(msg.into())
    }
}

impl From<sea_orm::DbErr> for LinkRelayError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkRelayError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for LinkRelayError {
    fn from(err: std::io::Error) -> Self {
        LinkRelayError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LinkRelayError {
    fn from(err: serde_json::Error) -> Self {
        LinkRelayError::Serialization(err.to_string())
    }
}

impl From<TransportError> for LinkRelayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound(msg) => LinkRelayError::NotFound(msg),
            other => LinkRelayError::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkRelayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kind_collapses_size_limit_into_validation() {
        let err = LinkRelayError::size_limit_exceeded("5.0GB > 4.0GB");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), "E002");
    }

    #[test]
    fn test_kind_persistence_group() {
        for err in [
            LinkRelayError::database_operation("x"),
            LinkRelayError::database_connection("x"),
            LinkRelayError::file_operation("x"),
            LinkRelayError::serialization("x"),
        ] {
            assert_eq!(err.kind(), ErrorKind::Persistence);
        }
    }

    #[test]
    fn test_from_transport_error() {
        let err: LinkRelayError = TransportError::NotFound("message 7".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: LinkRelayError = TransportError::RateLimited {
            retry_after: Duration::from_secs(3),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_format_simple() {
        let err = LinkRelayError::permission_denied("not your link");
        assert_eq!(err.format_simple(), "Permission Denied: not your link");
        assert_eq!(err.to_string(), err.format_simple());
    }
}
