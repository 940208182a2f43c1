//! URL 规范化与验证模块
//!
//! 补全缺失的协议，验证 URL 安全性，阻止危险协议

use url::Url;

/// URL 验证错误
#[derive(Debug)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    DangerousProtocol(String),
    InvalidFormat(String),
    MissingHost,
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::DangerousProtocol(proto) => {
                write!(f, "Dangerous protocol blocked: {}", proto)
            }
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
            Self::MissingHost => write!(f, "URL has no host"),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 危险协议列表
const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// 验证 URL 安全性
///
/// 检查项目：
/// 1. URL 不为空
/// 2. 不是危险协议（javascript:, data:, file: 等）
/// 3. 必须是 http:// 或 https://
/// 4. URL 格式有效
pub fn validate_url(url: &str) -> Result<(), UrlValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let url_lower = url.to_lowercase();

    // 检查危险协议
    for proto in DANGEROUS_PROTOCOLS {
        if url_lower.starts_with(proto) {
            return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
        }
    }

    // 检查协议
    if !url_lower.starts_with("http://") && !url_lower.starts_with("https://") {
        let proto = url_lower
            .split(':')
            .next()
            .map(|s| format!("{}:", s))
            .unwrap_or_default();
        return Err(UrlValidationError::InvalidProtocol(proto));
    }

    // 解析 URL 验证格式
    let parsed = Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(())
}

/// 规范化用户输入的 URL
///
/// Trims whitespace and prefixes `https://` when the input carries no http(s)
/// scheme. Dangerous schemes are left untouched so validation still rejects them.
pub fn normalize_url(raw: &str) -> String {
    let url = raw.trim();
    let lower = url.to_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        return url.to_string();
    }
    // 其他协议（ftp:// 等）原样保留，交给验证拒绝
    let has_other_scheme = lower.find("://").is_some_and(|idx| {
        idx > 0
            && lower[..idx]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    if has_other_scheme || DANGEROUS_PROTOCOLS.iter().any(|proto| lower.starts_with(proto)) {
        return url.to_string();
    }
    format!("https://{}", url)
}

/// 规范化后验证，返回可直接存储的 URL
pub fn normalize_and_validate(raw: &str) -> Result<String, UrlValidationError> {
    if raw.trim().is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }
    let normalized = normalize_url(raw);
    validate_url(&normalized)?;
    Ok(normalized)
}

/// 从自由文本中提取 http(s) URL
pub fn extract_urls(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| {
            let lower = token.to_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://")
        })
        .map(|token| {
            token
                .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | '"' | '\''))
                .to_string()
        })
        .filter(|url| validate_url(url).is_ok())
        .collect()
}

/// 获取 URL 验证错误的用户友好消息
pub fn validation_error_message(error: &UrlValidationError) -> &'static str {
    match error {
        UrlValidationError::EmptyUrl => "URL cannot be empty",
        UrlValidationError::InvalidProtocol(_) => "URL must start with http:// or https://",
        UrlValidationError::DangerousProtocol(_) => "This URL protocol is not allowed",
        UrlValidationError::InvalidFormat(_) => "Invalid URL format",
        UrlValidationError::MissingHost => "URL must contain a host",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("https://example.com/path?query=1").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
    }

    #[test]
    fn test_dangerous_protocols() {
        assert!(matches!(
            validate_url("javascript:alert(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_url("data:text/html,<script>alert(1)</script>"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_url("vbscript:msgbox(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
    }

    #[test]
    fn test_invalid_protocols() {
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert!(matches!(
            validate_url("mailto:test@example.com"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_empty_url() {
        assert!(matches!(
            validate_url(""),
            Err(UrlValidationError::EmptyUrl)
        ));
        assert!(matches!(
            validate_url("   "),
            Err(UrlValidationError::EmptyUrl)
        ));
    }

    #[test]
    fn test_normalize_adds_https() {
        assert_eq!(normalize_url("example.com/a/b"), "https://example.com/a/b");
        assert_eq!(normalize_url("  example.com "), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("HTTPS://Example.com"), "HTTPS://Example.com");
        assert_eq!(normalize_url("ftp://example.com"), "ftp://example.com");
        assert_eq!(
            normalize_url("example.com/?next=http://x.org"),
            "https://example.com/?next=http://x.org"
        );
    }

    #[test]
    fn test_normalize_and_validate() {
        assert_eq!(
            normalize_and_validate("example.com/a/b").unwrap(),
            "https://example.com/a/b"
        );
        assert!(matches!(
            normalize_and_validate("javascript:alert(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            normalize_and_validate(""),
            Err(UrlValidationError::EmptyUrl)
        ));
        assert!(normalize_and_validate("not a url").is_err());
        assert!(normalize_and_validate("ftp://example.com").is_err());
    }

    #[test]
    fn test_extract_urls() {
        let text = "see https://example.com/a, and http://foo.org/x?y=1. not www.bar.com";
        assert_eq!(
            extract_urls(text),
            vec!["https://example.com/a".to_string(), "http://foo.org/x?y=1".to_string()]
        );
        assert!(extract_urls("nothing here").is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches!(
            validate_url("JAVASCRIPT:alert(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(validate_url("HTTP://example.com").is_ok());
        assert!(validate_url("HTTPS://example.com").is_ok());
    }
}
