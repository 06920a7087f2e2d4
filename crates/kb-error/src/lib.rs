use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// 控制台统一错误类型
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum KbError {
    // === 业务错误 ===
    #[error("请求无效: {reason}")]
    InvalidRequest { reason: String },

    #[error("验证失败: {message}")]
    Validation { message: String },

    #[error("服务端返回错误 (code={code}): {message}")]
    Api { code: i32, message: String },

    // === 技术错误 ===
    #[error("本地存储错误: {operation}")]
    Storage { operation: String, message: String },

    #[error("文件读写错误: {path}")]
    Io { path: String, message: String },

    #[error("网络错误: {operation}")]
    Network { operation: String, message: String },

    #[error("超时错误: {operation} 超过 {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("并发错误: {operation}")]
    Concurrency { operation: String, message: String },

    // === 系统错误 ===
    #[error("配置错误: {key} - {reason}")]
    Configuration { key: String, reason: String },

    #[error("序列化错误: {format}")]
    Serialization { format: String, message: String },
}

/// 错误严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Low,      // 可预期的业务错误
    Medium,   // 技术错误但不影响核心功能
    High,     // 影响核心功能的错误
    Critical, // 系统级严重错误
}

/// 错误元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetadata {
    pub error_id: String,
    pub severity: ErrorSeverity,
    pub component: String,
    pub operation: Option<String>,
    pub knowledge_base: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub context: std::collections::HashMap<String, String>,
}

impl KbError {
    /// 获取错误的严重级别
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            KbError::InvalidRequest { .. }
            | KbError::Validation { .. }
            | KbError::Api { .. } => ErrorSeverity::Low,
            KbError::Network { .. } | KbError::Timeout { .. } => ErrorSeverity::Medium,
            KbError::Io { .. } => ErrorSeverity::Medium,
            KbError::Storage { .. }
            | KbError::Serialization { .. }
            | KbError::Concurrency { .. } => ErrorSeverity::High,
            KbError::Configuration { .. } => ErrorSeverity::Critical,
        }
    }

    /// 记录错误日志
    pub fn log(&self, metadata: &ErrorMetadata) {
        match metadata.severity {
            ErrorSeverity::Low => {
                warn!(
                    error_id = %metadata.error_id,
                    component = %metadata.component,
                    operation = ?metadata.operation,
                    knowledge_base = ?metadata.knowledge_base,
                    error = %self,
                    "业务错误"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_id = %metadata.error_id,
                    component = %metadata.component,
                    operation = ?metadata.operation,
                    knowledge_base = ?metadata.knowledge_base,
                    error = %self,
                    context = ?metadata.context,
                    "技术错误"
                );
            }
            ErrorSeverity::High | ErrorSeverity::Critical => {
                error!(
                    error_id = %metadata.error_id,
                    component = %metadata.component,
                    operation = ?metadata.operation,
                    knowledge_base = ?metadata.knowledge_base,
                    error = %self,
                    context = ?metadata.context,
                    severity = ?metadata.severity,
                    "严重错误"
                );
            }
        }
    }

    /// 获取用户友好的错误消息
    pub fn user_message(&self) -> String {
        match self {
            KbError::InvalidRequest { .. } => "请求参数有误，请检查后重试".to_string(),
            KbError::Validation { message } => message.clone(),
            KbError::Api { message, .. } => message.clone(),
            KbError::Io { .. } => "无法读取文件，请检查路径".to_string(),
            KbError::Network { .. } | KbError::Timeout { .. } => {
                "请求出错，请稍后重试".to_string()
            }
            KbError::Configuration { .. } => "配置有误，请检查配置文件".to_string(),
            _ => "系统内部错误，请联系管理员".to_string(),
        }
    }
}

/// 创建错误元数据的便捷构造器
pub struct ErrorMetadataBuilder {
    metadata: ErrorMetadata,
}

impl ErrorMetadataBuilder {
    pub fn new(component: &str) -> Self {
        Self {
            metadata: ErrorMetadata {
                error_id: uuid::Uuid::new_v4().to_string(),
                severity: ErrorSeverity::Medium,
                component: component.to_string(),
                operation: None,
                knowledge_base: None,
                timestamp: chrono::Utc::now(),
                context: std::collections::HashMap::new(),
            },
        }
    }

    pub fn operation(mut self, operation: &str) -> Self {
        self.metadata.operation = Some(operation.to_string());
        self
    }

    pub fn knowledge_base(mut self, name: &str) -> Self {
        self.metadata.knowledge_base = Some(name.to_string());
        self
    }

    pub fn context(mut self, key: &str, value: &str) -> Self {
        self.metadata
            .context
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(mut self, error: &KbError) -> ErrorMetadata {
        self.metadata.severity = error.severity();
        self.metadata
    }
}

pub type Result<T> = std::result::Result<T, KbError>;

// === 转换实现 ===

impl From<serde_json::Error> for KbError {
    fn from(err: serde_json::Error) -> Self {
        KbError::Serialization {
            format: "json".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for KbError {
    fn from(err: tokio::task::JoinError) -> Self {
        KbError::Concurrency {
            operation: "task_join".to_string(),
            message: err.to_string(),
        }
    }
}
