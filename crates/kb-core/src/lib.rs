use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod pagination;

pub use kb_error::{KbError as Error, Result};
pub use pagination::{PageSize, Pagination};

/// 服务端约定的成功状态码
pub const SUCCESS_CODE: i32 = 200;

/// 本地存储中记录当前知识库名称的键
pub const KNOWLEDGE_NAME_KEY: &str = "knowledgeName";

/// 知识库中的一个已上传文档（只读展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_path: String,
    pub create_time: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCountQuery {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListQuery {
    pub name: String,
    pub page: u32,
    pub page_size: u32,
    pub keyword: String,
}

/// 添加文档的方式：知识入库（粘贴文本）或文件入库（上传文件）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    Text,
    File,
}

impl DocumentMode {
    pub fn label(self) -> &'static str {
        match self {
            DocumentMode::Text => "知识入库",
            DocumentMode::File => "文件入库",
        }
    }
}

/// 新文档的内容：文本正文或本地文件路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentPayload {
    Text { content: String },
    File { path: PathBuf },
}

impl DocumentPayload {
    pub fn mode(&self) -> DocumentMode {
        match self {
            DocumentPayload::Text { .. } => DocumentMode::Text,
            DocumentPayload::File { .. } => DocumentMode::File,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub knowledge_base: String,
    pub file_name: String,
    pub payload: DocumentPayload,
}

/// 服务端统一响应包装 `{code, msg, data}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: Option<i32>,
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 未携带 code 的响应视为成功
    pub fn is_success(&self) -> bool {
        self.code.map_or(true, |c| c == SUCCESS_CODE)
    }

    /// 将非 200 的 code 转为业务错误，缺省的 data 用默认值填充
    pub fn into_data(self) -> Result<T>
    where
        T: Default,
    {
        match self.code {
            Some(code) if code != SUCCESS_CODE => Err(Error::Api {
                code,
                message: self.msg.unwrap_or_default(),
            }),
            _ => Ok(self.data.unwrap_or_default()),
        }
    }
}

/// 创建接口的返回状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStatus {
    pub code: i32,
    #[serde(default)]
    pub msg: String,
}

impl CreateStatus {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}
