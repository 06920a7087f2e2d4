use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use kb_core::{
    ApiResponse, CreateStatus, DocumentPayload, FileCountQuery, FileListQuery, FileRecord,
    NewDocument,
};
pub use kb_error::{KbError, Result};

const COUNT_PATH: &str = "/knowledge/file/count";
const LIST_PATH: &str = "/knowledge/file/list";
const CREATE_TEXT_PATH: &str = "/knowledge/text/create";
const CREATE_FILE_PATH: &str = "/knowledge/file/create";

/// 知识库后端的四个接口
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    async fn file_count(&self, query: &FileCountQuery) -> Result<u64>;
    async fn file_list(&self, query: &FileListQuery) -> Result<Vec<FileRecord>>;
    async fn create_text(&self, name: &str, file_name: &str, text: &str) -> Result<CreateStatus>;
    async fn create_file(&self, name: &str, file_name: &str, path: &Path) -> Result<CreateStatus>;

    /// 按载荷类型分发到对应的创建接口
    async fn create_document(&self, doc: &NewDocument) -> Result<CreateStatus> {
        match &doc.payload {
            DocumentPayload::Text { content } => {
                self.create_text(&doc.knowledge_base, &doc.file_name, content)
                    .await
            }
            DocumentPayload::File { path } => {
                self.create_file(&doc.knowledge_base, &doc.file_name, path)
                    .await
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String, // e.g. http://localhost:8080/api
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct HttpKnowledgeClient {
    http: Client,
    cfg: HttpClientConfig,
}

impl HttpKnowledgeClient {
    pub fn new(cfg: HttpClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| KbError::Configuration {
                key: "api.base_url".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, cfg })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, operation: &str, e: reqwest::Error) -> KbError {
        if e.is_timeout() {
            KbError::Timeout {
                operation: operation.to_string(),
                timeout_ms: self.cfg.timeout.as_millis() as u64,
            }
        } else {
            KbError::Network {
                operation: operation.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// 解析响应体；HTTP 状态非 2xx 且响应体不是约定的 JSON 包装时视为传输错误
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let bytes = resp.bytes().await.map_err(|e| KbError::Network {
        operation: "read_body".to_string(),
        message: e.to_string(),
    })?;
    match serde_json::from_slice::<T>(&bytes) {
        Ok(v) => Ok(v),
        Err(_) if !status.is_success() => Err(KbError::Api {
            code: i32::from(status.as_u16()),
            message: String::from_utf8_lossy(&bytes).into_owned(),
        }),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl KnowledgeApi for HttpKnowledgeClient {
    #[instrument(skip(self), fields(kb = %query.name))]
    async fn file_count(&self, query: &FileCountQuery) -> Result<u64> {
        let resp = self
            .http
            .post(self.url(COUNT_PATH))
            .json(query)
            .send()
            .await
            .map_err(|e| self.map_send_error("file_count", e))?;
        let body: ApiResponse<u64> = decode(resp).await?;
        body.into_data()
    }

    #[instrument(skip(self), fields(kb = %query.name, page = query.page))]
    async fn file_list(&self, query: &FileListQuery) -> Result<Vec<FileRecord>> {
        let resp = self
            .http
            .post(self.url(LIST_PATH))
            .json(query)
            .send()
            .await
            .map_err(|e| self.map_send_error("file_list", e))?;
        let body: ApiResponse<Vec<FileRecord>> = decode(resp).await?;
        let files = body.into_data()?;
        debug!(count = files.len(), "file list received");
        Ok(files)
    }

    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn create_text(&self, name: &str, file_name: &str, text: &str) -> Result<CreateStatus> {
        let body = serde_json::json!({
            "name": name,
            "file_name": file_name,
            "text": text,
        });
        let resp = self
            .http
            .post(self.url(CREATE_TEXT_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error("create_text", e))?;
        decode(resp).await
    }

    #[instrument(skip(self))]
    async fn create_file(&self, name: &str, file_name: &str, path: &Path) -> Result<CreateStatus> {
        let bytes = tokio::fs::read(path).await.map_err(|e| KbError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(size = bytes.len(), "uploading file");
        let upload_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let form = multipart::Form::new()
            .text("name", name.to_string())
            .text("file_name", file_name.to_string())
            .part("file", multipart::Part::bytes(bytes).file_name(upload_name));
        let resp = self
            .http
            .post(self.url(CREATE_FILE_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error("create_file", e))?;
        decode(resp).await
    }
}
