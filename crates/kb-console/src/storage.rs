//! 客户端本地键值存储，保存当前选中的知识库名称。

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use kb_core::KNOWLEDGE_NAME_KEY;
use kb_error::{KbError, Result};

pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// 当前知识库名称，未设置时为空字符串
    fn knowledge_name(&self) -> Result<String> {
        Ok(self.get(KNOWLEDGE_NAME_KEY)?.unwrap_or_default())
    }
}

/// 基于 sled 的持久化存储
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| KbError::Storage {
            operation: format!("open {}", path.display()),
            message: e.to_string(),
        })?;
        Ok(Self { db })
    }
}

impl LocalStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.db.get(key).map_err(|e| KbError::Storage {
            operation: "get".to_string(),
            message: e.to_string(),
        })?;
        value
            .map(|v| {
                String::from_utf8(v.to_vec()).map_err(|e| KbError::Serialization {
                    format: "utf8".to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key, value.as_bytes())
            .and_then(|_| self.db.flush())
            .map(|_| ())
            .map_err(|e| KbError::Storage {
                operation: "set".to_string(),
                message: e.to_string(),
            })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn with_knowledge_name(name: &str) -> Self {
        let store = Self::default();
        if let Ok(mut entries) = store.entries.write() {
            entries.insert(KNOWLEDGE_NAME_KEY.to_string(), name.to_string());
        }
        store
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|e| KbError::Concurrency {
            operation: "memory_store_read".to_string(),
            message: e.to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|e| KbError::Concurrency {
            operation: "memory_store_write".to_string(),
            message: e.to_string(),
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
