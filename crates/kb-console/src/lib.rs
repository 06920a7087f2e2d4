//! 知识库管理台的数据集页面：文档列表、分页、防抖搜索与添加文件流程。

pub mod controller;
pub mod debounce;
pub mod dialog;
pub mod notify;
pub mod state;
pub mod storage;

pub use controller::{ControllerConfig, DatasetController, DatasetHandle};
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use dialog::{AddDocumentState, DocumentDraft, DraftField};
pub use notify::{Notification, NotificationVariant};
pub use state::{Action, DatasetState, Effect, Event, ListStatus};
pub use storage::{LocalStore, MemoryStore, SledStore};

pub use kb_error::{KbError, Result};
