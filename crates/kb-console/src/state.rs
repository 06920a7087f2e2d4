//! 数据集页面状态与事件处理（纯函数式 reducer，不做任何 IO）。
//!
//! [`DatasetState::update`] 接收一个事件，修改状态并返回需要执行的副作用
//! [`Effect`]；网络请求、防抖计时和提示展示都由控制器负责执行。

use kb_core::{CreateStatus, DocumentMode, DocumentPayload, FileRecord, PageSize, Pagination};
use kb_error::Result;
use tracing::{debug, warn};

use crate::dialog::{AddDocumentState, DocumentDraft, DraftField};
use crate::notify::{
    Notification, ADD_FAILURE_TITLE, ADD_SUCCESS_DESCRIPTION, ADD_SUCCESS_TITLE,
    REQUEST_FAILED_DESCRIPTION,
};

/// 文件列表的加载状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ListStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// 用户在页面上的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// 首次加载；再次派发即重新加载总数与当前页
    Mount,
    /// 切换知识库后重新加载：回到第一页并清空搜索
    SwitchKnowledgeBase,
    ChangePage(u32),
    ChangePageSize(PageSize),
    SearchInput(String),
    OpenAddOptions,
    OpenAddDialog(DocumentMode),
    EditDraft(DraftField, String),
    /// 关闭入库方式菜单或编辑中的对话框；提交中忽略
    CloseAddDialog,
    SubmitAddDialog,
}

#[derive(Debug, Clone)]
pub enum Event {
    Action(Action),
    /// 防抖结束，提交搜索关键字
    SearchFired(String),
    CountLoaded {
        seq: u64,
        result: Result<u64>,
    },
    FilesLoaded {
        seq: u64,
        result: Result<Vec<FileRecord>>,
    },
    DocumentCreated {
        result: Result<CreateStatus>,
    },
}

impl From<Action> for Event {
    fn from(action: Action) -> Self {
        Event::Action(action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchCount {
        seq: u64,
    },
    FetchFiles {
        seq: u64,
        page: u32,
        page_size: u32,
        keyword: String,
    },
    Debounce(String),
    CancelDebounce,
    CreateDocument {
        file_name: String,
        payload: DocumentPayload,
    },
    Notify(Notification),
}

#[derive(Debug, Clone, Default)]
pub struct DatasetState {
    files: Vec<FileRecord>,
    pagination: Pagination,
    search_input: String,
    applied_keyword: String,
    list_status: ListStatus,
    add_document: AddDocumentState,
    count_seq: u64,
    list_seq: u64,
}

impl DatasetState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            pagination: Pagination::new(page_size),
            ..Default::default()
        }
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn applied_keyword(&self) -> &str {
        &self.applied_keyword
    }

    pub fn list_status(&self) -> &ListStatus {
        &self.list_status
    }

    pub fn add_document(&self) -> &AddDocumentState {
        &self.add_document
    }

    pub fn is_creating(&self) -> bool {
        self.add_document.is_submitting()
    }

    pub fn update(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Action(action) => self.on_action(action),
            Event::SearchFired(keyword) => {
                debug!(%keyword, "search committed");
                self.applied_keyword = keyword;
                vec![self.fetch_files()]
            }
            Event::CountLoaded { seq, result } => self.on_count_loaded(seq, result),
            Event::FilesLoaded { seq, result } => self.on_files_loaded(seq, result),
            Event::DocumentCreated { result } => self.on_document_created(result),
        }
    }

    fn on_action(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Mount => vec![self.fetch_count(), self.fetch_files()],
            Action::SwitchKnowledgeBase => {
                self.pagination.set_page(1);
                self.search_input.clear();
                self.applied_keyword.clear();
                vec![Effect::CancelDebounce, self.fetch_count(), self.fetch_files()]
            }
            Action::ChangePage(page) => {
                if self.pagination.set_page(page) {
                    vec![self.fetch_files()]
                } else {
                    vec![]
                }
            }
            Action::ChangePageSize(size) => {
                if self.pagination.set_page_size(size) {
                    vec![self.fetch_files()]
                } else {
                    vec![]
                }
            }
            Action::SearchInput(value) => {
                // 回到第一页；真正的请求由防抖结束后的 SearchFired 发出
                self.pagination.set_page(1);
                self.search_input = value.clone();
                vec![Effect::Debounce(value)]
            }
            Action::OpenAddOptions => {
                if self.add_document == AddDocumentState::Closed {
                    self.add_document = AddDocumentState::SelectingType;
                } else {
                    warn!(state = ?self.add_document, "add options ignored");
                }
                vec![]
            }
            Action::OpenAddDialog(mode) => {
                if self.add_document.is_submitting() {
                    warn!("add dialog cannot be reopened while submitting");
                } else {
                    self.add_document = AddDocumentState::Editing {
                        mode,
                        draft: DocumentDraft::default(),
                    };
                }
                vec![]
            }
            Action::EditDraft(field, value) => {
                match &mut self.add_document {
                    AddDocumentState::Editing { draft, .. } => draft.set(field, value),
                    other => warn!(state = ?other, ?field, "draft edit ignored"),
                }
                vec![]
            }
            Action::CloseAddDialog => {
                if self.add_document.is_submitting() {
                    debug!("close ignored while submitting");
                } else {
                    self.add_document = AddDocumentState::Closed;
                }
                vec![]
            }
            Action::SubmitAddDialog => self.submit(),
        }
    }

    fn submit(&mut self) -> Vec<Effect> {
        let (mode, draft) = match &self.add_document {
            AddDocumentState::Editing { mode, draft } => (*mode, draft.clone()),
            AddDocumentState::Submitting { .. } => {
                debug!("submit ignored, request already in flight");
                return vec![];
            }
            other => {
                warn!(state = ?other, "submit without an open dialog");
                return vec![];
            }
        };

        match draft.to_request(mode) {
            Ok((file_name, payload)) => {
                self.add_document = AddDocumentState::Submitting { mode, draft };
                vec![Effect::CreateDocument { file_name, payload }]
            }
            Err(e) => vec![Effect::Notify(Notification::failure(
                ADD_FAILURE_TITLE,
                e.user_message(),
            ))],
        }
    }

    fn on_document_created(&mut self, result: Result<CreateStatus>) -> Vec<Effect> {
        let previous = std::mem::take(&mut self.add_document);
        let restore = |previous: AddDocumentState| match previous {
            AddDocumentState::Submitting { mode, draft } => AddDocumentState::Editing { mode, draft },
            other => other,
        };

        match result {
            Ok(status) if status.is_success() => {
                // 两种入库方式成功后都刷新列表和总数
                vec![
                    Effect::Notify(Notification::success(
                        ADD_SUCCESS_TITLE,
                        ADD_SUCCESS_DESCRIPTION,
                    )),
                    self.fetch_files(),
                    self.fetch_count(),
                ]
            }
            Ok(status) => {
                self.add_document = restore(previous);
                vec![Effect::Notify(Notification::failure(
                    ADD_FAILURE_TITLE,
                    status.msg,
                ))]
            }
            Err(e) => {
                debug!(error = %e, "create request failed");
                self.add_document = restore(previous);
                vec![Effect::Notify(Notification::failure(
                    ADD_FAILURE_TITLE,
                    REQUEST_FAILED_DESCRIPTION,
                ))]
            }
        }
    }

    fn on_count_loaded(&mut self, seq: u64, result: Result<u64>) -> Vec<Effect> {
        if seq != self.count_seq {
            debug!(seq, latest = self.count_seq, "discarding stale count response");
            return vec![];
        }
        match result {
            Ok(total) => {
                if self.pagination.set_total_items(total) {
                    vec![self.fetch_files()]
                } else {
                    vec![]
                }
            }
            // 保留之前的总数
            Err(_) => vec![],
        }
    }

    fn on_files_loaded(&mut self, seq: u64, result: Result<Vec<FileRecord>>) -> Vec<Effect> {
        if seq != self.list_seq {
            debug!(seq, latest = self.list_seq, "discarding stale file list response");
            return vec![];
        }
        match result {
            Ok(files) => {
                self.files = files;
                self.list_status = ListStatus::Loaded;
            }
            Err(e) => self.list_status = ListStatus::Failed(e.user_message()),
        }
        vec![]
    }

    fn fetch_count(&mut self) -> Effect {
        self.count_seq += 1;
        Effect::FetchCount {
            seq: self.count_seq,
        }
    }

    fn fetch_files(&mut self) -> Effect {
        self.list_seq += 1;
        self.list_status = ListStatus::Loading;
        Effect::FetchFiles {
            seq: self.list_seq,
            page: self.pagination.current_page(),
            page_size: self.pagination.page_size().get(),
            keyword: self.applied_keyword.clone(),
        }
    }
}
