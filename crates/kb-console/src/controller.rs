use std::sync::Arc;
use std::time::Duration;

use kb_client::KnowledgeApi;
use kb_core::{FileCountQuery, FileListQuery, NewDocument, PageSize};
use kb_error::{ErrorMetadata, ErrorMetadataBuilder, KbError, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::debounce::{Debouncer, SEARCH_DEBOUNCE};
use crate::notify::Notification;
use crate::state::{Action, DatasetState, Effect, Event};
use crate::storage::LocalStore;

const COMPONENT: &str = "dataset";

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub debounce: Duration,
    pub page_size: PageSize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce: SEARCH_DEBOUNCE,
            page_size: PageSize::default(),
        }
    }
}

/// 页面控制器的外部句柄：派发操作、读取最新状态
pub struct DatasetHandle {
    actions: mpsc::UnboundedSender<Action>,
    snapshots: watch::Receiver<DatasetState>,
    task: JoinHandle<()>,
}

impl DatasetHandle {
    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.actions.send(action).map_err(|e| KbError::Concurrency {
            operation: "dispatch".to_string(),
            message: e.to_string(),
        })
    }

    pub fn snapshot(&self) -> DatasetState {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DatasetState> {
        self.snapshots.clone()
    }

    /// 关闭操作通道并等待事件循环退出
    pub async fn shutdown(self) -> Result<()> {
        drop(self.actions);
        self.task.await?;
        Ok(())
    }
}

/// 单一事件循环：顺序处理用户操作与异步请求的完成事件
pub struct DatasetController {
    api: Arc<dyn KnowledgeApi>,
    store: Arc<dyn LocalStore>,
    state: DatasetState,
    events_tx: mpsc::UnboundedSender<Event>,
    debouncer: Debouncer<Event>,
    snapshots: watch::Sender<DatasetState>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl DatasetController {
    /// 启动控制器，返回句柄和提示消息的接收端
    pub fn spawn(
        api: Arc<dyn KnowledgeApi>,
        store: Arc<dyn LocalStore>,
        config: ControllerConfig,
    ) -> (DatasetHandle, mpsc::UnboundedReceiver<Notification>) {
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let state = DatasetState::new(config.page_size);
        let (snap_tx, snap_rx) = watch::channel(state.clone());

        let controller = Self {
            api,
            store,
            state,
            debouncer: Debouncer::new(config.debounce, events_tx.clone()),
            events_tx,
            snapshots: snap_tx,
            notifications: notify_tx,
        };
        let task = tokio::spawn(controller.run(actions_rx, events_rx));

        let handle = DatasetHandle {
            actions: actions_tx,
            snapshots: snap_rx,
            task,
        };
        (handle, notify_rx)
    }

    async fn run(
        mut self,
        mut actions: mpsc::UnboundedReceiver<Action>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        info!(debounce_ms = self.debouncer.delay().as_millis() as u64, "dataset controller started");
        loop {
            let event = tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => Event::Action(action),
                    None => break,
                },
                Some(event) = events.recv() => event,
            };
            self.handle(event);
        }
        self.debouncer.cancel();
        info!("dataset controller stopped");
    }

    fn handle(&mut self, event: Event) {
        for effect in self.state.update(event) {
            self.execute(effect);
        }
        self.snapshots.send_replace(self.state.clone());
    }

    fn execute(&self, effect: Effect) {
        match effect {
            Effect::FetchCount { seq } => {
                let api = self.api.clone();
                let tx = self.events_tx.clone();
                let query = FileCountQuery {
                    name: self.knowledge_name(),
                };
                tokio::spawn(async move {
                    let result = api.file_count(&query).await;
                    if let Err(e) = &result {
                        log_failure(e, "load_count", &query.name, &[]);
                    }
                    let _ = tx.send(Event::CountLoaded { seq, result });
                });
            }
            Effect::FetchFiles {
                seq,
                page,
                page_size,
                keyword,
            } => {
                let api = self.api.clone();
                let tx = self.events_tx.clone();
                let query = FileListQuery {
                    name: self.knowledge_name(),
                    page,
                    page_size,
                    keyword,
                };
                debug!(seq, page, page_size, keyword = %query.keyword, "loading files");
                tokio::spawn(async move {
                    let result = api.file_list(&query).await;
                    if let Err(e) = &result {
                        let page = query.page.to_string();
                        let page_size = query.page_size.to_string();
                        log_failure(
                            e,
                            "load_files",
                            &query.name,
                            &[
                                ("page", page.as_str()),
                                ("page_size", page_size.as_str()),
                                ("keyword", query.keyword.as_str()),
                            ],
                        );
                    }
                    let _ = tx.send(Event::FilesLoaded { seq, result });
                });
            }
            Effect::Debounce(keyword) => self.debouncer.call(Event::SearchFired(keyword)),
            Effect::CancelDebounce => self.debouncer.cancel(),
            Effect::CreateDocument { file_name, payload } => {
                let api = self.api.clone();
                let tx = self.events_tx.clone();
                let doc = NewDocument {
                    knowledge_base: self.knowledge_name(),
                    file_name,
                    payload,
                };
                info!(file_name = %doc.file_name, mode = ?doc.payload.mode(), "creating document");
                tokio::spawn(async move {
                    let result = api.create_document(&doc).await;
                    match &result {
                        Ok(status) if !status.is_success() => {
                            warn!(code = status.code, msg = %status.msg, "create rejected by server");
                        }
                        Ok(_) => info!(file_name = %doc.file_name, "document created"),
                        Err(e) => log_failure(
                            e,
                            "create_document",
                            &doc.knowledge_base,
                            &[("file_name", doc.file_name.as_str())],
                        ),
                    }
                    let _ = tx.send(Event::DocumentCreated { result });
                });
            }
            Effect::Notify(notification) => {
                if self.notifications.send(notification).is_err() {
                    debug!("notification dropped, no receiver");
                }
            }
        }
    }

    /// 每次请求时读取，存储不可用时退回空字符串
    fn knowledge_name(&self) -> String {
        self.store.knowledge_name().unwrap_or_else(|e| {
            log_failure(&e, "read_knowledge_name", "", &[]);
            String::new()
        })
    }
}

fn failure_metadata(
    error: &KbError,
    operation: &str,
    knowledge_base: &str,
    context: &[(&str, &str)],
) -> ErrorMetadata {
    context
        .iter()
        .fold(
            ErrorMetadataBuilder::new(COMPONENT)
                .operation(operation)
                .knowledge_base(knowledge_base),
            |builder, (key, value)| builder.context(key, value),
        )
        .build(error)
}

fn log_failure(error: &KbError, operation: &str, knowledge_base: &str, context: &[(&str, &str)]) {
    error.log(&failure_metadata(error, operation, knowledge_base, context));
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kb_core::{CreateStatus, DocumentMode, FileRecord};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tokio::time::sleep;

    use crate::dialog::{AddDocumentState, DraftField};
    use crate::notify::REQUEST_FAILED_DESCRIPTION;
    use crate::storage::MemoryStore;
    use kb_core::KNOWLEDGE_NAME_KEY;

    #[derive(Debug, Clone, PartialEq)]
    enum Created {
        Text { name: String, file_name: String, text: String },
        File { name: String, file_name: String, path: PathBuf },
    }

    /// 记录所有调用的内存后端
    struct MockApi {
        total: u64,
        list_delays: HashMap<u32, u64>,
        create_status: Mutex<Result<CreateStatus>>,
        create_delay_ms: u64,
        counts: Mutex<Vec<FileCountQuery>>,
        lists: Mutex<Vec<FileListQuery>>,
        created: Mutex<Vec<Created>>,
    }

    impl MockApi {
        fn new(total: u64) -> Self {
            Self {
                total,
                list_delays: HashMap::new(),
                create_status: Mutex::new(Ok(CreateStatus {
                    code: 200,
                    msg: "success".into(),
                })),
                create_delay_ms: 0,
                counts: Mutex::new(Vec::new()),
                lists: Mutex::new(Vec::new()),
                created: Mutex::new(Vec::new()),
            }
        }

        fn lists(&self) -> Vec<FileListQuery> {
            self.lists.lock().unwrap().clone()
        }

        fn count_calls(&self) -> usize {
            self.counts.lock().unwrap().len()
        }

        fn created(&self) -> Vec<Created> {
            self.created.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl KnowledgeApi for MockApi {
        async fn file_count(&self, query: &FileCountQuery) -> Result<u64> {
            self.counts.lock().unwrap().push(query.clone());
            Ok(self.total)
        }

        async fn file_list(&self, query: &FileListQuery) -> Result<Vec<FileRecord>> {
            self.lists.lock().unwrap().push(query.clone());
            if let Some(ms) = self.list_delays.get(&query.page) {
                sleep(Duration::from_millis(*ms)).await;
            }
            Ok(vec![FileRecord {
                file_path: format!("page-{}-{}.md", query.page, query.keyword),
                create_time: "2024-05-01 10:00:00".into(),
                status: "parsed".into(),
            }])
        }

        async fn create_text(&self, name: &str, file_name: &str, text: &str) -> Result<CreateStatus> {
            self.created.lock().unwrap().push(Created::Text {
                name: name.into(),
                file_name: file_name.into(),
                text: text.into(),
            });
            sleep(Duration::from_millis(self.create_delay_ms)).await;
            self.create_status.lock().unwrap().clone()
        }

        async fn create_file(&self, name: &str, file_name: &str, path: &Path) -> Result<CreateStatus> {
            self.created.lock().unwrap().push(Created::File {
                name: name.into(),
                file_name: file_name.into(),
                path: path.to_path_buf(),
            });
            sleep(Duration::from_millis(self.create_delay_ms)).await;
            self.create_status.lock().unwrap().clone()
        }
    }

    fn start(
        api: Arc<MockApi>,
    ) -> (DatasetHandle, mpsc::UnboundedReceiver<Notification>) {
        let store = Arc::new(MemoryStore::with_knowledge_name("demo"));
        DatasetController::spawn(api, store, ControllerConfig::default())
    }

    /// 暂停的时钟下让所有就绪任务跑完
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_loads_count_and_first_page() {
        let api = Arc::new(MockApi::new(25));
        let (handle, _notes) = start(api.clone());

        handle.dispatch(Action::Mount).unwrap();
        settle().await;

        let snap = handle.snapshot();
        assert_eq!(snap.pagination().total_items(), 25);
        assert_eq!(snap.pagination().total_pages(), 3);
        assert_eq!(snap.files()[0].file_path, "page-1-.md");
        assert_eq!(
            api.lists(),
            vec![FileListQuery {
                name: "demo".into(),
                page: 1,
                page_size: 10,
                keyword: String::new(),
            }]
        );
        assert_eq!(api.count_calls(), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_knowledge_base_reloads_first_page_unfiltered() {
        let api = Arc::new(MockApi::new(45));
        let store = Arc::new(MemoryStore::with_knowledge_name("demo"));
        let (handle, _notes) =
            DatasetController::spawn(api.clone(), store.clone(), ControllerConfig::default());
        handle.dispatch(Action::Mount).unwrap();
        settle().await;
        handle.dispatch(Action::SearchInput("faq".into())).unwrap();
        sleep(Duration::from_millis(600)).await;
        handle.dispatch(Action::ChangePage(3)).unwrap();
        settle().await;
        // 未到防抖时间的输入在切换后不应再触发
        handle.dispatch(Action::SearchInput("faq2".into())).unwrap();

        store.set(KNOWLEDGE_NAME_KEY, "manual").unwrap();
        handle.dispatch(Action::SwitchKnowledgeBase).unwrap();
        sleep(Duration::from_millis(600)).await;

        let last = api.lists().pop().unwrap();
        assert_eq!(
            last,
            FileListQuery {
                name: "manual".into(),
                page: 1,
                page_size: 10,
                keyword: String::new(),
            }
        );
        assert_eq!(api.lists().len(), 4);
        let snap = handle.snapshot();
        assert_eq!(snap.pagination().current_page(), 1);
        assert_eq!(snap.search_input(), "");
        assert_eq!(snap.applied_keyword(), "");
        assert_eq!(snap.files()[0].file_path, "page-1-.md");
    }

    #[test]
    fn test_list_failure_metadata_carries_query_context() {
        let err = KbError::Network {
            operation: "file_list".into(),
            message: "connection refused".into(),
        };
        let metadata = failure_metadata(&err, "load_files", "demo", &[("page", "2"), ("keyword", "faq")]);
        assert_eq!(metadata.operation.as_deref(), Some("load_files"));
        assert_eq!(metadata.knowledge_base.as_deref(), Some("demo"));
        assert_eq!(metadata.context.get("page").map(String::as_str), Some("2"));
        assert_eq!(metadata.context.get("keyword").map(String::as_str), Some("faq"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_knowledge_name_sends_empty_string() {
        let api = Arc::new(MockApi::new(0));
        let (handle, _notes) =
            DatasetController::spawn(api.clone(), Arc::new(MemoryStore::default()), ControllerConfig::default());

        handle.dispatch(Action::Mount).unwrap();
        settle().await;

        assert_eq!(api.lists()[0].name, "");
        assert_eq!(handle.snapshot().pagination().total_pages(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_issues_one_request() {
        let api = Arc::new(MockApi::new(45));
        let (handle, _notes) = start(api.clone());
        handle.dispatch(Action::Mount).unwrap();
        settle().await;
        handle.dispatch(Action::ChangePage(3)).unwrap();
        settle().await;
        assert_eq!(api.lists().len(), 2);

        for value in ["r", "ru", "rus", "rust"] {
            handle.dispatch(Action::SearchInput(value.into())).unwrap();
            sleep(Duration::from_millis(100)).await;
            assert_eq!(handle.snapshot().pagination().current_page(), 1);
        }
        assert_eq!(api.lists().len(), 2);

        sleep(Duration::from_millis(500)).await;
        let lists = api.lists();
        assert_eq!(lists.len(), 3);
        assert_eq!(lists[2].keyword, "rust");
        assert_eq!(lists[2].page, 1);
        assert_eq!(handle.snapshot().files()[0].file_path, "page-1-rust.md");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_typing_issues_two_requests() {
        let api = Arc::new(MockApi::new(45));
        let (handle, _notes) = start(api.clone());

        handle.dispatch(Action::SearchInput("a".into())).unwrap();
        sleep(Duration::from_millis(600)).await;
        handle.dispatch(Action::SearchInput("ab".into())).unwrap();
        sleep(Duration::from_millis(600)).await;

        let keywords: Vec<String> = api.lists().into_iter().map(|q| q.keyword).collect();
        assert_eq!(keywords, vec!["a".to_string(), "ab".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_size_change_clamps_and_refetches() {
        let api = Arc::new(MockApi::new(25));
        let (handle, _notes) = start(api.clone());
        handle.dispatch(Action::Mount).unwrap();
        settle().await;

        handle.dispatch(Action::ChangePage(3)).unwrap();
        handle
            .dispatch(Action::ChangePageSize(PageSize::new(20).unwrap()))
            .unwrap();
        settle().await;

        let snap = handle.snapshot();
        assert_eq!(snap.pagination().total_pages(), 2);
        assert_eq!(snap.pagination().current_page(), 2);
        let last = api.lists().pop().unwrap();
        assert_eq!((last.page, last.page_size), (2, 20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_does_not_overwrite_newer_page() {
        let mut mock = MockApi::new(30);
        mock.list_delays.insert(1, 300);
        let api = Arc::new(mock);
        let (handle, _notes) = start(api.clone());

        handle.dispatch(Action::Mount).unwrap();
        settle().await;
        handle.dispatch(Action::ChangePage(2)).unwrap();
        settle().await;
        assert_eq!(handle.snapshot().files()[0].file_path, "page-2-.md");

        sleep(Duration::from_millis(400)).await;
        assert_eq!(handle.snapshot().files()[0].file_path, "page-2-.md");
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_submit_success_reloads_and_notifies() {
        let api = Arc::new(MockApi::new(5));
        let (handle, mut notes) = start(api.clone());
        handle.dispatch(Action::Mount).unwrap();
        settle().await;

        handle.dispatch(Action::OpenAddOptions).unwrap();
        handle.dispatch(Action::OpenAddDialog(DocumentMode::Text)).unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FileName, "faq".into()))
            .unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FileText, "问：怎么入库？".into()))
            .unwrap();
        handle.dispatch(Action::SubmitAddDialog).unwrap();
        settle().await;

        assert_eq!(
            api.created(),
            vec![Created::Text {
                name: "demo".into(),
                file_name: "faq".into(),
                text: "问：怎么入库？".into(),
            }]
        );
        let note = notes.try_recv().unwrap();
        assert!(!note.is_destructive());
        assert_eq!(note.title, "添加文件成功");

        let snap = handle.snapshot();
        assert_eq!(snap.add_document(), &AddDocumentState::Closed);
        assert!(!snap.is_creating());
        assert_eq!(api.lists().len(), 2);
        assert_eq!(api.count_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_submit_success_reloads_list() {
        let api = Arc::new(MockApi::new(5));
        let (handle, mut notes) = start(api.clone());

        handle.dispatch(Action::OpenAddDialog(DocumentMode::File)).unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FilePath, "/data/manual.pdf".into()))
            .unwrap();
        handle.dispatch(Action::SubmitAddDialog).unwrap();
        settle().await;

        assert_eq!(
            api.created(),
            vec![Created::File {
                name: "demo".into(),
                file_name: "manual.pdf".into(),
                path: PathBuf::from("/data/manual.pdf"),
            }]
        );
        assert!(!notes.try_recv().unwrap().is_destructive());
        assert_eq!(api.lists().len(), 1);
        assert!(!handle.snapshot().add_document().is_dialog_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_submit_keeps_dialog_open() {
        let api = Arc::new(MockApi::new(5));
        *api.create_status.lock().unwrap() = Ok(CreateStatus {
            code: 500,
            msg: "知识库不存在".into(),
        });
        let (handle, mut notes) = start(api.clone());

        handle.dispatch(Action::OpenAddDialog(DocumentMode::Text)).unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FileName, "faq".into()))
            .unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FileText, "内容".into()))
            .unwrap();
        handle.dispatch(Action::SubmitAddDialog).unwrap();
        settle().await;

        let note = notes.try_recv().unwrap();
        assert!(note.is_destructive());
        assert_eq!(note.description, "知识库不存在");
        let snap = handle.snapshot();
        assert!(snap.add_document().is_dialog_open());
        assert!(!snap.is_creating());
        assert!(api.lists().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_shows_generic_notice() {
        let api = Arc::new(MockApi::new(5));
        *api.create_status.lock().unwrap() = Err(KbError::Network {
            operation: "create_text".into(),
            message: "connection refused".into(),
        });
        let (handle, mut notes) = start(api.clone());

        handle.dispatch(Action::OpenAddDialog(DocumentMode::Text)).unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FileName, "faq".into()))
            .unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FileText, "内容".into()))
            .unwrap();
        handle.dispatch(Action::SubmitAddDialog).unwrap();
        settle().await;

        assert_eq!(notes.try_recv().unwrap().description, REQUEST_FAILED_DESCRIPTION);
        assert!(handle.snapshot().add_document().is_dialog_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_submit_sends_one_request() {
        let mut mock = MockApi::new(5);
        mock.create_delay_ms = 200;
        let api = Arc::new(mock);
        let (handle, _notes) = start(api.clone());

        handle.dispatch(Action::OpenAddDialog(DocumentMode::Text)).unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FileName, "faq".into()))
            .unwrap();
        handle
            .dispatch(Action::EditDraft(DraftField::FileText, "内容".into()))
            .unwrap();
        handle.dispatch(Action::SubmitAddDialog).unwrap();
        handle.dispatch(Action::SubmitAddDialog).unwrap();
        settle().await;
        assert!(handle.snapshot().is_creating());

        sleep(Duration::from_millis(300)).await;
        assert_eq!(api.created().len(), 1);
        assert!(!handle.snapshot().is_creating());
    }
}
