//! 添加文件流程：选择入库方式的弹出菜单与填写内容的对话框。

use std::path::{Path, PathBuf};

use kb_core::{DocumentMode, DocumentPayload};
use kb_error::{KbError, Result};

/// 对话框中的草稿，每次打开对话框都会清空
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentDraft {
    pub file_name: String,
    pub file_path: String,
    pub file_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    FileName,
    FilePath,
    FileText,
}

impl DocumentDraft {
    pub fn set(&mut self, field: DraftField, value: String) {
        match field {
            DraftField::FileName => self.file_name = value,
            DraftField::FilePath => self.file_path = value,
            DraftField::FileText => self.file_text = value,
        }
    }

    /// 校验草稿并生成提交用的文件名与载荷
    pub fn to_request(&self, mode: DocumentMode) -> Result<(String, DocumentPayload)> {
        match mode {
            DocumentMode::Text => {
                if self.file_name.trim().is_empty() {
                    return Err(KbError::Validation {
                        message: "请输入文件名称".to_string(),
                    });
                }
                if self.file_text.trim().is_empty() {
                    return Err(KbError::Validation {
                        message: "请输入文本内容".to_string(),
                    });
                }
                Ok((
                    self.file_name.trim().to_string(),
                    DocumentPayload::Text {
                        content: self.file_text.clone(),
                    },
                ))
            }
            DocumentMode::File => {
                let raw = self.file_path.trim();
                if raw.is_empty() {
                    return Err(KbError::Validation {
                        message: "请选择要上传的文件".to_string(),
                    });
                }
                let path = PathBuf::from(raw);
                let file_name = match self.file_name.trim() {
                    "" => default_file_name(&path),
                    name => name.to_string(),
                };
                Ok((file_name, DocumentPayload::File { path }))
            }
        }
    }
}

fn default_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 添加文件流程的唯一状态，取代多个布尔开关
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AddDocumentState {
    #[default]
    Closed,
    SelectingType,
    Editing {
        mode: DocumentMode,
        draft: DocumentDraft,
    },
    Submitting {
        mode: DocumentMode,
        draft: DocumentDraft,
    },
}

impl AddDocumentState {
    pub fn is_dialog_open(&self) -> bool {
        matches!(self, Self::Editing { .. } | Self::Submitting { .. })
    }

    pub fn is_options_open(&self) -> bool {
        matches!(self, Self::SelectingType)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting { .. })
    }

    pub fn mode(&self) -> Option<DocumentMode> {
        match self {
            Self::Editing { mode, .. } | Self::Submitting { mode, .. } => Some(*mode),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&DocumentDraft> {
        match self {
            Self::Editing { draft, .. } | Self::Submitting { draft, .. } => Some(draft),
            _ => None,
        }
    }
}
