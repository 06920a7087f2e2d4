use serde::{Deserialize, Serialize};

pub const ADD_SUCCESS_TITLE: &str = "添加文件成功";
pub const ADD_SUCCESS_DESCRIPTION: &str = "文件已添加";
pub const ADD_FAILURE_TITLE: &str = "添加文件失败";
pub const REQUEST_FAILED_DESCRIPTION: &str = "请求出错，请稍后重试";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// 一条短暂显示的提示（toast）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub variant: NotificationVariant,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn success(title: &str, description: &str) -> Self {
        Self {
            variant: NotificationVariant::Default,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn failure(title: &str, description: impl Into<String>) -> Self {
        Self {
            variant: NotificationVariant::Destructive,
            title: title.to_string(),
            description: description.into(),
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == NotificationVariant::Destructive
    }
}
