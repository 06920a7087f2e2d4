use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// 分页组件可选的每页条数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    pub const OPTIONS: [u32; 4] = [10, 20, 30, 50];

    pub fn new(size: u32) -> Result<Self> {
        if Self::OPTIONS.contains(&size) {
            Ok(Self(size))
        } else {
            Err(Error::InvalidRequest {
                reason: format!("page_size must be one of {:?}, got {}", Self::OPTIONS, size),
            })
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<u32> for PageSize {
    type Error = Error;

    fn try_from(size: u32) -> Result<Self> {
        Self::new(size)
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> u32 {
        size.0
    }
}

/// 分页状态。总页数为派生值，当前页始终保持在 `[1, total_pages]` 内。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    current_page: u32,
    page_size: PageSize,
    total_items: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

impl Pagination {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            current_page: 1,
            page_size,
            total_items: 0,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    /// 向上取整；没有数据时仍为 1 页
    pub fn total_pages(&self) -> u32 {
        let size = u64::from(self.page_size.get());
        let pages = self.total_items.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// 返回当前页是否发生变化
    pub fn set_page(&mut self, page: u32) -> bool {
        let clamped = page.clamp(1, self.total_pages());
        let changed = clamped != self.current_page;
        self.current_page = clamped;
        changed
    }

    /// 修改每页条数后重新夹紧当前页；返回当前页或每页条数是否变化
    pub fn set_page_size(&mut self, size: PageSize) -> bool {
        let size_changed = size != self.page_size;
        self.page_size = size;
        let page_changed = self.clamp();
        size_changed || page_changed
    }

    /// 更新总条数；返回当前页是否因此被夹紧
    pub fn set_total_items(&mut self, total: u64) -> bool {
        self.total_items = total;
        self.clamp()
    }

    fn clamp(&mut self) -> bool {
        self.set_page(self.current_page)
    }
}
