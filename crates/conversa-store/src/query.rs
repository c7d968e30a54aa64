use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl Pagination {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.page_size()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        let page_size = pagination.page_size() as u64;
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(page_size)
        };
        Self {
            items,
            total,
            page: pagination.page(),
            page_size: pagination.page_size(),
            total_pages,
        }
    }
}

/// Filters shared by the `/api/query/*` family of endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFilter {
    pub dialogue_id: Option<String>,
    pub session_id: Option<String>,
    pub turn_id: Option<String>,
    pub sender_role: Option<String>,
    pub content_type: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DialogueFilter {
    pub dialogue_type: Option<String>,
    pub human_id: Option<String>,
    pub ai_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnFilter {
    pub dialogue_id: Option<String>,
    pub session_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilter {
    pub dialogue_id: Option<String>,
    pub open_only: Option<bool>,
}
