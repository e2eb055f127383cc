use serde::{Deserialize, Serialize};

/// Zero-based page request. A page size of 0 means unpaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub fn unpaged() -> Self {
        Self::default()
    }

    pub fn is_unpaged(&self) -> bool {
        self.page_size == 0
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    pub total_items: u64,
}

impl<T> Page<T> {
    /// Cut a page out of an already ordered, complete result set.
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = all.len() as u64;
        let items = if request.is_unpaged() {
            all
        } else {
            all.into_iter()
                .skip(request.offset() as usize)
                .take(request.page_size as usize)
                .collect()
        };
        Self {
            items,
            request,
            total_items,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.request.is_unpaged() {
            1
        } else {
            self.total_items.div_ceil(u64::from(self.request.page_size))
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            request: self.request,
            total_items: self.total_items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedMetadata {
    pub page: u32,
    pub page_size: u32,
    pub last_page: u64,
    pub total_items: u64,
}

/// Paged response body: `{ payload, metadata }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedContent<T> {
    pub payload: Vec<T>,
    pub metadata: PagedMetadata,
}

impl<T> PagedContent<T> {
    /// Pair a (possibly re-ordered) payload with the metadata of `page`.
    pub fn new<S>(payload: Vec<T>, page: &Page<S>) -> Self {
        let page_size = if page.request.is_unpaged() {
            page.total_items as u32
        } else {
            page.request.page_size
        };
        Self {
            payload,
            metadata: PagedMetadata {
                page: page.request.page,
                page_size,
                last_page: page.total_pages(),
                total_items: page.total_items,
            },
        }
    }
}
