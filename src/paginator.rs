use crate::domain::EngineError;

pub const DEFAULT_PAGE_SIZES: [usize; 3] = [5, 10, 25];

pub fn page<T>(items: &[T], page_index: usize, page_size: usize) -> &[T] {
    let start = page_index.saturating_mul(page_size);
    if page_size == 0 || start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        len.div_ceil(page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    page_index: usize,
    page_size: usize,
    allowed_sizes: Vec<usize>,
}

impl Pagination {
    pub fn new(allowed_sizes: Vec<usize>, page_size: usize) -> Result<Self, EngineError> {
        let mut pagination = Self {
            page_index: 0,
            page_size: 0,
            allowed_sizes,
        };
        pagination.set_page_size(page_size)?;
        Ok(pagination)
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn allowed_sizes(&self) -> &[usize] {
        &self.allowed_sizes
    }

    /// Not clamped, a page past the end is valid and empty.
    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), EngineError> {
        if page_size == 0 || !self.allowed_sizes.contains(&page_size) {
            return Err(EngineError::InvalidPageSize {
                size: page_size,
                allowed: self.allowed_sizes.clone(),
            });
        }
        self.page_size = page_size;
        self.page_index = 0;
        Ok(())
    }

    pub fn grow(&mut self) -> Result<(), EngineError> {
        let next = self.allowed_sizes.iter().copied().filter(|s| *s > self.page_size).min();
        match next {
            Some(size) => self.set_page_size(size),
            None => Ok(()),
        }
    }

    pub fn shrink(&mut self) -> Result<(), EngineError> {
        let prev = self.allowed_sizes.iter().copied().filter(|s| *s < self.page_size).max();
        match prev {
            Some(size) => self.set_page_size(size),
            None => Ok(()),
        }
    }

    pub fn reset(&mut self) {
        self.page_index = 0;
    }

    pub fn page_count(&self, len: usize) -> usize {
        page_count(len, self.page_size)
    }

    pub fn has_next(&self, len: usize) -> bool {
        self.page_index.saturating_add(1) < self.page_count(len)
    }

    pub fn has_prev(&self) -> bool {
        self.page_index > 0
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        page(items, self.page_index, self.page_size)
    }

    pub fn page_info(&self, len: usize) -> String {
        let total = self.page_count(len);
        if total == 0 {
            "No pages".to_string()
        } else if self.page_index >= total {
            format!("Page - of {total}")
        } else {
            format!("Page {} of {}", self.page_index + 1, total)
        }
    }

    pub fn range_info(&self, len: usize) -> String {
        let start = self.page_index.saturating_mul(self.page_size);
        if start >= len {
            return format!("0 of {len}");
        }
        let end = start.saturating_add(self.page_size).min(len);
        format!("{}-{} of {}", start + 1, end, len)
    }
}
