//! Pagination over an already-ordered sequence.

use serde::Serialize;

use crate::{CoreError, ValidationError};

/// One page of a paginated view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number this slice represents.
    pub page: usize,
    pub total_pages: usize,
}

/// `ceil(len / page_size)`.
pub fn total_pages(len: usize, page_size: usize) -> Result<usize, ValidationError> {
    if page_size == 0 {
        return Err(ValidationError::ZeroPageSize);
    }
    Ok(len.div_ceil(page_size))
}

/// Slice out page `page` (1-based).
///
/// Pages outside `[1, total_pages]` are rejected rather than clamped; moving
/// between pages is the caller's concern.
///
/// The one exception: an empty input has `total_pages == 0` yet still accepts
/// page 1, returned as an empty page. Every other page of an empty input is
/// out of range.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Result<Page<T>, CoreError> {
    let total = total_pages(items.len(), page_size)?;
    if total == 0 && page == 1 {
        return Ok(Page {
            items: Vec::new(),
            page,
            total_pages: 0,
        });
    }
    if page == 0 || page > total {
        return Err(CoreError::PageOutOfRange {
            page,
            total_pages: total,
        });
    }
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(items.len());
    Ok(Page {
        items: items[start..end].to_vec(),
        page,
        total_pages: total,
    })
}
