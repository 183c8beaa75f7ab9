//! Sort direction and the header-click toggle shared by link and click views.

use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Asc),
            "desc" | "descending" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    /// Orient an ascending comparison result.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }

    /// Arrow shown next to a sortable column header.
    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Asc => "↑",
            SortOrder::Desc => "↓",
        }
    }
}

/// Toggle state for a sortable column: each activation applies the current
/// order and flips it for the next one. Starts ascending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortToggle {
    next: SortOrder,
}

impl SortToggle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order the next activation will apply.
    pub fn next(&self) -> SortOrder {
        self.next
    }

    /// Return the order to apply now and flip for the next activation.
    pub fn advance(&mut self) -> SortOrder {
        let current = self.next;
        self.next = current.flipped();
        current
    }
}

/// Stable sort of `items` by `key` in the given order. Ties keep input order
/// in both directions.
pub fn sort_stable_by_key<T, K, F>(items: &mut [T], order: SortOrder, mut key: F)
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    items.sort_by(|a, b| order.apply(key(a).cmp(&key(b))));
}
