//! Most-recently-used categories, for quick reselection.

use crate::category::CategoryId;
use std::collections::VecDeque;

pub const DEFAULT_RECENT_CAPACITY: usize = 5;

/// Bounded MRU list, most recent first. Re-adding moves an entry to the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentCategories {
    entries: VecDeque<CategoryId>,
    capacity: usize,
}

impl Default for RecentCategories {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RECENT_CAPACITY)
    }
}

impl RecentCategories {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn touch(&mut self, id: CategoryId) {
        if let Some(pos) = self.entries.iter().position(|e| *e == id) {
            self.entries.remove(pos);
        }
        self.entries.push_front(id);
        self.entries.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.entries.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(recent: &RecentCategories) -> Vec<usize> {
        recent.iter().map(CategoryId::index).collect()
    }

    #[test]
    fn newest_first() {
        let mut recent = RecentCategories::default();
        recent.touch(CategoryId(1));
        recent.touch(CategoryId(2));
        assert_eq!(ids(&recent), vec![2, 1]);
    }

    #[test]
    fn retouch_moves_to_front_without_duplicating() {
        let mut recent = RecentCategories::default();
        for i in [1, 2, 3] {
            recent.touch(CategoryId(i));
        }
        recent.touch(CategoryId(1));
        assert_eq!(ids(&recent), vec![1, 3, 2]);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut recent = RecentCategories::default();
        for i in 0..7 {
            recent.touch(CategoryId(i));
        }
        assert_eq!(recent.len(), DEFAULT_RECENT_CAPACITY);
        assert_eq!(ids(&recent), vec![6, 5, 4, 3, 2]);
    }

    #[test]
    fn zero_capacity_stays_empty() {
        let mut recent = RecentCategories::with_capacity(0);
        recent.touch(CategoryId(0));
        assert!(recent.is_empty());
    }
}
