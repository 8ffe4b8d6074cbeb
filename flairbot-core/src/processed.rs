use std::collections::HashSet;
use tracing::debug;

/// Size above which the set is trimmed between cycles.
pub const PROCESSED_CEILING: usize = 200;

/// Number of oldest entries dropped by a trim.
pub const PROCESSED_TRIM_OFFSET: usize = 99;

/// Fullnames of listing items that discovery has already looked at, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    order: Vec<String>,
    index: HashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.index.contains(fullname)
    }

    /// Records `fullname`; returns `false` if it was already present.
    pub fn insert(&mut self, fullname: impl Into<String>) -> bool {
        let fullname = fullname.into();
        if self.index.contains(&fullname) {
            return false;
        }
        self.index.insert(fullname.clone());
        self.order.push(fullname);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Bounds the set once it grows past [`PROCESSED_CEILING`].
    ///
    /// Keeps entries `PROCESSED_TRIM_OFFSET..len - 1`: the oldest 99 entries and
    /// the single newest entry are dropped. Returns how many entries were removed.
    pub fn trim(&mut self) -> usize {
        let len = self.order.len();
        if len <= PROCESSED_CEILING {
            return 0;
        }

        let kept: Vec<String> = self.order[PROCESSED_TRIM_OFFSET..len - 1].to_vec();
        self.index = kept.iter().cloned().collect();
        self.order = kept;

        let removed = len - self.order.len();
        debug!(
            "Trimmed processed set from {} to {} entries",
            len,
            self.order.len()
        );
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> ProcessedSet {
        let mut set = ProcessedSet::new();
        for i in 0..n {
            set.insert(format!("t1_{}", i));
        }
        set
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = ProcessedSet::new();
        assert!(set.insert("t1_a"));
        assert!(!set.insert("t1_a"));
        assert_eq!(set.len(), 1);
        assert!(set.contains("t1_a"));
    }

    #[test]
    fn test_no_trim_at_ceiling() {
        let mut set = filled(PROCESSED_CEILING);
        assert_eq!(set.trim(), 0);
        assert_eq!(set.len(), PROCESSED_CEILING);
    }

    #[test]
    fn test_trim_keeps_reference_window() {
        let mut set = filled(201);
        assert_eq!(set.trim(), 100);
        assert_eq!(set.len(), 101);

        // Oldest 99 are gone, entry 99 is now the oldest.
        assert!(!set.contains("t1_98"));
        assert_eq!(set.iter().next(), Some("t1_99"));
        // The newest entry is dropped as well.
        assert!(!set.contains("t1_200"));
        assert_eq!(set.iter().last(), Some("t1_199"));
    }

    #[test]
    fn test_trimmed_entries_can_be_reinserted() {
        let mut set = filled(250);
        set.trim();
        assert!(set.insert("t1_0"));
        assert!(set.insert("t1_249"));
        assert!(!set.insert("t1_150"));
    }
}
