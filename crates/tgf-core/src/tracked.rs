use std::{collections::HashSet, sync::RwLock};

use crate::domain::UserId;

/// Set of sender ids whose messages are eligible for forwarding.
///
/// An owned, injectable instance (no statics): the engine holds one, tests
/// build isolated ones. Reads stay safe while an add/remove is in flight.
#[derive(Debug, Default)]
pub struct TrackedUserSet {
    inner: RwLock<HashSet<UserId>>,
}

impl TrackedUserSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            inner: RwLock::new(ids.into_iter().map(UserId).collect()),
        }
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.inner
            .read()
            .map(|set| set.contains(&user_id))
            .unwrap_or(false)
    }

    pub fn add(&self, user_id: UserId) {
        if let Ok(mut set) = self.inner.write() {
            set.insert(user_id);
        }
    }

    /// Removing an absent id is a no-op.
    pub fn remove(&self, user_id: UserId) {
        if let Ok(mut set) = self.inner.write() {
            set.remove(&user_id);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_add_remove() {
        let set = TrackedUserSet::new([1, 2]);
        assert!(set.contains(UserId(1)));
        assert!(!set.contains(UserId(3)));

        set.add(UserId(3));
        assert!(set.contains(UserId(3)));

        set.remove(UserId(1));
        assert!(!set.contains(UserId(1)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_absent_is_noop() {
        let set = TrackedUserSet::new([7]);
        set.remove(UserId(99));
        assert_eq!(set.len(), 1);
    }
}
