use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

/// In-process record of which universities have a job in flight.
#[derive(Clone, Default)]
pub struct LeaseTable {
    held: Arc<Mutex<HashSet<i64>>>,
}

/// Released on drop.
pub struct Lease {
    university_id: i64,
    held: Arc<Mutex<HashSet<i64>>>,
}

impl LeaseTable {
    pub fn new() -> Self {
        LeaseTable::default()
    }

    /// `None` if another job for `university_id` holds the lease.
    pub fn acquire(&self, university_id: i64) -> Option<Lease> {
        let mut held = self.held.lock().unwrap_or_else(|p| p.into_inner());
        match held.insert(university_id) {
            true => Some(Lease {
                university_id,
                held: self.held.clone(),
            }),
            false => None,
        }
    }

    pub fn is_held(&self, university_id: i64) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&university_id)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.university_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_is_exclusive_per_university() {
        let table = LeaseTable::new();

        let first = table.acquire(1);
        assert!(first.is_some());
        assert!(table.acquire(1).is_none());
        assert!(table.acquire(2).is_some());

        drop(first);
        assert!(!table.is_held(1));
        assert!(table.acquire(1).is_some());
    }
}
