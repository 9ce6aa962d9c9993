use parking_lot::RwLock;

use crate::record::RunRecord;

/// Append-only log of run results. Entries are never mutated; the log is
/// emptied only by [`ResultsLog::clear`].
#[derive(Debug, Default)]
pub struct ResultsLog {
    records: RwLock<Vec<RunRecord>>,
}

impl ResultsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: impl Into<RunRecord>) {
        self.records.write().push(record.into());
    }

    pub fn snapshot(&self) -> Vec<RunRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}
