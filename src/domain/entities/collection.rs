//! Duplicate-free, newest-first notification collection.

use std::collections::{HashSet, VecDeque};

use super::{NotificationId, NotificationRecord};

/// Result of merging one pushed record into a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Record was new and has been prepended.
    Inserted,
    /// A record with the same id already exists or was deleted; nothing changed.
    Duplicate,
    /// Payload could not be turned into a record; nothing changed.
    Rejected,
}

impl MergeOutcome {
    /// Whether the collection changed.
    #[must_use]
    pub const fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Result of removing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Record was present and has been removed.
    Removed {
        /// Whether the removed record counted towards the unread total.
        was_unread: bool,
    },
    /// No record with that id was present.
    NotPresent,
}

/// Notifications for one view, newest first.
///
/// Ids are unique and `unread_count` always equals the number of unread
/// records. Deleted ids never come back.
#[derive(Debug, Clone, Default)]
pub struct NotificationCollection {
    records: VecDeque<NotificationRecord>,
    ids: HashSet<NotificationId>,
    deleted: HashSet<NotificationId>,
    unread_count: usize,
}

impl NotificationCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with a fetched sequence.
    ///
    /// Order is kept as given. Repeated ids keep their first occurrence and
    /// ids deleted earlier are skipped.
    pub fn replace(&mut self, records: impl IntoIterator<Item = NotificationRecord>) {
        self.records.clear();
        self.ids.clear();
        self.unread_count = 0;

        for record in records {
            if self.deleted.contains(record.id()) {
                continue;
            }
            if self.ids.insert(record.id().clone()) {
                if !record.is_read() {
                    self.unread_count += 1;
                }
                self.records.push_back(record);
            }
        }
    }

    /// Prepends a record unless its id is already present or was deleted.
    pub fn merge(&mut self, record: NotificationRecord) -> MergeOutcome {
        if self.deleted.contains(record.id()) || !self.ids.insert(record.id().clone()) {
            return MergeOutcome::Duplicate;
        }

        if !record.is_read() {
            self.unread_count += 1;
        }
        self.records.push_front(record);
        MergeOutcome::Inserted
    }

    /// Marks a single record read. Returns `true` if it was unread.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        let was_unread = self
            .records
            .iter_mut()
            .find(|record| record.id() == id)
            .is_some_and(NotificationRecord::mark_read);

        if was_unread {
            self.unread_count = self.unread_count.saturating_sub(1);
        }
        was_unread
    }

    /// Marks every record read. Returns how many were unread.
    pub fn mark_all_read(&mut self) -> usize {
        let previously_unread = self.unread_count;
        for record in &mut self.records {
            record.mark_read();
        }
        self.unread_count = 0;
        previously_unread
    }

    /// Removes a record, adjusting the unread count if it was unread.
    ///
    /// The id is remembered even when no record is present, so a late push
    /// or reload cannot bring it back.
    pub fn remove(&mut self, id: &NotificationId) -> DeleteOutcome {
        self.deleted.insert(id.clone());

        let Some(index) = self.records.iter().position(|record| record.id() == id) else {
            return DeleteOutcome::NotPresent;
        };

        let was_unread = !self.records[index].is_read();
        self.records.remove(index);
        self.ids.remove(id);

        if was_unread {
            self.unread_count = self.unread_count.saturating_sub(1);
        }
        DeleteOutcome::Removed { was_unread }
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: &NotificationId) -> Option<&NotificationRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    /// Whether a record with `id` is present.
    #[must_use]
    pub fn contains(&self, id: &NotificationId) -> bool {
        self.ids.contains(id)
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter()
    }

    /// Newest record.
    #[must_use]
    pub fn latest(&self) -> Option<&NotificationRecord> {
        self.records.front()
    }

    /// Number of unread records.
    #[must_use]
    pub const fn unread_count(&self) -> usize {
        self.unread_count
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
