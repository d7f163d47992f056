//! Optimistic cache of the grouped board view.
//!
//! The engine is pure and synchronous: [`CacheEngine::begin`] applies a
//! mutation locally and hands back what to submit, and the caller reports the
//! outcome through [`CacheEngine::confirm`] or [`CacheEngine::rollback`].
//! Changes pushed by the server go through [`CacheEngine::apply_remote`],
//! which never snapshots and never rolls back.
//!
//! Local reconciliation by kind:
//!
//! | kind   | local change                         | on failure          |
//! |--------|--------------------------------------|---------------------|
//! | create | prepend provisional record           | remove provisional  |
//! | update | replace in place across all lanes    | restore snapshot    |
//! | move   | remove everywhere, prepend to target | restore snapshot    |

use tindur_core::{
    ChangeEvent, ChangeKind, CreateRecordRequest, GroupedView, Lane, ListFilter, NewRecord,
    Record, RecordId, UpdateRecordRequest,
};
use tracing::debug;

/// A change the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationIntent {
    Create(NewRecord),
    /// Replace every editable field with the given record's values. Counts as
    /// a move when the lane differs from the cached one.
    Update(Record),
    Move { record: Record, target: Lane },
}

/// What to send to the server for a started mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(CreateRecordRequest),
    Update {
        id: RecordId,
        request: UpdateRecordRequest,
    },
}

/// The grouped view as it was right before a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(GroupedView);

impl Snapshot {
    pub fn view(&self) -> &GroupedView {
        &self.0
    }
}

/// A mutation applied locally and awaiting the server's answer.
#[must_use = "a pending mutation must be confirmed or rolled back"]
#[derive(Debug, Clone)]
pub struct PendingMutation {
    kind: ChangeKind,
    id: RecordId,
    snapshot: Snapshot,
}

impl PendingMutation {
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// The record's id in the local view; provisional for creates.
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[derive(Debug, Clone)]
pub struct CacheEngine {
    view: GroupedView,
    filter: ListFilter,
    next_provisional: i64,
}

impl CacheEngine {
    pub fn new(filter: ListFilter) -> Self {
        Self {
            view: GroupedView::new(),
            filter,
            next_provisional: -1,
        }
    }

    pub fn view(&self) -> &GroupedView {
        &self.view
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    /// Swap in a freshly fetched view.
    pub fn replace_view(&mut self, view: GroupedView) {
        self.view = view;
    }

    /// Apply `intent` optimistically.
    pub fn begin(&mut self, intent: MutationIntent) -> (PendingMutation, Submission) {
        let snapshot = Snapshot(self.view.clone());

        match intent {
            MutationIntent::Create(payload) => {
                let id = self.provisional_id();
                let submission = Submission::Create(CreateRecordRequest::from(&payload));
                self.view.prepend(payload.into_record(id));
                let pending = PendingMutation {
                    kind: ChangeKind::Create,
                    id,
                    snapshot,
                };
                (pending, submission)
            }
            MutationIntent::Update(record) => {
                let cached_lane = self.view.find(record.id).map(|(lane, _)| lane);
                let kind = match cached_lane {
                    Some(lane) if lane != record.lane => ChangeKind::Move,
                    _ => ChangeKind::Update,
                };
                let submission = Submission::Update {
                    id: record.id,
                    request: UpdateRecordRequest::from_record(&record),
                };
                let id = record.id;
                self.apply(kind, record);
                (PendingMutation { kind, id, snapshot }, submission)
            }
            MutationIntent::Move { mut record, target } => {
                record.lane = target;
                let id = record.id;
                let submission = Submission::Update {
                    id,
                    request: UpdateRecordRequest::move_to(target),
                };
                self.apply(ChangeKind::Move, record);
                let pending = PendingMutation {
                    kind: ChangeKind::Move,
                    id,
                    snapshot,
                };
                (pending, submission)
            }
        }
    }

    /// Adopt the server's version of a mutated record.
    pub fn confirm(&mut self, pending: PendingMutation, server: &Record) {
        match pending.kind {
            ChangeKind::Create => {
                if self.view.contains(server.id) {
                    // Already delivered by a refetch.
                    self.view.remove(pending.id);
                } else if !self.view.replace(pending.id, server) {
                    self.view.prepend(server.clone());
                }
            }
            ChangeKind::Update | ChangeKind::Move => match self.view.find(server.id) {
                Some((lane, _)) if lane == server.lane => {
                    self.view.replace(server.id, server);
                }
                Some(_) => {
                    self.view.remove(server.id);
                    self.view.prepend(server.clone());
                }
                None => {}
            },
        }
        debug!(kind = %pending.kind, id = %server.id, "Mutation confirmed");
    }

    /// Undo a mutation the server rejected.
    pub fn rollback(&mut self, pending: PendingMutation) {
        debug!(kind = %pending.kind, id = %pending.id, "Rolling back mutation");
        match pending.kind {
            ChangeKind::Create => {
                self.view.remove(pending.id);
            }
            ChangeKind::Update | ChangeKind::Move => {
                self.view = pending.snapshot.0;
            }
        }
    }

    /// Apply a change another session made. The record is already committed.
    pub fn apply_remote(&mut self, event: &ChangeEvent) {
        let record = &event.record;
        if !self.filter.matches(record) {
            self.view.remove(record.id);
            return;
        }

        match event.kind {
            ChangeKind::Create => {
                self.view.remove(record.id);
                self.view.prepend(record.clone());
            }
            ChangeKind::Update => match self.view.find(record.id) {
                Some((lane, _)) if lane == record.lane => {
                    self.view.replace(record.id, record);
                }
                Some(_) | None => {
                    self.view.remove(record.id);
                    self.view.prepend(record.clone());
                }
            },
            ChangeKind::Move => self.apply(ChangeKind::Move, record.clone()),
        }
    }

    fn apply(&mut self, kind: ChangeKind, record: Record) {
        match kind {
            ChangeKind::Move => {
                self.view.remove(record.id);
                self.view.prepend(record);
            }
            _ => {
                self.view.replace(record.id, &record);
            }
        }
    }

    fn provisional_id(&mut self) -> RecordId {
        let id = RecordId(self.next_provisional);
        self.next_provisional -= 1;
        id
    }
}
