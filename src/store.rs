//! Record store contract and change-event plumbing.
//!
//! The ledger only talks to storage through [`RecordStore`]. Every successful
//! write is echoed to subscribers of the affected entity as a [`ChangeEvent`],
//! which is how the ledger's local snapshot learns about both its own writes
//! and writes made by anyone else sharing the store.

use std::cell::RefCell;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::Result;
use crate::models::{Entity, NewRecord, Patch, Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Record,
}

/// Receiving end of a change feed for one entity. Dropping it unsubscribes.
pub struct Subscription {
    entity: Entity,
    rx: Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Events delivered since the last drain, without blocking.
    pub fn pending(&self) -> Vec<ChangeEvent> {
        self.rx.try_iter().collect()
    }

    pub fn unsubscribe(self) {}
}

/// Fan-out of change events to live subscriptions. Closed receivers are
/// pruned on the next publish.
#[derive(Default)]
pub struct Subscribers {
    senders: RefCell<Vec<(Entity, Sender<ChangeEvent>)>>,
}

impl Subscribers {
    pub fn subscribe(&self, entity: Entity) -> Subscription {
        let (tx, rx) = channel();
        self.senders.borrow_mut().push((entity, tx));
        Subscription { entity, rx }
    }

    pub fn publish(&self, kind: ChangeKind, record: &Record) {
        let entity = record.entity();
        self.senders.borrow_mut().retain(|(e, tx)| {
            *e != entity
                || tx
                    .send(ChangeEvent {
                        kind,
                        record: record.clone(),
                    })
                    .is_ok()
        });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.senders.borrow().len()
    }
}

pub trait RecordStore {
    fn list(&self, entity: Entity) -> Result<Vec<Record>>;

    fn insert(&self, record: NewRecord) -> Result<Record>;

    fn insert_many(&self, records: Vec<NewRecord>) -> Result<Vec<Record>> {
        records.into_iter().map(|r| self.insert(r)).collect()
    }

    /// Fails with `NotFound` when no record has `id`.
    fn update(&self, entity: Entity, id: RecordId, patch: Patch) -> Result<Record>;

    /// Returns the removed record. Fails with `NotFound` when no record has `id`.
    fn delete(&self, entity: Entity, id: RecordId) -> Result<Record>;

    fn subscribe(&self, entity: Entity) -> Subscription;
}
