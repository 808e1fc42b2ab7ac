//! Smallest-mailbox pooling

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendError, TrySendError};

/// Handle to one pool member's mailbox.
///
/// Backlog is read straight off the bounded channel, so no side-band
/// counters have to stay in sync with it.
#[derive(Debug)]
pub struct Mailbox<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Mailbox<T> {
    pub fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }

    /// Messages currently queued for this member.
    pub fn backlog(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Enqueue without waiting; fails when the mailbox is full or closed.
    pub fn try_deliver(&self, msg: T) -> Result<(), TrySendError<T>> {
        self.tx.try_send(msg)
    }

    /// Enqueue, waiting for mailbox space.
    pub async fn deliver(&self, msg: T) -> Result<(), SendError<T>> {
        self.tx.send(msg).await
    }
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// Fixed pool of identical members; each message goes to the member with
/// the smallest backlog. Pure selection, no business logic.
#[derive(Debug)]
pub struct LeastLoaded<T> {
    members: Vec<Mailbox<T>>,
}

impl<T> LeastLoaded<T> {
    pub fn new(members: Vec<Mailbox<T>>) -> Self {
        Self { members }
    }

    pub fn select(&self) -> Option<&Mailbox<T>> {
        self.members.iter().min_by_key(|m| m.backlog())
    }

    pub fn members(&self) -> &[Mailbox<T>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<T> Clone for LeastLoaded<T> {
    fn clone(&self) -> Self {
        Self {
            members: self.members.clone(),
        }
    }
}
