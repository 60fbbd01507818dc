//! Temporal axis.
//!
//! Follows one node key through the revisions of a resource and yields a
//! fresh cursor for every revision in which the node exists. Revisions
//! where the node is absent are skipped. The axis is lazy and cannot be
//! restarted; the latest revision is re-read on every step, so commits made
//! while iterating are picked up by a future axis.

use std::iter::FusedIterator;

use revtree_common::RevtreeResult;
use tracing::trace;

use crate::cursor::NodeReadCursor;
use crate::resource::ResourceSession;

/// Whether the source revision is part of the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeSelf {
    /// Start at the source revision.
    Yes,
    /// Start next to the source revision.
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Future,
    Past,
}

/// Iterator over the revisions holding one node.
#[derive(Debug)]
pub struct TemporalAxis {
    session: ResourceSession,
    node_key: i64,
    direction: Direction,
    next: Option<u32>,
}

impl TemporalAxis {
    fn new(session: ResourceSession, node_key: i64, direction: Direction, start: Option<u32>) -> Self {
        Self {
            session,
            node_key,
            direction,
            next: start,
        }
    }

    /// Revisions after the cursor's, up to the latest.
    pub fn future(cursor: &NodeReadCursor, include_self: IncludeSelf) -> RevtreeResult<Self> {
        let revision = cursor.revision_number()?;
        let start = match include_self {
            IncludeSelf::Yes => Some(revision),
            IncludeSelf::No => revision.checked_add(1),
        };
        Ok(Self::new(
            cursor.session().clone(),
            cursor.node_key()?,
            Direction::Future,
            start,
        ))
    }

    /// Revisions before the cursor's, down to revision 0.
    pub fn past(cursor: &NodeReadCursor, include_self: IncludeSelf) -> RevtreeResult<Self> {
        let revision = cursor.revision_number()?;
        let start = match include_self {
            IncludeSelf::Yes => Some(revision),
            IncludeSelf::No => revision.checked_sub(1),
        };
        Ok(Self::new(
            cursor.session().clone(),
            cursor.node_key()?,
            Direction::Past,
            start,
        ))
    }

    /// Every revision from 0 to the latest.
    pub fn all_time(cursor: &NodeReadCursor) -> RevtreeResult<Self> {
        Ok(Self::new(
            cursor.session().clone(),
            cursor.node_key()?,
            Direction::Future,
            Some(0),
        ))
    }

    /// The node key being followed.
    pub fn node_key(&self) -> i64 {
        self.node_key
    }
}

impl Iterator for TemporalAxis {
    type Item = RevtreeResult<NodeReadCursor>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let revision = self.next?;

            match self.direction {
                Direction::Future => {
                    let latest = match self.session.latest_revision() {
                        Ok(latest) => latest,
                        Err(e) => {
                            self.next = None;
                            return Some(Err(e));
                        }
                    };
                    if revision > latest {
                        self.next = None;
                        return None;
                    }
                    self.next = revision.checked_add(1);
                }
                Direction::Past => self.next = revision.checked_sub(1),
            }

            let mut cursor = match self.session.begin_node_read_trx(revision) {
                Ok(cursor) => cursor,
                Err(e) => {
                    self.next = None;
                    return Some(Err(e));
                }
            };
            match cursor.move_to(self.node_key) {
                Ok(moved) if moved.has_moved() => return Some(Ok(cursor)),
                Ok(_) => {
                    trace!(revision, node_key = self.node_key, "node absent, skipping revision");
                    cursor.close();
                }
                Err(e) => {
                    self.next = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl FusedIterator for TemporalAxis {}

#[cfg(test)]
mod tests {
    use super::*;
    use revtree_common::config::ResourceConfig;
    use revtree_common::{NodeKind, DOCUMENT_NODE_KEY};
    use revtree_storage::{CommitCredentials, NameFields, Node};

    /// Revision 1 adds element 1, revision 2 keeps it, revision 3 removes it.
    fn session() -> ResourceSession {
        let session = ResourceSession::in_memory(ResourceConfig::default()).unwrap();

        let mut committer = session.begin_commit().unwrap();
        let name = committer.intern_name("e", NodeKind::Element).unwrap();
        let mut root = committer.node(DOCUMENT_NODE_KEY).unwrap().unwrap();
        if let Some(s) = root.structure_mut() {
            s.first_child_key = 1;
            s.child_count = 1;
            s.descendant_count = 1;
        }
        committer.put_node(root).unwrap();
        committer
            .put_node(Node::element(1, DOCUMENT_NODE_KEY, NameFields::local(name)))
            .unwrap();
        committer.commit(CommitCredentials::default()).unwrap();

        let committer = session.begin_commit().unwrap();
        committer.commit(CommitCredentials::default()).unwrap();

        let mut committer = session.begin_commit().unwrap();
        committer.remove_node(1).unwrap();
        let mut root = committer.node(DOCUMENT_NODE_KEY).unwrap().unwrap();
        if let Some(s) = root.structure_mut() {
            *s = revtree_storage::StructFields::NULL;
        }
        committer.put_node(root).unwrap();
        committer.commit(CommitCredentials::default()).unwrap();
        session
    }

    fn revisions(axis: TemporalAxis) -> Vec<u32> {
        axis.map(|cursor| cursor.unwrap().revision_number().unwrap())
            .collect()
    }

    #[test]
    fn test_future_skips_deletion() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(1).unwrap();
        cursor.move_to(1).unwrap();

        assert_eq!(
            revisions(TemporalAxis::future(&cursor, IncludeSelf::No).unwrap()),
            vec![2]
        );
        assert_eq!(
            revisions(TemporalAxis::future(&cursor, IncludeSelf::Yes).unwrap()),
            vec![1, 2]
        );
    }

    #[test]
    fn test_past() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(2).unwrap();
        cursor.move_to(1).unwrap();

        assert_eq!(
            revisions(TemporalAxis::past(&cursor, IncludeSelf::No).unwrap()),
            vec![1]
        );
        assert_eq!(
            revisions(TemporalAxis::past(&cursor, IncludeSelf::Yes).unwrap()),
            vec![2, 1]
        );
    }

    #[test]
    fn test_all_time_for_root() {
        let session = session();
        let cursor = session.begin_node_read_trx(3).unwrap();
        assert_eq!(
            revisions(TemporalAxis::all_time(&cursor).unwrap()),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_yielded_cursors_sit_on_node() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(1).unwrap();
        cursor.move_to(1).unwrap();

        for found in TemporalAxis::all_time(&cursor).unwrap() {
            let found = found.unwrap();
            assert_eq!(found.node_key().unwrap(), 1);
            assert!(found.is_element().unwrap());
        }
        // Skipped revisions released their readers.
        assert_eq!(session.active_reader_count(), 1);
    }

    #[test]
    fn test_past_from_revision_zero_is_empty() {
        let session = session();
        let cursor = session.begin_node_read_trx(0).unwrap();
        let mut axis = TemporalAxis::past(&cursor, IncludeSelf::No).unwrap();
        assert!(axis.next().is_none());
        assert!(axis.next().is_none());
    }

    #[test]
    fn test_closed_source_fails() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(0).unwrap();
        cursor.close();
        assert!(TemporalAxis::future(&cursor, IncludeSelf::No).is_err());
    }
}
