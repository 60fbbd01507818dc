//! The node read cursor.
//!
//! A [`NodeReadCursor`] is bound to one revision and always sits on a node,
//! starting at the document root. Moves resolve their target through the
//! cursor's [`PageReadTrx`]; a target that is missing or unreadable leaves
//! the cursor where it was and reports [`Move::NotMoved`].
//!
//! Names are resolved per partition of the name dictionary: local names and
//! prefixes under the node's own kind, namespace URIs under
//! [`NodeKind::Namespace`]. A namespace node's prefix lives in the
//! `Namespace` partition and its value is the URI.
//!
//! The probe methods (`*_kind`, `*_dewey_id`) read neighbours directly and
//! never change the current node.

use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;
use revtree_common::{
    NodeKind, RevtreeError, RevtreeResult, TrxId, DOCUMENT_NODE_KEY, NULL_NAME_KEY, NULL_NODE_KEY,
};
use revtree_storage::name::name_key;
use revtree_storage::{CommitCredentials, DeweyId, Node, PageReadTrx, QName};
use tracing::{debug, trace};

use crate::item_list::ItemList;
use crate::movement::Move;
use crate::resource::ResourceSession;

/// A single-threaded, revision-bound handle on a document tree.
///
/// Every method fails with `ClosedTransaction` after [`close`](Self::close).
/// Dropping the cursor closes it.
pub struct NodeReadCursor {
    session: ResourceSession,
    trx: Option<PageReadTrx>,
    revision: u32,
    current: Option<Node>,
    item_list: ItemList,
}

impl NodeReadCursor {
    pub(crate) fn new(session: ResourceSession, trx: PageReadTrx) -> RevtreeResult<Self> {
        let root = trx
            .get_node(DOCUMENT_NODE_KEY)?
            .ok_or(RevtreeError::NodeNotFound {
                node_key: DOCUMENT_NODE_KEY,
            })?;
        Ok(Self {
            session,
            revision: trx.revision_number(),
            trx: Some(trx),
            current: Some(root),
            item_list: ItemList::new(),
        })
    }

    fn trx(&self) -> RevtreeResult<&PageReadTrx> {
        self.trx.as_ref().ok_or(RevtreeError::ClosedTransaction)
    }

    fn current(&self) -> RevtreeResult<&Node> {
        self.trx()?;
        self.current.as_ref().ok_or(RevtreeError::ClosedTransaction)
    }

    /// Reads a node without moving. Misses and faults are `None`.
    fn probe(&self, key: i64) -> Option<Node> {
        if key == NULL_NODE_KEY {
            return None;
        }
        match self.trx.as_ref()?.get_node(key) {
            Ok(node) => node,
            Err(e) => {
                trace!(key, error = %e, "probe failed");
                None
            }
        }
    }

    fn last_child_key_of(&self, node: &Node) -> Option<i64> {
        if !node.structure().has_first_child() {
            return None;
        }
        let mut key = node.structure().first_child_key;
        loop {
            let child = self.probe(key)?;
            if !child.structure().has_right_sibling() {
                return Some(key);
            }
            key = child.structure().right_sibling_key;
        }
    }

    /// Right sibling of `node` or of its nearest ancestor that has one.
    fn following_key_of(&self, node: &Node) -> Option<i64> {
        if node.structure().has_right_sibling() {
            return Some(node.structure().right_sibling_key);
        }
        let mut key = node.parent_key;
        while key != NULL_NODE_KEY {
            let ancestor = self.probe(key)?;
            if ancestor.structure().has_right_sibling() {
                return Some(ancestor.structure().right_sibling_key);
            }
            key = ancestor.parent_key;
        }
        None
    }

    fn move_to_key(&mut self, key: Option<i64>) -> RevtreeResult<Move> {
        match key {
            Some(key) => self.move_to(key),
            None => Ok(Move::NotMoved),
        }
    }

    fn resolve_name(&self, trx: &PageReadTrx, node: &Node) -> Option<QName> {
        let fields = node.name_fields()?;
        let kind = node.kind();
        let lookup = |key: i32, kind: NodeKind| {
            if key == NULL_NAME_KEY {
                String::new()
            } else {
                trx.get_name(key, kind)
            }
        };
        Some(QName {
            namespace_uri: lookup(fields.uri_key, NodeKind::Namespace),
            prefix: lookup(fields.prefix_key, kind),
            local_name: lookup(fields.local_name_key, kind),
        })
    }

    // ------------------------------------------------------------------
    // Moves
    // ------------------------------------------------------------------

    /// Moves to the node stored under `key`.
    ///
    /// Negative keys address the item list. A missing node and a failed
    /// read both leave the cursor unchanged and return `NotMoved`.
    pub fn move_to(&mut self, key: i64) -> RevtreeResult<Move> {
        let trx = self.trx()?;
        if key < 0 {
            return Ok(match self.item_list.get(key) {
                Some(item) => {
                    self.current = Some(Node::atomic(key, item.value.clone(), item.type_key));
                    Move::Moved
                }
                None => Move::NotMoved,
            });
        }

        match trx.get_node(key) {
            Ok(Some(node)) => {
                self.current = Some(node);
                Ok(Move::Moved)
            }
            Ok(None) => {
                trace!(key, revision = self.revision, "node not found");
                Ok(Move::NotMoved)
            }
            Err(e) => {
                debug!(key, revision = self.revision, error = %e, "node lookup failed");
                Ok(Move::NotMoved)
            }
        }
    }

    /// Moves to the document root.
    pub fn move_to_document_root(&mut self) -> RevtreeResult<Move> {
        self.move_to(DOCUMENT_NODE_KEY)
    }

    /// Moves to the parent.
    pub fn move_to_parent(&mut self) -> RevtreeResult<Move> {
        let node = self.current()?;
        let key = node.has_parent().then_some(node.parent_key);
        self.move_to_key(key)
    }

    /// Moves to the first child.
    pub fn move_to_first_child(&mut self) -> RevtreeResult<Move> {
        let s = self.current()?.structure();
        let key = s.has_first_child().then_some(s.first_child_key);
        self.move_to_key(key)
    }

    /// Moves to the last child by walking the children.
    pub fn move_to_last_child(&mut self) -> RevtreeResult<Move> {
        let node = self.current()?;
        let key = self.last_child_key_of(node);
        self.move_to_key(key)
    }

    /// Moves to the left sibling.
    pub fn move_to_left_sibling(&mut self) -> RevtreeResult<Move> {
        let s = self.current()?.structure();
        let key = s.has_left_sibling().then_some(s.left_sibling_key);
        self.move_to_key(key)
    }

    /// Moves to the right sibling.
    pub fn move_to_right_sibling(&mut self) -> RevtreeResult<Move> {
        let s = self.current()?.structure();
        let key = s.has_right_sibling().then_some(s.right_sibling_key);
        self.move_to_key(key)
    }

    /// Moves to the attribute at `index` of the current element.
    pub fn move_to_attribute(&mut self, index: usize) -> RevtreeResult<Move> {
        let key = self.current()?.attribute_keys().get(index).copied();
        self.move_to_key(key)
    }

    /// Moves to the namespace at `index` of the current element.
    pub fn move_to_namespace(&mut self, index: usize) -> RevtreeResult<Move> {
        let key = self.current()?.namespace_keys().get(index).copied();
        self.move_to_key(key)
    }

    /// Moves to the attribute of the current element named `name`.
    pub fn move_to_attribute_by_name(&mut self, name: &QName) -> RevtreeResult<Move> {
        let trx = self.trx()?;
        let key = self.current()?.attribute_keys().iter().copied().find(|&key| {
            self.probe(key)
                .and_then(|attribute| self.resolve_name(trx, &attribute))
                .is_some_and(|resolved| resolved == *name)
        });
        self.move_to_key(key)
    }

    /// Moves to the right sibling of the current node or of its nearest
    /// ancestor that has one.
    pub fn move_to_next_following(&mut self) -> RevtreeResult<Move> {
        let node = self.current()?;
        let key = self.following_key_of(node);
        self.move_to_key(key)
    }

    /// Moves to the next node in pre-order that is not a descendant: the
    /// right sibling if there is one, otherwise the next following node.
    pub fn move_to_next(&mut self) -> RevtreeResult<Move> {
        self.move_to_next_following()
    }

    /// Moves to the previous node in pre-order: the deepest last descendant
    /// of the left sibling, or the parent if there is no left sibling.
    pub fn move_to_previous(&mut self) -> RevtreeResult<Move> {
        let node = self.current()?;
        let key = if node.structure().has_left_sibling() {
            let mut key = node.structure().left_sibling_key;
            loop {
                let Some(sibling) = self.probe(key) else {
                    break None;
                };
                match self.last_child_key_of(&sibling) {
                    Some(last) => key = last,
                    None if sibling.structure().has_first_child() => break None,
                    None => break Some(key),
                }
            }
        } else {
            node.has_parent().then_some(node.parent_key)
        };
        self.move_to_key(key)
    }

    // ------------------------------------------------------------------
    // Current node
    // ------------------------------------------------------------------

    /// Key of the current node.
    pub fn node_key(&self) -> RevtreeResult<i64> {
        Ok(self.current()?.key)
    }

    /// Kind of the current node.
    pub fn kind(&self) -> RevtreeResult<NodeKind> {
        Ok(self.current()?.kind())
    }

    /// Snapshot of the current node.
    pub fn node(&self) -> RevtreeResult<Node> {
        Ok(self.current()?.clone())
    }

    /// Resolved name of a named node.
    pub fn name(&self) -> RevtreeResult<Option<QName>> {
        let node = self.current()?;
        Ok(self.resolve_name(self.trx()?, node))
    }

    /// String value of a value node, or the URI of a namespace node.
    /// Empty for other kinds.
    pub fn value(&self) -> RevtreeResult<String> {
        Ok(self
            .raw_value()?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default())
    }

    /// Raw value bytes.
    pub fn raw_value(&self) -> RevtreeResult<Option<Bytes>> {
        let node = self.current()?;
        if node.kind() == NodeKind::Namespace {
            return Ok(self.namespace_uri()?.map(Bytes::from));
        }
        Ok(node.value().cloned())
    }

    /// Type name of the current node.
    pub fn type_name(&self) -> RevtreeResult<String> {
        let node = self.current()?;
        Ok(self.trx()?.get_name(node.type_key, node.kind()))
    }

    /// Dictionary key of the type name.
    pub fn type_key(&self) -> RevtreeResult<i32> {
        Ok(self.current()?.type_key)
    }

    /// Namespace URI key; `NULL_NAME_KEY` for unnamed kinds.
    pub fn uri_key(&self) -> RevtreeResult<i32> {
        Ok(self.current()?.name_fields().map_or(NULL_NAME_KEY, |n| n.uri_key))
    }

    /// Prefix key; `NULL_NAME_KEY` for unnamed kinds.
    pub fn prefix_key(&self) -> RevtreeResult<i32> {
        Ok(self.current()?.name_fields().map_or(NULL_NAME_KEY, |n| n.prefix_key))
    }

    /// Local name key; `NULL_NAME_KEY` for unnamed kinds.
    pub fn local_name_key(&self) -> RevtreeResult<i32> {
        Ok(self
            .current()?
            .name_fields()
            .map_or(NULL_NAME_KEY, |n| n.local_name_key))
    }

    /// Path summary key: 0 for the document, -1 when unknown.
    pub fn path_node_key(&self) -> RevtreeResult<i64> {
        let node = self.current()?;
        if node.kind() == NodeKind::Document {
            return Ok(DOCUMENT_NODE_KEY);
        }
        Ok(node.name_fields().map_or(NULL_NODE_KEY, |n| n.path_node_key))
    }

    /// Namespace URI of a named node, if bound.
    pub fn namespace_uri(&self) -> RevtreeResult<Option<String>> {
        let node = self.current()?;
        let trx = self.trx()?;
        Ok(node
            .name_fields()
            .filter(|n| n.uri_key != NULL_NAME_KEY)
            .map(|n| trx.get_name(n.uri_key, NodeKind::Namespace)))
    }

    /// Parent key.
    pub fn parent_key(&self) -> RevtreeResult<i64> {
        Ok(self.current()?.parent_key)
    }

    /// First child key.
    pub fn first_child_key(&self) -> RevtreeResult<i64> {
        Ok(self.current()?.structure().first_child_key)
    }

    /// Left sibling key.
    pub fn left_sibling_key(&self) -> RevtreeResult<i64> {
        Ok(self.current()?.structure().left_sibling_key)
    }

    /// Right sibling key.
    pub fn right_sibling_key(&self) -> RevtreeResult<i64> {
        Ok(self.current()?.structure().right_sibling_key)
    }

    /// Number of structural children.
    pub fn child_count(&self) -> RevtreeResult<u64> {
        Ok(self.current()?.structure().child_count)
    }

    /// Number of structural descendants, excluding the node itself.
    pub fn descendant_count(&self) -> RevtreeResult<u64> {
        Ok(self.current()?.structure().descendant_count)
    }

    /// Number of attributes.
    pub fn attribute_count(&self) -> RevtreeResult<usize> {
        Ok(self.current()?.attribute_keys().len())
    }

    /// Number of namespace declarations.
    pub fn namespace_count(&self) -> RevtreeResult<usize> {
        Ok(self.current()?.namespace_keys().len())
    }

    /// Key of the attribute at `index`.
    pub fn attribute_key(&self, index: usize) -> RevtreeResult<Option<i64>> {
        Ok(self.current()?.attribute_keys().get(index).copied())
    }

    /// Attribute keys of the current element.
    pub fn attribute_keys(&self) -> RevtreeResult<Vec<i64>> {
        Ok(self.current()?.attribute_keys().to_vec())
    }

    /// Namespace keys of the current element.
    pub fn namespace_keys(&self) -> RevtreeResult<Vec<i64>> {
        Ok(self.current()?.namespace_keys().to_vec())
    }

    /// Stored hash of the current node.
    pub fn hash(&self) -> RevtreeResult<i64> {
        Ok(self.current()?.hash)
    }

    /// Order label of the current node.
    pub fn dewey_id(&self) -> RevtreeResult<Option<DeweyId>> {
        Ok(self.current()?.dewey_id.clone())
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    /// True if `key` resolves in this revision or the item list.
    pub fn has_node(&self, key: i64) -> RevtreeResult<bool> {
        self.trx()?;
        if key < 0 {
            return Ok(self.item_list.get(key).is_some());
        }
        Ok(self.probe(key).is_some())
    }

    /// True if the current node has a parent.
    pub fn has_parent(&self) -> RevtreeResult<bool> {
        Ok(self.current()?.has_parent())
    }

    /// True if the current node has a first child.
    pub fn has_first_child(&self) -> RevtreeResult<bool> {
        Ok(self.current()?.structure().has_first_child())
    }

    /// True if the current node has a last child.
    pub fn has_last_child(&self) -> RevtreeResult<bool> {
        self.has_first_child()
    }

    /// True if the current node has a left sibling.
    pub fn has_left_sibling(&self) -> RevtreeResult<bool> {
        Ok(self.current()?.structure().has_left_sibling())
    }

    /// True if the current node has a right sibling.
    pub fn has_right_sibling(&self) -> RevtreeResult<bool> {
        Ok(self.current()?.structure().has_right_sibling())
    }

    /// True if the current node has structural children.
    pub fn has_children(&self) -> RevtreeResult<bool> {
        Ok(self.current()?.structure().child_count > 0)
    }

    /// True if the current node has attributes.
    pub fn has_attributes(&self) -> RevtreeResult<bool> {
        Ok(!self.current()?.attribute_keys().is_empty())
    }

    /// True if the current node declares namespaces.
    pub fn has_namespaces(&self) -> RevtreeResult<bool> {
        Ok(!self.current()?.namespace_keys().is_empty())
    }

    fn is_kind(&self, kind: NodeKind) -> RevtreeResult<bool> {
        Ok(self.kind()? == kind)
    }

    /// True on an element.
    pub fn is_element(&self) -> RevtreeResult<bool> {
        self.is_kind(NodeKind::Element)
    }

    /// True on a text node.
    pub fn is_text(&self) -> RevtreeResult<bool> {
        self.is_kind(NodeKind::Text)
    }

    /// True on the document root.
    pub fn is_document_root(&self) -> RevtreeResult<bool> {
        self.is_kind(NodeKind::Document)
    }

    /// True on a comment.
    pub fn is_comment(&self) -> RevtreeResult<bool> {
        self.is_kind(NodeKind::Comment)
    }

    /// True on an attribute.
    pub fn is_attribute(&self) -> RevtreeResult<bool> {
        self.is_kind(NodeKind::Attribute)
    }

    /// True on a namespace declaration.
    pub fn is_namespace(&self) -> RevtreeResult<bool> {
        self.is_kind(NodeKind::Namespace)
    }

    /// True on a processing instruction.
    pub fn is_pi(&self) -> RevtreeResult<bool> {
        self.is_kind(NodeKind::ProcessingInstruction)
    }

    /// True if the current node carries a value.
    pub fn is_value_node(&self) -> RevtreeResult<bool> {
        Ok(self.kind()?.is_value_kind())
    }

    /// True if the current node carries a name.
    pub fn is_name_node(&self) -> RevtreeResult<bool> {
        Ok(self.kind()?.is_name_kind())
    }

    /// True if the current node takes part in child and sibling links.
    pub fn is_structural_node(&self) -> RevtreeResult<bool> {
        Ok(self.kind()?.is_structural())
    }

    // ------------------------------------------------------------------
    // Probes
    // ------------------------------------------------------------------

    fn probe_kind(&self, key: Option<i64>) -> NodeKind {
        key.and_then(|key| self.probe(key))
            .map_or(NodeKind::Unknown, |node| node.kind())
    }

    /// Kind of the right sibling, `Unknown` if there is none.
    pub fn right_sibling_kind(&self) -> RevtreeResult<NodeKind> {
        let s = self.current()?.structure();
        Ok(self.probe_kind(s.has_right_sibling().then_some(s.right_sibling_key)))
    }

    /// Kind of the left sibling, `Unknown` if there is none.
    pub fn left_sibling_kind(&self) -> RevtreeResult<NodeKind> {
        let s = self.current()?.structure();
        Ok(self.probe_kind(s.has_left_sibling().then_some(s.left_sibling_key)))
    }

    /// Kind of the first child, `Unknown` if there is none.
    pub fn first_child_kind(&self) -> RevtreeResult<NodeKind> {
        let s = self.current()?.structure();
        Ok(self.probe_kind(s.has_first_child().then_some(s.first_child_key)))
    }

    /// Kind of the last child, `Unknown` if there is none.
    pub fn last_child_kind(&self) -> RevtreeResult<NodeKind> {
        let node = self.current()?;
        Ok(self.probe_kind(self.last_child_key_of(node)))
    }

    /// Kind of the parent, `Unknown` if there is none.
    pub fn parent_kind(&self) -> RevtreeResult<NodeKind> {
        let node = self.current()?;
        Ok(self.probe_kind(node.has_parent().then_some(node.parent_key)))
    }

    fn probe_dewey_id(&self, key: Option<i64>) -> Option<DeweyId> {
        if !self.session.config().store_dewey_ids {
            return None;
        }
        key.and_then(|key| self.probe(key))
            .and_then(|node| node.dewey_id)
    }

    /// Order label of the left sibling.
    pub fn left_sibling_dewey_id(&self) -> RevtreeResult<Option<DeweyId>> {
        let s = self.current()?.structure();
        Ok(self.probe_dewey_id(s.has_left_sibling().then_some(s.left_sibling_key)))
    }

    /// Order label of the right sibling.
    pub fn right_sibling_dewey_id(&self) -> RevtreeResult<Option<DeweyId>> {
        let s = self.current()?.structure();
        Ok(self.probe_dewey_id(s.has_right_sibling().then_some(s.right_sibling_key)))
    }

    /// Order label of the parent.
    pub fn parent_dewey_id(&self) -> RevtreeResult<Option<DeweyId>> {
        let node = self.current()?;
        Ok(self.probe_dewey_id(node.has_parent().then_some(node.parent_key)))
    }

    /// Order label of the first child.
    pub fn first_child_dewey_id(&self) -> RevtreeResult<Option<DeweyId>> {
        let s = self.current()?.structure();
        Ok(self.probe_dewey_id(s.has_first_child().then_some(s.first_child_key)))
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    /// Dictionary key `name` has or would have.
    pub fn key_for_name(&self, name: &str) -> RevtreeResult<i32> {
        self.trx()?;
        Ok(name_key(name))
    }

    /// Resolves a name key; empty for unknown keys.
    pub fn name_for_key(&self, key: i32, kind: NodeKind) -> RevtreeResult<String> {
        Ok(self.trx()?.get_name(key, kind))
    }

    /// Resolves a name key to bytes.
    pub fn raw_name_for_key(&self, key: i32, kind: NodeKind) -> RevtreeResult<Vec<u8>> {
        Ok(self.trx()?.get_raw_name(key, kind))
    }

    /// Number of nodes of `kind` named `name`.
    pub fn name_count(&self, name: &str, kind: NodeKind) -> RevtreeResult<u32> {
        Ok(self.trx()?.get_name_count(name_key(name), kind))
    }

    // ------------------------------------------------------------------
    // Revision
    // ------------------------------------------------------------------

    /// Transaction id.
    pub fn id(&self) -> RevtreeResult<TrxId> {
        Ok(self.trx()?.id())
    }

    /// Revision the cursor is bound to.
    pub fn revision_number(&self) -> RevtreeResult<u32> {
        Ok(self.trx()?.revision_number())
    }

    /// Commit time of the revision in milliseconds since the epoch.
    pub fn revision_timestamp(&self) -> RevtreeResult<i64> {
        Ok(self.trx()?.revision_timestamp())
    }

    /// Highest node key of the revision.
    pub fn max_node_key(&self) -> RevtreeResult<i64> {
        Ok(self.trx()?.max_node_key())
    }

    /// Author and message of the revision.
    pub fn commit_credentials(&self) -> RevtreeResult<CommitCredentials> {
        Ok(self.trx()?.commit_credentials().clone())
    }

    /// The item list.
    pub fn item_list(&self) -> RevtreeResult<&ItemList> {
        self.trx()?;
        Ok(&self.item_list)
    }

    /// The item list, for adding values.
    pub fn item_list_mut(&mut self) -> RevtreeResult<&mut ItemList> {
        self.trx()?;
        Ok(&mut self.item_list)
    }

    /// The session that opened this cursor.
    pub fn session(&self) -> &ResourceSession {
        &self.session
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Closes the cursor. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut trx) = self.trx.take() {
            trx.close();
            self.session.deregister_reader(trx.id());
        }
        self.current = None;
        self.item_list.clear();
    }

    /// True once closed.
    pub fn is_closed(&self) -> bool {
        self.trx.is_none()
    }

    fn identity(&self) -> Option<(i64, u32)> {
        self.trx.as_ref()?;
        self.current.as_ref().map(|node| (node.key, self.revision))
    }
}

impl Drop for NodeReadCursor {
    fn drop(&mut self) {
        self.close();
    }
}

impl PartialEq for NodeReadCursor {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for NodeReadCursor {}

impl Hash for NodeReadCursor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for NodeReadCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeReadCursor")
            .field("trx", &self.trx.as_ref().map(PageReadTrx::id))
            .field("revision", &self.revision)
            .field("node_key", &self.current.as_ref().map(|n| n.key))
            .field("items", &self.item_list.len())
            .finish()
    }
}

impl fmt::Display for NodeReadCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Some(trx), Some(node)) = (&self.trx, &self.current) else {
            return write!(f, "closed cursor (revision {})", self.revision);
        };
        write!(f, "revision {}: ", self.revision)?;
        if let Some(name) = self.resolve_name(trx, node) {
            write!(f, "name={name} ")?;
        }
        if let Some(value) = node.value() {
            write!(f, "value={:?} ", String::from_utf8_lossy(value))?;
        }
        write!(f, "{node}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item_list::AtomicValue;
    use revtree_common::config::ResourceConfig;
    use revtree_storage::NameFields;

    /// Revision 1: `<a>x</a>`.
    fn session() -> ResourceSession {
        let session = ResourceSession::in_memory(ResourceConfig::default()).unwrap();
        let mut committer = session.begin_commit().unwrap();
        let name = committer.intern_name("a", NodeKind::Element).unwrap();

        let mut root = committer.node(DOCUMENT_NODE_KEY).unwrap().unwrap();
        let mut a = Node::element(1, DOCUMENT_NODE_KEY, NameFields::local(name));
        let text = Node::text(2, 1, "x");
        if let Some(s) = root.structure_mut() {
            s.first_child_key = 1;
            s.child_count = 1;
            s.descendant_count = 2;
        }
        if let Some(s) = a.structure_mut() {
            s.first_child_key = 2;
            s.child_count = 1;
            s.descendant_count = 1;
        }
        for node in [root, a, text] {
            committer.put_node(node).unwrap();
        }
        committer.commit(CommitCredentials::default()).unwrap();
        session
    }

    #[test]
    fn test_starts_at_document_root() {
        let session = session();
        let cursor = session.begin_node_read_trx(1).unwrap();
        assert_eq!(cursor.node_key().unwrap(), DOCUMENT_NODE_KEY);
        assert!(cursor.is_document_root().unwrap());
        assert!(!cursor.has_parent().unwrap());
        assert_eq!(cursor.path_node_key().unwrap(), 0);
        assert_eq!(cursor.descendant_count().unwrap(), 2);
    }

    #[test]
    fn test_basic_moves() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(1).unwrap();

        assert_eq!(cursor.move_to_first_child().unwrap(), Move::Moved);
        assert!(cursor.is_element().unwrap());
        assert_eq!(cursor.name().unwrap(), Some(QName::local("a")));
        assert_eq!(cursor.value().unwrap(), "");

        assert_eq!(cursor.move_to_last_child().unwrap(), Move::Moved);
        assert!(cursor.is_text().unwrap());
        assert_eq!(cursor.value().unwrap(), "x");
        assert_eq!(cursor.type_name().unwrap(), "xs:untyped");
        assert_eq!(cursor.name().unwrap(), None);

        assert_eq!(cursor.move_to_right_sibling().unwrap(), Move::NotMoved);
        assert_eq!(cursor.node_key().unwrap(), 2);
        assert_eq!(cursor.move_to_parent().unwrap(), Move::Moved);
        assert_eq!(cursor.move_to_document_root().unwrap(), Move::Moved);
        assert_eq!(cursor.node_key().unwrap(), 0);
    }

    #[test]
    fn test_missing_key_keeps_position() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(1).unwrap();
        cursor.move_to(1).unwrap();

        assert_eq!(cursor.move_to(500).unwrap(), Move::NotMoved);
        assert_eq!(cursor.move_to(NULL_NODE_KEY).unwrap(), Move::NotMoved);
        assert_eq!(cursor.node_key().unwrap(), 1);
        assert!(!cursor.has_node(500).unwrap());
        assert!(cursor.has_node(2).unwrap());
    }

    #[test]
    fn test_item_list() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(1).unwrap();
        let key = cursor
            .item_list_mut()
            .unwrap()
            .add(AtomicValue::untyped("42"));

        assert!(cursor.has_node(key).unwrap());
        assert_eq!(cursor.move_to(key).unwrap(), Move::Moved);
        assert_eq!(cursor.kind().unwrap(), NodeKind::Atomic);
        assert_eq!(cursor.value().unwrap(), "42");
        assert_eq!(cursor.parent_key().unwrap(), NULL_NODE_KEY);
        assert_eq!(cursor.move_to(key - 1).unwrap(), Move::NotMoved);
    }

    #[test]
    fn test_probes_keep_position() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(1).unwrap();
        cursor.move_to(1).unwrap();

        assert_eq!(cursor.first_child_kind().unwrap(), NodeKind::Text);
        assert_eq!(cursor.last_child_kind().unwrap(), NodeKind::Text);
        assert_eq!(cursor.parent_kind().unwrap(), NodeKind::Document);
        assert_eq!(cursor.right_sibling_kind().unwrap(), NodeKind::Unknown);
        assert_eq!(cursor.left_sibling_kind().unwrap(), NodeKind::Unknown);
        assert_eq!(cursor.parent_dewey_id().unwrap(), None);
        assert_eq!(cursor.node_key().unwrap(), 1);
    }

    #[test]
    fn test_names() {
        let session = session();
        let cursor = session.begin_node_read_trx(1).unwrap();
        let key = cursor.key_for_name("a").unwrap();
        assert_eq!(cursor.name_for_key(key, NodeKind::Element).unwrap(), "a");
        assert_eq!(cursor.raw_name_for_key(key, NodeKind::Element).unwrap(), b"a");
        assert_eq!(cursor.name_count("a", NodeKind::Element).unwrap(), 1);
        assert_eq!(cursor.name_count("b", NodeKind::Element).unwrap(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let session = session();
        let mut cursor = session.begin_node_read_trx(1).unwrap();
        assert_eq!(session.active_reader_count(), 1);

        cursor.close();
        cursor.close();
        assert!(cursor.is_closed());
        assert_eq!(session.active_reader_count(), 0);
        assert!(matches!(cursor.node_key(), Err(RevtreeError::ClosedTransaction)));
        assert!(matches!(cursor.move_to(0), Err(RevtreeError::ClosedTransaction)));
        assert!(matches!(cursor.first_child_kind(), Err(RevtreeError::ClosedTransaction)));
        assert_eq!(cursor.to_string(), "closed cursor (revision 1)");
    }

    #[test]
    fn test_equality_by_key_and_revision() {
        let session = session();
        let mut a = session.begin_node_read_trx(1).unwrap();
        let mut b = session.begin_node_read_trx(1).unwrap();
        let c = session.begin_node_read_trx(0).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        b.move_to(1).unwrap();
        assert_ne!(a, b);

        a.close();
        b.close();
        assert_eq!(a, b);
    }
}
