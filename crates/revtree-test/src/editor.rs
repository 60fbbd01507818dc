//! Tree edits that keep the structural invariants.
//!
//! [`RevisionCommitter`] stores nodes as given. `TreeEditor` builds on it
//! and maintains sibling and parent links, child and descendant counts,
//! attribute and namespace lists, name reference counts and, when the
//! resource stores them, order labels.

use revtree_common::{NodeKind, RevtreeError, RevtreeResult, NULL_NAME_KEY, NULL_NODE_KEY};
use revtree_storage::{CommitCredentials, DeweyId, NameFields, Node, NodeData, RevisionCommitter};
use revtree_xdm::ResourceSession;

/// A structural node to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSpec<'a> {
    /// Element with a local name.
    Element(&'a str),
    /// Text node.
    Text(&'a str),
    /// Comment.
    Comment(&'a str),
    /// Processing instruction with target and content.
    ProcessingInstruction(&'a str, &'a str),
}

/// Edits the revision staged by a committer.
#[derive(Debug)]
pub struct TreeEditor {
    committer: RevisionCommitter,
}

impl TreeEditor {
    /// Wraps a committer.
    pub fn new(committer: RevisionCommitter) -> Self {
        Self { committer }
    }

    /// Starts editing the next revision of `session`.
    pub fn begin(session: &ResourceSession) -> RevtreeResult<Self> {
        Ok(Self::new(session.begin_commit()?))
    }

    /// The underlying committer.
    pub fn committer(&mut self) -> &mut RevisionCommitter {
        &mut self.committer
    }

    /// Commits with a fixed author.
    pub fn commit(self) -> RevtreeResult<u32> {
        self.committer
            .commit(CommitCredentials::new("revtree-test", None))
    }

    /// Commits with `message` at `timestamp`.
    pub fn commit_at(self, message: &str, timestamp: i64) -> RevtreeResult<u32> {
        self.committer.commit_at(
            CommitCredentials::new("revtree-test", Some(message.to_string())),
            timestamp,
        )
    }

    fn get(&self, key: i64) -> RevtreeResult<Node> {
        self.committer
            .node(key)?
            .ok_or(RevtreeError::NodeNotFound { node_key: key })
    }

    fn labels(&self) -> bool {
        self.committer.store_dewey_ids()
    }

    fn make_node(&mut self, key: i64, parent: i64, spec: NodeSpec<'_>) -> RevtreeResult<Node> {
        Ok(match spec {
            NodeSpec::Element(name) => {
                let local = self.committer.intern_name(name, NodeKind::Element)?;
                Node::element(key, parent, NameFields::local(local))
            }
            NodeSpec::Text(value) => Node::text(key, parent, value.to_string()),
            NodeSpec::Comment(value) => Node::comment(key, parent, value.to_string()),
            NodeSpec::ProcessingInstruction(target, data) => {
                let local = self
                    .committer
                    .intern_name(target, NodeKind::ProcessingInstruction)?;
                Node::processing_instruction(key, parent, NameFields::local(local), data.to_string())
            }
        })
    }

    fn label_between(&self, parent: &Node, left: i64, right: i64) -> RevtreeResult<Option<DeweyId>> {
        if !self.labels() {
            return Ok(None);
        }
        let Some(parent_id) = parent.dewey_id.as_ref() else {
            return Ok(None);
        };
        let left_id = if left == NULL_NODE_KEY {
            None
        } else {
            self.get(left)?.dewey_id
        };
        let right_id = if right == NULL_NODE_KEY {
            None
        } else {
            self.get(right)?.dewey_id
        };
        Ok(Some(DeweyId::between(
            parent_id,
            left_id.as_ref(),
            right_id.as_ref(),
        )))
    }

    fn adjust_descendants(&mut self, from: i64, delta: i64) -> RevtreeResult<()> {
        let mut key = from;
        while key != NULL_NODE_KEY {
            let mut node = self.get(key)?;
            if let Some(s) = node.structure_mut() {
                s.descendant_count = s.descendant_count.saturating_add_signed(delta);
            }
            key = node.parent_key;
            self.committer.put_node(node)?;
        }
        Ok(())
    }

    /// Inserts a new first child of `parent` and returns its key.
    pub fn insert_first_child(&mut self, parent: i64, spec: NodeSpec<'_>) -> RevtreeResult<i64> {
        let parent_node = self.get(parent)?;
        if !matches!(parent_node.kind(), NodeKind::Document | NodeKind::Element) {
            return Err(RevtreeError::invalid_argument(format!(
                "{} node {parent} cannot have children",
                parent_node.kind()
            )));
        }
        let old_first = parent_node.structure().first_child_key;

        let key = self.committer.allocate_node_key();
        let dewey_id = self.label_between(&parent_node, NULL_NODE_KEY, old_first)?;
        let mut node = self.make_node(key, parent, spec)?.with_dewey_id(dewey_id);
        if let Some(s) = node.structure_mut() {
            s.right_sibling_key = old_first;
        }
        self.committer.put_node(node)?;

        if old_first != NULL_NODE_KEY {
            let mut right = self.get(old_first)?;
            if let Some(s) = right.structure_mut() {
                s.left_sibling_key = key;
            }
            self.committer.put_node(right)?;
        }

        let mut parent_node = self.get(parent)?;
        if let Some(s) = parent_node.structure_mut() {
            s.first_child_key = key;
            s.child_count += 1;
        }
        self.committer.put_node(parent_node)?;
        self.adjust_descendants(parent, 1)?;
        Ok(key)
    }

    /// Inserts a new right sibling of `left` and returns its key.
    pub fn insert_right_sibling(&mut self, left: i64, spec: NodeSpec<'_>) -> RevtreeResult<i64> {
        let left_node = self.get(left)?;
        if !left_node.kind().is_structural() || !left_node.has_parent() {
            return Err(RevtreeError::invalid_argument(format!(
                "{} node {left} cannot have siblings",
                left_node.kind()
            )));
        }
        let parent = left_node.parent_key;
        let old_right = left_node.structure().right_sibling_key;
        let parent_node = self.get(parent)?;

        let key = self.committer.allocate_node_key();
        let dewey_id = self.label_between(&parent_node, left, old_right)?;
        let mut node = self.make_node(key, parent, spec)?.with_dewey_id(dewey_id);
        if let Some(s) = node.structure_mut() {
            s.left_sibling_key = left;
            s.right_sibling_key = old_right;
        }
        self.committer.put_node(node)?;

        let mut left_node = left_node;
        if let Some(s) = left_node.structure_mut() {
            s.right_sibling_key = key;
        }
        self.committer.put_node(left_node)?;

        if old_right != NULL_NODE_KEY {
            let mut right = self.get(old_right)?;
            if let Some(s) = right.structure_mut() {
                s.left_sibling_key = key;
            }
            self.committer.put_node(right)?;
        }

        let mut parent_node = parent_node;
        if let Some(s) = parent_node.structure_mut() {
            s.child_count += 1;
        }
        self.committer.put_node(parent_node)?;
        self.adjust_descendants(parent, 1)?;
        Ok(key)
    }

    fn last_attribute_label(&self, element: &Node) -> RevtreeResult<Option<DeweyId>> {
        let mut last = None;
        for &key in element.attribute_keys().iter().chain(element.namespace_keys()) {
            let id = self.get(key)?.dewey_id;
            if id > last {
                last = id;
            }
        }
        Ok(last)
    }

    fn attribute_label(&self, element: &Node) -> RevtreeResult<Option<DeweyId>> {
        if !self.labels() {
            return Ok(None);
        }
        let Some(element_id) = element.dewey_id.as_ref() else {
            return Ok(None);
        };
        let previous = self.last_attribute_label(element)?;
        Ok(Some(DeweyId::new_attribute(element_id, previous.as_ref())))
    }

    fn element(&self, key: i64) -> RevtreeResult<Node> {
        let node = self.get(key)?;
        if node.kind() != NodeKind::Element {
            return Err(RevtreeError::invalid_argument(format!(
                "node {key} is a {} node, not an element",
                node.kind()
            )));
        }
        Ok(node)
    }

    /// Appends an attribute to `element` and returns its key.
    pub fn insert_attribute(&mut self, element: i64, name: &str, value: &str) -> RevtreeResult<i64> {
        let mut element_node = self.element(element)?;
        let dewey_id = self.attribute_label(&element_node)?;
        let local = self.committer.intern_name(name, NodeKind::Attribute)?;

        let key = self.committer.allocate_node_key();
        let attribute = Node::attribute(key, element, NameFields::local(local), value.to_string())
            .with_dewey_id(dewey_id);
        self.committer.put_node(attribute)?;

        if let Some((attributes, _)) = element_node.element_keys_mut() {
            attributes.push(key);
        }
        self.committer.put_node(element_node)?;
        Ok(key)
    }

    /// Appends a namespace declaration to `element` and returns its key.
    pub fn insert_namespace(&mut self, element: i64, prefix: &str, uri: &str) -> RevtreeResult<i64> {
        let mut element_node = self.element(element)?;
        let dewey_id = self.attribute_label(&element_node)?;
        let name = NameFields {
            uri_key: self.committer.intern_name(uri, NodeKind::Namespace)?,
            prefix_key: self.committer.intern_name(prefix, NodeKind::Namespace)?,
            local_name_key: NULL_NAME_KEY,
            path_node_key: NULL_NODE_KEY,
        };

        let key = self.committer.allocate_node_key();
        self.committer
            .put_node(Node::namespace(key, element, name).with_dewey_id(dewey_id))?;

        if let Some((_, namespaces)) = element_node.element_keys_mut() {
            namespaces.push(key);
        }
        self.committer.put_node(element_node)?;
        Ok(key)
    }

    fn release_names(&mut self, node: &Node) {
        let Some(name) = node.name_fields().copied() else {
            return;
        };
        match node.kind() {
            NodeKind::Namespace => {
                self.committer.release_name(name.uri_key, NodeKind::Namespace);
                self.committer.release_name(name.prefix_key, NodeKind::Namespace);
            }
            kind => self.committer.release_name(name.local_name_key, kind),
        }
    }

    fn remove_one(&mut self, node: &Node) -> RevtreeResult<()> {
        self.release_names(node);
        self.committer.remove_node(node.key)?;
        Ok(())
    }

    /// Removes `key` with its attributes, namespaces and descendants.
    ///
    /// Removed keys are never reused.
    pub fn remove_subtree(&mut self, key: i64) -> RevtreeResult<()> {
        let node = self.get(key)?;
        match node.kind() {
            NodeKind::Document => {
                return Err(RevtreeError::invalid_argument("the document root cannot be removed"))
            }
            NodeKind::Attribute | NodeKind::Namespace => {
                let mut element = self.get(node.parent_key)?;
                if let Some((attributes, namespaces)) = element.element_keys_mut() {
                    attributes.retain(|&k| k != key);
                    namespaces.retain(|&k| k != key);
                }
                self.committer.put_node(element)?;
                return self.remove_one(&node);
            }
            _ => {}
        }

        let s = *node.structure();
        if s.left_sibling_key != NULL_NODE_KEY {
            let mut left = self.get(s.left_sibling_key)?;
            if let Some(ls) = left.structure_mut() {
                ls.right_sibling_key = s.right_sibling_key;
            }
            self.committer.put_node(left)?;
        }
        if s.right_sibling_key != NULL_NODE_KEY {
            let mut right = self.get(s.right_sibling_key)?;
            if let Some(rs) = right.structure_mut() {
                rs.left_sibling_key = s.left_sibling_key;
            }
            self.committer.put_node(right)?;
        }

        let mut parent = self.get(node.parent_key)?;
        if let Some(ps) = parent.structure_mut() {
            if ps.first_child_key == key {
                ps.first_child_key = s.right_sibling_key;
            }
            ps.child_count -= 1;
        }
        self.committer.put_node(parent)?;
        self.adjust_descendants(node.parent_key, -1 - s.descendant_count as i64)?;

        let mut pending = vec![node];
        while let Some(node) = pending.pop() {
            for &k in node.attribute_keys().iter().chain(node.namespace_keys()) {
                let extra = self.get(k)?;
                self.remove_one(&extra)?;
            }
            let mut child = node.structure().first_child_key;
            while child != NULL_NODE_KEY {
                let child_node = self.get(child)?;
                child = child_node.structure().right_sibling_key;
                pending.push(child_node);
            }
            self.remove_one(&node)?;
        }
        Ok(())
    }

    /// Replaces the value of a text, comment, attribute or PI node.
    pub fn set_value(&mut self, key: i64, value: &str) -> RevtreeResult<()> {
        let mut node = self.get(key)?;
        let kind = node.kind();
        match &mut node.data {
            NodeData::Text { value: v, .. }
            | NodeData::Comment { value: v, .. }
            | NodeData::Attribute { value: v, .. }
            | NodeData::ProcessingInstruction { value: v, .. } => {
                *v = value.to_string().into();
            }
            _ => {
                return Err(RevtreeError::invalid_argument(format!(
                    "{kind} node {key} has no value"
                )))
            }
        }
        self.committer.put_node(node)
    }
}
