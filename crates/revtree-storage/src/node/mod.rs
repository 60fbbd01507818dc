//! Node model.
//!
//! A node is a closed sum over the kinds of the document tree. Fields that
//! only some kinds carry live in the variant; kinds without structural links
//! answer structural queries through [`StructFields::NULL`].

mod dewey;

pub use dewey::DeweyId;

use std::fmt;

use bytes::Bytes;
use revtree_common::{NodeKind, NULL_NAME_KEY, NULL_NODE_KEY};

use crate::name::untyped_type_key;

/// Structural links of a node that takes part in the child/sibling chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructFields {
    /// First structural child.
    pub first_child_key: i64,
    /// Previous sibling.
    pub left_sibling_key: i64,
    /// Next sibling.
    pub right_sibling_key: i64,
    /// Number of structural children.
    pub child_count: u64,
    /// Number of structural descendants, not counting the node itself.
    pub descendant_count: u64,
}

impl StructFields {
    /// Zero-degree links used by kinds without structure.
    pub const NULL: Self = Self {
        first_child_key: NULL_NODE_KEY,
        left_sibling_key: NULL_NODE_KEY,
        right_sibling_key: NULL_NODE_KEY,
        child_count: 0,
        descendant_count: 0,
    };

    /// True if a first child is linked.
    #[inline]
    pub fn has_first_child(&self) -> bool {
        self.first_child_key != NULL_NODE_KEY
    }

    /// True if a left sibling is linked.
    #[inline]
    pub fn has_left_sibling(&self) -> bool {
        self.left_sibling_key != NULL_NODE_KEY
    }

    /// True if a right sibling is linked.
    #[inline]
    pub fn has_right_sibling(&self) -> bool {
        self.right_sibling_key != NULL_NODE_KEY
    }
}

impl Default for StructFields {
    fn default() -> Self {
        Self::NULL
    }
}

/// Name references of a named node, as dictionary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameFields {
    /// Namespace URI key, or `NULL_NAME_KEY`.
    pub uri_key: i32,
    /// Prefix key, or `NULL_NAME_KEY`.
    pub prefix_key: i32,
    /// Local name key, or `NULL_NAME_KEY`.
    pub local_name_key: i32,
    /// Key of the node's path summary entry; -1 when unknown.
    pub path_node_key: i64,
}

impl NameFields {
    /// A name with only a local part.
    pub fn local(local_name_key: i32) -> Self {
        Self {
            uri_key: NULL_NAME_KEY,
            prefix_key: NULL_NAME_KEY,
            local_name_key,
            path_node_key: NULL_NODE_KEY,
        }
    }
}

impl Default for NameFields {
    fn default() -> Self {
        Self::local(NULL_NAME_KEY)
    }
}

/// A resolved qualified name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI; empty when unbound.
    pub namespace_uri: String,
    /// Prefix; empty when absent.
    pub prefix: String,
    /// Local part.
    pub local_name: String,
}

impl QName {
    /// Creates a fully qualified name.
    pub fn new(
        namespace_uri: impl Into<String>,
        prefix: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            prefix: prefix.into(),
            local_name: local_name.into(),
        }
    }

    /// Creates a name without namespace or prefix.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", "", local_name)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{}:{}", self.prefix, self.local_name)
        }
    }
}

/// Kind-specific node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The document root.
    Document {
        /// Child links.
        structure: StructFields,
    },
    /// An element.
    Element {
        /// Child and sibling links.
        structure: StructFields,
        /// Element name.
        name: NameFields,
        /// Attribute node keys, in document order.
        attribute_keys: Vec<i64>,
        /// Namespace node keys, in declaration order.
        namespace_keys: Vec<i64>,
    },
    /// An attribute of an element.
    Attribute {
        /// Attribute name.
        name: NameFields,
        /// Attribute value.
        value: Bytes,
    },
    /// A namespace declaration. Its value is the URI behind `name.uri_key`.
    Namespace {
        /// Prefix and URI keys.
        name: NameFields,
    },
    /// A text node.
    Text {
        /// Sibling links.
        structure: StructFields,
        /// Character data.
        value: Bytes,
    },
    /// A comment.
    Comment {
        /// Sibling links.
        structure: StructFields,
        /// Comment text.
        value: Bytes,
    },
    /// A processing instruction.
    ProcessingInstruction {
        /// Sibling links.
        structure: StructFields,
        /// Target name.
        name: NameFields,
        /// Instruction content.
        value: Bytes,
    },
    /// An atomic value living in a cursor's item list.
    Atomic {
        /// Encoded value.
        value: Bytes,
    },
    /// A removed node.
    Null,
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Stable node key.
    pub key: i64,
    /// Parent key, `NULL_NODE_KEY` for the root and item list values.
    pub parent_key: i64,
    /// Dictionary key of the type name.
    pub type_key: i32,
    /// Stored hash. Not maintained by this crate.
    pub hash: i64,
    /// Order label, when the resource stores them.
    pub dewey_id: Option<DeweyId>,
    /// Kind-specific payload.
    pub data: NodeData,
}

impl Node {
    fn with_data(key: i64, parent_key: i64, data: NodeData) -> Self {
        Self {
            key,
            parent_key,
            type_key: untyped_type_key(),
            hash: 0,
            dewey_id: None,
            data,
        }
    }

    /// The document root at `DOCUMENT_NODE_KEY`.
    pub fn document(key: i64) -> Self {
        Self::with_data(
            key,
            NULL_NODE_KEY,
            NodeData::Document {
                structure: StructFields::NULL,
            },
        )
    }

    /// An element without children or attributes.
    pub fn element(key: i64, parent_key: i64, name: NameFields) -> Self {
        Self::with_data(
            key,
            parent_key,
            NodeData::Element {
                structure: StructFields::NULL,
                name,
                attribute_keys: Vec::new(),
                namespace_keys: Vec::new(),
            },
        )
    }

    /// An attribute.
    pub fn attribute(key: i64, parent_key: i64, name: NameFields, value: impl Into<Bytes>) -> Self {
        Self::with_data(
            key,
            parent_key,
            NodeData::Attribute {
                name,
                value: value.into(),
            },
        )
    }

    /// A namespace declaration.
    pub fn namespace(key: i64, parent_key: i64, name: NameFields) -> Self {
        Self::with_data(key, parent_key, NodeData::Namespace { name })
    }

    /// A text node.
    pub fn text(key: i64, parent_key: i64, value: impl Into<Bytes>) -> Self {
        Self::with_data(
            key,
            parent_key,
            NodeData::Text {
                structure: StructFields::NULL,
                value: value.into(),
            },
        )
    }

    /// A comment.
    pub fn comment(key: i64, parent_key: i64, value: impl Into<Bytes>) -> Self {
        Self::with_data(
            key,
            parent_key,
            NodeData::Comment {
                structure: StructFields::NULL,
                value: value.into(),
            },
        )
    }

    /// A processing instruction.
    pub fn processing_instruction(
        key: i64,
        parent_key: i64,
        name: NameFields,
        value: impl Into<Bytes>,
    ) -> Self {
        Self::with_data(
            key,
            parent_key,
            NodeData::ProcessingInstruction {
                structure: StructFields::NULL,
                name,
                value: value.into(),
            },
        )
    }

    /// An atomic item list value.
    pub fn atomic(key: i64, value: impl Into<Bytes>, type_key: i32) -> Self {
        Self {
            type_key,
            ..Self::with_data(
                key,
                NULL_NODE_KEY,
                NodeData::Atomic {
                    value: value.into(),
                },
            )
        }
    }

    /// A tombstone left where a node was removed.
    pub fn null(key: i64) -> Self {
        Self::with_data(key, NULL_NODE_KEY, NodeData::Null)
    }

    /// Sets the order label.
    #[must_use]
    pub fn with_dewey_id(mut self, dewey_id: Option<DeweyId>) -> Self {
        self.dewey_id = dewey_id;
        self
    }

    /// Returns the kind tag.
    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Document { .. } => NodeKind::Document,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Attribute { .. } => NodeKind::Attribute,
            NodeData::Namespace { .. } => NodeKind::Namespace,
            NodeData::Text { .. } => NodeKind::Text,
            NodeData::Comment { .. } => NodeKind::Comment,
            NodeData::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
            NodeData::Atomic { .. } => NodeKind::Atomic,
            NodeData::Null => NodeKind::Null,
        }
    }

    /// Structural links; [`StructFields::NULL`] for non-structural kinds.
    pub fn structure(&self) -> &StructFields {
        match &self.data {
            NodeData::Document { structure }
            | NodeData::Element { structure, .. }
            | NodeData::Text { structure, .. }
            | NodeData::Comment { structure, .. }
            | NodeData::ProcessingInstruction { structure, .. } => structure,
            _ => &StructFields::NULL,
        }
    }

    /// Mutable structural links, for structural kinds only.
    pub fn structure_mut(&mut self) -> Option<&mut StructFields> {
        match &mut self.data {
            NodeData::Document { structure }
            | NodeData::Element { structure, .. }
            | NodeData::Text { structure, .. }
            | NodeData::Comment { structure, .. }
            | NodeData::ProcessingInstruction { structure, .. } => Some(structure),
            _ => None,
        }
    }

    /// Name references, for named kinds.
    pub fn name_fields(&self) -> Option<&NameFields> {
        match &self.data {
            NodeData::Element { name, .. }
            | NodeData::Attribute { name, .. }
            | NodeData::Namespace { name }
            | NodeData::ProcessingInstruction { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Raw value bytes, for value kinds.
    pub fn value(&self) -> Option<&Bytes> {
        match &self.data {
            NodeData::Attribute { value, .. }
            | NodeData::Text { value, .. }
            | NodeData::Comment { value, .. }
            | NodeData::ProcessingInstruction { value, .. }
            | NodeData::Atomic { value } => Some(value),
            _ => None,
        }
    }

    /// Attribute keys of an element; empty otherwise.
    pub fn attribute_keys(&self) -> &[i64] {
        match &self.data {
            NodeData::Element { attribute_keys, .. } => attribute_keys,
            _ => &[],
        }
    }

    /// Namespace keys of an element; empty otherwise.
    pub fn namespace_keys(&self) -> &[i64] {
        match &self.data {
            NodeData::Element { namespace_keys, .. } => namespace_keys,
            _ => &[],
        }
    }

    /// Mutable attribute and namespace key lists of an element.
    pub fn element_keys_mut(&mut self) -> Option<(&mut Vec<i64>, &mut Vec<i64>)> {
        match &mut self.data {
            NodeData::Element {
                attribute_keys,
                namespace_keys,
                ..
            } => Some((attribute_keys, namespace_keys)),
            _ => None,
        }
    }

    /// True if a parent is linked.
    #[inline]
    pub fn has_parent(&self) -> bool {
        self.parent_key != NULL_NODE_KEY
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} node {} (parent {})", self.kind(), self.key, self.parent_key)?;
        let s = self.structure();
        if self.kind().is_structural() {
            write!(
                f,
                " first_child={} left={} right={} children={} descendants={}",
                s.first_child_key,
                s.left_sibling_key,
                s.right_sibling_key,
                s.child_count,
                s.descendant_count
            )?;
        }
        if let Some(dewey_id) = &self.dewey_id {
            write!(f, " dewey={dewey_id}")?;
        }
        Ok(())
    }
}
