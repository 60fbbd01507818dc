//! Node kind tag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a node in a document tree.
///
/// The discriminants are persisted in record pages and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeKind {
    /// Unknown kind. Never stored; used as a neutral tag.
    Unknown = 0,
    /// Element node.
    Element = 1,
    /// Attribute node.
    Attribute = 2,
    /// Text node.
    Text = 3,
    /// Processing instruction node.
    ProcessingInstruction = 7,
    /// Comment node.
    Comment = 8,
    /// Document root node.
    Document = 9,
    /// Namespace declaration node.
    Namespace = 13,
    /// Atomic value held in a cursor's item list.
    Atomic = 15,
    /// Null record left where a node was removed.
    Null = 16,
}

impl NodeKind {
    /// Converts a raw tag into a kind.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Unknown),
            1 => Some(Self::Element),
            2 => Some(Self::Attribute),
            3 => Some(Self::Text),
            7 => Some(Self::ProcessingInstruction),
            8 => Some(Self::Comment),
            9 => Some(Self::Document),
            13 => Some(Self::Namespace),
            15 => Some(Self::Atomic),
            16 => Some(Self::Null),
            _ => None,
        }
    }

    /// Returns the raw tag.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for kinds that take part in the sibling and child links.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(
            self,
            Self::Document
                | Self::Element
                | Self::Text
                | Self::Comment
                | Self::ProcessingInstruction
        )
    }

    /// True for kinds that carry a qualified name.
    #[must_use]
    pub const fn is_name_kind(self) -> bool {
        matches!(
            self,
            Self::Element | Self::Attribute | Self::Namespace | Self::ProcessingInstruction
        )
    }

    /// True for kinds that carry a value.
    #[must_use]
    pub const fn is_value_kind(self) -> bool {
        matches!(
            self,
            Self::Attribute
                | Self::Text
                | Self::Comment
                | Self::ProcessingInstruction
                | Self::Atomic
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Element => "element",
            Self::Attribute => "attribute",
            Self::Text => "text",
            Self::ProcessingInstruction => "processing-instruction",
            Self::Comment => "comment",
            Self::Document => "document",
            Self::Namespace => "namespace",
            Self::Atomic => "atomic",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}
