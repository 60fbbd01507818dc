//! Order labels (DeweyIDs).
//!
//! A label is a sequence of divisions. Odd divisions close a level; even
//! divisions are carets that open room between two adjacent siblings, so a
//! node can be inserted anywhere without relabelling its neighbours.
//! Division `1` directly after an element's label marks the attribute and
//! namespace area of that element.
//!
//! ```text
//!   1            document
//!   1.3          first element
//!   1.3.1.3      first attribute of 1.3
//!   1.3.3        first child of 1.3
//!   1.3.4.3      inserted between 1.3.3 and 1.3.5
//! ```
//!
//! The byte encoding is prefix-free per division and order preserving, so
//! byte order equals document order and a byte prefix is an ancestor.

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};

use crate::error::DecodeError;

const ATTRIBUTE_MARKER: u32 = 1;
const FIRST_DIVISION: u32 = 3;

const ONE_BYTE_LIMIT: u32 = 0x80;
const TWO_BYTE_LIMIT: u32 = ONE_BYTE_LIMIT + 0x4000;
const THREE_BYTE_LIMIT: u32 = TWO_BYTE_LIMIT + 0x20_0000;
const FIVE_BYTE_TAG: u8 = 0xE0;

/// An order- and ancestry-preserving node label.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeweyId {
    divisions: Vec<u32>,
}

impl DeweyId {
    /// Label of the document root.
    #[must_use]
    pub fn root() -> Self {
        Self {
            divisions: vec![1],
        }
    }

    /// Creates a label from raw divisions.
    ///
    /// # Errors
    ///
    /// Rejects empty labels, zero divisions and labels ending in a caret.
    pub fn from_divisions(divisions: Vec<u32>) -> Result<Self, DecodeError> {
        match divisions.last() {
            None => Err(DecodeError::InvalidLabel { reason: "empty" }),
            Some(last) if last % 2 == 0 => Err(DecodeError::InvalidLabel {
                reason: "ends with a caret",
            }),
            Some(_) if divisions.contains(&0) => Err(DecodeError::InvalidLabel {
                reason: "zero division",
            }),
            Some(_) => Ok(Self { divisions }),
        }
    }

    /// Returns the divisions.
    #[must_use]
    pub fn divisions(&self) -> &[u32] {
        &self.divisions
    }

    /// Label for a new child of `parent` placed between the siblings `left`
    /// and `right`. Either neighbour may be absent.
    ///
    /// The neighbours must be children of `parent` with `left < right`.
    #[must_use]
    pub fn between(parent: &DeweyId, left: Option<&DeweyId>, right: Option<&DeweyId>) -> Self {
        let base = parent.divisions.len();
        let suffix = |id: &DeweyId| -> Vec<u32> { id.divisions[base.min(id.divisions.len())..].to_vec() };

        let tail = match (left.map(suffix), right.map(suffix)) {
            (None, None) => vec![FIRST_DIVISION],
            (Some(l), None) => after(&l),
            (None, Some(r)) => before(&r),
            (Some(l), Some(r)) => between_suffixes(&l, &r),
        };

        let mut divisions = parent.divisions.clone();
        divisions.extend(tail);
        Self { divisions }
    }

    /// Label for a new attribute or namespace of `element`, placed after
    /// `previous` (the element's current last attribute label, if any).
    #[must_use]
    pub fn new_attribute(element: &DeweyId, previous: Option<&DeweyId>) -> Self {
        let mut area = element.divisions.clone();
        area.push(ATTRIBUTE_MARKER);
        let area = Self { divisions: area };
        Self::between(&area, previous, None)
    }

    /// Label of the parent node, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let mut divisions = self.divisions.clone();
        divisions.pop();
        while divisions.last().is_some_and(|d| d % 2 == 0) {
            divisions.pop();
        }
        if divisions.is_empty() {
            return None;
        }
        if divisions.len() > 1 && divisions.last() == Some(&ATTRIBUTE_MARKER) {
            divisions.pop();
        }
        Some(Self { divisions })
    }

    /// Depth in the tree. The root is at level 0.
    #[must_use]
    pub fn level(&self) -> usize {
        self.divisions
            .iter()
            .skip(1)
            .filter(|&&d| d % 2 == 1 && d != ATTRIBUTE_MARKER)
            .count()
    }

    /// True if this label belongs to an attribute or namespace node.
    #[must_use]
    pub fn is_attribute(&self) -> bool {
        let mut end = self.divisions.len().saturating_sub(1);
        while end > 0 && self.divisions[end - 1] % 2 == 0 {
            end -= 1;
        }
        end > 1 && self.divisions[end - 1] == ATTRIBUTE_MARKER
    }

    /// True if `self` is a proper ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &DeweyId) -> bool {
        other.divisions.len() > self.divisions.len() && other.divisions.starts_with(&self.divisions)
    }

    /// True if `self` is a proper descendant of `other`.
    #[must_use]
    pub fn is_descendant_of(&self, other: &DeweyId) -> bool {
        other.is_ancestor_of(self)
    }

    /// True if `self` and `other` are structural siblings and `self` comes
    /// first.
    #[must_use]
    pub fn is_preceding_sibling_of(&self, other: &DeweyId) -> bool {
        !self.is_attribute()
            && !other.is_attribute()
            && self < other
            && self.parent().is_some()
            && self.parent() == other.parent()
    }

    /// Encodes the label into its byte form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.divisions.len() * 2);
        for &division in &self.divisions {
            encode_division(&mut buf, division);
        }
        buf.to_vec()
    }

    /// Decodes a label from its byte form.
    ///
    /// # Errors
    ///
    /// Returns an error for truncated divisions or an invalid label.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut divisions = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let (division, width) = decode_division(&bytes[pos..])?;
            divisions.push(division);
            pos += width;
        }
        Self::from_divisions(divisions)
    }
}

/// Smallest sibling suffix greater than `suffix`.
fn after(suffix: &[u32]) -> Vec<u32> {
    match suffix.first() {
        Some(&d) if d % 2 == 1 => vec![d + 2],
        Some(&d) => vec![d + 1],
        None => vec![FIRST_DIVISION],
    }
}

/// A sibling suffix smaller than `suffix`, staying above the attribute
/// marker.
fn before(suffix: &[u32]) -> Vec<u32> {
    match suffix.first() {
        Some(&d) if d > FIRST_DIVISION => vec![if d % 2 == 1 { d - 2 } else { d - 1 }],
        Some(&d) if d == FIRST_DIVISION => vec![2, FIRST_DIVISION],
        Some(&d) => {
            let mut out = vec![d];
            out.extend(before(&suffix[1..]));
            out
        }
        None => vec![FIRST_DIVISION],
    }
}

fn between_suffixes(left: &[u32], right: &[u32]) -> Vec<u32> {
    let i = left
        .iter()
        .zip(right)
        .take_while(|(l, r)| l == r)
        .count();
    let (Some(&a), Some(&b)) = (left.get(i), right.get(i)) else {
        return after(left);
    };

    let mut out = left[..i].to_vec();
    let next_odd = if a % 2 == 1 { a + 2 } else { a + 1 };
    if next_odd < b {
        out.push(next_odd);
    } else if a % 2 == 1 && b == a + 2 {
        out.extend([a + 1, FIRST_DIVISION]);
    } else if a % 2 == 1 {
        out.push(b);
        out.extend(before(&right[i + 1..]));
    } else {
        out.push(a);
        out.extend(after(&left[i + 1..]));
    }
    out
}

fn encode_division(buf: &mut BytesMut, division: u32) {
    if division < ONE_BYTE_LIMIT {
        buf.put_u8(division as u8);
    } else if division < TWO_BYTE_LIMIT {
        let v = division - ONE_BYTE_LIMIT;
        buf.put_u8(0x80 | (v >> 8) as u8);
        buf.put_u8(v as u8);
    } else if division < THREE_BYTE_LIMIT {
        let v = division - TWO_BYTE_LIMIT;
        buf.put_u8(0xC0 | (v >> 16) as u8);
        buf.put_u16(v as u16);
    } else {
        buf.put_u8(FIVE_BYTE_TAG);
        buf.put_u32(division);
    }
}

fn decode_division(bytes: &[u8]) -> Result<(u32, usize), DecodeError> {
    let first = bytes[0];
    let width = match first {
        0x00..=0x7F => 1,
        0x80..=0xBF => 2,
        0xC0..=0xDF => 3,
        _ => 5,
    };
    if bytes.len() < width {
        return Err(DecodeError::UnexpectedEof {
            needed: width,
            remaining: bytes.len(),
        });
    }
    let division = match width {
        1 => u32::from(first),
        2 => ONE_BYTE_LIMIT + ((u32::from(first & 0x3F) << 8) | u32::from(bytes[1])),
        3 => {
            TWO_BYTE_LIMIT
                + ((u32::from(first & 0x1F) << 16)
                    | (u32::from(bytes[1]) << 8)
                    | u32::from(bytes[2]))
        }
        _ => {
            if first != FIVE_BYTE_TAG {
                return Err(DecodeError::UnknownTag {
                    what: "order label division",
                    tag: first,
                });
            }
            u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]])
        }
    };
    Ok((division, width))
}

impl fmt::Display for DeweyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, division) in self.divisions.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{division}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeweyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeweyId({self})")
    }
}

impl FromStr for DeweyId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let divisions = s
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| DecodeError::InvalidLabel {
                    reason: "division is not a number",
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_divisions(divisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DeweyId {
        s.parse().unwrap()
    }

    #[test]
    fn test_root_and_first_child() {
        let root = DeweyId::root();
        assert_eq!(root.to_string(), "1");
        assert_eq!(root.level(), 0);
        assert_eq!(root.parent(), None);

        let child = DeweyId::between(&root, None, None);
        assert_eq!(child, id("1.3"));
        assert_eq!(child.level(), 1);
        assert_eq!(child.parent(), Some(root));
    }

    #[test]
    fn test_append_and_prepend() {
        let parent = id("1.3");
        assert_eq!(DeweyId::between(&parent, Some(&id("1.3.3")), None), id("1.3.5"));
        assert_eq!(DeweyId::between(&parent, None, Some(&id("1.3.7"))), id("1.3.5"));
        assert_eq!(DeweyId::between(&parent, None, Some(&id("1.3.3"))), id("1.3.2.3"));
        assert_eq!(
            DeweyId::between(&parent, None, Some(&id("1.3.2.3"))),
            id("1.3.2.2.3")
        );
    }

    #[test]
    fn test_between_siblings() {
        let parent = id("1");
        let cases = [
            ("1.3", "1.7", "1.5"),
            ("1.3", "1.5", "1.4.3"),
            ("1.3", "1.4.3", "1.4.2.3"),
            ("1.4.3", "1.5", "1.4.5"),
            ("1.2.3", "1.3", "1.2.5"),
        ];
        for (left, right, expected) in cases {
            let (l, r) = (id(left), id(right));
            let mid = DeweyId::between(&parent, Some(&l), Some(&r));
            assert_eq!(mid, id(expected), "between {left} and {right}");
            assert!(l < mid && mid < r);
            assert!(l.is_preceding_sibling_of(&mid));
            assert!(mid.is_preceding_sibling_of(&r));
            assert_eq!(mid.parent(), Some(parent.clone()));
        }
    }

    #[test]
    fn test_repeated_insertion_keeps_order() {
        let parent = DeweyId::root();
        let mut left = DeweyId::between(&parent, None, None);
        let right = DeweyId::between(&parent, Some(&left), None);
        for _ in 0..50 {
            let mid = DeweyId::between(&parent, Some(&left), Some(&right));
            assert!(left < mid && mid < right);
            assert_eq!(mid.level(), 1);
            assert!(left.to_bytes() < mid.to_bytes());
            left = mid;
        }
    }

    #[test]
    fn test_attributes() {
        let element = id("1.3");
        let first = DeweyId::new_attribute(&element, None);
        let second = DeweyId::new_attribute(&element, Some(&first));
        assert_eq!(first, id("1.3.1.3"));
        assert_eq!(second, id("1.3.1.5"));
        assert!(first.is_attribute());
        assert!(!element.is_attribute());
        assert_eq!(first.parent(), Some(element.clone()));
        assert_eq!(first.level(), 2);

        let child = DeweyId::between(&element, None, None);
        assert!(element < first && first < child);
        assert!(!first.is_preceding_sibling_of(&second));
    }

    #[test]
    fn test_ancestry() {
        let a = id("1.3");
        let b = id("1.3.2.3");
        let c = id("1.5");
        assert!(a.is_ancestor_of(&b));
        assert!(b.is_descendant_of(&a));
        assert!(!a.is_ancestor_of(&a));
        assert!(!c.is_ancestor_of(&b));
        assert_eq!(b.parent(), Some(a));
    }

    #[test]
    fn test_bytes_preserve_order_and_prefix() {
        let labels = [
            id("1"),
            id("1.3"),
            id("1.3.127"),
            id("1.3.129"),
            id("1.3.16511"),
            id("1.3.16513"),
            id("1.3.2113663"),
            id("1.3.2113665"),
            id("1.3.4000000001"),
            id("1.5"),
        ];
        for pair in labels.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_bytes() < pair[1].to_bytes(), "{} vs {}", pair[0], pair[1]);
        }
        for label in &labels {
            assert_eq!(&DeweyId::from_bytes(&label.to_bytes()).unwrap(), label);
        }
        assert!(labels[2].to_bytes().starts_with(&labels[1].to_bytes()));
        assert!(!labels[9].to_bytes().starts_with(&labels[1].to_bytes()));
    }

    #[test]
    fn test_invalid_labels() {
        assert!(DeweyId::from_divisions(vec![]).is_err());
        assert!(DeweyId::from_divisions(vec![1, 2]).is_err());
        assert!(DeweyId::from_divisions(vec![1, 0, 3]).is_err());
        assert!(DeweyId::from_bytes(&[0x81]).is_err());
        assert!("1.x".parse::<DeweyId>().is_err());
    }
}
