//! Binary codec for page containers.
//!
//! All integers are little-endian. Variable-length fields carry a `u32`
//! length prefix.
//!
//! ```text
//! container := has_modified:u8 page [page]
//! page      := tag:u8 body
//! node      := kind:u8 key:i64 parent:i64 type:i32 hash:i64 [dewey] body
//! ```

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use revtree_common::{NodeKind, PageKey};

use super::{CommitCredentials, Page, PageContainer, RecordPage, RevisionRootPage, UberPage};
use crate::error::DecodeError;
use crate::name::{NameDictionary, NameEntry};
use crate::node::{DeweyId, NameFields, Node, NodeData, StructFields};

const TAG_UBER: u8 = 1;
const TAG_REVISION_ROOT: u8 = 2;
const TAG_RECORD: u8 = 3;
const TAG_NAME: u8 = 4;

/// Encodes a page container.
pub fn encode_container(container: &PageContainer) -> Bytes {
    let mut buf = BytesMut::with_capacity(256);
    buf.put_u8(u8::from(container.modified().is_some()));
    encode_page(&mut buf, container.complete());
    if let Some(modified) = container.modified() {
        encode_page(&mut buf, modified);
    }
    buf.freeze()
}

/// Decodes a page container, rejecting trailing bytes.
///
/// # Errors
///
/// Returns a [`DecodeError`] describing the first malformed field.
pub fn decode_container(bytes: &[u8]) -> Result<PageContainer, DecodeError> {
    let mut r = Reader { buf: bytes };
    let has_modified = r.flag()?;
    let complete = decode_page(&mut r)?;
    let container = if has_modified {
        PageContainer::with_modified(complete, decode_page(&mut r)?)
    } else {
        PageContainer::new(complete)
    };
    if !r.buf.is_empty() {
        return Err(DecodeError::TrailingBytes {
            count: r.buf.len(),
        });
    }
    Ok(container)
}

fn encode_page(buf: &mut BytesMut, page: &Page) {
    match page {
        Page::Uber(uber) => {
            buf.put_u8(TAG_UBER);
            buf.put_u64_le(uber.next_page_key.as_u64());
            put_len(buf, uber.revision_roots.len());
            for key in &uber.revision_roots {
                buf.put_u64_le(key.as_u64());
            }
        }
        Page::RevisionRoot(root) => {
            buf.put_u8(TAG_REVISION_ROOT);
            buf.put_u32_le(root.revision);
            buf.put_i64_le(root.timestamp);
            buf.put_i64_le(root.max_node_key);
            put_str(buf, &root.credentials.author);
            match &root.credentials.message {
                Some(message) => {
                    buf.put_u8(1);
                    put_str(buf, message);
                }
                None => buf.put_u8(0),
            }
            put_len(buf, root.record_pages.len());
            for (number, key) in &root.record_pages {
                buf.put_u64_le(*number);
                buf.put_u64_le(key.as_u64());
            }
            buf.put_u64_le(root.name_page.as_u64());
        }
        Page::Record(page) => {
            buf.put_u8(TAG_RECORD);
            buf.put_u64_le(page.page_number);
            put_len(buf, page.records.len());
            for node in page.records.values() {
                encode_node(buf, node);
            }
        }
        Page::Name(names) => {
            buf.put_u8(TAG_NAME);
            put_len(buf, names.len());
            for (kind, key, entry) in names.entries() {
                buf.put_u8(kind);
                buf.put_i32_le(key);
                buf.put_u32_le(entry.count);
                put_str(buf, &entry.name);
            }
        }
    }
}

fn decode_page(r: &mut Reader<'_>) -> Result<Page, DecodeError> {
    let tag = r.u8()?;
    let page = match tag {
        TAG_UBER => {
            let next_page_key = PageKey::new(r.u64()?);
            let count = r.len()?;
            let mut revision_roots = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                revision_roots.push(PageKey::new(r.u64()?));
            }
            Page::Uber(UberPage {
                revision_roots,
                next_page_key,
            })
        }
        TAG_REVISION_ROOT => {
            let revision = r.u32()?;
            let timestamp = r.i64()?;
            let max_node_key = r.i64()?;
            let author = r.string()?;
            let message = if r.flag()? { Some(r.string()?) } else { None };
            let count = r.len()?;
            let mut record_pages = BTreeMap::new();
            for _ in 0..count {
                let number = r.u64()?;
                record_pages.insert(number, PageKey::new(r.u64()?));
            }
            Page::RevisionRoot(RevisionRootPage {
                revision,
                timestamp,
                max_node_key,
                credentials: CommitCredentials { author, message },
                record_pages,
                name_page: PageKey::new(r.u64()?),
            })
        }
        TAG_RECORD => {
            let mut page = RecordPage::new(r.u64()?);
            let count = r.len()?;
            for _ in 0..count {
                let node = decode_node(r)?;
                page.records.insert(node.key, node);
            }
            Page::Record(page)
        }
        TAG_NAME => {
            let mut names = NameDictionary::new();
            let count = r.len()?;
            for _ in 0..count {
                let kind = r.u8()?;
                let key = r.i32()?;
                let count = r.u32()?;
                let name = r.string()?;
                names.restore(kind, key, NameEntry { name, count });
            }
            Page::Name(names)
        }
        tag => return Err(DecodeError::UnknownTag { what: "page", tag }),
    };
    Ok(page)
}

fn encode_node(buf: &mut BytesMut, node: &Node) {
    buf.put_u8(node.kind().as_u8());
    buf.put_i64_le(node.key);
    buf.put_i64_le(node.parent_key);
    buf.put_i32_le(node.type_key);
    buf.put_i64_le(node.hash);
    match &node.dewey_id {
        Some(dewey_id) => {
            buf.put_u8(1);
            put_bytes(buf, &dewey_id.to_bytes());
        }
        None => buf.put_u8(0),
    }

    match &node.data {
        NodeData::Document { structure } => put_structure(buf, structure),
        NodeData::Element {
            structure,
            name,
            attribute_keys,
            namespace_keys,
        } => {
            put_structure(buf, structure);
            put_name(buf, name);
            for keys in [attribute_keys, namespace_keys] {
                put_len(buf, keys.len());
                for key in keys {
                    buf.put_i64_le(*key);
                }
            }
        }
        NodeData::Attribute { name, value } => {
            put_name(buf, name);
            put_bytes(buf, value);
        }
        NodeData::Namespace { name } => put_name(buf, name),
        NodeData::Text { structure, value } | NodeData::Comment { structure, value } => {
            put_structure(buf, structure);
            put_bytes(buf, value);
        }
        NodeData::ProcessingInstruction {
            structure,
            name,
            value,
        } => {
            put_structure(buf, structure);
            put_name(buf, name);
            put_bytes(buf, value);
        }
        NodeData::Atomic { value } => put_bytes(buf, value),
        NodeData::Null => {}
    }
}

fn decode_node(r: &mut Reader<'_>) -> Result<Node, DecodeError> {
    let tag = r.u8()?;
    let kind = NodeKind::from_u8(tag).ok_or(DecodeError::UnknownTag { what: "node", tag })?;
    let key = r.i64()?;
    let parent_key = r.i64()?;
    let type_key = r.i32()?;
    let hash = r.i64()?;
    let dewey_id = if r.flag()? {
        Some(DeweyId::from_bytes(&r.bytes()?)?)
    } else {
        None
    };

    let data = match kind {
        NodeKind::Document => NodeData::Document {
            structure: r.structure()?,
        },
        NodeKind::Element => {
            let structure = r.structure()?;
            let name = r.name()?;
            let attribute_keys = r.keys()?;
            let namespace_keys = r.keys()?;
            NodeData::Element {
                structure,
                name,
                attribute_keys,
                namespace_keys,
            }
        }
        NodeKind::Attribute => NodeData::Attribute {
            name: r.name()?,
            value: r.bytes()?,
        },
        NodeKind::Namespace => NodeData::Namespace { name: r.name()? },
        NodeKind::Text => NodeData::Text {
            structure: r.structure()?,
            value: r.bytes()?,
        },
        NodeKind::Comment => NodeData::Comment {
            structure: r.structure()?,
            value: r.bytes()?,
        },
        NodeKind::ProcessingInstruction => NodeData::ProcessingInstruction {
            structure: r.structure()?,
            name: r.name()?,
            value: r.bytes()?,
        },
        NodeKind::Atomic => NodeData::Atomic { value: r.bytes()? },
        NodeKind::Null => NodeData::Null,
        NodeKind::Unknown => return Err(DecodeError::UnknownTag { what: "node", tag }),
    };

    Ok(Node {
        key,
        parent_key,
        type_key,
        hash,
        dewey_id,
        data,
    })
}

fn put_len(buf: &mut BytesMut, len: usize) {
    buf.put_u32_le(len as u32);
}

fn put_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    put_len(buf, bytes.len());
    buf.put_slice(bytes);
}

fn put_str(buf: &mut BytesMut, s: &str) {
    put_bytes(buf, s.as_bytes());
}

fn put_structure(buf: &mut BytesMut, s: &StructFields) {
    buf.put_i64_le(s.first_child_key);
    buf.put_i64_le(s.left_sibling_key);
    buf.put_i64_le(s.right_sibling_key);
    buf.put_u64_le(s.child_count);
    buf.put_u64_le(s.descendant_count);
}

fn put_name(buf: &mut BytesMut, n: &NameFields) {
    buf.put_i32_le(n.uri_key);
    buf.put_i32_le(n.prefix_key);
    buf.put_i32_le(n.local_name_key);
    buf.put_i64_le(n.path_node_key);
}

/// Bounds-checked reader over a byte slice.
struct Reader<'a> {
    buf: &'a [u8],
}

impl Reader<'_> {
    fn need(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::UnexpectedEof {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn flag(&mut self) -> Result<bool, DecodeError> {
        Ok(self.u8()? != 0)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn i32(&mut self) -> Result<i32, DecodeError> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        self.need(8)?;
        Ok(self.buf.get_i64_le())
    }

    fn len(&mut self) -> Result<usize, DecodeError> {
        Ok(self.u32()? as usize)
    }

    fn bytes(&mut self) -> Result<Bytes, DecodeError> {
        let len = self.len()?;
        self.need(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(Bytes::copy_from_slice(head))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn keys(&mut self) -> Result<Vec<i64>, DecodeError> {
        let count = self.len()?;
        let mut keys = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            keys.push(self.i64()?);
        }
        Ok(keys)
    }

    fn structure(&mut self) -> Result<StructFields, DecodeError> {
        Ok(StructFields {
            first_child_key: self.i64()?,
            left_sibling_key: self.i64()?,
            right_sibling_key: self.i64()?,
            child_count: self.u64()?,
            descendant_count: self.u64()?,
        })
    }

    fn name(&mut self) -> Result<NameFields, DecodeError> {
        Ok(NameFields {
            uri_key: self.i32()?,
            prefix_key: self.i32()?,
            local_name_key: self.i32()?,
            path_node_key: self.i64()?,
        })
    }
}
