//! Fixture documents.
//!
//! Each builder commits into the given session and returns the keys the
//! tests refer to.

use revtree_common::{RevtreeResult, DOCUMENT_NODE_KEY};
use revtree_xdm::ResourceSession;

use crate::editor::{NodeSpec, TreeEditor};

/// Keys of the [`attributed_element`] document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributedElement {
    /// Revision holding the document.
    pub revision: u32,
    /// The element.
    pub element: i64,
    /// Its attributes `a` and `b`.
    pub attributes: [i64; 2],
    /// Its only child, a text node.
    pub text: i64,
}

/// Commits `<e a="1" b="2">text</e>` with keys 1 to 4 into a fresh session.
pub fn attributed_element(session: &ResourceSession) -> RevtreeResult<AttributedElement> {
    let mut editor = TreeEditor::begin(session)?;
    let element = editor.insert_first_child(DOCUMENT_NODE_KEY, NodeSpec::Element("e"))?;
    let a = editor.insert_attribute(element, "a", "1")?;
    let b = editor.insert_attribute(element, "b", "2")?;
    let text = editor.insert_first_child(element, NodeSpec::Text("text"))?;
    let revision = editor.commit()?;
    Ok(AttributedElement {
        revision,
        element,
        attributes: [a, b],
        text,
    })
}

/// Commits a mixed document and returns its keys in pre-order:
///
/// ```text
/// <library xmlns:x="urn:x">
///   <book id="1"><title>Dune</title><!--classic--></book>
///   <book id="2"><title>Emma</title><?render fast?></book>
///   <shelf/>
///   tail
/// </library>
/// ```
pub fn library(session: &ResourceSession) -> RevtreeResult<Vec<i64>> {
    let mut editor = TreeEditor::begin(session)?;
    let library = editor.insert_first_child(DOCUMENT_NODE_KEY, NodeSpec::Element("library"))?;
    editor.insert_namespace(library, "x", "urn:x")?;

    let book1 = editor.insert_first_child(library, NodeSpec::Element("book"))?;
    editor.insert_attribute(book1, "id", "1")?;
    let title1 = editor.insert_first_child(book1, NodeSpec::Element("title"))?;
    let dune = editor.insert_first_child(title1, NodeSpec::Text("Dune"))?;
    let comment = editor.insert_right_sibling(title1, NodeSpec::Comment("classic"))?;

    let book2 = editor.insert_right_sibling(book1, NodeSpec::Element("book"))?;
    editor.insert_attribute(book2, "id", "2")?;
    let title2 = editor.insert_first_child(book2, NodeSpec::Element("title"))?;
    let emma = editor.insert_first_child(title2, NodeSpec::Text("Emma"))?;
    let pi = editor.insert_right_sibling(title2, NodeSpec::ProcessingInstruction("render", "fast"))?;

    let shelf = editor.insert_right_sibling(book2, NodeSpec::Element("shelf"))?;
    let tail = editor.insert_right_sibling(shelf, NodeSpec::Text("tail"))?;
    editor.commit()?;

    Ok(vec![
        DOCUMENT_NODE_KEY,
        library,
        book1,
        title1,
        dune,
        comment,
        book2,
        title2,
        emma,
        pi,
        shelf,
        tail,
    ])
}
