use super::{
    util, Attrs, ContentMatch, ContentMatchError, Fragment, FragmentError, MarkSet, NodeType,
};
use displaydoc::Display;
use std::fmt;
use std::ops::RangeBounds;
use std::sync::Arc;
use thiserror::Error;

/// Errors when creating or checking nodes
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Node text cannot be empty
    EmptyText,
    /// Cannot construct a text node with `create`, `{0}` is the text type
    CannotConstructTextNode(String),
    /// Invalid content for node {0}
    InvalidContent(String),
    /// Mark `{mark}` is not allowed in node {node}
    DisallowedMark {
        /// The parent node type
        node: String,
        /// The mark type
        mark: String,
    },
    /// Could not access a child
    Fragment(#[from] FragmentError),
}

/// A string that stores its length in utf-16
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    len_utf16: usize,
    content: String,
}

impl Text {
    /// Return the contained string
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// The length of this string if it were encoded in utf-16
    pub fn len_utf16(&self) -> usize {
        self.len_utf16
    }
}

impl From<String> for Text {
    fn from(src: String) -> Text {
        Text {
            len_utf16: src.encode_utf16().count(),
            content: src,
        }
    }
}

struct NodeData {
    r#type: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: MarkSet,
    text: Option<Text>,
}

/// This type represents a node in the tree that makes up a document. So a document is an instance
/// of `Node`, with children that are also instances of `Node`.
///
/// Nodes are persistent: cloning one is cheap and shares the whole subtree.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    /// Create a node. Only the text is checked here; use [`Node::check`] to validate the node
    /// against its schema.
    pub fn new(
        r#type: NodeType,
        attrs: Attrs,
        content: Fragment,
        marks: MarkSet,
        text: Option<String>,
    ) -> Result<Self, NodeError> {
        let text = match text {
            Some(text) if text.trim().is_empty() => return Err(NodeError::EmptyText),
            Some(text) => Some(Text::from(text)),
            None => None,
        };
        Ok(Self::from_parts(r#type, attrs, content, marks, text))
    }

    /// Create a text node of the given type.
    pub fn new_text<T: Into<String>>(
        r#type: NodeType,
        text: T,
        marks: MarkSet,
    ) -> Result<Self, NodeError> {
        let attrs = r#type.compute_attrs(None);
        Self::new(r#type, attrs, Fragment::empty(), marks, Some(text.into()))
    }

    pub(crate) fn from_parts(
        r#type: NodeType,
        attrs: Attrs,
        content: Fragment,
        marks: MarkSet,
        text: Option<Text>,
    ) -> Self {
        Node(Arc::new(NodeData {
            r#type,
            attrs,
            content,
            marks,
            text,
        }))
    }

    /// The type of node that this is.
    pub fn r#type(&self) -> &NodeType {
        &self.0.r#type
    }

    /// The attributes of this node.
    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    /// A container holding the node's children.
    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    /// The marks applied to this node.
    pub fn marks(&self) -> &MarkSet {
        &self.0.marks
    }

    /// For text nodes, this contains the node's text content.
    pub fn text(&self) -> Option<&str> {
        self.0.text.as_ref().map(Text::as_str)
    }

    /// True when both values share the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The number of children that the node has.
    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    /// Get the child node at the given index.
    pub fn child(&self, index: usize) -> Result<&Node, FragmentError> {
        self.0.content.child(index)
    }

    /// Get the child node at the given index, if it exists.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.0.content.maybe_child(index)
    }

    /// Returns this node's first child, or `None` if there are no children.
    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    /// Returns this node's last child, or `None` if there are no children.
    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    /// True when this is a block (non-inline node)
    pub fn is_block(&self) -> bool {
        self.0.r#type.is_block()
    }

    /// True when this is an inline node (a text node or a node that can appear among text).
    pub fn is_inline(&self) -> bool {
        self.0.r#type.is_inline()
    }

    /// True when this is a text node.
    pub fn is_text(&self) -> bool {
        self.0.r#type.is_text()
    }

    /// True when this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.0.r#type.is_leaf()
    }

    /// The size of this node, as defined by the integer-based indexing scheme. For text nodes,
    /// this is the amount of characters. For other leaf nodes, it is one. For non-leaf nodes, it
    /// is the size of the content plus two (the start and end token).
    pub fn node_size(&self) -> usize {
        if self.is_leaf() {
            return 1;
        }
        match &self.0.text {
            Some(text) if self.is_text() => text.len_utf16(),
            _ => 2 + self.0.content.size(),
        }
    }

    /// Concatenates all the text nodes found in this node and its children.
    pub fn text_content(&self) -> String {
        if let Some(text) = self.text() {
            return text.to_owned();
        }
        let mut buf = String::new();
        for child in self.0.content.iter() {
            buf.push_str(&child.text_content());
        }
        buf
    }

    /// Compare the markup (type, attributes, and marks) of this node to those of another.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(&other.0.r#type, &other.0.attrs, &other.0.marks)
    }

    /// Check whether this node's markup corresponds to the given type, attributes, and marks.
    pub fn has_markup(&self, r#type: &NodeType, attrs: &Attrs, marks: &MarkSet) -> bool {
        self.0.r#type.same(r#type) && &self.0.attrs == attrs && &self.0.marks == marks
    }

    /// Create a new node with the same markup as this node, containing the given content.
    pub fn copy(&self, content: Fragment) -> Node {
        if content.ptr_eq(&self.0.content) {
            return self.clone();
        }
        Self::from_parts(
            self.0.r#type.clone(),
            self.0.attrs.clone(),
            content,
            self.0.marks.clone(),
            self.0.text.clone(),
        )
    }

    /// Create a copy of this node, with the given set of marks instead of the node's own marks.
    pub fn mark(&self, marks: MarkSet) -> Node {
        if marks == self.0.marks {
            return self.clone();
        }
        Self::from_parts(
            self.0.r#type.clone(),
            self.0.attrs.clone(),
            self.0.content.clone(),
            marks,
            self.0.text.clone(),
        )
    }

    /// Get the content match in this node at the given index.
    pub fn content_match_at(&self, index: usize) -> Result<ContentMatch, ContentMatchError> {
        self.0
            .r#type
            .content_match_or_empty()
            .match_fragment_range(&self.0.content, 0..index)?
            .ok_or(ContentMatchError::InvalidContent)
    }

    /// Test whether replacing the range between `from` and `to` (by child index) with the given
    /// replacement fragment (which defaults to the empty fragment) would leave the node's content
    /// valid. You can optionally pass a range of indices into the replacement fragment.
    pub fn can_replace<R: RangeBounds<usize>>(
        &self,
        from: usize,
        to: usize,
        replacement: Option<&Fragment>,
        range: R,
    ) -> Result<bool, ContentMatchError> {
        let empty = Fragment::empty();
        let replacement = replacement.unwrap_or(&empty);
        let count = replacement.child_count();
        let (start, end) = util::bounds(&range, count).ok_or(ContentMatchError::InvalidRange {
            start: util::from(&range),
            end: util::to(&range, count),
            count,
        })?;

        let one = self
            .content_match_at(from)?
            .match_fragment_range(replacement, start..end)?;
        let two = match one {
            Some(one) => one.match_fragment_range(&self.0.content, to..)?,
            None => None,
        };
        if !two.map_or(false, |m| m.valid_end()) {
            return Ok(false);
        }
        Ok(replacement.children()[start..end]
            .iter()
            .all(|child| self.0.r#type.allows_marks(child.marks())))
    }

    /// Test whether the given node's content could be appended to this node.
    pub fn can_append(&self, other: &Node) -> Result<bool, ContentMatchError> {
        if other.content().is_empty() {
            return Ok(true);
        }
        let end = self.child_count();
        self.can_replace(end, end, Some(other.content()), ..)
    }

    /// Check whether this node and its descendants conform to the schema.
    pub fn check(&self) -> Result<(), NodeError> {
        let r#type = &self.0.r#type;
        let matched = r#type
            .content_match_or_empty()
            .match_fragment(&self.0.content);
        if !matched.map_or(false, |m| m.valid_end()) {
            return Err(NodeError::InvalidContent(r#type.name().to_owned()));
        }
        for child in self.0.content.iter() {
            if let Some(mark) = child
                .marks()
                .iter()
                .find(|mark| !r#type.allows_mark_named(mark.r#type()))
            {
                return Err(NodeError::DisallowedMark {
                    node: r#type.name().to_owned(),
                    mark: mark.r#type().to_owned(),
                });
            }
            child.check()?;
        }
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.text == other.0.text
                && self.same_markup(other)
                && self.0.content == other.0.content)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mark in self.0.marks.iter().rev() {
            write!(f, "{}(", mark.r#type())?;
        }
        if let Some(text) = self.text() {
            write!(f, "{:?}", text)?;
        } else {
            let mut tuple = f.debug_tuple(self.0.r#type.name());
            for child in self.0.content.iter() {
                tuple.field(child);
            }
            tuple.finish()?;
        }
        for _ in self.0.marks.iter() {
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Node, NodeError};
    use crate::model::{Attrs, ContentMatchError, Fragment, MarkSet};
    use crate::tests::helper::{basic_schema, doc, em, p, text};
    use serde_json::json;

    #[test]
    fn test_empty_text() {
        let schema = basic_schema();
        for t in &["text", "paragraph", "image"] {
            let r#type = schema.node_type(t).unwrap();
            assert_eq!(
                Node::new(
                    r#type.clone(),
                    Attrs::new(),
                    Fragment::empty(),
                    MarkSet::empty(),
                    Some(String::new())
                ),
                Err(NodeError::EmptyText)
            );
            assert_eq!(
                Node::new(
                    r#type,
                    Attrs::new(),
                    Fragment::empty(),
                    MarkSet::empty(),
                    Some(" \n".into())
                ),
                Err(NodeError::EmptyText)
            );
        }
    }

    #[test]
    fn test_size() {
        let schema = basic_schema();
        assert_eq!(text("Hello").node_size(), 5);
        assert_eq!(text("\u{1F60A}").node_size(), 2);

        let image = schema.node_type("image").unwrap();
        let img = image.create(None, Fragment::empty(), None).unwrap();
        assert_eq!(img.node_size(), 1);

        let para = p(vec![text("Hallo"), img]);
        assert_eq!(para.node_size(), 2 + para.content().size());
        assert_eq!(para.node_size(), 4);
        assert_eq!(para.child_count(), 2);
    }

    #[test]
    fn test_equality() {
        let a = doc(vec![p(vec![text("one"), em("two")])]);
        let b = doc(vec![p(vec![text("one"), em("two")])]);
        let c = doc(vec![p(vec![text("one"), text("two")])]);
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(doc(vec![]), p(vec![]));
    }

    #[test]
    fn test_attrs_take_part_in_equality() {
        let schema = basic_schema();
        let heading = schema.node_type("heading").unwrap();
        let mut attrs = Attrs::new();
        attrs.insert("level".into(), json!(2));
        let h1 = heading.create(None, vec![text("x")], None).unwrap();
        let h2 = heading.create(Some(attrs), vec![text("x")], None).unwrap();
        assert_ne!(h1, h2);
        assert!(!h1.same_markup(&h2));
    }

    #[test]
    fn test_text_content() {
        let d = doc(vec![p(vec![text("ab")]), p(vec![em("cd"), text("ef")])]);
        assert_eq!(d.text_content(), "abcdef");
        assert_eq!(d.child(1).unwrap().text_content(), "cdef");
    }

    #[test]
    fn test_copy_and_mark() {
        let para = p(vec![text("a")]);
        assert!(para.copy(para.content().clone()).ptr_eq(&para));
        let copied = para.copy(Fragment::from(text("b")));
        assert!(copied.same_markup(&para));
        assert_eq!(copied.text_content(), "b");

        let plain = text("a");
        let marked = em("a");
        assert_eq!(plain.mark(marked.marks().clone()), marked);
        assert!(marked.mark(marked.marks().clone()).ptr_eq(&marked));
    }

    #[test]
    fn test_check() {
        let schema = basic_schema();
        assert_eq!(doc(vec![p(vec![em("a")])]).check(), Ok(()));
        assert_eq!(
            doc(vec![]).check(),
            Err(NodeError::InvalidContent("doc".into()))
        );
        assert_eq!(
            doc(vec![text("a")]).check(),
            Err(NodeError::InvalidContent("doc".into()))
        );

        let heading = schema.node_type("heading").unwrap();
        let h = heading.create(None, vec![em("a")], None).unwrap();
        assert_eq!(
            doc(vec![h]).check(),
            Err(NodeError::DisallowedMark {
                node: "heading".into(),
                mark: "em".into()
            })
        );
    }

    #[test]
    fn test_content_match_at() {
        let d = doc(vec![p(vec![]), p(vec![])]);
        let schema = basic_schema();
        let paragraph = schema.node_type("paragraph").unwrap();
        let after_one = d.content_match_at(1).unwrap();
        assert!(after_one.valid_end());
        assert!(after_one.match_type(&paragraph).is_some());
        assert!(matches!(
            d.content_match_at(3),
            Err(ContentMatchError::InvalidRange { .. })
        ));
        let bad = doc(vec![text("x")]);
        assert_eq!(
            bad.content_match_at(1).unwrap_err(),
            ContentMatchError::InvalidContent
        );
    }

    #[test]
    fn test_can_replace() {
        let d = doc(vec![p(vec![]), p(vec![])]);
        let paras = Fragment::from(vec![p(vec![]), p(vec![])]);
        let texts = Fragment::from(vec![text("x")]);
        assert_eq!(d.can_replace(0, 2, None, ..), Ok(false));
        assert_eq!(d.can_replace(0, 1, None, ..), Ok(true));
        assert_eq!(d.can_replace(0, 2, Some(&paras), ..), Ok(true));
        assert_eq!(d.can_replace(0, 2, Some(&paras), 1..), Ok(true));
        assert_eq!(d.can_replace(1, 1, Some(&texts), ..), Ok(false));
        assert!(d.can_replace(0, 0, Some(&texts), 0..2).is_err());

        assert_eq!(d.can_append(&doc(vec![p(vec![])])), Ok(true));
        assert_eq!(p(vec![]).can_append(&doc(vec![p(vec![])])), Ok(false));
        assert_eq!(p(vec![]).can_append(&p(vec![])), Ok(true));
    }

    #[test]
    fn test_debug() {
        let d = doc(vec![p(vec![text("a"), em("b")])]);
        assert_eq!(format!("{:?}", d), r#"doc(paragraph("a", em("b")))"#);
    }
}
