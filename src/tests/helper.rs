//! # Helpers
//!
//! Functions to create a small schema and documents in it programmatically.
//!
//! See also: <https://github.com/prosemirror/prosemirror-test-builder>
use crate::model::{ContentMatch, MarkSet, Node, NodeType, Schema};
use once_cell::sync::Lazy;

const BASIC: &str = r#"{
    "nodes": {
        "doc": {},
        "paragraph": {"marks": "_"},
        "heading": {"attrs": {"level": 1}, "marks": ""},
        "blockquote": {},
        "text": {"text": true},
        "image": {"inline": true, "leaf": true, "attrs": {"src": ""}}
    },
    "marks": {
        "em": {},
        "strong": {},
        "link": {"attrs": {"href": null}}
    }
}"#;

static BASIC_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let schema = Schema::from_json(BASIC).unwrap();
    let node = |name: &str| schema.node_type(name).unwrap();

    // block+
    for &name in &["doc", "blockquote"] {
        let mut b = ContentMatch::builder(&schema);
        let (s0, s1) = (b.add_state(false), b.add_state(true));
        for &child in &["paragraph", "heading", "blockquote"] {
            b.add_edge(s0, &node(child), s1).unwrap();
            b.add_edge(s1, &node(child), s1).unwrap();
        }
        schema
            .set_content_match(name, b.build().unwrap().start())
            .unwrap();
    }

    // (text | image)*
    let mut b = ContentMatch::builder(&schema);
    let s0 = b.add_state(true);
    b.add_edge(s0, &node("text"), s0).unwrap();
    b.add_edge(s0, &node("image"), s0).unwrap();
    schema
        .set_content_match("paragraph", b.build().unwrap().start())
        .unwrap();

    // text*
    let mut b = ContentMatch::builder(&schema);
    let s0 = b.add_state(true);
    b.add_edge(s0, &node("text"), s0).unwrap();
    schema
        .set_content_match("heading", b.build().unwrap().start())
        .unwrap();

    schema
});

/// The schema all helpers build nodes in.
pub fn basic_schema() -> Schema {
    BASIC_SCHEMA.clone()
}

/// Get a node type of the basic schema.
pub fn node_type(name: &str) -> NodeType {
    BASIC_SCHEMA.node_type(name).unwrap()
}

fn block(name: &str, content: Vec<Node>) -> Node {
    node_type(name).create(None, content, None).unwrap()
}

/// Create a document node.
pub fn doc(content: Vec<Node>) -> Node {
    block("doc", content)
}

/// Create a paragraph node.
pub fn p(content: Vec<Node>) -> Node {
    block("paragraph", content)
}

/// Create a heading (level 1) node.
pub fn h1(content: Vec<Node>) -> Node {
    block("heading", content)
}

/// Create a blockquote node.
pub fn blockquote(content: Vec<Node>) -> Node {
    block("blockquote", content)
}

/// Create an image node.
pub fn img() -> Node {
    block("image", vec![])
}

/// Create a text node.
pub fn text(content: &str) -> Node {
    Node::new_text(node_type("text"), content, MarkSet::empty()).unwrap()
}

fn marked(content: &str, mark: &str) -> Node {
    let mark = BASIC_SCHEMA.mark_type(mark).unwrap().create(None);
    Node::new_text(node_type("text"), content, MarkSet::from(vec![mark])).unwrap()
}

/// Create an emphasized text node.
pub fn em(content: &str) -> Node {
    marked(content, "em")
}

/// Create a strong text node.
pub fn strong(content: &str) -> Node {
    marked(content, "strong")
}
