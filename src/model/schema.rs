use super::content::{Graph, StateId};
use super::{ContentMatch, Fragment, Mark, MarkSet, Node, NodeError};
use displaydoc::Display;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Attribute values, keyed by attribute name
pub type Attrs = BTreeMap<String, Value>;

/// Errors when building a schema
#[derive(Debug, Display, Error)]
pub enum SchemaError {
    /// {kind} type name cannot be empty
    EmptyName {
        /// Either `node` or `mark`
        kind: &'static str,
    },
    /// Unknown node type `{0}`
    UnknownNodeType(String),
    /// The content match of node type `{0}` has already been set
    ContentMatchAlreadySet(String),
    /// The content match for node type `{0}` was built against another schema
    ForeignContentMatch(String),
    /// Could not parse the schema spec
    Parse(#[from] serde_json::Error),
}

/// The description of a node type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeSpec {
    /// The attributes of this node type, with their default values.
    pub attrs: Attrs,
    /// Whether this is an inline type.
    pub inline: bool,
    /// The marks allowed inside this node: a space-separated list of mark names, `"_"` for all
    /// marks or `""` for none. When unset, only inline nodes allow marks.
    pub marks: Option<String>,
    /// Whether this is a leaf node type.
    pub leaf: bool,
    /// Whether this is the text node type.
    pub text: bool,
}

/// The description of a mark type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkSpec {
    /// The attributes of this mark type, with their default values.
    pub attrs: Attrs,
}

/// The node and mark specs of a schema, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaSpec {
    /// The node types, keyed by name. The first one is the default top node.
    pub nodes: IndexMap<String, NodeSpec>,
    /// The mark types, keyed by name.
    pub marks: IndexMap<String, MarkSpec>,
}

#[derive(Debug)]
struct Compiled {
    graph: Arc<Graph>,
    state: StateId,
    inline_content: bool,
}

struct NodeTypeData {
    name: String,
    spec: NodeSpec,
    content: OnceCell<Compiled>,
}

struct MarkTypeData {
    name: String,
    spec: MarkSpec,
}

struct SchemaInner {
    nodes: IndexMap<String, NodeTypeData>,
    marks: IndexMap<String, MarkTypeData>,
}

/// A document schema. Holds node and mark type objects for the nodes and marks that may occur in
/// conforming documents.
///
/// Construction has two phases: [`Schema::new`] creates all the types, after which
/// [`Schema::set_content_match`] installs the content automaton of each type, exactly once. Content
/// expressions may refer to the type they belong to, which is why the automata can only be built
/// after the types exist.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    /// Build the node and mark types described by the spec.
    pub fn new(spec: SchemaSpec) -> Result<Self, SchemaError> {
        let mut nodes = IndexMap::with_capacity(spec.nodes.len());
        for (name, spec) in spec.nodes {
            if name.trim().is_empty() {
                return Err(SchemaError::EmptyName { kind: "node" });
            }
            let data = NodeTypeData {
                name: name.clone(),
                spec,
                content: OnceCell::new(),
            };
            nodes.insert(name, data);
        }
        let mut marks = IndexMap::with_capacity(spec.marks.len());
        for (name, spec) in spec.marks {
            if name.trim().is_empty() {
                return Err(SchemaError::EmptyName { kind: "mark" });
            }
            let data = MarkTypeData {
                name: name.clone(),
                spec,
            };
            marks.insert(name, data);
        }
        debug!(nodes = nodes.len(), marks = marks.len(), "created schema");
        Ok(Schema {
            inner: Arc::new(SchemaInner { nodes, marks }),
        })
    }

    /// Parse a [`SchemaSpec`] from JSON and build the schema.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let spec: SchemaSpec = serde_json::from_str(json)?;
        Self::new(spec)
    }

    pub(crate) fn empty() -> Self {
        Schema {
            inner: Arc::new(SchemaInner {
                nodes: IndexMap::new(),
                marks: IndexMap::new(),
            }),
        }
    }

    /// Get the node type with the given name.
    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.inner.nodes.get_index_of(name).map(|index| NodeType {
            schema: self.clone(),
            index,
        })
    }

    /// Get the mark type with the given name.
    pub fn mark_type(&self, name: &str) -> Option<MarkType> {
        self.inner.marks.get_index_of(name).map(|index| MarkType {
            schema: self.clone(),
            index,
        })
    }

    /// All node types, in declaration order.
    pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
        (0..self.inner.nodes.len()).map(move |index| self.node_type_at(index))
    }

    /// All mark types, in declaration order.
    pub fn mark_types(&self) -> impl Iterator<Item = MarkType> + '_ {
        (0..self.inner.marks.len()).map(move |index| MarkType {
            schema: self.clone(),
            index,
        })
    }

    /// The type of the default top node, which is the first node type in the spec.
    pub fn top_node_type(&self) -> Option<NodeType> {
        if self.inner.nodes.is_empty() {
            None
        } else {
            Some(self.node_type_at(0))
        }
    }

    /// Install the content automaton of the named node type. This can only happen once per type;
    /// the automaton must have been built against this schema.
    pub fn set_content_match(
        &self,
        name: &str,
        content_match: ContentMatch,
    ) -> Result<(), SchemaError> {
        let data = self
            .inner
            .nodes
            .get(name)
            .ok_or_else(|| SchemaError::UnknownNodeType(name.to_owned()))?;
        if !content_match.schema().ptr_eq(self) && content_match.has_edges_anywhere() {
            return Err(SchemaError::ForeignContentMatch(name.to_owned()));
        }
        let compiled = Compiled {
            inline_content: content_match.inline_content(),
            graph: content_match.graph().clone(),
            state: content_match.state(),
        };
        data.content
            .set(compiled)
            .map_err(|_| SchemaError::ContentMatchAlreadySet(name.to_owned()))?;
        debug!(node_type = name, "installed content match");
        Ok(())
    }

    /// True when both values refer to the same schema.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn node_type_at(&self, index: usize) -> NodeType {
        NodeType {
            schema: self.clone(),
            index,
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.inner.nodes.keys().collect::<Vec<_>>())
            .field("marks", &self.inner.marks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Node types are objects allocated once per `Schema` and used to tag `Node` instances. They
/// contain information about the node type, such as its name and what kind of node it represents.
///
/// Two node types are equal when they have the same name.
#[derive(Clone)]
pub struct NodeType {
    schema: Schema,
    index: usize,
}

impl NodeType {
    fn data(&self) -> &NodeTypeData {
        &self.schema.inner.nodes[self.index]
    }

    /// The name the node type has in this schema.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The schema that the node type is part of.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The spec that this type is based on
    pub fn spec(&self) -> &NodeSpec {
        &self.data().spec
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// True when both handles point to the same slot of the same schema.
    pub fn same(&self, other: &NodeType) -> bool {
        self.index == other.index && self.schema.ptr_eq(&other.schema)
    }

    /// True if this is a leaf node type.
    pub fn is_leaf(&self) -> bool {
        self.spec().leaf
    }

    /// True if this is the text node type.
    pub fn is_text(&self) -> bool {
        self.spec().text
    }

    /// True if this is a block type
    pub fn is_block(&self) -> bool {
        !(self.spec().text || self.spec().inline)
    }

    /// True if this is an inline type.
    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// True if this is a textblock type, a block that contains inline content.
    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content() == Some(true)
    }

    /// Whether this type's content starts with inline nodes. `None` until the content match was
    /// installed.
    pub fn inline_content(&self) -> Option<bool> {
        self.compiled().map(|c| c.inline_content)
    }

    fn compiled(&self) -> Option<&Compiled> {
        self.data().content.get()
    }

    /// The starting match of the node type's content expression, once installed.
    pub fn content_match(&self) -> Option<ContentMatch> {
        self.compiled()
            .map(|c| ContentMatch::at(self.schema.clone(), c.graph.clone(), c.state))
    }

    /// Like [`NodeType::content_match`], but types without an installed automaton accept only
    /// empty content.
    pub(crate) fn content_match_or_empty(&self) -> ContentMatch {
        self.content_match().unwrap_or_else(ContentMatch::empty)
    }

    /// Whether any attribute of this type must be provided by the caller.
    ///
    /// Attributes don't have a notion of being required yet, so this is always false.
    pub fn has_required_attrs(&self) -> bool {
        false
    }

    /// Indicates whether this node allows some of the same content as the given node type.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self.same(other)
            || self
                .content_match_or_empty()
                .compatible(&other.content_match_or_empty())
    }

    /// Compute the attributes of a new node: the defaults from the spec, overridden by `attrs`.
    pub fn compute_attrs(&self, attrs: Option<Attrs>) -> Attrs {
        let mut built = self.spec().attrs.clone();
        if let Some(attrs) = attrs {
            built.extend(attrs);
        }
        built
    }

    /// Check whether the given mark type is allowed in this node.
    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        self.allows_mark_named(mark_type.name())
    }

    pub(crate) fn allows_mark_named(&self, name: &str) -> bool {
        match self.spec().marks.as_deref() {
            None => self.is_inline(),
            Some("_") => true,
            Some(list) => list.split_whitespace().any(|allowed| allowed == name),
        }
    }

    /// Test whether the given set of marks are allowed in this node.
    pub fn allows_marks(&self, marks: &MarkSet) -> bool {
        marks.iter().all(|mark| self.allows_mark_named(mark.r#type()))
    }

    /// Removes the marks that are not allowed in this node from the given set.
    pub fn allowed_marks(&self, marks: &MarkSet) -> MarkSet {
        if self.allows_marks(marks) {
            return marks.clone();
        }
        marks
            .iter()
            .filter(|mark| self.allows_mark_named(mark.r#type()))
            .cloned()
            .collect()
    }

    /// Returns true if the given fragment is valid content for this node type.
    pub fn valid_content(&self, content: &Fragment) -> bool {
        match self.content_match_or_empty().match_fragment(content) {
            Some(end) if end.valid_end() => {
                content.iter().all(|child| self.allows_marks(child.marks()))
            }
            _ => false,
        }
    }

    /// Create a node of this type. The content is not checked against the type's content
    /// expression. Text nodes can't be created this way.
    pub fn create<C: Into<Fragment>>(
        &self,
        attrs: Option<Attrs>,
        content: C,
        marks: Option<MarkSet>,
    ) -> Result<Node, NodeError> {
        if self.is_text() {
            return Err(NodeError::CannotConstructTextNode(self.name().to_owned()));
        }
        Ok(Node::from_parts(
            self.clone(),
            self.compute_attrs(attrs),
            content.into(),
            marks.unwrap_or_default(),
            None,
        ))
    }

    /// Like [`NodeType::create`], but check the given content against the type's content
    /// expression first.
    pub fn create_checked<C: Into<Fragment>>(
        &self,
        attrs: Option<Attrs>,
        content: C,
        marks: Option<MarkSet>,
    ) -> Result<Node, NodeError> {
        let content = content.into();
        if !self.valid_content(&content) {
            return Err(NodeError::InvalidContent(self.name().to_owned()));
        }
        self.create(attrs, content, marks)
    }

    /// Like [`NodeType::create`], but add the nodes needed before and after the given content to
    /// make it valid. The inserted nodes are themselves empty. Returns `None` if no such filling
    /// exists, and for the text type.
    pub fn create_and_fill<C: Into<Fragment>>(
        &self,
        attrs: Option<Attrs>,
        content: C,
        marks: Option<MarkSet>,
    ) -> Option<Node> {
        if self.is_text() {
            return None;
        }
        let start = self.content_match_or_empty();
        let mut content = content.into();
        if !content.is_empty() {
            let before = start.fill(&content, false, 0)?;
            content = before.append(&content);
        }
        let after = start
            .match_fragment(&content)?
            .fill(&Fragment::empty(), true, 0)?;
        Some(Node::from_parts(
            self.clone(),
            self.compute_attrs(attrs),
            content.append(&after),
            marks.unwrap_or_default(),
            None,
        ))
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for NodeType {}

impl Hash for NodeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state)
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

/// Like nodes, marks (which are associated with nodes to signify things like emphasis or being
/// part of a link) are tagged with type objects, which are instantiated once per `Schema`.
#[derive(Clone)]
pub struct MarkType {
    schema: Schema,
    index: usize,
}

impl MarkType {
    fn data(&self) -> &MarkTypeData {
        &self.schema.inner.marks[self.index]
    }

    /// The name of the mark type.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The schema that this mark type instance is part of.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The spec on which the type is based.
    pub fn spec(&self) -> &MarkSpec {
        &self.data().spec
    }

    /// Create a mark of this type. Attributes not given fall back to the spec's defaults.
    pub fn create(&self, attrs: Option<Attrs>) -> Mark {
        let mut built = self.spec().attrs.clone();
        if let Some(attrs) = attrs {
            built.extend(attrs);
        }
        Mark::from_parts(self.name().to_owned(), built)
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for MarkType {}

impl Hash for MarkType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state)
    }
}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}
