use super::{util, Fragment, Node, NodeType, Schema};
use displaydoc::Display;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;
use std::ops::RangeBounds;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Error on content matching
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ContentMatchError {
    /// Called contentMatchAt on a node with invalid content
    InvalidContent,
    /// Edge index {index} out of range for a state with {count} edges
    EdgeIndexOutOfBounds {
        /// The requested index
        index: usize,
        /// The number of edges
        count: usize,
    },
    /// Invalid range {start}..{end} for a fragment with {count} children
    InvalidRange {
        /// Start of the range
        start: usize,
        /// End of the range
        end: usize,
        /// The number of children
        count: usize,
    },
    /// State {state} does not exist in an automaton with {count} states
    UnknownState {
        /// The requested state
        state: usize,
        /// The number of states
        count: usize,
    },
    /// Node type `{0}` belongs to another schema
    ForeignNodeType(String),
    /// An automaton needs at least one state
    NoStates,
}

/// The address of a state within one automaton.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// The position of the state in the order it was added.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct State {
    valid_end: bool,
    edges: Vec<(usize, StateId)>,
}

/// The states of one automaton. Edges point at node types by their slot in the schema and at
/// states by their index here, so cycles don't need shared ownership.
#[derive(Debug)]
pub(crate) struct Graph {
    states: Vec<State>,
}

impl Graph {
    fn state(&self, id: StateId) -> &State {
        &self.states[id.0]
    }
}

static EMPTY: Lazy<ContentMatch> = Lazy::new(|| ContentMatch {
    schema: Schema::empty(),
    graph: Arc::new(Graph {
        states: vec![State {
            valid_end: true,
            edges: Vec::new(),
        }],
    }),
    state: StateId(0),
});

/// A transition of the automaton: matching a node of `node_type` leads to `next`.
#[derive(Debug, Clone, PartialEq, new)]
pub struct Edge {
    /// The type this edge matches.
    pub node_type: NodeType,
    /// The state after the match.
    pub next: ContentMatch,
}

/// Instances of this type represent a match state of a node type's content expression, and can be
/// used to find out whether further content matches here, and whether a given position is a valid
/// end of the node.
///
/// A `ContentMatch` is a cheap handle into a shared automaton; use [`AutomatonBuilder`] to create
/// one.
#[derive(Clone)]
pub struct ContentMatch {
    schema: Schema,
    graph: Arc<Graph>,
    state: StateId,
}

impl ContentMatch {
    /// The shared state without edges that accepts only the end of the content.
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    /// Start building an automaton over the node types of the given schema.
    pub fn builder(schema: &Schema) -> AutomatonBuilder {
        AutomatonBuilder::new(schema)
    }

    pub(crate) fn at(schema: Schema, graph: Arc<Graph>, state: StateId) -> Self {
        ContentMatch {
            schema,
            graph,
            state,
        }
    }

    fn data(&self) -> &State {
        self.graph.state(self.state)
    }

    fn goto(&self, state: StateId) -> ContentMatch {
        ContentMatch {
            schema: self.schema.clone(),
            graph: self.graph.clone(),
            state,
        }
    }

    pub(crate) fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// The address of this state in its automaton.
    pub fn state(&self) -> StateId {
        self.state
    }

    pub(crate) fn has_edges_anywhere(&self) -> bool {
        self.graph.states.iter().any(|s| !s.edges.is_empty())
    }

    /// True when both handles point at the same state of the same automaton.
    pub fn same_state(&self, other: &ContentMatch) -> bool {
        self.state == other.state && Arc::ptr_eq(&self.graph, &other.graph)
    }

    /// True when this match state represents a valid end of the node.
    pub fn valid_end(&self) -> bool {
        self.data().valid_end
    }

    /// The number of outgoing edges this node has in the finite automaton that describes the
    /// content expression.
    pub fn edge_count(&self) -> usize {
        self.data().edges.len()
    }

    /// Get the _n_th outgoing edge from this node in the finite automaton that describes the
    /// content expression.
    pub fn edge(&self, index: usize) -> Result<Edge, ContentMatchError> {
        let edges = &self.data().edges;
        let &(node_type, next) = edges
            .get(index)
            .ok_or(ContentMatchError::EdgeIndexOutOfBounds {
                index,
                count: edges.len(),
            })?;
        Ok(Edge::new(self.schema.node_type_at(node_type), self.goto(next)))
    }

    /// The outgoing edges, in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.data()
            .edges
            .iter()
            .map(move |&(node_type, next)| {
                Edge::new(self.schema.node_type_at(node_type), self.goto(next))
            })
    }

    fn step(&self, state: StateId, node_type: &NodeType) -> Option<StateId> {
        if !node_type.schema().ptr_eq(&self.schema) {
            return None;
        }
        self.graph
            .state(state)
            .edges
            .iter()
            .find(|(t, _)| *t == node_type.index())
            .map(|&(_, next)| next)
    }

    fn walk(&self, state: StateId, nodes: &[Node]) -> Option<StateId> {
        nodes
            .iter()
            .try_fold(state, |state, node| self.step(state, node.r#type()))
    }

    /// Match a node type, returning a match after that node if successful.
    pub fn match_type(&self, node_type: &NodeType) -> Option<ContentMatch> {
        self.step(self.state, node_type).map(|next| self.goto(next))
    }

    /// Try to match a fragment. Returns the resulting match when successful. Whether that match
    /// is a valid end is up to the caller to check.
    pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
        self.walk(self.state, fragment.children())
            .map(|end| self.goto(end))
    }

    /// Try to match the children of a fragment in the given index range.
    pub fn match_fragment_range<R: RangeBounds<usize>>(
        &self,
        fragment: &Fragment,
        range: R,
    ) -> Result<Option<ContentMatch>, ContentMatchError> {
        let count = fragment.child_count();
        let (start, end) = util::bounds(&range, count).ok_or(ContentMatchError::InvalidRange {
            start: util::from(&range),
            end: util::to(&range, count),
            count,
        })?;
        Ok(self
            .walk(self.state, &fragment.children()[start..end])
            .map(|end| self.goto(end)))
    }

    /// Get the first matching node type at this match position that can be generated.
    pub fn default_type(&self) -> Option<NodeType> {
        self.edges()
            .map(|edge| edge.node_type)
            .find(|t| !(t.is_text() || t.has_required_attrs()))
    }

    /// True when this match state and `other` share an outgoing edge of the same type.
    pub fn compatible(&self, other: &ContentMatch) -> bool {
        if !self.schema.ptr_eq(&other.schema) {
            return false;
        }
        let theirs = &other.data().edges;
        self.data()
            .edges
            .iter()
            .any(|(t, _)| theirs.iter().any(|(u, _)| t == u))
    }

    /// Whether the content starting here begins with inline nodes.
    pub fn inline_content(&self) -> bool {
        self.edges()
            .next()
            .map_or(false, |edge| edge.node_type.is_inline())
    }

    /// Try to match the given fragment, and if that fails, see if it can be made to match by
    /// inserting nodes in front of it. When successful, return a fragment of inserted nodes
    /// (which may be empty if nothing had to be inserted). When `to_end` is true, only return a
    /// fragment if the resulting match goes to the end of the content expression.
    ///
    /// The search follows edges in their declared order, so the result is deterministic. Inserted
    /// nodes carry their type's default attributes and no content.
    pub fn fill_before(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Result<Option<Fragment>, ContentMatchError> {
        let count = after.child_count();
        if start_index > count {
            return Err(ContentMatchError::InvalidRange {
                start: start_index,
                end: count,
                count,
            });
        }
        Ok(self.fill(after, to_end, start_index))
    }

    pub(crate) fn fill(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Option<Fragment> {
        let after = &after.children()[start_index..];
        let path = match self.search_fill(after, to_end) {
            Some(path) => path,
            None => {
                trace!(state = self.state.0, to_end, "no filling found");
                return None;
            }
        };
        trace!(state = self.state.0, nodes = path.len(), "found filling");
        Some(
            path.into_iter()
                .map(|index| {
                    let node_type = self.schema.node_type_at(index);
                    let attrs = node_type.compute_attrs(None);
                    Node::from_parts(
                        node_type,
                        attrs,
                        Fragment::empty(),
                        Default::default(),
                        None,
                    )
                })
                .collect(),
        )
    }

    /// Depth-first search for the node types to insert, following edges in order. Every state is
    /// entered at most once. Runs on an explicit stack of frames.
    fn search_fill(&self, after: &[Node], to_end: bool) -> Option<Vec<usize>> {
        let accepts = |state: StateId| match self.walk(state, after) {
            Some(end) => !to_end || self.graph.state(end).valid_end,
            None => false,
        };
        if accepts(self.state) {
            return Some(Vec::new());
        }

        let mut seen = HashSet::new();
        seen.insert(self.state);
        // (state, next edge to try)
        let mut frames = vec![(self.state, 0)];
        let mut path = Vec::new();
        while let Some(frame) = frames.last_mut() {
            let (index, next) = match self.graph.state(frame.0).edges.get(frame.1) {
                Some(&edge) => edge,
                None => {
                    frames.pop();
                    path.pop();
                    continue;
                }
            };
            frame.1 += 1;
            let node_type = self.schema.node_type_at(index);
            if node_type.is_text() || node_type.has_required_attrs() || !seen.insert(next) {
                continue;
            }
            path.push(index);
            if accepts(next) {
                return Some(path);
            }
            frames.push((next, 0));
        }
        None
    }

    /// Find a set of wrapping node types that would allow a node of the given type to appear at
    /// this position. The result may be empty (when it fits directly) and will be `None` when no
    /// such wrapping exists. The shortest wrapping wins.
    pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        struct Active {
            state: ContentMatch,
            node_type: Option<NodeType>,
            via: Option<usize>,
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut active = vec![Active {
            state: self.clone(),
            node_type: None,
            via: None,
        }];
        let mut cursor = 0;
        while cursor < active.len() {
            let current = cursor;
            cursor += 1;
            let state = active[current].state.clone();
            if state.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut at = Some(current);
                while let Some(i) = at {
                    if let Some(node_type) = &active[i].node_type {
                        result.push(node_type.clone());
                    }
                    at = active[i].via;
                }
                result.reverse();
                trace!(node_type = target.name(), depth = result.len(), "found wrapping");
                return Some(result);
            }
            let is_root = active[current].node_type.is_none();
            for Edge { node_type, next } in state.edges() {
                if node_type.is_leaf()
                    || node_type.has_required_attrs()
                    || seen.contains(node_type.name())
                    || !(is_root || next.valid_end())
                {
                    continue;
                }
                if let Some(inner) = node_type.content_match() {
                    seen.insert(node_type.name().to_owned());
                    active.push(Active {
                        state: inner,
                        node_type: Some(node_type),
                        via: Some(current),
                    });
                }
            }
        }
        trace!(node_type = target.name(), "no wrapping found");
        None
    }
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        if self.same_state(other) {
            return true;
        }
        let (a, b) = (self.data(), other.data());
        a.valid_end == b.valid_end
            && a.edges.len() == b.edges.len()
            && (a.edges.is_empty()
                || (Arc::ptr_eq(&self.graph, &other.graph)
                    && self.schema.ptr_eq(&other.schema)
                    && a.edges == b.edges))
    }
}

impl fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges: Vec<_> = self
            .edges()
            .map(|edge| (edge.node_type.name().to_owned(), edge.next.state.0))
            .collect();
        f.debug_struct("ContentMatch")
            .field("state", &self.state.0)
            .field("valid_end", &self.valid_end())
            .field("edges", &edges)
            .finish()
    }
}

/// Builds the states and edges of a content automaton for one schema.
#[derive(Debug)]
pub struct AutomatonBuilder {
    schema: Schema,
    states: Vec<State>,
}

impl AutomatonBuilder {
    /// Start an automaton over the node types of the given schema.
    pub fn new(schema: &Schema) -> Self {
        AutomatonBuilder {
            schema: schema.clone(),
            states: Vec::new(),
        }
    }

    /// Add a state. The first state added is the start state.
    pub fn add_state(&mut self, valid_end: bool) -> StateId {
        self.states.push(State {
            valid_end,
            edges: Vec::new(),
        });
        StateId(self.states.len() - 1)
    }

    fn check_state(&self, state: StateId) -> Result<(), ContentMatchError> {
        if state.0 < self.states.len() {
            Ok(())
        } else {
            Err(ContentMatchError::UnknownState {
                state: state.0,
                count: self.states.len(),
            })
        }
    }

    /// Add a transition from `from` to `to` for nodes of the given type.
    pub fn add_edge(
        &mut self,
        from: StateId,
        node_type: &NodeType,
        to: StateId,
    ) -> Result<&mut Self, ContentMatchError> {
        self.check_state(from)?;
        self.check_state(to)?;
        if !node_type.schema().ptr_eq(&self.schema) {
            return Err(ContentMatchError::ForeignNodeType(
                node_type.name().to_owned(),
            ));
        }
        self.states[from.0].edges.push((node_type.index(), to));
        Ok(self)
    }

    /// Finish the automaton.
    pub fn build(self) -> Result<Automaton, ContentMatchError> {
        if self.states.is_empty() {
            return Err(ContentMatchError::NoStates);
        }
        Ok(Automaton {
            schema: self.schema,
            graph: Arc::new(Graph {
                states: self.states,
            }),
        })
    }
}

/// A finished content automaton.
#[derive(Debug, Clone)]
pub struct Automaton {
    schema: Schema,
    graph: Arc<Graph>,
}

impl Automaton {
    /// The start state.
    pub fn start(&self) -> ContentMatch {
        ContentMatch::at(self.schema.clone(), self.graph.clone(), StateId(0))
    }

    /// The state with the given address.
    pub fn state(&self, state: StateId) -> Result<ContentMatch, ContentMatchError> {
        let count = self.graph.states.len();
        if state.0 >= count {
            return Err(ContentMatchError::UnknownState {
                state: state.0,
                count,
            });
        }
        Ok(ContentMatch::at(
            self.schema.clone(),
            self.graph.clone(),
            state,
        ))
    }

    /// The number of states.
    pub fn state_count(&self) -> usize {
        self.graph.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentMatch, ContentMatchError, StateId};
    use crate::model::{Fragment, NodeSpec, Schema, SchemaSpec};

    fn schema() -> Schema {
        let mut spec = SchemaSpec::default();
        for name in &["paragraph", "heading"] {
            spec.nodes.insert(name.to_string(), NodeSpec::default());
        }
        spec.nodes.insert(
            "text".into(),
            NodeSpec {
                text: true,
                ..NodeSpec::default()
            },
        );
        Schema::new(spec).unwrap()
    }

    #[test]
    fn test_empty_is_shared() {
        let a = ContentMatch::empty();
        let b = ContentMatch::empty();
        assert!(a.same_state(&b));
        assert!(a.valid_end());
        assert_eq!(a.edge_count(), 0);
        assert_eq!(a.default_type(), None);
    }

    #[test]
    fn test_builder_errors() {
        let schema = schema();
        let other = schema.clone();
        let foreign = self::schema();
        let paragraph = schema.node_type("paragraph").unwrap();

        assert_eq!(
            ContentMatch::builder(&schema).build().unwrap_err(),
            ContentMatchError::NoStates
        );

        let mut b = ContentMatch::builder(&other);
        let s0 = b.add_state(false);
        assert_eq!(
            b.add_edge(s0, &paragraph, StateId(1)).unwrap_err(),
            ContentMatchError::UnknownState { state: 1, count: 1 }
        );
        assert_eq!(
            b.add_edge(s0, &foreign.node_type("paragraph").unwrap(), s0)
                .unwrap_err(),
            ContentMatchError::ForeignNodeType("paragraph".into())
        );
        let automaton = b.build().unwrap();
        assert_eq!(automaton.state_count(), 1);
        assert!(automaton.state(StateId(1)).is_err());
    }

    #[test]
    fn test_edges() {
        let schema = schema();
        let paragraph = schema.node_type("paragraph").unwrap();
        let heading = schema.node_type("heading").unwrap();
        let mut b = ContentMatch::builder(&schema);
        let (s0, s1, s2) = (b.add_state(false), b.add_state(true), b.add_state(true));
        b.add_edge(s0, &paragraph, s1).unwrap();
        b.add_edge(s0, &heading, s2).unwrap();
        let automaton = b.build().unwrap();
        let start = automaton.start();

        assert_eq!(start.edge_count(), 2);
        let edge = start.edge(1).unwrap();
        assert!(edge.node_type.same(&heading));
        assert!(edge.next.same_state(&automaton.state(s2).unwrap()));
        assert_eq!(
            start.edge(2).unwrap_err(),
            ContentMatchError::EdgeIndexOutOfBounds { index: 2, count: 2 }
        );
        let names: Vec<_> = start.edges().map(|e| e.node_type.name().to_owned()).collect();
        assert_eq!(names, vec!["paragraph", "heading"]);
    }

    #[test]
    fn test_match_type() {
        let schema = schema();
        let paragraph = schema.node_type("paragraph").unwrap();
        let heading = schema.node_type("heading").unwrap();
        let mut b = ContentMatch::builder(&schema);
        let (s0, s1) = (b.add_state(false), b.add_state(true));
        b.add_edge(s0, &paragraph, s1).unwrap();
        let automaton = b.build().unwrap();
        let start = automaton.start();

        let next = start.match_type(&paragraph).unwrap();
        assert!(next.same_state(&automaton.state(s1).unwrap()));
        assert!(start.match_type(&heading).is_none());
        assert!(next.match_type(&paragraph).is_none());
        assert!(!start.valid_end());
        assert_eq!(start.edge_count(), 1);

        let foreign = self::schema().node_type("paragraph").unwrap();
        assert!(start.match_type(&foreign).is_none());
    }

    #[test]
    fn test_match_fragment_range_bounds() {
        let schema = schema();
        let mut b = ContentMatch::builder(&schema);
        b.add_state(true);
        let start = b.build().unwrap().start();

        let empty = Fragment::empty();
        assert!(start.match_fragment(&empty).unwrap().same_state(&start));
        assert!(start
            .match_fragment_range(&empty, 0..0)
            .unwrap()
            .unwrap()
            .same_state(&start));
        assert_eq!(
            start.match_fragment_range(&empty, 0..1).unwrap_err(),
            ContentMatchError::InvalidRange {
                start: 0,
                end: 1,
                count: 0
            }
        );
        assert_eq!(
            start.fill_before(&empty, false, 1).unwrap_err(),
            ContentMatchError::InvalidRange {
                start: 1,
                end: 0,
                count: 0
            }
        );
    }

    #[test]
    fn test_equality() {
        let schema = schema();
        let paragraph = schema.node_type("paragraph").unwrap();
        let mut b = ContentMatch::builder(&schema);
        let (s0, s1, s2) = (b.add_state(false), b.add_state(true), b.add_state(false));
        b.add_edge(s0, &paragraph, s1).unwrap();
        b.add_edge(s2, &paragraph, s1).unwrap();
        let a = b.build().unwrap();
        assert_eq!(a.state(s0).unwrap(), a.state(s2).unwrap());
        assert_ne!(a.state(s0).unwrap(), a.state(s1).unwrap());

        let mut b = ContentMatch::builder(&schema);
        let (t0, t1) = (b.add_state(false), b.add_state(true));
        b.add_edge(t0, &paragraph, t1).unwrap();
        let other = b.build().unwrap();
        assert_ne!(a.state(s0).unwrap(), other.state(t0).unwrap());
        assert_eq!(a.state(s1).unwrap(), other.state(t1).unwrap());
        assert_eq!(a.state(s1).unwrap(), ContentMatch::empty());
    }

    #[test]
    fn test_default_type_skips_text() {
        let schema = schema();
        let text = schema.node_type("text").unwrap();
        let heading = schema.node_type("heading").unwrap();
        let mut b = ContentMatch::builder(&schema);
        let (s0, s1) = (b.add_state(false), b.add_state(true));
        b.add_edge(s0, &text, s1).unwrap();
        let only_text = b.build().unwrap().start();
        assert_eq!(only_text.default_type(), None);
        assert!(only_text.inline_content());

        let mut b = ContentMatch::builder(&schema);
        let (s0, s1) = (b.add_state(false), b.add_state(true));
        b.add_edge(s0, &text, s1).unwrap();
        b.add_edge(s0, &heading, s1).unwrap();
        let start = b.build().unwrap().start();
        assert_eq!(start.default_type(), Some(heading));
    }

    #[test]
    fn test_compatible() {
        let schema = schema();
        let paragraph = schema.node_type("paragraph").unwrap();
        let heading = schema.node_type("heading").unwrap();
        let build = |types: &[&crate::model::NodeType]| {
            let mut b = ContentMatch::builder(&schema);
            let (s0, s1) = (b.add_state(false), b.add_state(true));
            for t in types {
                b.add_edge(s0, t, s1).unwrap();
            }
            b.build().unwrap().start()
        };
        let p = build(&[&paragraph]);
        let ph = build(&[&heading, &paragraph]);
        let h = build(&[&heading]);
        assert!(p.compatible(&ph));
        assert!(ph.compatible(&h));
        assert!(!p.compatible(&h));
        assert!(!p.compatible(&ContentMatch::empty()));
    }
}
