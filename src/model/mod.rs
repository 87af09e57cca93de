//! # The document model
//!
//! Documents are trees of [`Node`]s whose children live in [`Fragment`]s. Every node is tagged
//! with a [`NodeType`] from a [`Schema`], and the [`ContentMatch`] automaton of that type decides
//! which sequences of children are valid.
mod content;
mod fragment;
mod marks;
mod node;
mod resolved_pos;
mod schema;
mod slice;
pub(crate) mod util;

pub use content::{Automaton, AutomatonBuilder, ContentMatch, ContentMatchError, Edge, StateId};
pub use fragment::{Fragment, FragmentError};
pub use marks::{Mark, MarkError, MarkSet};
pub use node::{Node, NodeError, Text};
pub use resolved_pos::{Position, ResolvedPos};
pub use schema::{Attrs, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaError, SchemaSpec};
pub use slice::{Slice, SliceError};
