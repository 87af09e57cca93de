use super::Node;

/// A position in a document, counted in the integer-based indexing scheme.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, new)]
pub struct Position {
    offset: usize,
}

impl Position {
    /// The offset from the start of the document.
    pub fn offset(self) -> usize {
        self.offset
    }
}

impl From<usize> for Position {
    fn from(offset: usize) -> Self {
        Self { offset }
    }
}

/// A position together with the document it points into and its depth in that document.
///
/// Two resolved positions are equal when they have the same position in the very same document.
#[derive(Debug, Clone, new)]
pub struct ResolvedPos {
    pos: usize,
    doc: Node,
    depth: usize,
}

impl ResolvedPos {
    /// The position that was resolved.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The root node in which the position was resolved.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The number of levels the parent node is from the root.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl PartialEq for ResolvedPos {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && self.doc.ptr_eq(&other.doc)
    }
}

impl Eq for ResolvedPos {}
