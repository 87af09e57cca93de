use super::{util, Node};
use derivative::Derivative;
use displaydoc::Display;
use std::fmt::Debug;
use std::iter::FromIterator;
use std::ops::RangeBounds;
use std::sync::Arc;
use thiserror::Error;

/// Errors when indexing into a fragment
#[derive(Debug, Display, Error, Copy, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// Index {index} out of range for fragment with {size} children
    IndexOutOfBounds {
        /// The requested index
        index: usize,
        /// The number of children
        size: usize,
    },
    /// Invalid range {from}..{to} for fragment with {size} children
    InvalidRange {
        /// Start of the range
        from: usize,
        /// End of the range
        to: usize,
        /// The number of children
        size: usize,
    },
}

/// A fragment represents a node's collection of child nodes.
///
/// Like nodes, fragments are persistent data structures, and you should not mutate them or their
/// content. Rather, you create new instances whenever needed. The API tries to make this easy.
#[derive(Derivative)]
#[derivative(
    Debug(bound = "T: Debug"),
    Clone(bound = ""),
    PartialEq(bound = "T: PartialEq"),
    Eq(bound = "T: Eq")
)]
pub struct Fragment<T = Node> {
    inner: Arc<[T]>,
}

impl<T> Fragment<T> {
    /// An empty fragment
    pub fn empty() -> Self {
        Self::default()
    }

    /// The size of the fragment. For now this is the same as [`Fragment::child_count`].
    pub fn size(&self) -> usize {
        self.inner.len()
    }

    /// The number of child nodes in this fragment.
    pub fn child_count(&self) -> usize {
        self.inner.len()
    }

    /// True when the fragment has no children.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get a slice to all child nodes
    pub fn children(&self) -> &[T] {
        &self.inner[..]
    }

    /// Iterate over the child nodes.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.inner.iter()
    }

    /// The first child of the fragment wrapped in `Some`, or `None` if it is empty.
    pub fn first_child(&self) -> Option<&T> {
        self.inner.first()
    }

    /// The last child of the fragment wrapped in `Some`, or `None` if it is empty.
    pub fn last_child(&self) -> Option<&T> {
        self.inner.last()
    }

    /// Get the child node at the given index.
    pub fn child(&self, index: usize) -> Result<&T, FragmentError> {
        self.inner.get(index).ok_or(FragmentError::IndexOutOfBounds {
            index,
            size: self.inner.len(),
        })
    }

    /// Get the child node at the given index, if it exists.
    pub fn maybe_child(&self, index: usize) -> Option<&T> {
        self.inner.get(index)
    }

    /// Call `f` for every child node, in order, passing the child's index.
    pub fn for_each<F: FnMut(&T, usize)>(&self, mut f: F) {
        for (i, child) in self.inner.iter().enumerate() {
            f(child, i)
        }
    }

    /// True when both fragments share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Fragment<T> {
    /// Cut out the children in the given range of indices.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Result<Self, FragmentError> {
        let size = self.inner.len();
        let (from, to) = util::bounds(&range, size).ok_or(FragmentError::InvalidRange {
            from: util::from(&range),
            to: util::to(&range, size),
            size,
        })?;
        if from == 0 && to == size {
            return Ok(self.clone());
        }
        Ok(Self::from(&self.inner[from..to]))
    }

    /// Create a new fragment containing the combined content of this fragment and the other.
    pub fn append(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut nodes = Vec::with_capacity(self.inner.len() + other.inner.len());
        nodes.extend_from_slice(&self.inner);
        nodes.extend_from_slice(&other.inner);
        Self::from(nodes)
    }

    /// Create a new fragment in which the node at the given index is replaced by the given node.
    pub fn replace_child(&self, index: usize, node: T) -> Result<Self, FragmentError> {
        self.child(index)?;
        let mut nodes = self.inner.to_vec();
        nodes[index] = node;
        Ok(Self::from(nodes))
    }

    /// Create a new fragment by prepending the given node to this fragment.
    pub fn add_to_start(&self, node: T) -> Self {
        let mut nodes = Vec::with_capacity(self.inner.len() + 1);
        nodes.push(node);
        nodes.extend_from_slice(&self.inner);
        Self::from(nodes)
    }

    /// Create a new fragment by appending the given node to this fragment.
    pub fn add_to_end(&self, node: T) -> Self {
        let mut nodes = self.inner.to_vec();
        nodes.push(node);
        Self::from(nodes)
    }
}

impl<T> Default for Fragment<T> {
    fn default() -> Self {
        Self {
            inner: Arc::from(Vec::new()),
        }
    }
}

impl<T> From<Vec<T>> for Fragment<T> {
    fn from(src: Vec<T>) -> Fragment<T> {
        Fragment {
            inner: Arc::from(src),
        }
    }
}

impl<T: Clone> From<&[T]> for Fragment<T> {
    fn from(src: &[T]) -> Fragment<T> {
        Fragment {
            inner: Arc::from(src),
        }
    }
}

impl From<Node> for Fragment<Node> {
    fn from(node: Node) -> Fragment<Node> {
        Fragment::from(vec![node])
    }
}

impl<T> FromIterator<T> for Fragment<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a, T> IntoIterator for &'a Fragment<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
