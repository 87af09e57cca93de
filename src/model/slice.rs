use super::Fragment;
use displaydoc::Display;
use thiserror::Error;

/// Errors when creating a slice
#[derive(Debug, Display, Error, Copy, Clone, PartialEq, Eq)]
pub enum SliceError {
    /// Open depth at the end ({open_end}) is less than at the start ({open_start})
    OpenEndBeforeOpenStart {
        /// The open depth at the start.
        open_start: usize,
        /// The open depth at the end.
        open_end: usize,
    },
    /// A slice without content cannot be open
    OpenEmptyContent,
}

/// A slice represents a piece cut out of a larger document. It stores not only a fragment, but
/// also the depth up to which nodes on both side are ‘open’ (cut through).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    /// Create a slice. When specifying a non-zero open depth, you must
    /// make sure that there are nodes of at least that depth at the
    /// appropriate side of the fragment — i.e. if the fragment is an empty
    /// paragraph node, `openStart` and `openEnd` can't be greater than 1.
    ///
    /// It is not necessary for the content of open nodes to conform to
    /// the schema's content constraints, though it should be a valid
    /// start/end/middle for such a node, depending on which sides are
    /// open.
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Result<Slice, SliceError> {
        if open_end < open_start {
            return Err(SliceError::OpenEndBeforeOpenStart {
                open_start,
                open_end,
            });
        }
        if content.is_empty() && open_end != 0 {
            return Err(SliceError::OpenEmptyContent);
        }
        Ok(Slice {
            content,
            open_start,
            open_end,
        })
    }

    /// The empty slice.
    pub fn empty() -> Slice {
        Slice::default()
    }

    /// The slice's content.
    pub fn content(&self) -> &Fragment {
        &self.content
    }

    /// The open depth at the start.
    pub fn open_start(&self) -> usize {
        self.open_start
    }

    /// The open depth at the end.
    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// The size this slice would add when inserted into a document.
    pub fn size(&self) -> usize {
        self.content.size()
    }
}
