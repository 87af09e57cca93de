use super::Attrs;
use displaydoc::Display;
use once_cell::sync::Lazy;
use std::iter::FromIterator;
use std::sync::Arc;
use thiserror::Error;

/// Errors when building or combining marks
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum MarkError {
    /// Mark type cannot be empty
    EmptyType,
    /// Cannot merge a `{found}` mark into a `{expected}` mark
    TypeMismatch {
        /// The type of the receiving mark
        expected: String,
        /// The type of the mark that was passed in
        found: String,
    },
}

/// A mark is a piece of information that can be attached to a node, such as it being emphasized,
/// in code font, or a link. It has a type and optionally a set of attributes that provide further
/// information (such as the target of the link).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    r#type: String,
    attrs: Attrs,
}

impl Mark {
    /// Create a mark. The attributes are owned by the mark from here on, so later changes to the
    /// caller's map are never observed.
    pub fn new<T: Into<String>>(r#type: T, attrs: Attrs) -> Result<Self, MarkError> {
        let r#type = r#type.into();
        if r#type.trim().is_empty() {
            return Err(MarkError::EmptyType);
        }
        Ok(Self { r#type, attrs })
    }

    /// Used by `MarkType::create`, where the name was already validated by the schema.
    pub(crate) fn from_parts(r#type: String, attrs: Attrs) -> Self {
        Self { r#type, attrs }
    }

    /// The name of this mark's type.
    pub fn r#type(&self) -> &str {
        &self.r#type
    }

    /// The attributes associated with this mark.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Combine the attributes of two marks of the same type. Values from `other` win.
    pub fn merge(&self, other: &Mark) -> Result<Mark, MarkError> {
        if self.r#type != other.r#type {
            return Err(MarkError::TypeMismatch {
                expected: self.r#type.clone(),
                found: other.r#type.clone(),
            });
        }
        let mut attrs = self.attrs.clone();
        attrs.extend(other.attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(Mark {
            r#type: self.r#type.clone(),
            attrs,
        })
    }

    /// Test whether this mark is in the given set of marks.
    pub fn is_in_set(&self, set: &MarkSet) -> bool {
        set.contains(self)
    }

    /// Given a set of marks, create a new set which contains this one as well. A set that already
    /// has a mark of this type is returned unchanged.
    pub fn add_to_set(&self, set: &MarkSet) -> MarkSet {
        set.add(self.clone())
    }

    /// Remove marks of this type from the given set.
    pub fn remove_from_set(&self, set: &MarkSet) -> MarkSet {
        set.remove(&self.r#type)
    }
}

static EMPTY: Lazy<MarkSet> = Lazy::new(|| MarkSet {
    marks: Arc::from(Vec::new()),
});

/// An immutable set of marks, holding at most one mark per type.
#[derive(Debug, Clone)]
pub struct MarkSet {
    marks: Arc<[Mark]>,
}

impl MarkSet {
    /// The shared empty set.
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    /// The number of marks in this set.
    pub fn size(&self) -> usize {
        self.marks.len()
    }

    /// True when there are no marks in this set.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Add a mark. If a mark of the same type is already present, the first one is kept and this
    /// set is returned as is.
    pub fn add(&self, mark: Mark) -> MarkSet {
        if self.contains_type(&mark.r#type) {
            return self.clone();
        }
        let mut marks = Vec::with_capacity(self.marks.len() + 1);
        marks.extend_from_slice(&self.marks);
        marks.push(mark);
        MarkSet {
            marks: Arc::from(marks),
        }
    }

    /// Remove the mark of the given type, if any.
    pub fn remove(&self, r#type: &str) -> MarkSet {
        if !self.contains_type(r#type) {
            return self.clone();
        }
        self.iter()
            .filter(|m| m.r#type != r#type)
            .cloned()
            .collect()
    }

    /// True when this exact mark (type and attributes) is in the set.
    pub fn contains(&self, mark: &Mark) -> bool {
        self.marks.iter().any(|m| m == mark)
    }

    /// True when the set has a mark of the given type.
    pub fn contains_type(&self, r#type: &str) -> bool {
        self.get(r#type).is_some()
    }

    /// Get the mark of the given type.
    pub fn get(&self, r#type: &str) -> Option<&Mark> {
        self.marks.iter().find(|m| m.r#type == r#type)
    }

    /// Iterate the marks in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Mark> {
        self.marks.iter()
    }

    /// True when both sets share the same allocation.
    pub fn ptr_eq(&self, other: &MarkSet) -> bool {
        Arc::ptr_eq(&self.marks, &other.marks)
    }
}

impl Default for MarkSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for MarkSet {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.size() == other.size() && self.iter().all(|m| other.contains(m)))
    }
}

impl Eq for MarkSet {}

impl From<Vec<Mark>> for MarkSet {
    fn from(marks: Vec<Mark>) -> Self {
        if marks.is_empty() {
            return Self::empty();
        }
        let mut unique: Vec<Mark> = Vec::with_capacity(marks.len());
        for mark in marks {
            if !unique.iter().any(|m| m.r#type == mark.r#type) {
                unique.push(mark);
            }
        }
        MarkSet {
            marks: Arc::from(unique),
        }
    }
}

impl FromIterator<Mark> for MarkSet {
    fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
