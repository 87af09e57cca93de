use std::ops::{Bound, RangeBounds};

pub fn from<R: RangeBounds<usize>>(range: &R) -> usize {
    match range.start_bound() {
        Bound::Unbounded => 0,
        Bound::Included(x) => *x,
        Bound::Excluded(x) => x + 1,
    }
}

pub fn to<R: RangeBounds<usize>>(range: &R, max: usize) -> usize {
    match range.end_bound() {
        Bound::Unbounded => max,
        Bound::Included(x) => x + 1,
        Bound::Excluded(x) => *x,
    }
}

/// Resolve a range against a sequence of length `max`, returning `None` unless
/// `from <= to <= max`.
pub fn bounds<R: RangeBounds<usize>>(range: &R, max: usize) -> Option<(usize, usize)> {
    let (from, to) = (from(range), to(range, max));
    if from <= to && to <= max {
        Some((from, to))
    } else {
        None
    }
}
