use std::ops::Range;

/// A contiguous run of global line indices assigned to one scanning unit.
///
/// Partitions are pure arithmetic over `(nlines, parts, index)`. Every
/// process computes its own assignment from the same three numbers, so the
/// split never has to travel over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// First global line index of the run
    pub start: usize,
    /// Number of lines in the run
    pub count: usize,
}

impl Partition {
    /// One past the last global line index of the run
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The run as an index range, handy for slicing a line store
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Computes the partition owned by `index` when `nlines` lines are split
/// into `parts` contiguous runs.
///
/// The first `nlines % parts` runs hold one extra line, so run sizes never
/// differ by more than one. With `nlines = 0` every run is empty.
///
/// # Panics
///
/// Panics if `parts` is zero or `index` is out of range. Both are programmer
/// errors: callers derive these values from non-zero configuration.
pub fn partition_for(nlines: usize, parts: usize, index: usize) -> Partition {
    assert!(parts > 0, "cannot partition into zero parts");
    assert!(
        index < parts,
        "partition index {index} out of range for {parts} parts"
    );

    let base = nlines / parts;
    let extra = nlines % parts;
    let count = base + usize::from(index < extra);
    let start = index * base + index.min(extra);
    Partition { start, count }
}

/// Computes all `parts` partitions of `nlines` lines, in index order.
pub fn partitions(nlines: usize, parts: usize) -> Vec<Partition> {
    (0..parts)
        .map(|index| partition_for(nlines, parts, index))
        .collect()
}
