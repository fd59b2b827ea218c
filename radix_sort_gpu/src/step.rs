/// Iterator over the strides of a Kogge-Stone scan: 1, 2, 4, ... while the
/// stride stays below `limit`.
pub struct DoublingStrides {
    next: usize,
    limit: usize,
}

impl Iterator for DoublingStrides {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.limit {
            return None;
        }
        let stride = self.next;
        self.next *= 2;
        Some(stride)
    }
}

/// Returns the strides needed to scan a section of `limit` elements.
pub fn doubling_strides(limit: usize) -> DoublingStrides {
    DoublingStrides { next: 1, limit }
}
