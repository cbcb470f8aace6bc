/// Criteria for limiting how much of a worksheet is read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Criteria {
    /// Last row index (0-based, inclusive) to read; readers stop once a row passes it.
    pub(crate) row_upper_bound: Option<usize>,
}

impl Criteria {
    /// Reads every row of the sheet.
    pub(crate) fn all() -> Self {
        Criteria::default()
    }

    /// Reads rows up to and including `row`.
    pub(crate) fn until_row(row: usize) -> Self {
        Criteria { row_upper_bound: Some(row) }
    }

    /// Checks whether the row lies after the upper bound.
    pub(crate) fn after_row_upper_bound(&self, row: usize) -> bool {
        self.row_upper_bound
            .map(|row_upper_bound| row_upper_bound < row)
            .unwrap_or(false)
    }

    /// Checks whether a sheet read with `self` also satisfies `other`.
    pub(crate) fn covers(&self, other: &Criteria) -> bool {
        match (self.row_upper_bound, other.row_upper_bound) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(own), Some(requested)) => own >= requested,
        }
    }
}
