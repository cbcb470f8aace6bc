use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::criteria::Criteria;
use std::collections::HashMap;

/// A worksheet read into a sparse grid of non-empty cells.
#[derive(Debug)]
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells in document order
    pub(crate) cells: Vec<Cell>,
    /// Position of each cell in `cells`, keyed by (row, col)
    index: HashMap<(usize, usize), usize>,
    /// Criteria the sheet was read with
    pub(crate) criteria: Criteria,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(file_name: &str, name: &str, criteria: Criteria) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            index: HashMap::new(),
            criteria,
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Checks if a row is after the upper bound requested by the criteria.
    pub(crate) fn after_row_upper_bound(&self, row: usize) -> bool {
        self.criteria.after_row_upper_bound(row)
    }

    /// Adds a cell to the sheet, updating the data range.
    /// A later cell at the same position replaces the earlier one.
    pub(crate) fn push(&mut self, cell: Cell) {
        if self.after_row_upper_bound(cell.row) {
            return;
        }
        self.update_bound(cell.row, cell.col);
        match self.index.get(&(cell.row, cell.col)) {
            Some(&position) => self.cells[position] = cell,
            None => {
                self.index.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    /// Updates the actual data range boundaries based on cell positions.
    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|row_lower_bound| row < row_lower_bound).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|col_lower_bound| col < col_lower_bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Gets the cell at (row, col), if any.
    pub(crate) fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.index.get(&(row, col)).map(|&position| &self.cells[position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("", "", Criteria::all());

        assert!(sheet.cells.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert_eq!(sheet.row_upper_bound, None);
        assert_eq!(sheet.col_lower_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("", "", Criteria::all());
        push(&mut sheet, 1, 1, "a");
        push(&mut sheet, 1, 3, "b");
        push(&mut sheet, 3, 1, "c");
        push(&mut sheet, 3, 3, "d");

        assert_eq!(sheet.cells.len(), 4);
        assert_eq!(sheet.row_lower_bound, Some(1));
        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_lower_bound, Some(1));
        assert_eq!(sheet.col_upper_bound, Some(3));

        assert_eq!(sheet.get(3, 3).map(|cell| cell.value.as_str()), Some("d"));
        assert_eq!(sheet.get(2, 2), None);
        assert!(sheet.get(1, 1).is_some() && sheet.get(1, 2).is_none() && sheet.get(1, 3).is_some());
    }

    #[test]
    fn sheet_out_of_order_cells() {
        let mut sheet = Sheet::new("", "", Criteria::all());
        push(&mut sheet, 4, 0, "late");
        push(&mut sheet, 2, 2, "early");
        push(&mut sheet, 2, 2, "replaced");

        assert_eq!(sheet.cells.len(), 2);
        assert_eq!(sheet.row_lower_bound, Some(2));
        assert_eq!(sheet.row_upper_bound, Some(4));
        assert_eq!(sheet.get(2, 2).map(|cell| cell.value.as_str()), Some("replaced"));
    }

    #[test]
    fn sheet_upper_bound() {
        let mut sheet = Sheet::new("", "", Criteria::until_row(2));
        push(&mut sheet, 1, 0, "a");
        push(&mut sheet, 3, 0, "b");

        assert_eq!(sheet.cells.len(), 1);
        assert_eq!(sheet.row_upper_bound, Some(1));
        assert!(sheet.after_row_upper_bound(3));
    }
}
