use crate::Term;

/// One row of a decoded result, in column order.
///
/// A cell is `None` when the corresponding variable is unbound in this row. Such
/// cells are rendered blank, they are not dropped from the row.
pub type ResultRow = Vec<Option<Term>>;

/// The column names of a quad-shaped result, in their fixed order.
///
/// The graph column comes first. This is not RDF's canonical subject-first order but
/// it is the order the server emits and the one downstream headers are generated for.
pub const QUAD_COLUMNS: [&str; 4] = ["graph", "subject", "predicate", "object"];

/// A decoded query result, ready for rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultTable {
    /// The column names, in rendering order.
    pub columns: Vec<String>,
    /// The rows, each with exactly `columns.len()` cells.
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Creates an empty table with the given columns.
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ResultTable {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Creates an empty table with the fixed quad columns.
    pub fn quads() -> Self {
        Self::new(QUAD_COLUMNS)
    }

    pub fn push_row(&mut self, row: ResultRow) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width must match columns");
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_columns_are_graph_first() {
        let table = ResultTable::quads();
        assert_eq!(table.columns, ["graph", "subject", "predicate", "object"]);
        assert!(table.is_empty());
    }

    #[test]
    fn push_row_keeps_unbound_cells() {
        let mut table = ResultTable::new(["x", "y"]);
        table.push_row(vec![Some(Term::variable("x")), None]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][1], None);
    }
}
