//! Row iteration with filters.

use crate::core::{Project, Row};
use crate::error::Result;
use crate::filters::RowFilter;
use std::sync::Arc;
use tracing::debug;

/// Whether a visitor wants more rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitControl {
    /// Keep visiting rows
    Continue,
    /// Stop iterating; `end` is still called
    Stop,
}

/// Receives the rows of one pass over a project.
pub trait RowVisitor {
    /// Called once before the first row.
    fn start(&mut self, project: &Project) -> Result<()>;

    /// Called for each accepted row in increasing row-index order.
    fn visit(&mut self, project: &Project, row_index: usize, row: &Row) -> VisitControl;

    /// Called once after the last row.
    fn end(&mut self, project: &Project) -> Result<()>;
}

/// Visits the rows of a project that pass every configured filter.
#[derive(Debug, Clone, Default)]
pub struct FilteredRows {
    filters: Vec<Arc<dyn RowFilter>>,
}

impl FilteredRows {
    /// Accepts every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter rows must pass.
    pub fn with_filter(mut self, filter: Arc<dyn RowFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Number of configured filters.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if the row passes all filters.
    pub fn accepts(&self, project: &Project, row_index: usize, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|filter| filter.filter_row(project, row_index, row))
    }

    /// Drives `visitor` over the accepted rows.
    ///
    /// A failing `start` visits nothing and skips `end`.
    pub fn accept(&self, project: &Project, visitor: &mut dyn RowVisitor) -> Result<()> {
        visitor.start(project)?;

        let mut accepted = 0usize;
        for (row_index, row) in project.rows().iter().enumerate() {
            if !self.accepts(project, row_index, row) {
                continue;
            }
            accepted += 1;
            if visitor.visit(project, row_index, row) == VisitControl::Stop {
                debug!(row_index, "Visitor stopped iteration");
                break;
            }
        }

        debug!(
            project = %project.name(),
            accepted,
            filters = self.filters.len(),
            "Row iteration finished"
        );
        visitor.end(project)
    }
}
