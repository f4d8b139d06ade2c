//! Column projection of raw items into flat CSV rows

use crate::path::extract;
use crate::types::ColumnDefinition;
use serde_json::Value;

/// One projected item: cells in column order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectedRow {
    cells: Vec<(String, String)>,
}

impl ProjectedRow {
    /// Cell values in column order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    /// Value of the first column called `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value.as_str())
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when there are no columns
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Projects raw items through an ordered column list
#[derive(Clone, Debug)]
pub struct ColumnProjector {
    columns: Vec<ColumnDefinition>,
    separator: String,
}

impl ColumnProjector {
    /// Create a projector joining multi-valued cells with `separator`
    pub fn new(columns: Vec<ColumnDefinition>, separator: impl Into<String>) -> Self {
        Self {
            columns,
            separator: separator.into(),
        }
    }

    /// Column definitions, in output order
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Header names, in output order
    pub fn header(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Project one item; a path that does not resolve yields an empty cell
    #[must_use]
    pub fn project(&self, item: &Value) -> ProjectedRow {
        let cells = self
            .columns
            .iter()
            .map(|column| {
                let cell = extract(item, &column.path)
                    .map(|value| render_cell(&value, &self.separator))
                    .unwrap_or_default();
                (column.name.clone(), cell)
            })
            .collect();

        ProjectedRow { cells }
    }
}

/// Render a resolved value as cell text
///
/// Sequences join their non-null elements with `separator`, `null` is empty,
/// strings are verbatim, and objects fall back to compact JSON.
pub fn render_cell(value: &Value, separator: &str) -> String {
    match value {
        Value::Array(elements) => elements
            .iter()
            .filter(|e| !e.is_null())
            .map(render_scalar)
            .collect::<Vec<_>>()
            .join(separator),
        other => render_scalar(other),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
