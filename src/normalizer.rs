use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::NotebookError;
use crate::notebook::{Cell, CellType, Notebook};

/// Which normalization steps to apply. Every step is on by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Drop code and markdown cells whose source is whitespace-only.
    pub remove_empty_cells: bool,
    /// Null out `execution_count` on code cells.
    pub clear_execution_counts: bool,
    /// Empty the `metadata` of code and markdown cells.
    pub clear_cell_metadata: bool,
    /// Stamp `metadata.created` (once) and `metadata.updated` (every run).
    pub stamp_timestamps: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            remove_empty_cells: true,
            clear_execution_counts: true,
            clear_cell_metadata: true,
            stamp_timestamps: true,
        }
    }
}

/// Per-step counters, for diagnostics only.
///
/// Whether the document changed is decided by comparing serialized forms,
/// see [`Normalized::changed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub removed_cells: usize,
    pub cleared_execution_counts: usize,
    pub cleared_metadata: usize,
    pub stamped_created: bool,
}

/// The result of normalizing a notebook.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub notebook: Notebook,
    /// True iff the canonical serialization differs from the input's.
    pub changed: bool,
    pub report: NormalizeReport,
}

/// Format a timestamp the way it is stored in notebook metadata,
/// e.g. `2024-01-01T00:00:00+00:00`.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// The current time truncated to microseconds, the finest precision
/// notebook tooling writes and reads back.
pub fn current_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Normalize a notebook.
///
/// Steps run in order: empty-cell removal, per-cell cleaning, notebook
/// timestamp stamping. `now` is injected so the transform stays pure.
/// Errors only if the notebook cannot be serialized for comparison.
pub fn normalize(
    mut notebook: Notebook,
    now: DateTime<Utc>,
    options: &NormalizeOptions,
) -> Result<Normalized, NotebookError> {
    let before = notebook.to_canonical_string()?;
    let mut report = NormalizeReport::default();

    if options.remove_empty_cells {
        remove_empty_cells(&mut notebook.cells, &mut report);
    }

    for (i, cell) in notebook.cells.iter_mut().enumerate() {
        clean_cell(i, cell, options, &mut report);
    }

    if options.stamp_timestamps {
        stamp_timestamps(&mut notebook, &format_timestamp(now), &mut report);
    }

    let changed = notebook.to_canonical_string()? != before;
    if changed {
        info!(
            removed_cells = report.removed_cells,
            cleared_execution_counts = report.cleared_execution_counts,
            cleared_metadata = report.cleared_metadata,
            "notebook normalized"
        );
    }

    Ok(Normalized {
        notebook,
        changed,
        report,
    })
}

fn remove_empty_cells(cells: &mut Vec<Cell>, report: &mut NormalizeReport) {
    let mut index = 0;
    cells.retain(|cell| {
        let i = index;
        index += 1;

        let removable = matches!(cell.cell_type(), CellType::Code | CellType::Markdown);
        if removable && cell.is_blank() {
            debug!(cell = i, cell_type = %cell.cell_type(), "removing empty cell");
            report.removed_cells += 1;
            return false;
        }
        true
    });
}

fn clean_cell(
    i: usize,
    cell: &mut Cell,
    options: &NormalizeOptions,
    report: &mut NormalizeReport,
) {
    let cell_type = cell.cell_type();
    match cell {
        Cell::Code(code) => {
            if options.clear_execution_counts
                && let Some(count) = code.execution_count.as_mut()
                && !count.is_null()
            {
                *count = Value::Null;
                debug!(cell = i, "cleared execution count");
                report.cleared_execution_counts += 1;
            }
            if options.clear_cell_metadata && clear_metadata(&mut code.metadata) {
                debug!(cell = i, %cell_type, "cleared cell metadata");
                report.cleared_metadata += 1;
            }
        }
        Cell::Markdown(text) => {
            if options.clear_cell_metadata && clear_metadata(&mut text.metadata) {
                debug!(cell = i, %cell_type, "cleared cell metadata");
                report.cleared_metadata += 1;
            }
        }
        Cell::Raw(_) => {}
    }
}

/// Replace non-empty cell metadata with `{}`. Returns whether anything changed.
///
/// Absent, null, and already-empty metadata are left as they are, so a cell
/// without a `metadata` key is written back without one. Any other
/// non-object value counts as non-empty and is replaced.
fn clear_metadata(metadata: &mut Option<Value>) -> bool {
    match metadata {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) if map.is_empty() => false,
        Some(Value::Object(map)) => {
            map.clear();
            true
        }
        Some(other) => {
            *other = Value::Object(Map::new());
            true
        }
    }
}

fn stamp_timestamps(notebook: &mut Notebook, now: &str, report: &mut NormalizeReport) {
    if !matches!(notebook.metadata, Some(Value::Object(_))) {
        notebook.metadata = Some(Value::Object(Map::new()));
    }
    let Some(Value::Object(metadata)) = notebook.metadata.as_mut() else {
        return;
    };

    if !metadata.contains_key("created") {
        metadata.insert("created".to_string(), Value::String(now.to_string()));
        debug!(created = now, "stamped creation time");
        report.stamped_created = true;
    }
    metadata.insert("updated".to_string(), Value::String(now.to_string()));
}
