use anyhow::Result;
use orgtree_core::{BuildReport, FlatRow, ForestStats, MetricSpec, Reparented, RolledMetrics};
use serde::Serialize;
use std::io::{self, Write};

const VALUE_WIDTH: usize = 12;

/// Write to stdout, treating a closed pipe (`orgtree ... | head`) as success
pub(crate) fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn metric_columns(spec: &MetricSpec) -> Vec<&str> {
    spec.additive
        .iter()
        .map(String::as_str)
        .chain(spec.ratios.iter().map(|r| r.name.as_str()))
        .collect()
}

fn metric_cells(rolled: &RolledMetrics, spec: &MetricSpec) -> String {
    let mut cells = String::new();
    for name in &spec.additive {
        cells.push_str(&format!(" {:>VALUE_WIDTH$}", format_value(rolled.value(name))));
    }
    for ratio in &spec.ratios {
        cells.push_str(&format!(" {:>VALUE_WIDTH$}", format_value(rolled.ratio(&ratio.name))));
    }
    cells
}

/// Indented row table: one line per visible row, then a totals line
pub(crate) fn rows_table(rows: &[FlatRow<'_>], spec: &MetricSpec, totals: &RolledMetrics) -> String {
    let labels: Vec<String> = rows
        .iter()
        .map(|row| {
            let marker = match (row.has_children, row.expanded) {
                (false, _) => ' ',
                (true, true) => '-',
                (true, false) => '+',
            };
            format!("{}{} {}", "  ".repeat(row.depth), marker, row.node.id)
        })
        .collect();
    let width = labels
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once("total".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("{:<width$}", "node"));
    for name in metric_columns(spec) {
        out.push_str(&format!(" {name:>VALUE_WIDTH$}"));
    }
    out.push('\n');

    for (label, row) in labels.iter().zip(rows) {
        out.push_str(&format!("{label:<width$}"));
        out.push_str(&metric_cells(row.rolled, spec));
        out.push('\n');
    }

    out.push_str(&format!("{:<width$}", "total"));
    out.push_str(&metric_cells(totals, spec));
    out
}

pub(crate) fn check_summary(stats: &ForestStats, report: &BuildReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "nodes: {}  roots: {}  leaves: {}  max depth: {}\n",
        stats.nodes, stats.roots, stats.leaves, stats.max_depth
    ));
    if report.is_clean() {
        out.push_str("no repairs needed");
        return out;
    }

    out.push_str(&format!("repairs: {}\n", report.repairs()));
    let sections = [
        ("unknown parent, promoted to root", &report.dangling),
        ("parent cycle broken", &report.cycles_broken),
        ("parented by a member, promoted to root", &report.leaf_parents),
        ("below depth cap, re-rooted", &report.depth_capped),
        ("duplicate id dropped", &report.duplicates),
    ];
    for (title, ids) in sections {
        if !ids.is_empty() {
            out.push_str(&format!("  {title}: {}\n", ids.join(", ")));
        }
    }
    out.truncate(out.trim_end().len());
    out
}

pub(crate) fn move_summary(moved: &Reparented) -> String {
    let target = moved
        .change
        .new_parent_id
        .as_deref()
        .unwrap_or("(root)");
    let mut path = moved.ancestry.clone();
    path.push(moved.change.node_id.clone());
    format!(
        "moved {} under {}\npath: {}",
        moved.change.node_id,
        target,
        path.join(" > ")
    )
}
