#![warn(missing_docs)]
//! The `phylodiff` binary is a command line tool, using the `[phylodiff]` crate.
//! It compares two phylogenetic trees clade by clade and reports mismatches in the terminal.

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use itertools::Itertools;
use phylodiff::{
    diff::{robinson_foulds, treediff, DiffEntry, DiffOptions, DiffSummary, LeafAttr, LeafSet},
    tree::{Tree, TreeError},
};
use serde::Serialize;
use std::{
    error::Error,
    io,
    path::{Path, PathBuf},
};
use tinytemplate::{format_unescaped, TinyTemplate};
use tracing::{info, Dispatch};
use tracing_subscriber::EnvFilter;

/// contains the struct representing the command line arguments
/// parsed by [`clap`] and used to execute this binary
pub mod cli;

use cli::Report;

const DIFFS_TAB: &str = "#Dist\t{branch_header}Size1\tSize2\tndiffs\tDiff\trefTree\ttargetTree
{{ for row in rows }}{row.distance}\t{row.branch}{row.size1}\t{row.size2}\t{row.ndiffs}\t{row.diff}\t{row.ref_leaves}\t{row.target_leaves}
{{ endfor }}";

const SUMMARY: &str = "{total_distance}\t{branch}{mismatches}\t{rf}\t{rf_max}\n";

#[derive(Serialize)]
struct Row {
    distance: f64,
    branch: String,
    size1: usize,
    size2: usize,
    ndiffs: usize,
    diff: String,
    ref_leaves: String,
    target_leaves: String,
}

#[derive(Serialize)]
struct TabContext {
    branch_header: String,
    rows: Vec<Row>,
}

#[derive(Serialize)]
struct SummaryContext {
    total_distance: String,
    branch: String,
    mismatches: usize,
    rf: usize,
    rf_max: usize,
}

fn sepstring(leaves: &LeafSet, sep: &str) -> String {
    leaves.iter().join(sep)
}

fn build_dispatch(quiet: bool) -> Dispatch {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .finish();

    Dispatch::new(subscriber)
}

/// Ladderizes a subtree copy and names its leaves after their identity,
/// marking the ones that differ.
fn relabel(tree: &mut Tree, attr: &LeafAttr, diff: &LeafSet) -> Result<(), TreeError> {
    tree.ladderize()?;
    for leaf in tree.get_leaves() {
        let node = tree.get_mut(&leaf)?;
        let identity = attr.value(node).unwrap_or_default().to_string();
        let label = if diff.contains(&identity) {
            format!("{identity} ***")
        } else {
            identity
        };
        node.set_name(label);
    }

    Ok(())
}

/// Keeps the rightmost `max_width` columns of a drawing so leaf labels stay visible
fn trim_drawing(drawing: &str, max_width: usize) -> String {
    let width = drawing
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or_default();
    if width <= max_width {
        return drawing.to_string();
    }

    let start = width - max_width;
    drawing
        .lines()
        .map(|line| line.chars().skip(start).collect::<String>())
        .join("\n")
}

fn show_topology(
    table: Vec<DiffEntry>,
    ref_attr: &LeafAttr,
    target_attr: &LeafAttr,
    max_width: usize,
) -> Result<(), TreeError> {
    let mut total = 0.0;
    let n_entries = table.len();
    for mut entry in table {
        total += entry.distance;
        relabel(&mut entry.ref_subtree, ref_attr, &entry.difference)?;
        relabel(&mut entry.target_subtree, target_attr, &entry.difference)?;

        let label = |node: &phylodiff::tree::Node| node.name.clone().unwrap_or_else(|| "+".into());
        let branch = entry
            .branch_distance
            .map(|d| format!("\tBranch Dist: {d:.6}"))
            .unwrap_or_default();

        println!(
            "Dist: {:.6}{branch}\t#Diffs: {}/{} ({})",
            entry.distance,
            entry.ref_leaves.len(),
            entry.target_leaves.len(),
            entry.difference.len()
        );
        let reference = trim_drawing(&entry.ref_subtree.render_with(label)?, max_width);
        let target = trim_drawing(&entry.target_subtree.render_with(label)?, max_width);
        println!("Reference:\n{reference}");
        println!("Target:\n{target}");
    }
    info!("Total distance:\t{total:.4}\tMismatching nodes:\t{n_entries}");

    Ok(())
}

fn show_diffs(table: &[DiffEntry]) {
    let has_branch = table.iter().any(|e| e.branch_distance.is_some());
    if has_branch {
        println!(
            "{:<10}\t{:<11}\t{:<5}\t{:<5}\t{:<6}\tDiff",
            "Dist", "Branch Dist", "Size1", "Size2", "ndiffs"
        );
    } else {
        println!(
            "{:<10}\t{:<5}\t{:<5}\t{:<6}\tDiff",
            "Dist", "Size1", "Size2", "ndiffs"
        );
    }
    for entry in table {
        let branch = entry
            .branch_distance
            .map(|d| format!("{d:<11.6}\t"))
            .unwrap_or_default();
        println!(
            "{:<10.6}\t{branch}{:<5}\t{:<5}\t{:<6}\t{}",
            entry.distance,
            entry.ref_leaves.len(),
            entry.target_leaves.len(),
            entry.difference.len(),
            sepstring(&entry.difference, ", ")
        );
    }
}

fn show_diffs_tab(table: &[DiffEntry]) -> Result<String, tinytemplate::error::Error> {
    let has_branch = table.iter().any(|e| e.branch_distance.is_some());
    let rows = table
        .iter()
        .map(|entry| Row {
            distance: entry.distance,
            branch: entry
                .branch_distance
                .map(|d| format!("{d}\t"))
                .unwrap_or_default(),
            size1: entry.ref_leaves.len(),
            size2: entry.target_leaves.len(),
            ndiffs: entry.difference.len(),
            diff: sepstring(&entry.difference, "|"),
            ref_leaves: sepstring(&entry.ref_leaves, "|"),
            target_leaves: sepstring(&entry.target_leaves, "|"),
        })
        .collect();
    let ctx = TabContext {
        branch_header: if has_branch { "Branch Dist\t".into() } else { String::new() },
        rows,
    };

    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("diffs_tab", DIFFS_TAB)?;
    tt.render("diffs_tab", &ctx)
}

fn show_summary(summary: &DiffSummary) -> Result<String, tinytemplate::error::Error> {
    let header = match summary.total_branch_distance {
        Some(_) => ["Dist", "Branch Dist", "Mismatches", "RF", "maxRF"].join("\t"),
        None => ["Dist", "Mismatches", "RF", "maxRF"].join("\t"),
    };
    info!("\n{header}");

    let ctx = SummaryContext {
        total_distance: format!("{:.6}", summary.total_distance),
        branch: summary
            .total_branch_distance
            .map(|d| format!("{d:.6}\t"))
            .unwrap_or_default(),
        mismatches: summary.mismatches,
        rf: summary.rf,
        rf_max: summary.rf_max,
    };

    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("summary", SUMMARY)?;
    tt.render("summary", &ctx)
}

/// Settings of the report printed for every pair of trees
struct ReportOptions {
    report: Report,
    max_width: usize,
}

fn run_diff(
    reftree: &Path,
    target: &Path,
    (t1, t2): (&Tree, &Tree),
    (ref_attr, target_attr): (&LeafAttr, &LeafAttr),
    report: &ReportOptions,
    options: &DiffOptions,
) -> Result<(), Box<dyn Error>> {
    info!(
        "Comparing (Reference) {} and (Target) {}",
        reftree.display(),
        target.display()
    );
    let mut table = treediff(t1, t2, ref_attr, target_attr, options)?;
    if table.is_empty() {
        info!(
            "Difference between (Reference) {} and (Target) {} returned no results",
            reftree.display(),
            target.display()
        );
        return Ok(());
    }

    match report.report {
        Report::Topology => {
            table.sort_by(|a, b| b.distance.total_cmp(&a.distance));
            show_topology(table, ref_attr, target_attr, report.max_width)?;
        }
        Report::Diffs => show_diffs(&table),
        Report::DiffsTab => print!("{}", show_diffs_tab(&table)?),
        Report::Summary => {
            let rf = robinson_foulds(t1, t2, ref_attr, target_attr)?;
            print!("{}", show_summary(&DiffSummary::new(&table, rf))?);
        }
    }

    Ok(())
}

fn run_all(
    reftrees: &[PathBuf],
    targets: &[PathBuf],
    attrs: (&LeafAttr, &LeafAttr),
    report: &ReportOptions,
    options: &DiffOptions,
) -> Result<(), Box<dyn Error>> {
    let target_trees = targets
        .iter()
        .map(|path| Tree::from_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    for reftree in reftrees {
        let t1 = Tree::from_file(reftree)?;
        for (target, t2) in targets.iter().zip(target_trees.iter()) {
            run_diff(reftree, target, (&t1, t2), attrs, report, options)?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    match cli::Args::parse().command {
        cli::Commands::Diff {
            reftrees,
            targets,
            ref_attr,
            target_attr,
            fullsearch,
            distance,
            branch_distance,
            report,
            max_width,
            cpu,
            progress,
            quiet,
        } => {
            let dispatch = build_dispatch(quiet);
            let options = DiffOptions {
                metric: distance,
                reduce_matrix: fullsearch,
                branch_distance,
                jobs: cpu,
                progress,
                dispatch: Some(dispatch.clone()),
            };
            let report = ReportOptions { report, max_width };
            tracing::dispatcher::with_default(&dispatch, || {
                run_all(
                    &reftrees,
                    &targets,
                    (&ref_attr, &target_attr),
                    &report,
                    &options,
                )
            })?;
        }
        cli::Commands::Completion { shell } => {
            let mut cmd = cli::Args::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}
