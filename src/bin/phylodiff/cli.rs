use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use phylodiff::diff::{BranchDistance, DistanceMetric, LeafAttr};

/// A command line tool to find structural differences between phylogenetic trees
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    /// The command to execute
    pub command: Commands,
}

/// Layout of the difference report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Report {
    /// Both subtrees of every mismatch, differing leaves are marked with ***
    #[default]
    Topology,
    /// One line per mismatch
    Diffs,
    /// Tab separated table with the leaves of both subtrees
    DiffsTab,
    /// Totals of the comparison and Robinson Foulds distance
    Summary,
}

/// The available commands in the `phylodiff` tool
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare phylogenetic trees clade by clade
    ///
    /// Every clade of the reference tree is matched to the most similar
    /// clade of the target tree. Matches that are not exact are reported
    /// with the leaves that differ.
    /// Every reference tree is compared to every target tree.
    #[clap(verbatim_doc_comment)]
    Diff {
        /// Reference trees
        #[arg(short, long = "reftree", required = true, num_args = 1..)]
        reftrees: Vec<PathBuf>,
        /// Trees to compare to the references
        #[arg(short, long = "target", required = true, num_args = 1..)]
        targets: Vec<PathBuf>,
        /// Leaf attribute identifying leaves of the reference tree ("name" or an NHX feature)
        #[arg(long, default_value = "name")]
        ref_attr: LeafAttr,
        /// Leaf attribute identifying leaves of the target tree ("name" or an NHX feature)
        #[arg(long, default_value = "name")]
        target_attr: LeafAttr,
        /// Drop clades with an exact counterpart before matching the others
        #[arg(long)]
        fullsearch: bool,
        /// Distance between clades
        #[arg(value_enum, short, long, default_value_t = DistanceMetric::Set)]
        distance: DistanceMetric,
        /// Secondary branch length distance computed on mismatches
        #[arg(value_enum, short, long)]
        branch_distance: Option<BranchDistance>,
        /// Layout of the report
        #[arg(value_enum, long, default_value_t = Report::Topology)]
        report: Report,
        /// Drawings of the topology report wider than this are cut on the left
        #[arg(long, default_value_t = 80)]
        max_width: usize,
        /// Number of threads used to build the distance matrix, 0 to use every core
        #[arg(short = 'C', long, default_value_t = 1)]
        cpu: usize,
        /// Show a progress bar while the distance matrix is built
        #[arg(long)]
        progress: bool,
        /// Only log warnings and errors
        #[arg(short, long)]
        quiet: bool,
    },
    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
