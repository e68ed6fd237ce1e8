use cslice_slicer::{CallGraph, SliceStats};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outcome of a `slice` run across every input file
#[derive(Debug, Default, Serialize)]
pub struct SliceReport {
    pub files: Vec<FileReport>,
}

impl SliceReport {
    pub fn written(&self) -> usize {
        self.files
            .iter()
            .flat_map(|file| &file.targets)
            .filter(|target| target.output.is_some())
            .count()
    }

    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|file| file.error.is_some()).count()
    }
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub targets: Vec<TargetReport>,
}

impl FileReport {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            error: None,
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TargetReport {
    pub target: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SliceStats>,
}

impl TargetReport {
    pub fn written(target: String, output: PathBuf, stats: SliceStats) -> Self {
        Self {
            target,
            output: Some(output),
            error: None,
            stats: Some(stats),
        }
    }

    pub fn failed(target: String, error: String) -> Self {
        Self {
            target,
            output: None,
            error: Some(error),
            stats: None,
        }
    }
}

pub fn render_slice_summary(report: &SliceReport) -> String {
    let mut out = String::new();

    for file in &report.files {
        if let Some(error) = &file.error {
            out.push_str(&format!("{}: skipped ({})\n", file.path.display(), error));
            continue;
        }

        out.push_str(&format!(
            "{}: {} targets\n",
            file.path.display(),
            file.targets.len()
        ));
        for target in &file.targets {
            match (&target.output, &target.stats, &target.error) {
                (Some(output), Some(stats), _) => out.push_str(&format!(
                    "  {} -> {} ({} helpers, {} stubbed, {:.1}% reduction)\n",
                    target.target,
                    output.display(),
                    stats.helpers,
                    stats.stub_helpers,
                    stats.reduction_percent
                )),
                (_, _, Some(error)) => {
                    out.push_str(&format!("  {}: failed ({})\n", target.target, error))
                }
                _ => out.push_str(&format!("  {}\n", target.target)),
            }
        }
    }

    out.push_str(&format!(
        "Wrote {} files; {} inputs skipped",
        report.written(),
        report.failed_files()
    ));
    out
}

/// Call-graph diagnostics, optionally focused on one function
#[derive(Debug, Serialize)]
pub struct GraphReport {
    pub functions: usize,
    pub calls: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<FocusReport>,

    pub edges: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct FocusReport {
    pub function: String,
    pub callees: Vec<String>,
    pub callers: Vec<String>,

    /// Shortest call distance from `function`, unbounded by the slice depth
    pub depths: BTreeMap<String, usize>,
}

impl GraphReport {
    pub fn new(graph: &CallGraph, focus: Option<&str>) -> Self {
        let focus = focus.map(|name| FocusReport {
            function: name.to_string(),
            callees: graph.callees(name),
            callers: graph.callers(name),
            depths: graph.shortest_depths(name),
        });

        let edges = match &focus {
            Some(focus) => graph
                .edges()
                .into_iter()
                .filter(|(from, to)| *from == focus.function || *to == focus.function)
                .collect(),
            None => graph.edges(),
        };

        Self {
            functions: graph.node_count(),
            calls: graph.edge_count(),
            focus,
            edges,
        }
    }
}

pub fn render_graph(report: &GraphReport) -> String {
    let mut out = format!("{} functions, {} calls\n", report.functions, report.calls);

    if let Some(focus) = &report.focus {
        out.push_str(&format!(
            "callees of {}: {}\n",
            focus.function,
            join_or_dash(&focus.callees)
        ));
        out.push_str(&format!(
            "callers of {}: {}\n",
            focus.function,
            join_or_dash(&focus.callers)
        ));

        let mut by_depth: Vec<_> = focus.depths.iter().collect();
        by_depth.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
        for (name, depth) in by_depth {
            out.push_str(&format!("  depth {depth}: {name}\n"));
        }
        return out;
    }

    for (from, to) in &report.edges {
        out.push_str(&format!("{from} -> {to}\n"));
    }
    out
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
