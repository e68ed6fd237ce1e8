use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use cslice_slicer::{write_unit, ReconstructedUnit, Slicer, SlicerConfig};
use cslice_syntax::{is_c_source, strip, TranslationUnit};
use report::{FileReport, GraphReport, SliceReport, TargetReport};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

mod report;

fn print_stdout(text: &str) -> Result<()> {
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

#[derive(Parser)]
#[command(name = "cslice")]
#[command(about = "Reconstruct minimal compilable C units around target functions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Slice target functions out of C sources
    Slice(SliceArgs),

    /// List the functions called from the entry point
    Targets(TargetsArgs),

    /// Show call-graph diagnostics
    Graph(GraphArgs),

    /// Remove the entry function, optionally appending an include line
    #[command(name = "strip-entry")]
    StripEntry(StripEntryArgs),
}

#[derive(Args)]
struct EngineArgs {
    /// Slicer config file (TOML); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Entry point function
    #[arg(long)]
    entry: Option<String>,
}

impl EngineArgs {
    fn load_config(&self) -> Result<SlicerConfig> {
        let mut config = match &self.config {
            Some(path) => SlicerConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => SlicerConfig::default(),
        };
        if let Some(entry) = &self.entry {
            config.entry_point = entry.clone();
        }
        Ok(config)
    }
}

#[derive(Args)]
struct SliceArgs {
    /// C source files or directories to walk for them
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Function to slice (repeatable); defaults to every callee of the entry point
    #[arg(short = 'f', long = "function")]
    functions: Vec<String>,

    #[command(flatten)]
    engine: EngineArgs,

    /// Maximum call depth followed from each target
    #[arg(long)]
    max_depth: Option<usize>,

    /// Additional call names to ignore (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Directory receiving reconstructed_<name>.c files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output JSON report
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TargetsArgs {
    /// C source file
    path: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GraphArgs {
    /// C source file
    path: PathBuf,

    /// Focus on one function's callees, callers and depths
    #[arg(short = 'f', long = "function")]
    function: Option<String>,

    #[command(flatten)]
    engine: EngineArgs,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct StripEntryArgs {
    /// C source file
    path: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Line appended after stripping, e.g. `#include "harness.c"`
    #[arg(long)]
    include: Option<String>,

    /// Write here instead of rewriting the input in place
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout is reserved for JSON
    let json_output = match &cli.command {
        Commands::Slice(args) => args.json,
        Commands::Targets(args) => args.json,
        Commands::Graph(args) => args.json,
        Commands::StripEntry(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Slice(args) => run_slice(args),
        Commands::Targets(args) => run_targets(args),
        Commands::Graph(args) => run_graph(args),
        Commands::StripEntry(args) => run_strip_entry(args),
    }
}

fn run_slice(args: SliceArgs) -> Result<()> {
    let mut config = args.engine.load_config()?;
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }
    config.extra_exclusions.extend(args.exclude.iter().cloned());
    let slicer = Slicer::new(config).context("Invalid slicer configuration")?;

    let sources = collect_sources(&args.paths)?;
    if sources.is_empty() {
        bail!("No C sources found");
    }
    // one subdirectory per input keeps same-named targets apart
    let per_file_dirs = sources.len() > 1;

    let mut report = SliceReport::default();
    for path in &sources {
        let out_dir = if per_file_dirs {
            args.output_dir.join(file_stem(path))
        } else {
            args.output_dir.clone()
        };
        report
            .files
            .push(slice_file(&slicer, path, &args.functions, &out_dir));
    }

    log::info!(
        "Sliced {} files: {} units written, {} inputs skipped",
        report.files.len(),
        report.written(),
        report.failed_files()
    );

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&report)?)?;
    } else {
        print_stdout(&report::render_slice_summary(&report))?;
    }
    Ok(())
}

fn slice_file(slicer: &Slicer, path: &Path, functions: &[String], out_dir: &Path) -> FileReport {
    let mut file_report = FileReport::new(path);

    let unit = match read_unit(slicer, path) {
        Ok(unit) => unit,
        Err(err) => {
            log::warn!("Skipping {}: {:#}", path.display(), err);
            file_report.error = Some(format!("{err:#}"));
            return file_report;
        }
    };
    let source_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let slices: Vec<(String, cslice_slicer::Result<ReconstructedUnit>)> = if functions.is_empty() {
        slicer
            .slice_entry_calls(&unit, &source_name)
            .into_iter()
            .map(|slice| (slice.target.clone(), Ok(slice)))
            .collect()
    } else {
        functions
            .iter()
            .map(|name| (name.clone(), slicer.slice(&unit, &source_name, name)))
            .collect()
    };

    for (name, slice) in slices {
        let target = match slice.and_then(|slice| {
            let output = write_unit(out_dir, &slice)?;
            Ok((output, slice.stats))
        }) {
            Ok((output, stats)) => TargetReport::written(name, output, stats),
            Err(err) => {
                log::warn!("Failed to slice `{}` in {}: {}", name, path.display(), err);
                TargetReport::failed(name, err.to_string())
            }
        };
        file_report.targets.push(target);
    }

    file_report
}

fn run_targets(args: TargetsArgs) -> Result<()> {
    let slicer = Slicer::new(args.engine.load_config()?).context("Invalid slicer configuration")?;
    let unit = read_unit(&slicer, &args.path)?;
    let targets = slicer.entry_targets(&unit);

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&targets)?)?;
    } else {
        let lines: Vec<_> = targets
            .iter()
            .map(|f| {
                format!(
                    "{}\tlines {}-{}\t{}",
                    f.name, f.start_line, f.end_line, f.signature
                )
            })
            .collect();
        print_stdout(&lines.join("\n"))?;
    }
    Ok(())
}

fn run_graph(args: GraphArgs) -> Result<()> {
    let slicer = Slicer::new(args.engine.load_config()?).context("Invalid slicer configuration")?;
    let unit = read_unit(&slicer, &args.path)?;
    let graph = slicer.call_graph(&unit);

    if let Some(name) = &args.function {
        if graph.find_node(name).is_none() {
            bail!("Function `{}` not found in {}", name, args.path.display());
        }
    }

    let report = GraphReport::new(&graph, args.function.as_deref());
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&report)?)?;
    } else {
        print_stdout(report::render_graph(&report).trim_end())?;
    }
    Ok(())
}

fn run_strip_entry(args: StripEntryArgs) -> Result<()> {
    let slicer = Slicer::new(args.engine.load_config()?).context("Invalid slicer configuration")?;
    let unit = read_unit(&slicer, &args.path)?;
    let entry = &slicer.config().entry_point;

    let mut code = strip::remove_function(&unit, entry)
        .with_context(|| format!("Failed to strip `{}` from {}", entry, args.path.display()))?;
    if let Some(line) = &args.include {
        code = strip::append_include_line(&code, line);
    }

    let target = args.output.as_ref().unwrap_or(&args.path);
    write_atomic(target, code.as_bytes())?;
    log::info!(
        "Removed `{}` from {}, wrote {}",
        entry,
        args.path.display(),
        target.display()
    );
    Ok(())
}

fn read_unit(slicer: &Slicer, path: &Path) -> Result<TranslationUnit> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    slicer
        .parse(&bytes)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Expand directories into the C sources below them, sorted by path
fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for path in paths {
        if path.is_dir() {
            let found = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file() && is_c_source(entry.path()))
                .map(|entry| entry.into_path());
            sources.extend(found);
        } else if path.is_file() {
            sources.push(path.clone());
        } else {
            bail!("Path not found: {}", path.display());
        }
    }

    log::debug!("Collected {} source files", sources.len());
    Ok(sources)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unit".to_string())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unit"),
        std::process::id()
    ));

    {
        let mut file =
            File::create(&tmp).with_context(|| format!("create tmp {}", tmp.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("write tmp {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("sync tmp {}", tmp.display()))?;
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename tmp {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
