//! a7p - Validate, repair and re-zero `.a7p` ballistic profile archives
//!
//! This tool checks archives for integrity and domain errors, optionally
//! recovers damaged ones, replaces distance tables and adjusts the zero.

use a7p_core::distances::{self, DistancePreset};
use a7p_core::{
    dump, load, Correction, EngineConfig, Error, Mode, Profile, RuleRegistry, Violation,
    ZeroAdjustment, ZeroOffset, ZeroReference,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Archive file extension
const EXTENSION: &str = "a7p";

/// Validate, repair and re-zero .a7p ballistic profile archives
#[derive(Parser, Debug)]
#[command(name = "a7p")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a .a7p file or a directory to process
    path: PathBuf,

    /// Recursively process files in the specified directory
    #[arg(short, long)]
    recursive: bool,

    /// Skip data validation (use with caution)
    #[arg(long = "unsafe")]
    unsafe_mode: bool,

    /// Show violations and corrections in detail (single file only)
    #[arg(long)]
    verbose: bool,

    /// Save changes without confirmation
    #[arg(short = 'F', long)]
    force: bool,

    /// Try to repair a damaged archive (single file only)
    #[arg(long)]
    recover: bool,

    #[command(flatten)]
    distances: DistanceArgs,

    #[command(flatten)]
    zeroing: ZeroArgs,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Distances")]
struct DistanceArgs {
    /// Set the zero distance in meters
    #[arg(long, visible_alias = "zd", value_name = "METERS")]
    zero_distance: Option<u32>,

    /// Replace the distance table with a preset range
    #[arg(short, long, value_enum)]
    distances: Option<PresetArg>,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
#[command(next_help_heading = "Zeroing")]
struct ZeroArgs {
    /// Synchronize the zero with another archive
    #[arg(long, visible_alias = "zs", value_name = "FILE")]
    zero_sync: Option<PathBuf>,

    /// Offset the zero by X and Y clicks
    #[arg(
        long,
        visible_alias = "zo",
        num_args = 2,
        value_names = ["X_OFFSET", "Y_OFFSET"],
        allow_negative_numbers = true
    )]
    zero_offset: Option<Vec<f64>>,
}

/// Distance table presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    /// 25 to 400 m
    Subsonic,
    /// 100 to 700 m
    Low,
    /// 100 to 1000 m
    Medium,
    /// 100 to 1700 m
    Long,
    /// 100 to 2065 m
    Ultra,
}

impl From<PresetArg> for DistancePreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Subsonic => DistancePreset::Subsonic,
            PresetArg::Low => DistancePreset::Low,
            PresetArg::Medium => DistancePreset::Medium,
            PresetArg::Long => DistancePreset::Long,
            PresetArg::Ultra => DistancePreset::Ultra,
        }
    }
}

/// Changes requested on the command line, applied to every file
#[derive(Debug, Default)]
struct Edit {
    preset: Option<DistancePreset>,
    zero_distance: Option<u32>,
    zero: Option<ZeroAdjustment>,
}

impl Edit {
    fn is_empty(&self) -> bool {
        self.preset.is_none() && self.zero_distance.is_none() && self.zero.is_none()
    }

    fn apply(&self, profile: &mut Profile) -> a7p_core::Result<()> {
        if self.preset.is_some() || self.zero_distance.is_some() {
            distances::update_distances(profile, self.preset, self.zero_distance.map(f64::from))?;
        }
        if let Some(adjustment) = &self.zero {
            adjustment.apply(profile)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Status {
    Valid,
    Corrected(usize),
    Failed(String),
}

/// Outcome of processing one archive
#[derive(Debug)]
struct FileReport {
    path: PathBuf,
    status: Status,
    zero: Option<ZeroOffset>,
    new_zero: Option<ZeroOffset>,
    violations: Vec<Violation>,
    corrections: Vec<Correction>,
    profile: Option<Profile>,
    edited: bool,
}

impl FileReport {
    fn failed(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            status: Status::Failed(reason.into()),
            zero: None,
            new_zero: None,
            violations: Vec::new(),
            corrections: Vec::new(),
            profile: None,
            edited: false,
        }
    }

    fn is_failed(&self) -> bool {
        matches!(self.status, Status::Failed(_))
    }

    fn has_changes(&self) -> bool {
        self.profile.is_some() && (self.edited || !self.corrections.is_empty())
    }

    fn render(&self, edit: &Edit, verbose: bool) -> String {
        let path = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());

        let mut out = match &self.status {
            Status::Valid => format!("Valid: File: {}\n", path.display()),
            Status::Corrected(n) => {
                format!("Corrected ({} change(s)): File: {}\n", n, path.display())
            }
            Status::Failed(reason) => format!("Invalid ({}): File: {}\n", reason, path.display()),
        };

        if let Some(zero) = &self.zero {
            out.push_str(&format!("\tZero:\t{}\n", zero));
        }
        if let (Some(_), Some(new_zero)) = (&edit.zero, &self.new_zero) {
            out.push_str(&format!("\tNew zero:\t{}\n", new_zero));
        }
        if !self.is_failed() {
            if let Some(preset) = edit.preset {
                out.push_str(&format!("\tNew range: {}\n", preset));
            }
            if let Some(meters) = edit.zero_distance {
                out.push_str(&format!("\tNew zero distance: {}\n", meters));
            }
        }
        for correction in &self.corrections {
            out.push_str(&format!("\tCorrected {}\n", correction));
        }
        if verbose {
            for violation in &self.violations {
                out.push_str(&format!("\t{}\n", violation));
            }
        }
        out
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if !cli.path.exists() {
        bail!("The '{}' is not a valid path", cli.path.display());
    }
    if cli.path.is_dir() && (cli.verbose || cli.recover) {
        bail!(
            "The --verbose and --recover options are supported only when processing a single file"
        );
    }
    if cli.unsafe_mode {
        warn!("The 'unsafe' mode is restricted and may lead to file corruption.");
    }
    if cli.force {
        warn!("Use the 'force' option cautiously, only if you are certain about its effects.");
    }

    let mode = if cli.unsafe_mode { Mode::Unsafe } else { Mode::Strict };
    let config = EngineConfig::new().mode(mode).recover(cli.recover);
    let registry = RuleRegistry::shared();

    let edit = Edit {
        preset: cli.distances.distances.map(DistancePreset::from),
        zero_distance: cli.distances.zero_distance,
        zero: resolve_zero(&cli.zeroing, mode, registry)?,
    };

    let files = collect_files(&cli.path, cli.recursive);
    debug!("Found {} archive(s)", files.len());

    let mut reports: Vec<FileReport> = files
        .iter()
        .map(|path| process_file(path, &config, registry, &edit))
        .collect();
    reports.sort_by_key(FileReport::is_failed);

    let stdin = io::stdin();
    let mut failed = 0;
    for report in &reports {
        println!("{}", report.render(&edit, cli.verbose));
        if report.is_failed() {
            failed += 1;
        } else if report.has_changes() {
            if let Err(e) = save_changes(report, mode, registry, cli.force, &mut stdin.lock()) {
                warn!("An error occurred while saving {}: {:#}", report.path.display(), e);
            }
        }
    }

    println!(
        "Files checked: {}, Ok: {}, Failed: {}",
        reports.len(),
        reports.len() - failed,
        failed
    );

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Turns the zeroing arguments into an adjustment
fn resolve_zero(
    args: &ZeroArgs,
    mode: Mode,
    registry: &RuleRegistry,
) -> Result<Option<ZeroAdjustment>> {
    if let Some(path) = &args.zero_sync {
        let data = fs::read(path)
            .with_context(|| format!("Failed to read zero reference: {}", path.display()))?;
        let loaded = load(data, &EngineConfig::new().mode(mode), registry)
            .with_context(|| format!("Invalid zero reference: {}", path.display()))?;
        let reference = ZeroReference::from_profile(&loaded.profile)?;
        return Ok(Some(ZeroAdjustment::Sync(reference)));
    }

    match args.zero_offset.as_deref() {
        Some([x, y]) => Ok(Some(ZeroAdjustment::Offset(ZeroOffset::new(*x, *y)))),
        Some(other) => bail!("--zero-offset takes 2 values, got {}", other.len()),
        None => Ok(None),
    }
}

/// Lists the archives under `path`
fn collect_files(path: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(false)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_archive(p))
        .collect();
    files.sort();
    files
}

fn is_archive(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(EXTENSION)
}

/// Loads, checks and edits a single archive
fn process_file(
    path: &Path,
    config: &EngineConfig,
    registry: &RuleRegistry,
    edit: &Edit,
) -> FileReport {
    trace!("Reading {}", path.display());
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => return FileReport::failed(path, e.to_string()),
    };

    let loaded = match load(data, config, registry) {
        Ok(loaded) => loaded,
        Err(e) => {
            debug!("Error processing {}: {}", path.display(), e);
            let reason = match &e {
                Error::Validation(_) => "Validation error".to_string(),
                other => other.to_string(),
            };
            let mut report = FileReport::failed(path, reason);
            report.violations = e.violations().to_vec();
            return report;
        }
    };

    let mut profile = loaded.profile;
    let zero = ZeroOffset::of(&profile);
    if !edit.is_empty() {
        if let Err(e) = edit.apply(&mut profile) {
            return FileReport::failed(path, e.to_string());
        }
    }

    FileReport {
        path: path.to_path_buf(),
        status: if loaded.corrections.is_empty() {
            Status::Valid
        } else {
            Status::Corrected(loaded.corrections.len())
        },
        zero: Some(zero),
        new_zero: Some(ZeroOffset::of(&profile)),
        violations: loaded.warnings,
        corrections: loaded.corrections,
        profile: Some(profile),
        edited: !edit.is_empty(),
    }
}

/// Asks whether to save; only `y` or `Y` confirms
fn confirm(input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    write!(output, "Do you want to save changes? (Y/N): ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Writes the edited profile back to its file
fn save_changes(
    report: &FileReport,
    mode: Mode,
    registry: &RuleRegistry,
    force: bool,
    input: &mut impl BufRead,
) -> Result<()> {
    let Some(profile) = &report.profile else {
        return Ok(());
    };

    if !force && !confirm(input, &mut io::stdout())? {
        info!("No changes have been saved.");
        return Ok(());
    }

    let data = match dump(profile, mode, registry) {
        Ok(data) => data,
        Err(e) => {
            warn!("The data is invalid. Changes have not been saved: {}", e);
            return Ok(());
        }
    };

    fs::write(&report.path, data)
        .with_context(|| format!("Failed to write file: {}", report.path.display()))?;
    info!("Changes have been saved successfully.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use a7p_core::ProfileBuilder;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn write_archive(dir: &Path, name: &str, profile: &Profile) -> PathBuf {
        let path = dir.join(name);
        let data = dump(profile, Mode::Unsafe, RuleRegistry::shared()).unwrap();
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_zero_offset_with_negative_values() {
        let cli = Cli::try_parse_from(["a7p", "file.a7p", "--zero-offset", "10", "-20"]).unwrap();
        assert_eq!(cli.zeroing.zero_offset, Some(vec![10.0, -20.0]));
    }

    #[test]
    fn test_zero_sync_and_offset_conflict() {
        let result = Cli::try_parse_from([
            "a7p",
            "file.a7p",
            "--zs",
            "ref.a7p",
            "--zo",
            "1",
            "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_distances() {
        let args = ["a7p", "dir", "-r", "-d", "ultra", "--zd", "150", "-F"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.recursive);
        assert!(cli.force);
        assert_eq!(cli.distances.distances, Some(PresetArg::Ultra));
        assert_eq!(cli.distances.zero_distance, Some(150));
    }

    #[test]
    fn test_collect_only_archives() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(temp.path().join("a.a7p"), b"").unwrap();
        fs::write(temp.path().join("notes.txt"), b"").unwrap();
        fs::write(nested.join("b.a7p"), b"").unwrap();

        assert_eq!(collect_files(temp.path(), false), vec![temp.path().join("a.a7p")]);
        assert_eq!(
            collect_files(temp.path(), true),
            vec![temp.path().join("a.a7p"), nested.join("b.a7p")]
        );
    }

    #[test]
    fn test_process_valid_file() {
        let temp = TempDir::new().unwrap();
        let profile = ProfileBuilder::new().zero(1.5, -2.0).build();
        let path = write_archive(temp.path(), "ok.a7p", &profile);

        let report = process_file(
            &path,
            &EngineConfig::new(),
            RuleRegistry::shared(),
            &Edit::default(),
        );
        assert!(matches!(report.status, Status::Valid));
        assert_eq!(report.zero, Some(ZeroOffset::new(1.5, -2.0)));
        assert!(!report.has_changes());
        assert!(report.render(&Edit::default(), false).contains("\tZero:\tX: 1.5, Y: -2\n"));
    }

    #[test]
    fn test_process_invalid_file() {
        let temp = TempDir::new().unwrap();
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;
        let path = write_archive(temp.path(), "bad.a7p", &profile);

        let report = process_file(
            &path,
            &EngineConfig::new(),
            RuleRegistry::shared(),
            &Edit::default(),
        );
        assert!(report.is_failed());
        assert_eq!(report.violations.len(), 1);
        assert!(report.render(&Edit::default(), true).contains("range.b_weight"));
    }

    #[test]
    fn test_process_with_recovery() {
        let temp = TempDir::new().unwrap();
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;
        let path = write_archive(temp.path(), "bad.a7p", &profile);

        let config = EngineConfig::new().recover(true);
        let report = process_file(&path, &config, RuleRegistry::shared(), &Edit::default());
        assert!(matches!(report.status, Status::Corrected(1)));
        assert!(report.has_changes());
    }

    #[test]
    fn test_offset_edit_saved() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(temp.path(), "zero.a7p", &ProfileBuilder::new().build());
        let edit = Edit {
            zero: Some(ZeroAdjustment::Offset(ZeroOffset::new(10.0, -20.0))),
            ..Edit::default()
        };

        let report = process_file(&path, &EngineConfig::new(), RuleRegistry::shared(), &edit);
        assert_eq!(report.new_zero, Some(ZeroOffset::new(10.0, -20.0)));

        let mut input = Cursor::new("");
        save_changes(&report, Mode::Strict, RuleRegistry::shared(), true, &mut input).unwrap();

        let data = fs::read(&path).unwrap();
        let saved = load(data, &EngineConfig::new(), RuleRegistry::shared()).unwrap();
        assert_eq!(saved.profile.zero_x, -10000);
        assert_eq!(saved.profile.zero_y, -20000);
    }

    #[test]
    fn test_declined_save_leaves_file() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(temp.path(), "keep.a7p", &ProfileBuilder::new().build());
        let before = fs::read(&path).unwrap();
        let edit = Edit {
            preset: Some(DistancePreset::Subsonic),
            ..Edit::default()
        };

        let report = process_file(&path, &EngineConfig::new(), RuleRegistry::shared(), &edit);
        let mut input = Cursor::new("n\n");
        save_changes(&report, Mode::Strict, RuleRegistry::shared(), false, &mut input).unwrap();

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_confirm_answers() {
        let mut sink = Vec::new();
        assert!(confirm(&mut Cursor::new("y\n"), &mut sink).unwrap());
        assert!(confirm(&mut Cursor::new("Y"), &mut sink).unwrap());
        assert!(!confirm(&mut Cursor::new("yes\n"), &mut sink).unwrap());
        assert!(!confirm(&mut Cursor::new(""), &mut sink).unwrap());
    }
}
