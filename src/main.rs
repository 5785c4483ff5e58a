//! CLI entrypoint for `lastlog-audit`.
//!
//! Parses command-line arguments, validates the input file, decodes it through
//! the library engine, then prints the entries as a table or as lines, or
//! writes them to a CSV/TXT export.
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use lastlog_audit::{
    engine::{Engine, ScanOptions},
    entry::TimeZoneChoice,
    export::{ExportFormat, export},
    identity::{IdentityResolver, PasswdResolver, SystemResolver},
    io::{DEFAULT_LASTLOG_PATH, DEFAULT_MMAP_THRESHOLD_BYTES},
    record::RecordLayout,
    report::{DisplayMode, render},
};
use log::{LevelFilter, error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "lastlog-audit",
    version,
    about = "Analyzes /var/log/lastlog to generate login activity reports. Designed for security audits."
)]
struct Args {
    /// Lastlog file to read
    #[arg(long = "file", default_value = DEFAULT_LASTLOG_PATH)]
    file: PathBuf,

    /// Output format: 'table' for tabular and 'line' for line-by-line display
    #[arg(long = "display", value_enum, default_value_t = DisplayMode::Table)]
    display: DisplayMode,

    /// Include usernames. Accurate only on the host the lastlog came from,
    /// unless --passwd is given
    #[arg(long = "include-username")]
    include_username: bool,

    /// Resolve usernames from this passwd file instead of the local host
    #[arg(long = "passwd")]
    passwd: Option<PathBuf>,

    /// Export to this path instead of printing
    #[arg(long = "export")]
    export: Option<PathBuf>,

    /// Format for exported data
    #[arg(long = "export-format", value_enum, default_value_t = ExportFormat::Txt)]
    export_format: ExportFormat,

    /// Record layout of the input file
    #[arg(long = "layout", value_enum, default_value_t = RecordLayout::Lastlog32)]
    layout: RecordLayout,

    /// Show login times in UTC instead of the local time zone
    #[arg(long = "utc")]
    utc: bool,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log counts of empty, malformed and truncated records
    #[arg(long = "log-parse-stats")]
    log_parse_stats: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress the banner
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

const BANNER: &str = r#"
    __               __  __                   ___             ___ __
   / /   ____ ______/ /_/ /   ____  ____ _   /   | __  ______/ (_) /_
  / /   / __ `/ ___/ __/ /   / __ \/ __ `/  / /| |/ / / / __  / / __/
 / /___/ /_/ (__  ) /_/ /___/ /_/ / /_/ /  / ___ / /_/ / /_/ / / /_
/_____/\__,_/____/\__/_____/\____/\__, /  /_/  |_\__,_/\__,_/_/\__/
                                 /____/
"#;

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

/// Fail only on a confirmed absence. Other stat errors are left for the
/// open to report with their real cause.
fn ensure_not_missing(what: &str, path: &Path) -> Result<()> {
    match path.try_exists() {
        Ok(false) => bail!("{} not found: {}", what, path.display()),
        Ok(true) => Ok(()),
        Err(e) => {
            warn!("cannot check {}: {}", path.display(), e);
            Ok(())
        }
    }
}

fn verify_inputs(args: &Args) -> Result<()> {
    ensure_not_missing("lastlog file", &args.file)?;
    if let Some(p) = &args.passwd {
        ensure_not_missing("passwd file", p)?;
    }
    Ok(())
}

fn build_resolver(args: &Args) -> Result<Box<dyn IdentityResolver>> {
    match &args.passwd {
        Some(p) => {
            let r = PasswdResolver::from_path(p)?;
            if r.is_empty() {
                warn!("no users found in {}", p.display());
            } else {
                info!("loaded {} users from {}", r.len(), p.display());
            }
            Ok(Box::new(r))
        }
        None => Ok(Box::new(SystemResolver)),
    }
}

fn print_report(text: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes()).context("write report")?;
    writeln!(out).context("write report")?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    // --log-parse-stats reports at info level
    init_logger(args.verbose.max(u8::from(args.log_parse_stats)));
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    if !args.quiet {
        println!("{}", BANNER.bold().green());
    }
    if let Err(e) = verify_inputs(&args) {
        error!("{}", e);
        std::process::exit(2);
    }
    let resolver = match build_resolver(&args) {
        Ok(r) => r,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    };

    let include_username = args.include_username || args.passwd.is_some();
    let opts = ScanOptions {
        layout: args.layout,
        include_username,
        mmap_threshold_bytes: if args.mmap_threshold == 0 {
            u64::MAX
        } else {
            args.mmap_threshold
        },
    };
    let tz = if args.utc {
        TimeZoneChoice::Utc
    } else {
        TimeZoneChoice::Local
    };

    let mut engine = Engine::new();
    let load_res = engine.load_from_path(&args.file, &opts, &*resolver);

    if args.log_parse_stats {
        let s = engine.stats;
        log::info!(
            "parse stats: records={}, entries={}, empty={}, malformed={}, truncated_tail_bytes={}",
            s.records_read,
            s.emitted(),
            s.empty_slots,
            s.malformed,
            s.truncated_tail_bytes
        );
    }

    // Entries decoded before a read failure are still reported; a source that
    // yielded no record at all produces no report.
    let mut code = 0;
    let no_output = load_res.is_err() && engine.stats.records_read == 0;
    if no_output {
        info!("nothing decoded from {}, skipping report", args.file.display());
    } else if let Some(path) = &args.export {
        if let Err(e) = export(
            &engine.entries,
            path,
            args.export_format,
            args.display,
            include_username,
            tz,
        ) {
            error!("{}", e);
            code = 4;
        } else {
            info!("wrote {} entries to {}", engine.entries.len(), path.display());
        }
    } else if let Err(e) = print_report(&render(
        &engine.entries,
        args.display,
        include_username,
        tz,
    )) {
        error!("{:#}", e);
        code = 1;
    }

    if let Err(e) = load_res {
        error!("{}", e);
        if e.is_fatal() {
            code = 3;
        }
    }
    std::process::exit(code);
}
