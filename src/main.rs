use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use log::LevelFilter;
use std::path::PathBuf;
use std::process;
use treebak::config::BackupOptions;
use treebak::{Backup, BackupRequest, Level, Mode, path_util, report, sysexits};

/// Back up a directory to a destination, as a plain copy or a zip archive.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to back up.
    #[arg(short, long)]
    source: String,
    /// Path to save the backup to.
    #[arg(short, long)]
    destination: String,
    /// Name of the folder (or archive file) to save the backup to.
    #[arg(short, long)]
    name: Option<String>,
    /// Compress the backup into a zip archive.
    #[arg(short, long)]
    zip: bool,
    /// Compression level for zip archives.
    #[arg(short, long, requires = "zip")]
    level: Option<Level>,
    /// Leave out files or directories, relative to the source.
    #[arg(short = 'g', long, value_delimiter = ',')]
    ignore: Vec<String>,
    /// Read options from a TOML file; flags given here take precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log more detail (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> anyhow::Result<BackupOptions> {
        let from_flags = BackupOptions {
            name: self.name.clone(),
            archive: self.zip,
            level: self.level,
            ignore: self.ignore.clone(),
        };
        Ok(match &self.config {
            Some(path) => BackupOptions::load(path)?.merge(from_flags),
            None => from_flags,
        })
    }

    fn request(&self) -> anyhow::Result<BackupRequest> {
        if self.source.trim().is_empty() || self.destination.trim().is_empty() {
            bail!("Please specify a source and a destination path for the backup");
        }
        let source = path_util::expand_path(&self.source)?;
        let destination = path_util::expand_path(&self.destination)?;
        path_util::check_path(&source).context("Source path not found")?;

        let options = self.options()?;
        let mode = if options.archive {
            Mode::Archive
        } else {
            Mode::Copy
        };
        Ok(BackupRequest::new(source, destination, mode)
            .with_name(options.name)
            .with_level(options.level.unwrap_or_default())
            .with_ignore(options.ignore))
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

/// Entry point for the tbk CLI.
/// Parses arguments, runs the backup and maps the result to an exit code.
fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(sysexits::EX_USAGE);
        }
    };
    init_logger(cli.verbose);

    let request = match cli.request() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{e:#}");
            eprintln!("Use tbk --help for options");
            process::exit(sysexits::EX_USAGE);
        }
    };

    let mode = request.mode;
    let location = request.backup_location();
    let mut backup = Backup::new(request);
    let result = backup.execute(|event| {
        if let Some(line) = report::entry_line(&event, mode) {
            println!("{line}");
        }
    });

    match result {
        Ok(counters) => {
            println!("{}", report::summary(&location, &counters));
            process::exit(sysexits::EX_OK);
        }
        Err(err) if err.is_durability() => {
            println!("{}", report::summary(&location, &backup.summary()));
            eprintln!("The backup could not be flushed to storage: {err}");
            process::exit(sysexits::EX_FATAL);
        }
        Err(err) => {
            eprintln!("Oh no! tbk encountered an error: {err}");
            process::exit(sysexits::EX_FATAL);
        }
    }
}
