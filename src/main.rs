mod cli;

use playfit::{
    audit::AuditLog,
    config::{self, Config},
    lock::BatchLock,
    plex::{self, PlexClient},
    processor::{FileStatus, ImportStatus, Processor},
    scanner::{self, ScanEntry, ScanSummary},
};
use playfit_av::analyze::channel_label;
use playfit_av::{analyze, probe, SystemRunner, ToolRunner};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise derive from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "playfit=debug,playfit_av=debug".to_string()
        } else {
            "playfit=info,playfit_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan { path, quiet } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            scan(&config, &path, quiet)
        }
        Commands::Process {
            path,
            file,
            dry_run,
            quiet,
            no_hardware,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            process(&config, &path, file, dry_run, quiet, no_hardware)
        }
        Commands::Import {
            source,
            library,
            root,
            dry_run,
            no_hardware,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            import(&config, &source, library, root, dry_run, no_hardware)
        }
        Commands::Probe { file, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            probe_file(&config, &file, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Plex {
            path,
            sections,
            list,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            plex_scan(&config, path.as_deref(), &sections, list)
        }
        Commands::CheckTools => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            check_tools(&config);
            Ok(ExitCode::SUCCESS)
        }
        Commands::ValidateConfig { path } => {
            let path = path.or(cli.config);
            validate_config(path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("playfit {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn log(msg: impl AsRef<str>, quiet: bool) {
    if !quiet {
        println!("{}", msg.as_ref());
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Probe every path, printing a tag line per file.
fn probe_all(runner: &dyn ToolRunner, files: &[PathBuf], quiet: bool) -> Vec<ScanEntry> {
    files
        .iter()
        .map(|f| {
            log(format!("Probing: {}...", display_name(f)), quiet);
            let entry = ScanEntry::from_probe(f, probe::probe(runner, f));
            log(format!("  -> {}", entry.tag_line()), quiet);
            entry
        })
        .collect()
}

fn scan(config: &Config, path: &Path, quiet: bool) -> Result<ExitCode> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {:?}", path);
    }

    let runner = SystemRunner::new(config.tools.clone());
    let files = scanner::collect_media_files(path);
    let entries = probe_all(&runner, &files, quiet);

    println!("{}", ScanSummary::from_entries(&entries).render());
    Ok(ExitCode::SUCCESS)
}

fn process(
    config: &Config,
    path: &Path,
    single_file: bool,
    dry_run: bool,
    quiet: bool,
    no_hardware: bool,
) -> Result<ExitCode> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {:?}", path);
    }

    let _lock = BatchLock::acquire(&config.paths.lock_file)?;

    let runner = SystemRunner::new(config.tools.clone());
    let files = if single_file {
        vec![path.to_path_buf()]
    } else {
        scanner::collect_media_files(path)
    };

    if files.is_empty() {
        println!("No media files found in: {}", path.display());
        return Ok(ExitCode::FAILURE);
    }

    let entries = probe_all(&runner, &files, quiet);
    let to_process: Vec<_> = entries
        .iter()
        .filter_map(|entry| match entry {
            ScanEntry::Probed { info, plan } if plan.needs_any_work() => Some((info, plan)),
            ScanEntry::Probed { .. } => None,
            ScanEntry::ProbeError { path, error } => {
                tracing::warn!("Skipping {:?}: {}", path, error);
                None
            }
        })
        .collect();

    if to_process.is_empty() {
        log("No files need processing.", quiet);
        return Ok(ExitCode::SUCCESS);
    }

    log(format!("\nProcessing {} files...", to_process.len()), quiet);

    let mut processor = Processor::new(&runner, config);
    if no_hardware {
        processor = processor.without_hardware();
    }
    let audit = AuditLog::new(&config.paths.log_dir, "recode");
    let mut failed = 0;

    for (info, plan) in to_process {
        let report = processor.process_file(info, plan, dry_run);
        audit.record(&report);

        if report.status == FileStatus::Failed {
            failed += 1;
        }
        log(
            format!(
                "  {} {}: {}",
                report.status.symbol(),
                display_name(&info.path),
                report.status.as_str()
            ),
            quiet,
        );
        if let Some(error) = &report.error {
            log(format!("      Error: {}", error), quiet);
        }
    }

    if config.plex.scan_after && !dry_run {
        plex::notify(&config.plex, path);
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn import(
    config: &Config,
    source: &Path,
    library: Option<String>,
    root: Option<PathBuf>,
    dry_run: bool,
    no_hardware: bool,
) -> Result<ExitCode> {
    if !source.exists() {
        anyhow::bail!("Source does not exist: {:?}", source);
    }

    let root = match root {
        Some(root) => PathBuf::from(shellexpand::tilde(&root.to_string_lossy()).as_ref()),
        None => config.import.library_root_path(),
    };
    let library = library.unwrap_or_else(|| config.import.default_library.clone());
    let library_path = root.join(&library);

    if !root.exists() {
        anyhow::bail!("Library root does not exist: {:?}", root);
    }
    if !library_path.exists() {
        println!(
            "Warning: Library path does not exist, will create: {}",
            library_path.display()
        );
    }

    let source_is_dir = source.is_dir();
    let dest_base = match (source_is_dir, source.file_name()) {
        (true, Some(name)) => library_path.join(name),
        _ => library_path.clone(),
    };

    let files = scanner::collect_media_files(source);
    if files.is_empty() {
        println!("No media files found in: {}", source.display());
        return Ok(ExitCode::FAILURE);
    }

    println!("Source: {}", source.display());
    println!("Library: {} ({})", library, library_path.display());
    println!("Destination: {}", dest_base.display());
    println!("Files: {}", files.len());
    println!();

    let runner = SystemRunner::new(config.tools.clone());
    let mut processor = Processor::new(&runner, config);
    if no_hardware {
        processor = processor.without_hardware();
    }
    let audit = AuditLog::new(&config.paths.log_dir, "import");
    let (mut succeeded, mut failed) = (0, 0);

    for (idx, file) in files.iter().enumerate() {
        let dest_dir = match file.strip_prefix(source).ok().and_then(Path::parent) {
            Some(rel) if source_is_dir => dest_base.join(rel),
            _ => dest_base.clone(),
        };

        println!("  [{}/{}] {}", idx + 1, files.len(), display_name(file));

        let info = match probe::probe(&runner, file) {
            Ok(info) => info,
            Err(e) => {
                println!("    ERROR: {}", e);
                failed += 1;
                continue;
            }
        };
        let plan = analyze(&info);
        let tags = plan.tags();
        if !tags.is_empty() {
            println!("    Detected: {}", tags.join(" "));
        }

        let report = processor.import_file(&info, &plan, &dest_dir, &root, dry_run);
        if !dry_run {
            audit.record(&report);
        }

        match report.status {
            ImportStatus::Success => {
                println!(
                    "    -> {}: {}",
                    report.action.as_str(),
                    report.destination.display()
                );
                succeeded += 1;
            }
            ImportStatus::WouldImport => {
                println!(
                    "    -> Would {}: {}",
                    report.action.as_str(),
                    report.destination.display()
                );
                if plan.needs_hdr10_copy() {
                    println!("      + {}", report.dovi_action);
                }
                succeeded += 1;
            }
            ImportStatus::Failed => {
                println!(
                    "    X Failed: {}",
                    report.error.as_deref().unwrap_or("unknown error")
                );
                failed += 1;
            }
        }
    }

    println!();
    println!("Complete: {} succeeded, {} failed", succeeded, failed);
    println!("Source preserved at: {}", source.display());

    if config.plex.scan_after && !dry_run && succeeded > 0 {
        plex::notify(&config.plex, &dest_base);
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let runner = SystemRunner::new(config.tools.clone());
    let info = probe::probe(&runner, file)?;
    let plan = analyze(&info);

    if json {
        let value = serde_json::json!({ "media": info, "plan": plan });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File: {}", info.path.display());
    match &info.video {
        Some(video) => {
            print!("Video: {}", video.codec);
            if let (Some(w), Some(h)) = (video.width, video.height) {
                print!(" {}x{}", w, h);
            }
            println!(", {} bit", video.bit_depth);
            if video.hdr {
                print!("      HDR: {:?}", video.hdr_kind);
                if let Some(profile) = video.dovi_profile {
                    print!(" (Profile {})", profile);
                }
                println!();
            }
        }
        None => println!("Video: none"),
    }

    println!("\nAudio Tracks: {}", info.audio_tracks.len());
    for track in &info.audio_tracks {
        println!(
            "  [{}] {} {} ({})",
            track.index,
            track.codec,
            channel_label(track.channels),
            track.language
        );
    }

    println!("\nSubtitle Tracks: {}", info.subtitle_tracks.len());
    for track in &info.subtitle_tracks {
        print!("  [{}] {} ({})", track.index, track.codec, track.language);
        if track.forced {
            print!(" [forced]");
        }
        if track.default {
            print!(" [default]");
        }
        println!();
    }

    println!("\nPlan:");
    println!("  Video:     {}", plan.video_description());
    println!("  Audio:     {}", plan.audio_description());
    println!("  Subtitles: {}", plan.subtitle_description());
    println!("  DoVi:      {}", plan.dovi_description());

    Ok(())
}

fn plex_scan(
    config: &Config,
    path: Option<&Path>,
    keys: &[String],
    list: bool,
) -> Result<ExitCode> {
    if path.is_none() && keys.is_empty() && !list {
        anyhow::bail!("Nothing to scan: give a path, --sections or --list");
    }

    let client = PlexClient::new(&config.plex)?;

    if list {
        for section in client.sections()? {
            let locations: Vec<&str> = section.locations.iter().map(|l| l.path.as_str()).collect();
            println!(
                "  key={}  type={}  title={}  path={}",
                section.key,
                section.kind,
                section.title,
                locations.join(", ")
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut ok = true;

    if let Some(path) = path {
        match client.scan_path(path) {
            Ok(Some(section)) => println!(
                "  Triggered partial scan: {} (section {}) -> {}",
                section.title,
                section.key,
                path.display()
            ),
            Ok(None) => {
                println!("  No library section found for: {}", path.display());
                ok = false;
            }
            Err(e) => {
                println!("  Scan failed: {:#}", e);
                ok = false;
            }
        }
    }

    if !keys.is_empty() {
        let sections = client.sections()?;
        for key in keys {
            let Some(section) = sections.iter().find(|s| &s.key == key) else {
                println!("  Section {} does not exist, skipping", key);
                ok = false;
                continue;
            };
            match client.refresh(&section.key, None) {
                Ok(()) => println!("  Triggered scan: {} (section {})", section.title, key),
                Err(e) => {
                    println!("  Scan failed for {}: {:#}", section.title, e);
                    ok = false;
                }
            }
        }
    }

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn check_tools(config: &Config) {
    println!("Checking external tools...\n");

    let tools = playfit_av::check_tools(&config.tools);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!(
        "  Hardware: {} ({})",
        if config.hardware.enabled {
            "enabled"
        } else {
            "disabled"
        },
        config.hardware.device.display()
    );
    println!("  Log dir: {}", config.paths.log_dir.display());
    println!("  Lock file: {}", config.paths.lock_file.display());
    println!("  OCR timeout: {}s", config.subtitles.ocr_timeout_secs);
    match config.ownership.owner() {
        Some(owner) => println!("  Ownership: {}:{}", owner.user, owner.group),
        None => println!("  Ownership: unchanged"),
    }
    println!(
        "  Import: {}/{}",
        config.import.library_root, config.import.default_library
    );
    println!(
        "  Plex: {} (scan after changes: {})",
        config.plex.url,
        if config.plex.scan_after { "yes" } else { "no" }
    );

    Ok(())
}
