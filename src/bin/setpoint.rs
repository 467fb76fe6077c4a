//! Setpoint CLI: read, edit, snapshot and launch simulation job scripts.
//!
//! Usage:
//!   setpoint apply --set n=256 --get m
//!   setpoint show [keys...]
//!   setpoint launch <run> [--set key=value]... [--notes text]
//!   setpoint restart <prefix> <number> [--set key=value]...
//!   setpoint archive <prefix> [--rename new]

use clap::{Args, Parser, Subcommand};
use setpoint::analysis::RunParameters;
use setpoint::cluster::{
    matching_dirs, wait_for_slot, ArchivalMover, JobStatusProvider, ScriptRunner, SlurmStatus,
};
use setpoint::snapshot::{self, export_path};
use setpoint::{
    Config, DescriptorRegistry, LaunchOptions, Launcher, Session, SessionOutcome,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "setpoint",
    version,
    about = "Contextual parameter editing for simulation job scripts"
)]
struct Cli {
    /// Config file (default: <config dir>/setpoint/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Do not ask before destructive steps
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct Requests {
    /// Parameter to write, as key=value (repeatable)
    #[arg(long = "set", value_parser = parse_assignment)]
    set: Vec<(String, String)>,
    /// Snapshot (file or run directory) to replay before --set
    #[arg(long)]
    from: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply parameter changes to the source file
    Apply {
        #[command(flatten)]
        requests: Requests,
        /// Parameter to read back (repeatable)
        #[arg(long = "get")]
        get: Vec<String>,
        /// Edit this file instead of the configured source
        #[arg(long)]
        file: Option<PathBuf>,
        /// Take the first match instead of rejecting ambiguous ones
        #[arg(long)]
        fast: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print current parameter values (all when no keys are given)
    Show {
        keys: Vec<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Apply a snapshot to the source file
    Load {
        /// Snapshot file or run directory
        path: PathBuf,
    },
    /// Apply the configured default snapshot
    Restore,
    /// Save every current value as a named snapshot in the config directory
    Save {
        name: String,
        /// Replace an existing snapshot
        #[arg(long)]
        force: bool,
    },
    /// Edit the source, start the job and record the run
    Launch {
        run: String,
        #[command(flatten)]
        requests: Requests,
        /// Start without editing the source
        #[arg(long)]
        no_modify: bool,
        #[arg(long)]
        no_export: bool,
        #[arg(long)]
        no_log: bool,
        #[arg(long, default_value = "")]
        notes: String,
        /// Wait for a free job slot first
        #[arg(long)]
        wait: bool,
    },
    /// Restart every idle run starting with a prefix
    Restart {
        prefix: String,
        number: u32,
        /// Parameter to override, as key=value (repeatable)
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List active jobs
    Jobs {
        /// Report whether this run is active
        run: Option<String>,
    },
    /// Copy run directories to permanent storage
    Archive {
        prefix: String,
        /// Replacement for the first `_` segment of each name
        #[arg(long)]
        rename: Option<String>,
    },
    /// Copy run directories back from permanent storage
    Fetch {
        prefix: String,
        #[arg(long)]
        rename: Option<String>,
    },
    /// Evaluate the parameters recorded for a run
    Params {
        /// Run directory or snapshot file
        run: PathBuf,
        keys: Vec<String>,
        #[arg(long)]
        json: bool,
    },
}

/// Split `key=value`; the value is kept verbatim since whole-line values
/// carry their own leading separator
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        Some((key, _)) if !key.trim().is_empty() => Err(format!("no value given for '{}'", key.trim())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

fn confirm(prompt: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    print!("{} (y/n) ", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim() == "y"
}

/// Build the session described by `--from` and `--set`, on top of reading everything
fn build_session(
    config: &Config,
    registry: &DescriptorRegistry,
    requests: &Requests,
) -> Result<Session, String> {
    let mut session = Session::new().with_mode(config.search_mode());
    session.read_all(registry);
    if let Some(path) = &requests.from {
        let imported = snapshot::import(path, registry)
            .map_err(|e| format!("cannot import '{}': {}", path.display(), e))?;
        session.extend(imported);
    }
    for (key, value) in &requests.set {
        session.set(registry, key, value).map_err(|e| e.to_string())?;
    }
    Ok(session)
}

fn print_outcome(outcome: &SessionOutcome, json: bool) -> i32 {
    if json {
        return match serde_json::to_string_pretty(outcome) {
            Ok(text) => {
                println!("{}", text);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        };
    }
    for record in &outcome.modified {
        println!("{} = {}  (set)", record.key(), record.value.as_deref().unwrap_or_default());
    }
    for record in &outcome.read {
        match &record.value {
            Some(value) => println!("{} = {}", record.key(), value),
            None => println!("{} not found", record.key()),
        }
    }
    0
}

fn cmd_apply(
    config: &Config,
    registry: &DescriptorRegistry,
    requests: &Requests,
    get: &[String],
    file: Option<&Path>,
    fast: bool,
    json: bool,
) -> i32 {
    let mut session = Session::new().with_mode(if fast {
        setpoint::SearchMode::Fast
    } else {
        config.search_mode()
    });
    if let Some(path) = &requests.from {
        match snapshot::import(path, registry) {
            Ok(imported) => session.extend(imported),
            Err(e) => {
                eprintln!("Error: cannot import '{}': {}", path.display(), e);
                return 1;
            }
        }
    }
    for (key, value) in &requests.set {
        if let Err(e) = session.set(registry, key, value) {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    for key in get {
        if let Err(e) = session.get(registry, key) {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    let target = file.unwrap_or(config.source.as_path());
    match session.process(target) {
        Ok(outcome) => {
            if !json {
                println!("{} line(s) changed in {}", outcome.lines_changed, target.display());
            }
            print_outcome(&outcome, json)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_show(
    config: &Config,
    registry: &DescriptorRegistry,
    keys: &[String],
    file: Option<&Path>,
    json: bool,
) -> i32 {
    let mut session = Session::new().with_mode(config.search_mode());
    if keys.is_empty() {
        session.read_all(registry);
    } else {
        for key in keys {
            if let Err(e) = session.get(registry, key) {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    match session.inspect(file.unwrap_or(config.source.as_path())) {
        Ok(outcome) => print_outcome(&outcome, json),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_load(config: &Config, registry: &DescriptorRegistry, path: &Path, yes: bool) -> i32 {
    let requests = Requests {
        set: Vec::new(),
        from: Some(path.to_path_buf()),
    };
    let session = match build_session(config, registry, &requests) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let prompt = format!(
        "Apply {} parameter(s) from '{}' to '{}'?",
        session.to_modify().len(),
        path.display(),
        config.source.display()
    );
    if !confirm(&prompt, yes) {
        println!("Nothing was changed");
        return 0;
    }
    match session.process(&config.source) {
        Ok(outcome) => {
            println!("{} line(s) changed", outcome.lines_changed);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_save(config: &Config, registry: &DescriptorRegistry, name: &str, force: bool) -> i32 {
    let mut session = Session::new().with_mode(config.search_mode());
    session.read_all(registry);
    let outcome = match session.inspect(&config.source) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let path = export_path(&config.config_dir, "", name);
    match snapshot::export(&outcome, &path, force) {
        Ok(()) => {
            println!("Saved {} parameter(s) to {}", outcome.read.len(), path.display());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn status_provider() -> Result<SlurmStatus, String> {
    SlurmStatus::current_user().map_err(|e| format!("cannot determine user: {}", e))
}

fn script_runner(config: &Config) -> ScriptRunner {
    match &config.interpreter {
        Some(interpreter) => ScriptRunner::new().with_interpreter(interpreter.clone()),
        None => ScriptRunner::new(),
    }
}

fn cmd_launch(
    config: &Config,
    registry: &DescriptorRegistry,
    run: &str,
    requests: &Requests,
    options: LaunchOptions,
    wait: bool,
) -> i32 {
    let status = match status_provider() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let runner = script_runner(config);
    let session = match build_session(config, registry, requests) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if wait {
        if let Err(e) = wait_for_slot(&status, run, &config.scheduler) {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    let launcher = Launcher::new(
        &config.source,
        &config.output_dir,
        config.run_log(),
        &runner,
        &status,
    )
    .with_mode(config.search_mode());
    match launcher.launch(&session, run, &options) {
        Ok(report) => {
            println!("Job started: {}", report.job);
            if let Some(path) = report.snapshot {
                println!("Parameters exported to {}", path.display());
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_restart(
    config: &Config,
    registry: &DescriptorRegistry,
    prefix: &str,
    number: u32,
    overrides: &[(String, String)],
    notes: &str,
    yes: bool,
) -> i32 {
    let status = match status_provider() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let runner = script_runner(config);
    let launcher = Launcher::new(
        &config.source,
        &config.output_dir,
        config.run_log(),
        &runner,
        &status,
    )
    .with_mode(config.search_mode());
    let candidates = match launcher.restart_candidates(prefix) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if !confirm(&format!("Restart {} run(s)?", candidates.len()), yes) {
        println!("Aborted");
        return 0;
    }
    let options = LaunchOptions::default().with_notes(notes);
    match launcher.restart(registry, prefix, number, overrides, &options) {
        Ok(reports) => {
            for report in &reports {
                println!("Job started: {} ({})", report.run, report.job);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_jobs(run: Option<&str>) -> i32 {
    let status = match status_provider() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let active = match status.active_runs() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if active.is_empty() {
        println!("No active jobs.");
    }
    for name in &active {
        let marker = if Some(name.as_str()) == run { "  <--" } else { "" };
        println!("- {}{}", name, marker);
    }
    println!("Active jobs: {}", active.len());
    if let Some(run) = run {
        println!("{} running: {}", run, active.iter().any(|a| a == run));
    }
    0
}

fn cmd_transfer(config: &Config, prefix: &str, rename: Option<&str>, restore: bool, yes: bool) -> i32 {
    let store = config.archive();
    let (from, to) = if restore {
        (store.cold(), store.hot())
    } else {
        (store.hot(), store.cold())
    };
    let count = match matching_dirs(from, prefix) {
        Ok(dirs) => dirs.len(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let prompt = format!(
        "Copy {} folder(s) starting with '{}' to {}?",
        count,
        prefix,
        to.display()
    );
    if !confirm(&prompt, yes) {
        println!("Nothing was copied");
        return 0;
    }
    let result = if restore {
        store.restore(prefix, rename)
    } else {
        store.archive(prefix, rename)
    };
    match result {
        Ok(report) => {
            for transfer in &report.copied {
                println!("Copied {} -> {}", transfer.from.display(), transfer.to.display());
            }
            for skipped in &report.skipped {
                println!("{} already exists; not copied", skipped.display());
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_params(run: &Path, keys: &[String], json: bool) -> i32 {
    let params = match RunParameters::load(run) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if keys.is_empty() {
        let sizes = match params.domain_sizes() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };
        if json {
            match serde_json::to_string_pretty(&sizes) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            }
        } else {
            println!("t = {}\nx = {}\ny = {}\nz = {}", sizes.t, sizes.x, sizes.y, sizes.z);
        }
        return 0;
    }
    let mut values = serde_json::Map::new();
    for key in keys {
        match params.get(key) {
            Ok(value) => {
                if json {
                    values.insert(key.clone(), serde_json::json!(value));
                } else {
                    println!("{} = {}", key, value);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    if json {
        println!("{}", serde_json::Value::Object(values));
    }
    0
}

fn with_config(path: Option<&Path>, f: impl FnOnce(&Config) -> i32) -> i32 {
    match Config::discover(path) {
        Ok(config) => f(&config),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn with_registry(path: Option<&Path>, f: impl FnOnce(&Config, &DescriptorRegistry) -> i32) -> i32 {
    with_config(path, |config| match config.registry() {
        Ok(registry) => f(config, &registry),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let yes = cli.yes;

    let code = match cli.command {
        Commands::Params { run, keys, json } => cmd_params(&run, &keys, json),
        Commands::Jobs { run } => cmd_jobs(run.as_deref()),
        Commands::Archive { prefix, rename } => with_config(config_path, |config| {
            cmd_transfer(config, &prefix, rename.as_deref(), false, yes)
        }),
        Commands::Fetch { prefix, rename } => with_config(config_path, |config| {
            cmd_transfer(config, &prefix, rename.as_deref(), true, yes)
        }),
        Commands::Apply {
            requests,
            get,
            file,
            fast,
            json,
        } => with_registry(config_path, |config, registry| {
            cmd_apply(config, registry, &requests, &get, file.as_deref(), fast, json)
        }),
        Commands::Show { keys, file, json } => with_registry(config_path, |config, registry| {
            cmd_show(config, registry, &keys, file.as_deref(), json)
        }),
        Commands::Load { path } => {
            with_registry(config_path, |config, registry| cmd_load(config, registry, &path, yes))
        }
        Commands::Restore => with_registry(config_path, |config, registry| {
            match &config.default_snapshot {
                Some(path) => cmd_load(config, registry, path, yes),
                None => {
                    eprintln!("Error: no default_snapshot configured");
                    1
                }
            }
        }),
        Commands::Save { name, force } => with_registry(config_path, |config, registry| {
            cmd_save(config, registry, &name, force)
        }),
        Commands::Launch {
            run,
            requests,
            no_modify,
            no_export,
            no_log,
            notes,
            wait,
        } => with_registry(config_path, |config, registry| {
            let options = LaunchOptions {
                modify: !no_modify,
                export: !no_export,
                log: !no_log,
                notes,
            };
            cmd_launch(config, registry, &run, &requests, options, wait)
        }),
        Commands::Restart {
            prefix,
            number,
            set,
            notes,
        } => with_registry(config_path, |config, registry| {
            cmd_restart(config, registry, &prefix, number, &set, &notes, yes)
        }),
    };
    std::process::exit(code);
}
