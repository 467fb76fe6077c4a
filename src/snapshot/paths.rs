//! Where snapshots live on disk

use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default snapshot file name inside a run directory
pub const SNAPSHOT_FILE: &str = "parameters.csv";

fn restart_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"RESTAR[^_]+_").expect("static pattern"))
}

/// Whether `run` names a restart of an earlier run
pub fn is_restart(run: &str) -> bool {
    run.contains("RESTART")
}

/// Remove every `RESTART<n>_` marker from a run name
pub fn strip_restart_prefix(run: &str) -> String {
    restart_prefix().replace_all(run, "").into_owned()
}

/// Snapshot path for a run: `dir/run/file.csv`
///
/// Restart runs share their original run's directory and get a `restart_`
/// file prefix instead.
pub fn export_path(dir: &Path, run: &str, file_name: &str) -> PathBuf {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    if is_restart(run) {
        dir.join(strip_restart_prefix(run))
            .join(format!("restart_{}.csv", stem))
    } else {
        dir.join(run).join(format!("{}.csv", stem))
    }
}

/// Resolve an import location: a `.csv` file as-is, otherwise a run directory
pub fn import_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "csv") {
        path.to_path_buf()
    } else {
        path.join(SNAPSHOT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_run_path() {
        let p = export_path(Path::new("/out"), "DIANA_crn0dot65", "parameters");
        assert_eq!(p, PathBuf::from("/out/DIANA_crn0dot65/parameters.csv"));
    }

    #[test]
    fn csv_suffix_not_doubled() {
        let p = export_path(Path::new("/cfg"), "", "baseline.csv");
        assert_eq!(p, PathBuf::from("/cfg/baseline.csv"));
    }

    #[test]
    fn restart_run_uses_original_directory() {
        let p = export_path(Path::new("/out"), "RESTART3_DIANA", "parameters");
        assert_eq!(p, PathBuf::from("/out/DIANA/restart_parameters.csv"));
    }

    #[test]
    fn strip_prefix_handles_numbers() {
        assert_eq!(strip_restart_prefix("RESTART12_run_a"), "run_a");
        assert_eq!(strip_restart_prefix("run_a"), "run_a");
    }

    #[test]
    fn import_path_appends_snapshot_file_for_directories() {
        assert_eq!(import_path(Path::new("/out/run")), PathBuf::from("/out/run/parameters.csv"));
        assert_eq!(import_path(Path::new("/cfg/x.csv")), PathBuf::from("/cfg/x.csv"));
    }
}
