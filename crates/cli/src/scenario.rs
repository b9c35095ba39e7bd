//! Scenario discovery, loading and `gridcheck validate` / `gridcheck list`.

use std::path::{Path, PathBuf};

use gridcheck_api::RecordType;
use gridcheck_recon::ScenarioConfig;

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};
use crate::CliError;

pub const SCENARIO_SUFFIX: &str = ".scenario.toml";

/// A parsed, validated scenario and the API call it resolves to.
#[derive(Debug)]
pub struct Scenario {
    pub path: PathBuf,
    pub config: ScenarioConfig,
    /// `None` only for a skipped scenario naming a call that is not available.
    pub call: Option<RecordType>,
}

impl Scenario {
    /// Directory that workbook and fixture paths are relative to.
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Expand files and directories into scenario files. Directories are searched
/// recursively for `*.scenario.toml`; files are taken as given.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    let mut found = Vec::new();

    for path in paths {
        if path.is_dir() {
            let pattern = format!(
                "{}/**/*{SCENARIO_SUFFIX}",
                glob::Pattern::escape(&path.to_string_lossy())
            );
            let entries = glob::glob(&pattern)
                .map_err(|e| CliError::new(EXIT_USAGE, format!("bad path {}: {e}", path.display())))?;
            let mut in_dir: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
            in_dir.sort();
            found.extend(in_dir);
        } else if path.is_file() {
            found.push(path.clone());
        } else {
            return Err(CliError::new(EXIT_USAGE, format!("no such file or directory: {}", path.display())));
        }
    }

    found.dedup();
    if found.is_empty() {
        return Err(CliError::new(EXIT_USAGE, "no scenario files found")
            .with_hint(format!("scenario files are named *{SCENARIO_SUFFIX}")));
    }
    Ok(found)
}

/// Label for a scenario file whose config could not be loaded.
pub fn file_label(path: &Path) -> String {
    let file = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
    match file.strip_suffix(SCENARIO_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => file,
    }
}

pub fn load(path: &Path) -> Result<Scenario, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot read {}: {e}", path.display())))?;
    let config = ScenarioConfig::from_toml(&text)
        .map_err(|e| CliError::new(EXIT_CONFIG_INVALID, format!("{}: {e}", path.display())))?;
    let call = match config.reference.call.parse::<RecordType>() {
        Ok(call) => Some(call),
        Err(e) if config.is_skipped() => {
            log::debug!("{}: skipped scenario: {e}", path.display());
            None
        }
        Err(e) => return Err(CliError::new(EXIT_CONFIG_INVALID, format!("{}: {e}", path.display()))),
    };
    Ok(Scenario { path: path.to_path_buf(), config, call })
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn cmd_validate(paths: Vec<PathBuf>) -> Result<(), CliError> {
    let files = discover(&paths)?;
    let mut worst = EXIT_SUCCESS;

    for file in &files {
        match load(file) {
            Ok(scenario) => eprintln!("ok     {} ({})", file.display(), scenario.config.name),
            Err(e) => {
                eprintln!("error  {}", e.message);
                worst = worst.max(e.code);
            }
        }
    }

    if worst == EXIT_SUCCESS {
        eprintln!("{} scenario(s) valid", files.len());
        Ok(())
    } else {
        Err(CliError::new(worst, ""))
    }
}

#[derive(serde::Serialize)]
struct ListEntry {
    name: String,
    path: String,
    call: String,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip: Option<String>,
}

pub fn cmd_list(paths: Vec<PathBuf>, json: bool) -> Result<(), CliError> {
    let files = discover(&paths)?;
    let scenarios = files.iter().map(|f| load(f)).collect::<Result<Vec<_>, _>>()?;

    if json {
        let entries: Vec<ListEntry> = scenarios
            .iter()
            .map(|s| ListEntry {
                name: s.config.name.clone(),
                path: s.path.display().to_string(),
                call: s.config.reference.call.clone(),
                mode: s.config.mode.to_string(),
                skip: s.config.skip.clone(),
            })
            .collect();
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::new(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;
        println!("{out}");
    } else {
        for s in &scenarios {
            let skip = s.config.skip.as_deref().map(|r| format!("  [skip: {r}]")).unwrap_or_default();
            println!("{:<28} {:<12} {}{skip}", s.config.name, s.config.reference.call, s.path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
name = "View scopes"
workbook = "ibor"
sheet = "View scopes"
range = "D16:D26"
key = "scope"

[[fields]]
name = "scope"
column = 0
path = "scope"

[reference]
call = "scopes"
"#;

    #[test]
    fn discover_directories_recursively() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.scenario.toml"), MINIMAL).unwrap();
        fs::write(dir.path().join("nested/a.scenario.toml"), MINIMAL).unwrap();
        fs::write(dir.path().join("notes.toml"), "").unwrap();

        let found = discover(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.to_string_lossy().ends_with(SCENARIO_SUFFIX)));
    }

    #[test]
    fn discover_reports_missing_and_empty() {
        let dir = tempdir().unwrap();
        let err = discover(&[dir.path().join("nope")]).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);

        let err = discover(&[dir.path().to_path_buf()]).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        assert!(err.hint.is_some());
    }

    #[test]
    fn load_rejects_unknown_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.scenario.toml");
        fs::write(&path, MINIMAL.replace("call = \"scopes\"", "call = \"valuation\"")).unwrap();
        let err = load(&path).unwrap_err();
        assert_eq!(err.code, EXIT_CONFIG_INVALID);
        assert!(err.message.contains("unknown API call 'valuation'"), "{}", err.message);
    }

    #[test]
    fn skipped_scenario_may_name_unavailable_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.scenario.toml");
        let text = MINIMAL
            .replace("call = \"scopes\"", "call = \"reconciliation\"")
            .replace("name = \"View scopes\"", "name = \"Perform a reconciliation\"\nskip = \"not fully implemented\"");
        fs::write(&path, text).unwrap();
        let scenario = load(&path).unwrap();
        assert_eq!(scenario.call, None);
        assert!(scenario.config.is_skipped());
    }

    #[test]
    fn file_label_drops_suffix() {
        assert_eq!(file_label(Path::new("a/b/unknown_call.scenario.toml")), "unknown_call");
        assert_eq!(file_label(Path::new("notes.toml")), "notes.toml");
    }

    #[test]
    fn load_resolves_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.scenario.toml");
        fs::write(&path, MINIMAL).unwrap();
        let scenario = load(&path).unwrap();
        assert_eq!(scenario.call, Some(RecordType::Scopes));
        assert_eq!(scenario.base_dir(), dir.path());
    }
}
