//! `gridcheck run`: execute scenarios and report.
//!
//! Scenario flow: open workbook → read query parameters from the sheet →
//! read and normalize the observed range (must be non-empty) → fetch the
//! reference records → normalize → reconcile.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gridcheck_api::{
    CredentialSource, DefaultCredentials, FixtureApi, HttpApi, QueryParams, ReferenceApi, SecretsFilePath,
};
use gridcheck_io::{RangeAddress, SheetRef};
use gridcheck_recon::config::ParamSource;
use gridcheck_recon::{normalize_date, normalize_json, normalize_rows, reconcile_with, ReconError, ReconReport, Value};
use serde::Serialize;

use crate::exit_codes::{exit_code_name, EXIT_CONFIG_INVALID, EXIT_MISMATCH, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};
use crate::scenario::{self, Scenario};
use crate::CliError;

// ── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub path: String,
    pub outcome: Outcome,
    pub exit_code: u8,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Query parameters sent with the reference call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReconReport>,
}

impl ScenarioResult {
    fn new(name: String, path: &Path, outcome: Outcome, exit_code: u8) -> Self {
        Self {
            name,
            path: path.display().to_string(),
            outcome,
            exit_code,
            status: exit_code_name(exit_code),
            skip_reason: None,
            error: None,
            params: None,
            report: None,
        }
    }

    fn failed(name: String, path: &Path, err: CliError) -> Self {
        let mut result = Self::new(name, path, Outcome::Failed, err.code);
        result.error = Some(err.message);
        result
    }
}

#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub scenarios: Vec<ScenarioResult>,
}

impl RunReport {
    fn new(scenarios: Vec<ScenarioResult>) -> Self {
        let mut summary = RunSummary { total: scenarios.len(), ..Default::default() };
        for s in &scenarios {
            match s.outcome {
                Outcome::Passed => summary.passed += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }
        Self {
            meta: RunMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
            scenarios,
        }
    }

    /// Highest exit code among the scenarios.
    pub fn exit_code(&self) -> u8 {
        self.scenarios.iter().map(|s| s.exit_code).max().unwrap_or(EXIT_SUCCESS)
    }
}

// ── Runner ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only run the scenario with this name.
    pub name: Option<String>,
    /// Recorded API responses, overriding every scenario's `reference.fixtures`.
    pub fixtures: Option<PathBuf>,
    /// Secrets file, overriding the default credential lookup.
    pub secrets: Option<PathBuf>,
}

pub struct Runner {
    options: RunOptions,
    /// Built on first use; credentials are read once per run.
    http: Option<Result<HttpApi, String>>,
}

fn runtime(msg: impl std::fmt::Display) -> CliError {
    CliError::new(EXIT_RUNTIME, msg.to_string())
}

impl Runner {
    pub fn new(options: RunOptions) -> Self {
        Self { options, http: None }
    }

    pub fn run_all(&mut self, files: &[PathBuf]) -> Result<RunReport, CliError> {
        let mut results = Vec::new();

        for file in files {
            let scenario = match scenario::load(file) {
                Ok(s) => s,
                Err(e) => {
                    if self.options.name.is_none() {
                        results.push(ScenarioResult::failed(scenario::file_label(file), file, e));
                    } else {
                        log::warn!("{}", e.message);
                    }
                    continue;
                }
            };
            if let Some(ref wanted) = self.options.name {
                if &scenario.config.name != wanted {
                    continue;
                }
            }
            results.push(self.run_scenario(&scenario));
        }

        if let (Some(name), true) = (&self.options.name, results.is_empty()) {
            return Err(CliError::new(EXIT_USAGE, format!("no scenario named '{name}'"))
                .with_hint("run `gridcheck list <paths>` to see scenario names"));
        }
        Ok(RunReport::new(results))
    }

    pub fn run_scenario(&mut self, scenario: &Scenario) -> ScenarioResult {
        let name = scenario.config.name.clone();

        if let Some(ref reason) = scenario.config.skip {
            log::info!("{name}: skipped ({reason})");
            let mut result = ScenarioResult::new(name, &scenario.path, Outcome::Skipped, EXIT_SUCCESS);
            result.skip_reason = Some(reason.clone());
            return result;
        }

        match self.execute(scenario) {
            Ok((params, report)) => {
                let mut result = if report.is_match() {
                    ScenarioResult::new(name, &scenario.path, Outcome::Passed, EXIT_SUCCESS)
                } else {
                    let mut failed = ScenarioResult::new(name, &scenario.path, Outcome::Failed, EXIT_MISMATCH);
                    failed.error = report.clone().into_result().err().map(|e| e.to_string());
                    failed
                };
                result.params = Some(params.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect());
                result.report = Some(report);
                result
            }
            Err(e) => ScenarioResult::failed(name, &scenario.path, e),
        }
    }

    fn execute(&mut self, scenario: &Scenario) -> Result<(QueryParams, ReconReport), CliError> {
        let config = &scenario.config;
        let base_dir = scenario.base_dir();

        let workbook = gridcheck_io::open_workbook(base_dir, &config.workbook).map_err(runtime)?;
        let sheet = workbook.sheet(&config.sheet).map_err(runtime)?;

        let params = read_params(&sheet, scenario)?;

        let range: RangeAddress = config
            .range
            .to_string()
            .parse()
            .map_err(|e| CliError::new(EXIT_CONFIG_INVALID, format!("{}: range: {e}", config.name)))?;
        let grid = sheet.read_range(&range);
        let (headers, body) = match (config.header, grid.split_first()) {
            (true, Some((headers, body))) => (Some(headers.as_slice()), body),
            _ => (None, &grid[..]),
        };

        let extractors = config.sheet_extractors(headers).map_err(|e| {
            runtime(format!("{e} (range {range} of sheet '{}' in book '{}')", sheet.name(), workbook.name()))
        })?;
        let observed = normalize_rows(body, &extractors).map_err(runtime)?;
        if observed.is_empty() {
            let err = ReconError::RangeEmpty {
                workbook: workbook.name().to_string(),
                sheet: sheet.name().to_string(),
                range: range.to_string(),
            };
            return Err(CliError::new(EXIT_MISMATCH, err.to_string()));
        }
        log::debug!("{}: {} observed records from {}", config.name, observed.len(), range);

        let records = self.fetch(scenario, &params)?;
        let reference = normalize_json(&records, &config.reference_extractors().map_err(runtime)?).map_err(runtime)?;

        let report = reconcile_with(&observed, &reference, &config.key, config.mode, &config.options());
        Ok((params, report))
    }

    fn fetch(&mut self, scenario: &Scenario, params: &QueryParams) -> Result<Vec<serde_json::Value>, CliError> {
        let fixtures = self.options.fixtures.clone().or_else(|| {
            scenario
                .config
                .reference
                .fixtures
                .as_deref()
                .map(|dir| gridcheck_io::resolve_path(scenario.base_dir(), dir))
        });

        let call = scenario.call.ok_or_else(|| {
            CliError::new(
                EXIT_CONFIG_INVALID,
                format!("{}: unknown API call '{}'", scenario.config.name, scenario.config.reference.call),
            )
        })?;
        let result = match fixtures {
            Some(dir) => FixtureApi::new(dir).fetch(call, params),
            None => self.http()?.fetch(call, params),
        };
        result.map_err(|e| runtime(format!("{} ({call}): {e}", scenario.config.name)))
    }

    fn http(&mut self) -> Result<&HttpApi, CliError> {
        let secrets = self.options.secrets.clone();
        let cached = self.http.get_or_insert_with(|| {
            let loaded = match secrets {
                Some(path) => SecretsFilePath(path).load(),
                None => DefaultCredentials.load(),
            };
            loaded.and_then(HttpApi::new).map_err(|e| e.to_string())
        });
        cached.as_ref().map_err(|msg| {
            runtime(msg.clone()).with_hint(format!(
                "set {} or pass --secrets, or run against recorded responses with --fixtures",
                gridcheck_api::SECRETS_ENV
            ))
        })
    }
}

/// Scalar cell value as query parameter text.
fn param_text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn read_params(sheet: &SheetRef<'_>, scenario: &Scenario) -> Result<QueryParams, CliError> {
    let book = sheet.workbook().name();
    let mut params = QueryParams::new();

    for (name, source) in &scenario.config.reference.params {
        match source {
            ParamSource::Literal(s) => {
                params.set(name.as_str(), s.as_str());
            }
            ParamSource::Flag(b) => {
                params.set(name.as_str(), *b);
            }
            ParamSource::Cell { cell } => {
                let value = sheet.read(cell).map_err(runtime)?.into_scalar();
                if value.is_blank() {
                    return Err(runtime(format!(
                        "parameter '{name}': {cell} of sheet '{}' in book '{book}' is empty",
                        sheet.name()
                    )));
                }
                params.set(name.as_str(), param_text(&value));
            }
            ParamSource::Date { date } => {
                let value = sheet.read(date).map_err(runtime)?.into_scalar();
                let parsed = normalize_date(&value).map_err(|e| {
                    runtime(format!("parameter '{name}': {date} of sheet '{}': {e}", sheet.name()))
                })?;
                if parsed.is_none() {
                    log::debug!("parameter '{name}': {date} is blank, omitted");
                }
                params.set_opt(name.as_str(), parsed);
            }
        }
    }
    Ok(params)
}

// ── Command ─────────────────────────────────────────────────────────

fn render_human(report: &RunReport) {
    for s in &report.scenarios {
        match s.outcome {
            Outcome::Passed => {
                let detail = s.report.as_ref().map(|r| r.headline()).unwrap_or_else(|| s.name.clone());
                eprintln!("PASS  {detail}");
            }
            Outcome::Skipped => {
                eprintln!("SKIP  {}: {}", s.name, s.skip_reason.as_deref().unwrap_or(""));
            }
            Outcome::Failed => {
                eprintln!("FAIL  {}: {}", s.name, s.error.as_deref().unwrap_or("failed"));
            }
        }
    }
    let sum = &report.summary;
    eprintln!(
        "{} scenario(s): {} passed, {} failed, {} skipped",
        sum.total, sum.passed, sum.failed, sum.skipped
    );
}

pub fn cmd_run(
    paths: Vec<PathBuf>,
    options: RunOptions,
    json: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let files = scenario::discover(&paths)?;
    let report = Runner::new(options).run_all(&files)?;

    if json || output.is_some() {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| runtime(format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = output {
            std::fs::write(path, &json_str).map_err(|e| runtime(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if json {
            println!("{json_str}");
        }
    }

    render_human(&report);

    match report.exit_code() {
        EXIT_SUCCESS => Ok(()),
        // Already reported per scenario
        code => Err(CliError::new(code, "")),
    }
}
