use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use blocks::diagnostic::Diagnostic;
use blocks::loader::Loader;
use blocks::registry::Store;
use codegen::CodegenOptions;
use interpreter::{Execution, InterpreterOptions, RunError};
use serde::Deserialize;

const TEST_EXTENSION: &str = ".test.blocks";

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning must be attributed to this block id.
    #[serde(default)]
    pub block: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Run only this workspace. Defaults to every workspace in order.
    #[serde(default)]
    pub workspace: Option<String>,

    /// Interpreter depth limit for this test.
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Expected printed lines (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Substrings the generated Java source must contain.
    #[serde(default)]
    pub expect_java: Vec<String>,

    /// Expected run failure: an unknown workspace or an error-severity
    /// diagnostic whose message contains this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If true, the test expects loading the program to fail.
    #[serde(default)]
    pub expect_load_error: bool,

    /// Expected warnings. If present (even empty), warning count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

/// Parse a `.test.blocks` file into its TOML config and program JSON.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    // 1. Read file
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    // 2. Parse frontmatter
    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };

    let description = config.description.clone();

    // 3. Load the program
    let load_result = Loader::new(source.to_string(), 0).load();

    // 4. Handle expect_load_error
    if config.expect_load_error {
        return match load_result {
            Err(_) => TestResult {
                path: path.to_path_buf(),
                description,
                outcome: TestOutcome::Pass,
            },
            Ok(_) => fail(description, "expected load error, but loading succeeded".into()),
        };
    }

    let program = match load_result {
        Ok(p) => p,
        Err(errs) => {
            let msgs: Vec<String> = errs.iter().map(|e| e.message.clone()).collect();
            return fail(
                description,
                format!("unexpected load error: {}", msgs.join("; ")),
            );
        }
    };

    // 5. Execute
    let mut store = Store::from(program.clone());
    let mut options = InterpreterOptions::default();
    if let Some(max_depth) = config.max_depth {
        options.max_depth = max_depth;
    }
    let exec_result = match &config.workspace {
        Some(name) => interpreter::execute_workspace(&mut store, name, &options),
        None => Ok(interpreter::execute_program(&mut store, &options)),
    };

    // 6. Check error/output expectations
    if let Some(reason) = check_execution(&config, &exec_result) {
        return fail(description, reason);
    }

    // 7. Check warning expectations
    if let (Some(expected_warnings), Ok(execution)) = (&config.expect_warnings, &exec_result) {
        if let Some(reason) = check_warnings(&execution.diagnostics, expected_warnings) {
            return fail(description, reason);
        }
    }

    // 8. Check generated Java
    if !config.expect_java.is_empty() {
        let generated =
            codegen::generate_program(&mut Store::from(program), &CodegenOptions::default());
        for expected in &config.expect_java {
            if !generated.source.contains(expected.as_str()) {
                return fail(
                    description,
                    format!(
                        "generated Java does not contain \"{}\"\n  generated:\n{}",
                        expected,
                        indent_lines(&generated.source)
                    ),
                );
            }
        }
    }

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Pass,
    }
}

/// An unknown workspace, or the first error-severity diagnostic of a run.
fn run_error(result: &Result<Execution, RunError>) -> Option<String> {
    match result {
        Err(e) => Some(e.to_string()),
        Ok(execution) => execution
            .diagnostics
            .iter()
            .find(|d| !d.is_warning())
            .map(|d| d.to_string()),
    }
}

/// Returns `Some(reason)` when the run's error or output does not match.
fn check_execution(config: &TestConfig, result: &Result<Execution, RunError>) -> Option<String> {
    match (&config.expect_error, run_error(result)) {
        (Some(expected_err), Some(err_str)) => {
            return if err_str.contains(expected_err.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected_err, err_str
                ))
            };
        }
        (Some(expected_err), None) => {
            return Some(format!(
                "expected error containing \"{}\", but the run succeeded",
                expected_err
            ));
        }
        (None, Some(err_str)) => return Some(format!("unexpected run error: {}", err_str)),
        (None, None) => {}
    }

    let (Some(expected_output), Ok(execution)) = (&config.expect_output, result) else {
        return None;
    };
    let actual = execution.output.join("\n");
    let actual_trimmed = actual.trim();
    let expected_trimmed = expected_output.trim();
    if actual_trimmed == expected_trimmed {
        None
    } else {
        Some(format!(
            "output mismatch\n  expected: {}\n  actual:   {}",
            expected_trimmed.replace('\n', "\\n"),
            actual_trimmed.replace('\n', "\\n")
        ))
    }
}

fn indent_lines(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(diagnostics: &[Diagnostic], expected: &[ExpectedWarning]) -> Option<String> {
    let actual_warnings: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_warning()).collect();

    if actual_warnings.len() != expected.len() {
        let actual_msgs: Vec<String> = actual_warnings
            .iter()
            .map(|w| format!("  - {}", w))
            .collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual_warnings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual_warnings.iter().zip(expected.iter()).enumerate() {
        let msg = actual.problem.to_string();

        if !msg.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }

        if let Some(expected_block) = &expected.block {
            let actual_block = actual.block.as_ref().map(|b| b.as_str());
            if actual_block != Some(expected_block.as_str()) {
                return Some(format!(
                    "warning[{}]: expected on block {}, but it is on {}",
                    i,
                    expected_block,
                    actual_block.unwrap_or("no block")
                ));
            }
        }
    }

    None
}

/// Test files grouped by the folder they sit in, relative to `root`.
/// Files directly in `root` get the empty category.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_test = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(TEST_EXTENSION));
        if is_test {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_EXTENSION, path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

struct Style {
    color: bool,
}

impl Style {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }
}

/// Pick the categories to run. Requesting `a` also selects `a/b`.
fn select_categories<'c>(
    all: &'c BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'c str, &'c [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut selected = BTreeMap::new();
    for request in requested {
        let request = request.trim_matches('/');
        let nested = format!("{}/", request);
        let mut found = false;
        for (category, files) in all {
            if category == request || category.starts_with(&nested) {
                selected.insert(category.as_str(), files.as_slice());
                found = true;
            }
        }
        if !found {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                request,
                available.join(", ")
            );
        }
    }
    selected
}

/// Run all `.test.blocks` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { color: !no_color };
    let single_file = path.is_file();

    let single = [path.to_path_buf()];
    let all_categories = if single_file {
        BTreeMap::new()
    } else {
        discover_categorized(path)
    };
    let selected: BTreeMap<&str, &[PathBuf]> = if single_file {
        BTreeMap::from([("", &single[..])])
    } else if all_categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_EXTENSION, path.display());
        return 1;
    } else {
        select_categories(&all_categories, categories)
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if !single_file {
            eprintln!();
            eprintln!("{}", style.bold(category_label(category)));
        }

        for file in files.iter() {
            let result = run_single_test(file);
            let label = result
                .description
                .clone()
                .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
                .unwrap_or_else(|| "?".to_string());

            if matches!(result.outcome, TestOutcome::Pass) {
                passed += 1;
                eprintln!("  {}  {}", style.pass(), label);
            } else {
                eprintln!("  {}  {}", style.fail(), label);
                failures.push(result);
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
