use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use matcher::{LineError, TemplateRegistry};

use crate::config::{TemplateEntry, build_registry};

const CASE_SUFFIX: &str = ".test.txt";

/// Expected result for one input line.
#[derive(Debug, Default, Deserialize)]
pub struct ExpectedLine {
    /// Name of the template the line must match.
    #[serde(default)]
    pub template: Option<String>,

    /// Exact argument texts, checked only when present.
    #[serde(default)]
    pub args: Option<Vec<String>>,

    /// The line is well-formed but no template matches it.
    #[serde(default)]
    pub no_match: bool,

    /// The line must be rejected before matching (empty or unterminated quote).
    #[serde(default)]
    pub error: bool,
}

#[derive(Debug, Deserialize)]
pub struct CaseConfig {
    /// Human-readable case description.
    #[serde(default)]
    pub description: Option<String>,

    /// Templates, in priority order.
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateEntry>,

    /// If true, at least one template must fail to compile.
    #[serde(default)]
    pub expect_grammar_error: bool,

    /// One entry per non-empty input line.
    #[serde(default)]
    pub expect: Vec<ExpectedLine>,
}

/// Split a case file into its TOML frontmatter and the input lines after it.
fn parse_case_file(content: &str) -> Result<(CaseConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let body = &after_open[close_pos + 4..];
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);

    let config: CaseConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, body))
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

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(CASE_SUFFIX))
                .unwrap_or("?")
        })
    }
}

pub fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, body) = match parse_case_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let compiled = build_registry(&config.templates);
    let outcome = match (config.expect_grammar_error, compiled) {
        (true, Err(_)) => TestOutcome::Pass,
        (true, Ok(_)) => TestOutcome::Fail("expected a grammar error, but every template compiled".into()),
        (false, Err(errors)) => {
            let msgs: Vec<String> = errors.iter().map(|(_, e)| e.to_string()).collect();
            TestOutcome::Fail(format!("unexpected grammar error: {}", msgs.join("; ")))
        }
        (false, Ok(registry)) => match check_lines(&registry, body, &config.expect) {
            None => TestOutcome::Pass,
            Some(reason) => TestOutcome::Fail(reason),
        },
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Match every non-empty body line and compare with its expectation.
/// Returns `Some(reason)` on the first mismatch.
fn check_lines(registry: &TemplateRegistry, body: &str, expected: &[ExpectedLine]) -> Option<String> {
    let lines: Vec<(usize, &str)> = body
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .collect();

    if lines.len() != expected.len() {
        return Some(format!(
            "{} input line(s) but {} expectation(s)",
            lines.len(),
            expected.len()
        ));
    }

    for ((number, line), expect) in lines.into_iter().zip(expected) {
        let result = registry.parse_line(line);
        if let Some(reason) = compare(&result, expect) {
            return Some(format!("line {} `{}`: {}", number + 1, line, reason));
        }
    }
    None
}

fn compare(
    result: &Result<Option<matcher::LineMatch>, LineError>,
    expect: &ExpectedLine,
) -> Option<String> {
    match result {
        Err(_) if expect.error => None,
        Err(err) => Some(format!("unexpected error: {}", err)),
        Ok(_) if expect.error => Some("expected an error, but the line was accepted".into()),
        Ok(None) if expect.no_match => None,
        Ok(None) => Some(match &expect.template {
            Some(name) => format!("expected template `{}`, but nothing matched", name),
            None => "nothing matched".into(),
        }),
        Ok(Some(found)) if expect.no_match => {
            Some(format!("expected no match, got {}", found))
        }
        Ok(Some(found)) => {
            if let Some(name) = &expect.template {
                if found.template() != name.as_str() {
                    return Some(format!("expected template `{}`, got {}", name, found));
                }
            }
            if let Some(args) = &expect.args {
                if found.arg_strings() != *args {
                    return Some(format!(
                        "argument mismatch\n  expected: {:?}\n  actual:   {:?}",
                        args,
                        found.arg_strings()
                    ));
                }
            }
            None
        }
    }
}

/// Discover case files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_cases(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_cases(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_cases(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(CASE_SUFFIX))
        {
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

/// List available categories for the given case path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", CASE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} cases)", category_label(cat), files.len());
    }
}

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Select the categories to run. Unknown requests are reported and skipped.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut selected = BTreeMap::new();
    for request in requested {
        let req = request.trim_matches('/');
        let nested = format!("{}/", req);
        let before = selected.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&nested) {
                selected.insert(cat.as_str(), files);
            }
        }
        if selected.len() == before {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
    }
    selected
}

/// Run every case file under `path` (or a single file).
/// Returns the exit code: 0 when everything passes, 1 otherwise.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { no_color };

    let groups: Vec<(String, Vec<PathBuf>)> = if path.is_file() {
        vec![(String::new(), vec![path.to_path_buf()])]
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", CASE_SUFFIX, path.display());
            return 1;
        }
        let selected = select_categories(&all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
            .into_iter()
            .map(|(cat, files)| (cat.to_string(), files.clone()))
            .collect()
    };

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &groups {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", palette.bold(category_label(cat)));
        }
        for file in files {
            let result = run_single_test(file);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", palette.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", palette.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", palette.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASE: &str = "---\ndescription = \"assign\"\n\n[[template]]\nname = \"assign\"\nsyntax = \"$ident_=_$value\"\n\n[[expect]]\ntemplate = \"assign\"\nargs = [\"x\", \"5\"]\n\n[[expect]]\nno_match = true\n\n[[expect]]\nerror = true\n---\nx = 5\n== 5\nsay \"oops\n";

    #[test]
    fn splits_frontmatter_from_lines() {
        let (config, body) = parse_case_file(CASE).expect("frontmatter");
        assert_eq!(config.description.as_deref(), Some("assign"));
        assert_eq!(config.templates.len(), 1);
        assert_eq!(config.expect.len(), 3);
        assert_eq!(body, "x = 5\n== 5\nsay \"oops\n");
    }

    #[test]
    fn missing_frontmatter_is_reported() {
        assert!(parse_case_file("x = 5\n").is_err());
        assert!(parse_case_file("---\ndescription = \"x\"\n").is_err());
    }

    #[test]
    fn case_file_passes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("assign.test.txt");
        std::fs::write(&path, CASE).expect("write case");
        let result = run_single_test(&path);
        assert!(matches!(result.outcome, TestOutcome::Pass));
        assert_eq!(result.label(), "assign");
    }

    #[test]
    fn wrong_arguments_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wrong.test.txt");
        std::fs::write(&path, CASE.replace("[\"x\", \"5\"]", "[\"x\", \"6\"]")).expect("write case");
        let result = run_single_test(&path);
        match result.outcome {
            TestOutcome::Fail(reason) => assert!(reason.contains("argument mismatch"), "{}", reason),
            TestOutcome::Pass => panic!("expected failure"),
        }
    }

    #[test]
    fn bundled_cases_pass() {
        let cases = Path::new(env!("CARGO_MANIFEST_DIR")).join("cases");
        assert_eq!(run_tests(&cases, true, &[]), 0);
    }
}
