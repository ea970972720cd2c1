mod config;
mod test_runner;

use std::cell::{Cell, RefCell};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use grammar::GrammarError;
use matcher::{FileRegistry, LoaderError, ReloadStatus, TemplateRegistry};

use crate::config::TemplateFile;

const SUBCOMMANDS: &[&str] = &["check", "parse", "test", "watch", "help"];

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "TASKLINE_LOG";

#[derive(Parser)]
#[command(name = "taskline", version, about = "Match lines against syntax templates")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a template file and report grammar errors
    Check(CheckArgs),

    /// Match input lines against a template file
    Parse(ParseArgs),

    /// Run .test.txt case files
    Test(TestArgs),

    /// Re-run `parse` whenever the template file or the input changes
    Watch(WatchArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// TOML file with [[template]] entries
    templates: PathBuf,
}

#[derive(clap::Args)]
struct ParseArgs {
    /// TOML file with [[template]] entries
    templates: PathBuf,

    /// Input file, one line per entry (stdin when omitted)
    input: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.txt file or a directory containing them
    path: PathBuf,

    /// Run only cases in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

#[derive(clap::Args)]
struct WatchArgs {
    /// TOML file with [[template]] entries
    templates: PathBuf,

    /// Input file, one line per entry
    input: PathBuf,

    /// Delay between polls, in milliseconds
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Poll once and exit
    #[arg(long)]
    once: bool,
}

fn main() {
    // `taskline templates.toml input.txt` is shorthand for `taskline parse ...`
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        let pos = pos + 1;
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "parse".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let exit_code = match cli.command {
        Command::Check(check_args) => do_check(&check_args.templates, color_choice),
        Command::Parse(parse_args) => do_parse(parse_args, color_choice),
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                0
            } else {
                test_runner::run_tests(&test_args.path, cli.no_color, &test_args.category)
            }
        }
        Command::Watch(watch_args) => do_watch(watch_args, color_choice),
    };
    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Load and compile a template file, rendering grammar errors as diagnostics.
fn load_registry(path: &Path, color_choice: ColorChoice) -> Option<TemplateRegistry> {
    let file = match TemplateFile::load(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return None;
        }
    };
    match file.build_registry() {
        Ok(registry) => Some(registry),
        Err(errors) => {
            emit_grammar_errors(path, &file, &errors, color_choice);
            None
        }
    }
}

fn emit_grammar_errors(
    path: &Path,
    file: &TemplateFile,
    errors: &[(usize, GrammarError)],
    color_choice: ColorChoice,
) {
    // One codespan file per template, holding its syntax text
    let mut files = SimpleFiles::new();
    let file_ids: Vec<usize> = file
        .templates
        .iter()
        .map(|t| files.add(format!("{}[{}]", path.display(), t.name), t.syntax.clone()))
        .collect();

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for (index, error) in errors {
        let diagnostic = error.to_diagnostic(file_ids[*index]);
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
    }
}

fn do_check(templates: &Path, color_choice: ColorChoice) -> i32 {
    match load_registry(templates, color_choice) {
        Some(registry) => {
            eprintln!(
                "ok: {} template(s) compiled from {}",
                registry.len(),
                templates.display()
            );
            0
        }
        None => 1,
    }
}

fn do_parse(args: ParseArgs, color_choice: ColorChoice) -> i32 {
    let Some(registry) = load_registry(&args.templates, color_choice) else {
        return 1;
    };

    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e)),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map(|_| buf)
                .map_err(|e| format!("cannot read stdin: {}", e))
        }
    };
    let input = match input {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    match render_matches(&registry, &input, &mut io::stdout().lock()) {
        Ok(0) => 0,
        Ok(_) => 1,
        Err(e) => {
            eprintln!("error: cannot write output: {}", e);
            1
        }
    }
}

/// Print one result per non-empty line. Returns the number of malformed lines.
fn render_matches(registry: &TemplateRegistry, input: &str, out: &mut dyn Write) -> io::Result<usize> {
    let mut malformed = 0;
    for (number, line) in input.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        match registry.parse_line(line) {
            Ok(Some(found)) => writeln!(out, "{}", found)?,
            Ok(None) => writeln!(out, "(no match) {}", line)?,
            Err(e) => {
                malformed += 1;
                eprintln!("line {}: {}", number + 1, e);
            }
        }
    }
    Ok(malformed)
}

fn do_watch(args: WatchArgs, color_choice: ColorChoice) -> i32 {
    let registry = Rc::new(RefCell::new(TemplateRegistry::new()));
    let input = Rc::new(RefCell::new(String::new()));
    let dirty = Rc::new(Cell::new(false));

    let mut files = FileRegistry::new();

    let template_loader = {
        let registry = Rc::clone(&registry);
        let dirty = Rc::clone(&dirty);
        move |path: &Path| -> Result<(), LoaderError> {
            let file = TemplateFile::load(path).map_err(LoaderError::Failed)?;
            match file.build_registry() {
                Ok(built) => {
                    *registry.borrow_mut() = built;
                    dirty.set(true);
                    Ok(())
                }
                Err(errors) => {
                    // Keep matching with the previous templates
                    emit_grammar_errors(path, &file, &errors, color_choice);
                    Err(LoaderError::NoDynamic)
                }
            }
        }
    };
    let input_loader = {
        let input = Rc::clone(&input);
        let dirty = Rc::clone(&dirty);
        move |path: &Path| -> Result<(), LoaderError> {
            let text = std::fs::read_to_string(path)
                .map_err(|e| LoaderError::Failed(e.to_string()))?;
            *input.borrow_mut() = text;
            dirty.set(true);
            Ok(())
        }
    };

    let registered = files
        .register(&args.templates, template_loader, false)
        .and_then(|_| files.register(&args.input, input_loader, false));
    if let Err(e) = registered {
        eprintln!("error: {}", e);
        return 1;
    }
    tracing::debug!(files = ?files.paths().collect::<Vec<_>>(), "watching");

    loop {
        match files.poll_once() {
            Ok(ReloadStatus::Ok) => {}
            Ok(status) => tracing::warn!(?status, "poll finished with failures"),
            Err(e) => {
                eprintln!("error: {}", e);
                return 1;
            }
        }

        if dirty.replace(false) {
            let mut stdout = io::stdout().lock();
            let rendered = render_matches(&registry.borrow(), &input.borrow(), &mut stdout)
                .and_then(|_| writeln!(stdout, "--"));
            if let Err(e) = rendered {
                eprintln!("error: cannot write output: {}", e);
                return 1;
            }
        }

        if args.once {
            return 0;
        }
        std::thread::sleep(Duration::from_millis(args.interval_ms));
    }
}
