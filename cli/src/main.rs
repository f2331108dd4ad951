mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use blocks::Program;
use blocks::block::Block;
use blocks::diagnostic::Diagnostic;
use blocks::loader::{Loader, SourceMap};
use blocks::registry::{Store, VariableRegistry};
use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;

const SUBCOMMANDS: &[&str] = &["run", "generate", "test", "help"];

#[derive(Parser)]
#[command(name = "blocks", version, about = "Block program interpreter and Java generator")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// TOML file with [interpreter] and [codegen] settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a block program
    Run(RunArgs),

    /// Generate Java source, one class per workspace
    Generate(GenerateArgs),

    /// Run .test.blocks test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Program JSON file to execute
    file: String,

    /// Run only this workspace (default: all, in order)
    #[arg(short, long)]
    workspace: Option<String>,

    /// Load only, don't execute (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the loaded program
    #[arg(long)]
    ast: bool,

    /// List workspaces and their blocks
    #[arg(long)]
    list_blocks: bool,

    /// Suppress program output (just check for errors)
    #[arg(short, long)]
    quiet: bool,

    /// Print variable values after the run
    #[arg(long)]
    variables: bool,

    /// Maximum depth of nested function and method calls
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum block nesting, counted across calls
    #[arg(long)]
    max_nesting: Option<usize>,
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Program JSON file
    file: String,

    /// Write the source here instead of stdout (e.g. Main.java)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Spaces per indentation level
    #[arg(long)]
    indent: Option<usize>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.blocks file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// Log to stderr so program output on stdout stays clean.
/// `RUST_LOG` overrides the default `warn` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    // `blocks file.json` is shorthand for `blocks run file.json`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        let pos = pos + 1;
        let is_config_value = args[pos - 1] == "--config";
        if !is_config_value && !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "run".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => {
            debug!(path = ?cli.config, ?config, "configuration loaded");
            config
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Command::Run(run_args) => do_run(run_args, config, cli.no_color),
        Command::Generate(generate_args) => do_generate(generate_args, config, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Source file registered for diagnostics, plus its block-id index.
struct Loaded {
    files: SimpleFiles<String, String>,
    source_map: Option<SourceMap>,
    program: Program,
    color: ColorChoice,
}

fn load(file: &str, no_color: bool) -> Loaded {
    let color = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(file.to_string(), source.clone());

    let program = match Loader::new(source.clone(), file_id).load() {
        Ok(program) => {
            debug!(file, workspaces = program.workspaces.len(), "program loaded");
            program
        }
        Err(errors) => {
            let writer = StandardStream::stderr(color);
            let config = term::Config::default();
            for error in &errors {
                let diagnostic = error.to_diagnostic();
                let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            }
            process::exit(1);
        }
    };

    Loaded {
        source_map: SourceMap::new(&source).ok(),
        files,
        program,
        color,
    }
}

fn do_run(args: RunArgs, config: Config, no_color: bool) {
    let loaded = load(&args.file, no_color);

    if args.check {
        eprintln!("ok: {} loaded successfully", args.file);
        return;
    }

    if args.ast {
        println!("{:#?}", loaded.program);
        return;
    }

    if args.list_blocks {
        fn print_blocks(blocks: &[Block], indent: usize) {
            for block in blocks {
                let pad = "  ".repeat(indent);
                println!("{}{} ({})", pad, block.kind_name(), block.id);
                for (label, children) in block.child_sequences() {
                    if !children.is_empty() {
                        println!("{}  {}:", pad, label);
                        print_blocks(children, indent + 2);
                    }
                }
            }
        }
        for workspace in &loaded.program.workspaces {
            println!("workspace {}", workspace.name);
            print_blocks(&workspace.blocks, 1);
        }
        for function in &loaded.program.functions {
            println!("function {}({})", function.name, function.parameters.join(", "));
            print_blocks(&function.body, 1);
        }
        return;
    }

    let mut options = config.interpreter;
    if let Some(max_depth) = args.max_depth {
        options.max_depth = max_depth;
    }
    if let Some(max_nesting) = args.max_nesting {
        options.max_nesting = max_nesting;
    }

    let file_id = loaded.program.source_id;
    let mut store = Store::from(loaded.program.clone());
    let result = match &args.workspace {
        Some(name) => interpreter::execute_workspace(&mut store, name, &options),
        None => Ok(interpreter::execute_program(&mut store, &options)),
    };

    let execution = match result {
        Ok(execution) => execution,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if !args.quiet {
        for line in &execution.output {
            println!("{}", line);
        }
    }
    if args.variables {
        for variable in store.variables.all() {
            println!("{} = {}", variable.name, variable.value);
        }
    }

    emit_diagnostics(&loaded, file_id, &execution.diagnostics);
    if execution.diagnostics.iter().any(|d| !d.is_warning()) {
        process::exit(1);
    }
}

fn do_generate(args: GenerateArgs, config: Config, no_color: bool) {
    let loaded = load(&args.file, no_color);

    let mut options = config.codegen;
    if let Some(indent) = args.indent {
        options.indent_width = indent;
    }

    let file_id = loaded.program.source_id;
    let mut store = Store::from(loaded.program.clone());
    let generated = codegen::generate_program(&mut store, &options);
    emit_diagnostics(&loaded, file_id, &generated.diagnostics);

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &generated.source) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                process::exit(1);
            }
        }
        None => print!("{}", generated.source),
    }
}

fn emit_diagnostics(loaded: &Loaded, file_id: usize, diagnostics: &[Diagnostic]) {
    let writer = StandardStream::stderr(loaded.color);
    let config = term::Config::default();
    for diagnostic in diagnostics {
        let span = match (&loaded.source_map, &diagnostic.block) {
            (Some(map), Some(block)) => map.span_of(block),
            _ => None,
        };
        let report = diagnostic.to_report(file_id, span);
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &loaded.files, &report);
    }
}
