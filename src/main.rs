use std::collections::HashSet;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gem_lockgraph::configuration::Configuration;
use gem_lockgraph::format::{self, OutputFormat};
use gem_lockgraph::lockfile;
use gem_lockgraph::report::{Report, ReportOptions};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const EXIT_SUCCESS: i32 = 0;
const EXIT_DIAGNOSTICS: i32 = 1;
const EXIT_ERROR: i32 = 2;

#[derive(Parser)]
#[command(
    name = "gem-lockgraph",
    about = "Dependency graph of a Ruby Bundler Gemfile.lock",
    version = VERSION,
)]
struct Cli {
    /// Log parser decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the Gemfile.lock (default)
    Show(InputArgs),

    /// Print the nested dependency tree of each top-level dependency
    Tree(InputArgs),

    /// Print the flattened parent -> child relationships
    Edges(InputArgs),

    /// Print the gem-lockgraph version
    Version,
}

#[derive(Args)]
struct InputArgs {
    /// Project directory
    #[arg(default_value = ".")]
    dir: String,

    /// Suppress output except warnings
    #[arg(short, long)]
    quiet: bool,

    /// Gem names to leave out of the output
    #[arg(short, long, num_args = 1..)]
    ignore: Vec<String>,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Path to the Gemfile.lock file
    #[arg(short = 'G', long, default_value = "Gemfile.lock")]
    gemfile_lock: String,

    /// Path to the configuration file
    #[arg(short, long, default_value = Configuration::DEFAULT_FILE)]
    config: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Exit with code 1 when lines were skipped or questioned
    #[arg(long)]
    strict: bool,
}

impl Default for InputArgs {
    fn default() -> Self {
        InputArgs {
            dir: ".".to_string(),
            quiet: false,
            ignore: Vec::new(),
            format: OutputFormat::Text,
            gemfile_lock: "Gemfile.lock".to_string(),
            config: Configuration::DEFAULT_FILE.to_string(),
            output: None,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Summary,
    Tree,
    Edges,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Some(Commands::Show(args)) => cmd_render(View::Summary, &args, cli.verbose),
        Some(Commands::Tree(args)) => cmd_render(View::Tree, &args, cli.verbose),
        Some(Commands::Edges(args)) => cmd_render(View::Edges, &args, cli.verbose),
        Some(Commands::Version) => {
            println!("gem-lockgraph {}", VERSION);
            EXIT_SUCCESS
        }
        None => cmd_render(View::Summary, &InputArgs::default(), cli.verbose),
    };

    if code != EXIT_SUCCESS {
        process::exit(code);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn cmd_render(view: View, args: &InputArgs, verbose: bool) -> i32 {
    let dir = Path::new(&args.dir);
    if !dir.is_dir() {
        eprintln!("No such file or directory: {}", dir.display());
        return EXIT_ERROR;
    }

    // Configuration is looked up relative to the project dir
    let config_path = if Path::new(&args.config).is_absolute() {
        PathBuf::from(&args.config)
    } else {
        dir.join(&args.config)
    };
    let config = match Configuration::load_or_default(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_ERROR;
        }
    };

    let lockfile = match lockfile::load(&dir.join(&args.gemfile_lock)) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_ERROR;
        }
    };

    // CLI --ignore takes precedence; otherwise use config file
    let ignore = if !args.ignore.is_empty() {
        args.ignore.iter().cloned().collect::<HashSet<String>>()
    } else {
        config.ignore
    };
    let options = ReportOptions {
        ignore,
        strict: args.strict || config.strict,
    };
    let report = Report::build(&lockfile, &options);
    tracing::debug!(%report, "built report");

    let stdout = io::stdout();
    let is_tty = stdout.is_terminal();
    let mut output_handle: Box<dyn Write> = if let Some(path) = &args.output {
        match std::fs::File::create(path) {
            Ok(f) => Box::new(f),
            Err(e) => {
                eprintln!("Failed to open output file {}: {}", path, e);
                return EXIT_ERROR;
            }
        }
    } else {
        Box::new(stdout.lock())
    };
    let interactive = is_tty && args.output.is_none();

    match (view, args.format) {
        (View::Summary, OutputFormat::Text) => {
            format::print_text(&report, &mut output_handle, verbose, args.quiet, interactive)
        }
        (View::Summary, OutputFormat::Json) => {
            format::print_json(&report, &mut output_handle, interactive)
        }
        (View::Tree, OutputFormat::Text) if !args.quiet => {
            format::print_tree(&report, &mut output_handle, interactive)
        }
        (View::Tree, OutputFormat::Json) => {
            format::print_tree_json(&report, &mut output_handle, interactive)
        }
        (View::Edges, OutputFormat::Text) if !args.quiet => {
            format::print_edges(&report, &mut output_handle, interactive)
        }
        (View::Edges, OutputFormat::Json) => {
            format::print_edges_json(&report, &mut output_handle, interactive)
        }
        (View::Tree | View::Edges, OutputFormat::Text) => {}
    }
    output_handle.flush().ok();

    if report.failed() {
        if !args.quiet && view != View::Summary {
            eprintln!(
                "warning: {} line(s) skipped or questioned",
                report.diagnostics.len()
            );
        }
        return EXIT_DIAGNOSTICS;
    }

    EXIT_SUCCESS
}
