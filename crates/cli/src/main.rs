use anyhow::Result;
use clap::{Parser, Subcommand};
use popchain::commands::{
    analyze_command, chain_command, constraints_command, encode_command, gadgets_command,
    kb_match_command, kb_search_command, magic_methods_command, parse_command,
    payload_script_command, simulate_command, trampoline_chains_command, trampolines_command,
    SourceArgs,
};
use tracing_subscriber::EnvFilter;

/// PHP object-injection gadget chain finder.
///
/// This CLI is a thin wrapper around `popchain-core`. All analysis lives in the
/// library; commands only load inputs and render results.
#[derive(Parser, Debug)]
#[command(
    name = "popchain",
    version,
    about = "Find PHP object-injection gadget chains",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a repository and summarise classes, sinks and packages.
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        /// Also write the summary JSON to this file.
        #[arg(long)]
        output: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Parse a single PHP file and list its classes and methods.
    Parse {
        /// File to parse.
        #[arg(long)]
        file: String,

        /// Parser strategy: auto, structural or pattern.
        #[arg(long, default_value = "auto")]
        strategy: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List every magic method found.
    MagicMethods {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List methods that call a sink function directly.
    Gadgets {
        #[command(flatten)]
        source: SourceArgs,

        /// Sink function name (e.g. system, eval).
        #[arg(long)]
        sink: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List methods matching the trampoline heuristics.
    Trampolines {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Build ranked single-step chains ending at a sink.
    Chain {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        sink: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Build per-class __wakeup/__toString/__get/__invoke chains.
    TrampolineChains {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Serialize an object with the given properties.
    Encode {
        /// Target class name.
        #[arg(long = "class")]
        class_name: String,

        /// Properties as a JSON object.
        #[arg(long, default_value = "{}")]
        props: String,

        /// How string lengths are counted: chars or bytes. Defaults to the config value.
        #[arg(long)]
        string_lengths: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Emit a PHP script printing the payload raw, URL-encoded and base64-encoded.
    PayloadScript {
        #[arg(long = "class")]
        class_name: String,

        #[arg(long, default_value = "{}")]
        props: String,

        #[arg(long)]
        string_lengths: Option<String>,

        /// Write the script here instead of stdout.
        #[arg(long)]
        output: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Trace the lifecycle calls unserialize() triggers for a payload.
    Simulate {
        #[arg(long = "class")]
        class_name: String,

        #[arg(long, default_value = "{}")]
        props: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Search the known-chain table by framework or gadget name.
    KbSearch {
        keyword: String,

        /// Only entries pinned to exactly this version.
        #[arg(long)]
        version: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Match known chains against the repository's composer packages.
    KbMatch {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check runtime conditions that block or enable chains.
    Constraints {
        #[arg(long)]
        php_version: Option<String>,

        /// Whether class autoloading is available (true/false).
        #[arg(long)]
        autoload: Option<bool>,

        /// php.ini setting as key=value (repeatable).
        #[arg(long)]
        ini: Vec<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze { source, output, json } => {
            analyze_command(&source, output.as_deref(), json)?
        }
        Command::Parse { file, strategy, json } => parse_command(&file, &strategy, json)?,
        Command::MagicMethods { source, json } => magic_methods_command(&source, json)?,
        Command::Gadgets { source, sink, json } => gadgets_command(&source, &sink, json)?,
        Command::Trampolines { source, json } => trampolines_command(&source, json)?,
        Command::Chain { source, sink, json } => chain_command(&source, &sink, json)?,
        Command::TrampolineChains { source, json } => trampoline_chains_command(&source, json)?,
        Command::Encode { class_name, props, string_lengths, json } => {
            encode_command(&class_name, &props, string_lengths.as_deref(), json)?
        }
        Command::PayloadScript { class_name, props, string_lengths, output, json } => {
            payload_script_command(
                &class_name,
                &props,
                string_lengths.as_deref(),
                output.as_deref(),
                json,
            )?
        }
        Command::Simulate { class_name, props, json } => {
            simulate_command(&class_name, &props, json)?
        }
        Command::KbSearch { keyword, version, json } => {
            kb_search_command(&keyword, version.as_deref(), json)?
        }
        Command::KbMatch { source, json } => kb_match_command(&source, json)?,
        Command::Constraints { php_version, autoload, ini, json } => {
            constraints_command(php_version.as_deref(), autoload, &ini, json)?
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays parseable; `RUST_LOG` overrides the `warn` default.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();
}
