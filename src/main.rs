//! Purpose: `sheetmap` CLI entry point.
//! Role: Binary crate root; parses args, opens the table file, runs one mapping command.
//! Invariants: Command results are JSON on stdout (pretty on a terminal, compact otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All table access goes through `api::SheetMap`.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod table_paths;

use sheetmap::api::{
    Decode, Describe, Encode, Error, ErrorKind, FileTable, Json, Opaque, PlainText, SheetMap,
    to_exit_code,
};
use table_paths::default_table_path;

type CliMap = SheetMap<Value, Value, FileTable, CliCodec>;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `sheetmap --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();

    let file = cli.file.unwrap_or_else(default_table_path);
    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, file, cli.codec)
        .map_err(|err| (err, color_mode))
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "sheetmap",
    version,
    about = "Use a two-column table file as a key/value map",
    long_about = None,
    before_help = r#"Keys live in column 1 and values in column 2, one row per key.
Arguments are parsed as JSON when they are valid JSON, otherwise taken as text."#,
    after_help = r#"EXAMPLES
  $ sheetmap set greeting hello
  $ sheetmap set '[1, 2]' '{"pair": true}'
  $ sheetmap get greeting
  $ sheetmap items
  $ sheetmap --file ./team.json --codec json keys

NOTES
  - Default table file: ~/.sheetmap/table.json (override with --file or SHEETMAP_FILE)
  - Set RUST_LOG=debug to trace every table operation on stderr"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        env = "SHEETMAP_FILE",
        help = "Table file (default: ~/.sheetmap/table.json)",
        value_hint = ValueHint::FilePath
    )]
    file: Option<PathBuf>,
    #[arg(
        long,
        default_value = "opaque",
        help = "Cell encoding: opaque (base64 JSON), json, or plain (text only)"
    )]
    codec: CodecChoice,
    #[arg(long, default_value = "auto", help = "Colorize error labels")]
    color: ColorMode,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print the value stored under a key")]
    Get {
        key: String,
        #[arg(long, help = "Value to print when the key is missing")]
        default: Option<String>,
    },
    #[command(about = "Insert a key or overwrite its value")]
    Set { key: String, value: String },
    #[command(about = "Delete a key")]
    Del { key: String },
    #[command(about = "Report whether a key is present")]
    Has { key: String },
    #[command(about = "Count entries")]
    Len,
    #[command(about = "List keys in row order")]
    Keys {
        #[arg(long, help = "List from the last row to the first")]
        reverse: bool,
    },
    #[command(about = "List values in row order")]
    Values,
    #[command(about = "List [key, value] pairs in row order")]
    Items,
    #[command(about = "Remove and print the last entry")]
    Pop,
    #[command(about = "Remove every entry")]
    Clear,
    #[command(about = "Print the value for a key, storing the given one if missing")]
    Setdefault { key: String, value: String },
    #[command(about = "Set every member of a JSON object")]
    Update {
        #[arg(help = "JSON object, e.g. '{\"a\": 1, \"b\": 2}'")]
        entries: String,
    },
    #[command(about = "Print the whole map as text")]
    Dump,
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print version information")]
    Version,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CodecChoice {
    Opaque,
    Json,
    Plain,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Codec selected at runtime; every CLI key and value is a JSON value.
#[derive(Copy, Clone, Debug)]
struct CliCodec(CodecChoice);

impl Encode<Value> for CliCodec {
    fn encode(&self, value: &Value) -> sheetmap::api::Result<String> {
        match self.0 {
            CodecChoice::Opaque => Opaque.encode(value),
            CodecChoice::Json => Json.encode(value),
            CodecChoice::Plain => match value {
                Value::String(text) => Ok(text.clone()),
                _ => Err(Error::new(ErrorKind::Usage)
                    .with_message("plain codec stores text only")
                    .with_hint("Quote the argument as text, or use --codec opaque or --codec json.")),
            },
        }
    }
}

impl Decode<Value> for CliCodec {
    fn decode(&self, cell: &str) -> sheetmap::api::Result<Value> {
        match self.0 {
            CodecChoice::Opaque => Opaque.decode(cell),
            CodecChoice::Json => Json.decode(cell),
            CodecChoice::Plain => Ok(Value::String(cell.to_string())),
        }
    }
}

impl Describe for CliCodec {
    fn describe(&self) -> &'static str {
        match self.0 {
            CodecChoice::Opaque => Opaque.describe(),
            CodecChoice::Json => Json.describe(),
            CodecChoice::Plain => PlainText.describe(),
        }
    }
}

fn parse_arg(raw: &str, codec: CodecChoice) -> Value {
    if matches!(codec, CodecChoice::Plain) {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn emit_json(value: Value) {
    let pretty = io::stdout().is_terminal();
    let json = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::EmptyCollection => "table is empty".to_string(),
        ErrorKind::Table => "table operation failed".to_string(),
        ErrorKind::Codec => "cell could not be decoded".to_string(),
        ErrorKind::Busy => "table is busy".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Corrupt => "corrupt table file".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::AlreadyExists => "table already exists".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(row) = err.row() {
        inner.insert("row".to_string(), json!(row));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(row) = err.row() {
        lines.push(format!(
            "{} {row}",
            colorize_label("row:", use_color, AnsiColor::Yellow)
        ));
    }
    for cause in error_causes(err) {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}
