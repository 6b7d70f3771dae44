//! calcsql CLI - preview, validate and substitute calculation SQL
//!
//! Usage:
//!   calcsql formula <definition.json>
//!   calcsql query <definition.json> [--dialect <dialect>]
//!   calcsql validate <query.sql> --level <deal|tranche> --result-column <name>
//!   calcsql substitute <query.sql> --cycle <YYYYMM> --deal <n[:A,B]>...
//!
//! Examples:
//!   calcsql query defs/total_balance.toml --dialect tsql
//!   calcsql validate sql/balance_change.sql --level tranche --result-column bal_change
//!   calcsql substitute sql/balance_change.sql --cycle 202404 --deal 101 --deal 102:A,B

use calcsql::compile::Compiler;
use calcsql::config::Settings;
use calcsql::model::{CalculationDefinition, GroupLevel};
use calcsql::placeholder::{vocabulary, CycleCode, DealSelection, ExecutionParams};
use calcsql::sql::Dialect;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV_VAR: &str = "CALCSQL_LOG";

#[derive(Parser)]
#[command(name = "calcsql")]
#[command(about = "calcsql - compile and validate reporting calculations")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $CALCSQL_CONFIG or ./calcsql.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQL dialect, overriding the config file
    #[arg(short, long, global = true)]
    dialect: Option<DialectArg>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    output: OutputFormat,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the short formula for a definition
    Formula {
        /// Definition file (.json or .toml)
        file: PathBuf,
    },

    /// Print the preview SQL for a definition
    Query {
        /// Definition file (.json or .toml)
        file: PathBuf,
    },

    /// Formula, SQL, advice and validation for a definition
    Preview {
        /// Definition file (.json or .toml)
        file: PathBuf,
    },

    /// Validate System SQL
    Validate {
        /// SQL file, or - for stdin
        file: PathBuf,

        /// Group level the SQL reports at
        #[arg(short, long, default_value = "deal")]
        level: LevelArg,

        /// Declared result column
        #[arg(short, long)]
        result_column: String,

        /// Also parse the SQL with sqlparser
        #[arg(long)]
        strict: bool,
    },

    /// Print compatibility advice for a definition
    Advise {
        /// Definition file (.json or .toml)
        file: PathBuf,
    },

    /// Check a definition against the schema catalog
    Check {
        /// Definition file (.json or .toml)
        file: PathBuf,
    },

    /// Replace placeholders with runtime values
    Substitute {
        /// SQL file, or - for stdin
        file: PathBuf,

        /// Anchor cycle code (YYYYMM)
        #[arg(long)]
        cycle: CycleCode,

        /// Selected deal, optionally with tranches: 101 or 101:A,B
        #[arg(long = "deal", value_parser = parse_deal)]
        deals: Vec<DealSelection>,
    },

    /// List recognized placeholders
    Vocabulary,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Postgres,
    Duckdb,
    Tsql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Tsql => Dialect::TSql,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Deal,
    Tranche,
}

impl From<LevelArg> for GroupLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Deal => GroupLevel::Deal,
            LevelArg::Tranche => GroupLevel::Tranche,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dialect) = cli.dialect {
        settings.preview.dialect = dialect.into();
    }
    if let Commands::Validate { strict: true, .. } = cli.command {
        settings.validator.strict_parse = true;
    }

    let compiler = match Compiler::from_settings(&settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let output = cli.output;
    match cli.command {
        Commands::Formula { file } => with_definition(&file, |def| {
            emit_text(output, &compiler.generate_formula(def));
            ExitCode::SUCCESS
        }),
        Commands::Query { file } => with_definition(&file, |def| {
            emit_text(output, &compiler.generate_full_query(def));
            ExitCode::SUCCESS
        }),
        Commands::Preview { file } => with_definition(&file, |def| {
            let preview = compiler.preview(def);
            match output {
                OutputFormat::Json => emit_json(&preview),
                OutputFormat::Text => {
                    println!("Formula: {}", preview.formula);
                    if let Some(advice) = &preview.advice {
                        println!("Note: {}", advice);
                    }
                    println!();
                    println!("{}", preview.sql);
                    if let Some(validation) = &preview.validation {
                        println!();
                        print_validation(validation);
                    }
                }
            }
            ExitCode::SUCCESS
        }),
        Commands::Validate {
            file,
            level,
            result_column,
            strict: _,
        } => cmd_validate(&compiler, &file, level.into(), &result_column, output),
        Commands::Advise { file } => with_definition(&file, |def| {
            let advice = compiler.advise(def);
            match output {
                OutputFormat::Json => emit_json(&advice),
                OutputFormat::Text => match advice {
                    Some(text) => println!("{}", text),
                    None => println!("No compatibility notes."),
                },
            }
            ExitCode::SUCCESS
        }),
        Commands::Check { file } => with_definition(&file, |def| {
            let result = compiler.check_definition(def);
            let messages: Vec<String> = match &result {
                Ok(()) => Vec::new(),
                Err(errors) => errors.iter().map(ToString::to_string).collect(),
            };
            match output {
                OutputFormat::Json => emit_json(&CheckReport {
                    valid: messages.is_empty(),
                    errors: &messages,
                }),
                OutputFormat::Text if messages.is_empty() => println!("✓ Definition is valid"),
                OutputFormat::Text => {
                    eprintln!("✗ Definition has {} error(s):", messages.len());
                    for message in &messages {
                        eprintln!("  - {}", message);
                    }
                }
            }
            if result.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }),
        Commands::Substitute { file, cycle, deals } => {
            let sql = match read_source(&file) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            let params = ExecutionParams {
                anchor_cycle: cycle,
                deals,
            };
            match compiler.substitute(&sql, &params) {
                Ok(text) => {
                    emit_text(output, &text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Substitution error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Vocabulary => {
            let tokens = vocabulary();
            match output {
                OutputFormat::Json => emit_json(&tokens),
                OutputFormat::Text => {
                    for token in &tokens {
                        println!(
                            "{{{:<20} {:<16} {}",
                            format!("{}}}", token.name),
                            token.category.to_string(),
                            token.description
                        );
                    }
                }
            }
            ExitCode::SUCCESS
        }
    }
}

#[derive(Serialize)]
struct CheckReport<'a> {
    valid: bool,
    errors: &'a [String],
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "calcsql=debug" } else { "error" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings, calcsql::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn cmd_validate(
    compiler: &Compiler,
    file: &Path,
    level: GroupLevel,
    result_column: &str,
    output: OutputFormat,
) -> ExitCode {
    let sql = match read_source(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = compiler.validate(&sql, level, result_column);
    match output {
        OutputFormat::Json => emit_json(&result),
        OutputFormat::Text => print_validation(&result),
    }

    if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_validation(result: &calcsql::validation::ValidationResult) {
    if result.is_valid {
        println!("✓ SQL is valid");
    } else {
        println!("✗ SQL has {} error(s):", result.errors.len());
        for error in &result.errors {
            println!("  - {}", error);
        }
    }
    for warning in &result.warnings {
        println!("  ! {}", warning);
    }
    if !result.placeholders_used.is_empty() {
        println!("Placeholders: {}", result.placeholders_used.join(", "));
    }
    if result.is_complex() {
        println!(
            "Complex query: ctes={} subqueries={} tables={}",
            result.has_ctes,
            result.has_subqueries,
            result.used_tables.join(", ")
        );
    }
}

fn with_definition(file: &Path, run: impl FnOnce(&CalculationDefinition) -> ExitCode) -> ExitCode {
    match load_definition(file) {
        Ok(def) => run(&def),
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Read a definition as TOML when the extension says so, JSON otherwise.
fn load_definition(file: &Path) -> Result<CalculationDefinition, String> {
    let source = read_source(file)?;
    let is_toml = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&source)
            .map_err(|e| format!("Error parsing definition '{}': {}", file.display(), e))
    } else {
        serde_json::from_str(&source)
            .map_err(|e| format!("Error parsing definition '{}': {}", file.display(), e))
    }
}

fn read_source(file: &Path) -> Result<String, String> {
    if file.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Error reading stdin: {}", e))?;
        return Ok(buffer);
    }
    fs::read_to_string(file).map_err(|e| format!("Error reading file '{}': {}", file.display(), e))
}

fn parse_deal(value: &str) -> Result<DealSelection, String> {
    let (deal, tranches) = match value.split_once(':') {
        Some((deal, tranches)) => (deal, Some(tranches)),
        None => (value, None),
    };
    let deal_number: i64 = deal
        .trim()
        .parse()
        .map_err(|_| format!("invalid deal number '{}'", deal))?;

    let selection = DealSelection::deal(deal_number);
    Ok(match tranches {
        Some(list) => selection.with_tranches(
            list.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty()),
        ),
        None => selection,
    })
}

fn emit_text(output: OutputFormat, text: &str) {
    match output {
        OutputFormat::Json => emit_json(&text),
        OutputFormat::Text => println!("{}", text),
    }
}

fn emit_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}
