mod check;
mod completion;
mod generate;

use {
    crate::{
        config::{ConfigError, GeneratorConfig},
        emitter::EmitError,
        logger::Logger,
        schema::{Schema, SchemaError},
        utils::errorfmt::ErrorFmt,
    },
    ::log::Level,
    clap::{Args, Parser, Subcommand, ValueEnum},
    clap_complete::Shell,
    std::path::PathBuf,
    thiserror::Error,
    xml_to_wire::ParserError,
};

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// A compiler for object-based wire protocols.
#[derive(Parser, Debug)]
#[command(version = VERSION)]
pub struct WireRelay {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// The log level.
    #[arg(value_enum, long, default_value_t, global = true)]
    pub log_level: CliLogLevel,
    /// A JSON file that overrides the built-in generator configuration.
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Validate protocol documents without generating anything.
    Check(CheckArgs),
    /// Generate protocol modules for the configured host projects.
    Generate(GenerateArgs),
    /// Generate shell completion scripts for wire-relay.
    GenerateCompletion(CompletionArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// The protocol documents.
    #[arg(required = true)]
    pub files: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// The protocol documents.
    #[arg(required = true)]
    pub files: Vec<String>,
    /// Only generate the output of this project.
    #[arg(long)]
    pub project: Option<String>,
    /// Write into this directory instead of the configured one.
    ///
    /// Requires `--project` if more than one output is configured.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Copy, Clone, Hash, Default)]
pub enum CliLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Trace => Level::Trace,
            CliLogLevel::Debug => Level::Debug,
            CliLogLevel::Info => Level::Info,
            CliLogLevel::Warn => Level::Warn,
            CliLogLevel::Error => Level::Error,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Could not read {0}")]
    Read(String, #[source] std::io::Error),
    #[error("Could not parse {0}")]
    Parse(String, #[source] ParserError),
    #[error("{0} does not contain exactly one protocol")]
    NotOneProtocol(String),
    #[error("Could not build the schema")]
    Schema(#[from] SchemaError),
    #[error("Could not emit the output")]
    Emit(#[from] EmitError),
    #[error("There is no output for project {0}")]
    UnknownProject(String),
    #[error("--out requires --project when {0} outputs are configured")]
    AmbiguousOut(usize),
}

fn load_config(global: &GlobalArgs) -> Result<GeneratorConfig, CliError> {
    match &global.config {
        Some(path) => Ok(GeneratorConfig::load(path)?),
        None => Ok(GeneratorConfig::default()),
    }
}

/// Reads and validates protocol documents.
fn load_schema(files: &[String], config: &GeneratorConfig) -> Result<Schema, CliError> {
    let mut trees = vec![];
    for file in files {
        let data = std::fs::read(file).map_err(|e| CliError::Read(file.clone(), e))?;
        let mut roots =
            xml_to_wire::parse(&data).map_err(|e| CliError::Parse(file.clone(), e))?;
        if roots.len() != 1 {
            return Err(CliError::NotOneProtocol(file.clone()));
        }
        trees.push(roots.remove(0));
    }
    Ok(Schema::build(&trees, config)?)
}

pub fn main() {
    let cli = WireRelay::parse();
    if let Err(e) = Logger::install_stderr(cli.global.log_level.into()) {
        eprintln!("Error: {}", ErrorFmt(e));
        std::process::exit(1);
    }
    let res = match cli.command {
        Cmd::Check(a) => check::main(cli.global, a),
        Cmd::Generate(a) => generate::main(cli.global, a),
        Cmd::GenerateCompletion(a) => {
            completion::main(a);
            Ok(())
        }
    };
    if let Err(e) = res {
        log::error!("A fatal error occurred: {}", ErrorFmt(e));
        std::process::exit(1);
    }
}
