use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use grammar_vocab_core::{
    loader::{self, ModelConfiguration, ModelSource},
    ResolvedVocabulary,
};

use grammar_vocab_cli::config::CliConfig;
use grammar_vocab_cli::logging::{self, LogFormat};
use grammar_vocab_cli::report::ResolutionReport;

#[derive(Parser)]
#[command(
    name = "grammar-vocab",
    about = "Resolve tokenizer metadata into grammar engine vocabulary inputs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a model's vocabulary table, byte scheme and stop tokens
    Resolve(ResolveArgs),

    /// Show or persist the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show(ResolveArgs),
    /// Write the effective configuration to the config file
    Save(ResolveArgs),
}

#[derive(Args, Clone)]
struct ResolveArgs {
    /// Model ID (HuggingFace Hub format)
    #[arg(long)]
    model: Option<String>,

    /// Model revision (branch, tag or commit)
    #[arg(long)]
    revision: Option<String>,

    /// Local directory containing tokenizer.json (overrides --model)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Additional end-of-sequence string (can be repeated)
    #[arg(long = "extra-eos")]
    extra_eos_tokens: Vec<String>,

    /// Include the full vocabulary table in the output
    #[arg(long)]
    emit_vocab: bool,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ResolveArgs {
    fn to_config(&self) -> CliConfig {
        CliConfig {
            model: self.model.clone(),
            revision: self.revision.clone(),
            model_dir: self.model_dir.clone(),
            extra_eos_tokens: self.extra_eos_tokens.clone(),
            emit_vocab: self.emit_vocab.then_some(true),
            log_level: self.log_level.clone(),
        }
    }

    /// Config file values overridden by command-line flags.
    fn effective_config(&self) -> anyhow::Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::load_from(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => CliConfig::load(),
        };
        config.merge(&self.to_config());
        Ok(config)
    }
}

fn model_source(config: &CliConfig) -> anyhow::Result<ModelSource> {
    if let Some(dir) = &config.model_dir {
        return Ok(ModelSource::Directory(dir.clone()));
    }
    match &config.model {
        Some(id) => Ok(ModelSource::Hub {
            id: id.clone(),
            revision: config.revision.clone(),
        }),
        None => anyhow::bail!("no model given: pass --model or --model-dir"),
    }
}

fn resolve(args: &ResolveArgs) -> anyhow::Result<()> {
    let config = args.effective_config()?;
    logging::init(config.log_level.as_deref(), LogFormat::from_env())?;

    let source = model_source(&config)?;
    let configuration =
        ModelConfiguration::new(source).with_extra_eos_tokens(config.extra_eos_tokens.clone());
    let metadata = loader::load_metadata(&configuration)
        .with_context(|| format!("loading tokenizer metadata for {}", configuration.source))?;

    let resolved = ResolvedVocabulary::from_metadata(&metadata);
    tracing::info!(
        source = %configuration.source,
        vocab_size = resolved.vocab_size(),
        vocab_type = %resolved.vocab_type,
        stop_token_ids = ?resolved.stop_token_ids,
        "vocabulary resolved"
    );

    let report = ResolutionReport::new(
        configuration.source.to_string(),
        &resolved,
        config.emit_vocab.unwrap_or(false),
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Resolve(args) => resolve(&args),
        Command::Config { action } => match action {
            ConfigAction::Show(args) => {
                let config = args.effective_config()?;
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Save(args) => {
                let config = args.effective_config()?;
                let path = match &args.config {
                    Some(path) => {
                        config.save_to(path)?;
                        path.clone()
                    }
                    None => config.save()?,
                };
                println!("saved {}", path.display());
                Ok(())
            }
        },
    }
}
