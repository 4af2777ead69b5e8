//! Command-line front end for `dualtrans-core`.

use std::io;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use dualtrans_core::BatchJob;
use dualtrans_core::DEFAULT_MAX_TOKENS;
use dualtrans_core::DEFAULT_SOURCE_LANG;
use dualtrans_core::DEFAULT_TARGET_LANG;
use dualtrans_core::ProviderId;
use dualtrans_core::TranslationRequest;
use dualtrans_core::Translator;
use dualtrans_core::TranslatorConfig;

/// Default page size for `batch list`.
pub const DEFAULT_LIST_LIMIT: u32 = 20;

#[derive(Debug, Parser)]
#[command(name = "dualtrans", author, version, about = "Translate HTML with Claude or ChatGPT")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Translate one HTML fragment.
    Translate(TranslateArgs),

    /// Send a free-form message and print the reply.
    Ask(AskArgs),

    /// Manage asynchronous batch jobs.
    #[command(subcommand)]
    Batch(BatchCommand),

    /// Show which API keys are configured.
    Check,

    /// Store provider settings in the config file.
    Configure(ConfigureArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ProviderArgs {
    /// `claude` or `chatgpt`.
    #[arg(long, short = 'p', value_parser = parse_provider, default_value = "claude")]
    pub provider: ProviderId,

    /// Model override for this invocation.
    #[arg(long, short = 'm')]
    pub model: Option<String>,
}

#[derive(Debug, Args)]
pub struct TranslateArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,

    #[arg(long, default_value = DEFAULT_SOURCE_LANG)]
    pub from: String,

    #[arg(long, default_value = DEFAULT_TARGET_LANG)]
    pub to: String,

    /// HTML to translate.
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    pub text: Option<String>,

    /// Read the HTML from a file.
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Write the translation to a file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,

    pub message: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Extra request options as a JSON object, merged into the request body.
    #[arg(long, value_parser = parse_json_object)]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Subcommand)]
pub enum BatchCommand {
    /// Submit a JSONL file of translation requests.
    Create {
        #[command(flatten)]
        provider: ProviderArgs,

        /// One request object per line: `{"id", "text", "source_lang", "target_lang"}`.
        #[arg(long, short = 'i')]
        input: PathBuf,

        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: u32,

        /// Submit without asking for confirmation.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show the state of a batch.
    Status {
        #[command(flatten)]
        provider: ProviderArgs,
        id: String,
    },

    /// Download results into `batch-results-<id>.jsonl`.
    Results {
        #[command(flatten)]
        provider: ProviderArgs,
        id: String,

        /// Directory the results file is written to.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Ask the vendor to cancel a batch.
    Cancel {
        #[command(flatten)]
        provider: ProviderArgs,
        id: String,

        /// Cancel without asking for confirmation.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List recent batches.
    List {
        #[command(flatten)]
        provider: ProviderArgs,

        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
}

#[derive(Debug, Args)]
pub struct ConfigureArgs {
    #[arg(long, short = 'p', value_parser = parse_provider)]
    pub provider: ProviderId,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub base_url: Option<String>,
}

fn parse_provider(value: &str) -> Result<ProviderId, String> {
    ProviderId::from_str(value)
        .ok_or_else(|| format!("unknown provider `{value}`, expected `claude` or `chatgpt`"))
}

fn parse_json_object(value: &str) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    match serde_json::from_str(value) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err("options must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = TranslatorConfig::load();
    tracing::debug!(path = ?TranslatorConfig::config_path(), "loaded translator config");
    match cli.command {
        Command::Translate(args) => translate(&config, args).await,
        Command::Ask(args) => {
            let translator = translator(&config, &args.provider)?;
            let reply = translator
                .converse(&args.message, args.max_tokens, args.options.as_ref())
                .await?;
            println!("{reply}");
            Ok(())
        }
        Command::Batch(command) => batch(&config, command).await,
        Command::Check => {
            for provider in ProviderId::ALL {
                println!("{}", credential_line(&config, *provider));
            }
            Ok(())
        }
        Command::Configure(args) => configure(config, args),
    }
}

fn translator(config: &TranslatorConfig, args: &ProviderArgs) -> anyhow::Result<Translator> {
    let translator = Translator::from_config(config, args.provider)
        .with_context(|| format!("cannot set up the {} translator", args.provider))?;
    Ok(match args.model.as_deref() {
        Some(model) => translator.with_model(model),
        None => translator,
    })
}

async fn translate(config: &TranslatorConfig, args: TranslateArgs) -> anyhow::Result<()> {
    let text = match (&args.text, &args.input) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("either --text or --input is required"),
    };

    let translator = translator(config, &args.provider)?;
    let translated = translator
        .translate(&text, &args.from, &args.to, args.max_tokens)
        .await?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, translated.as_bytes())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Translation written to {}", path.display());
        }
        None => println!("{translated}"),
    }
    Ok(())
}

async fn batch(config: &TranslatorConfig, command: BatchCommand) -> anyhow::Result<()> {
    match command {
        BatchCommand::Create {
            provider,
            input,
            max_tokens,
            yes,
        } => {
            let content = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;
            let requests = parse_requests(&content)
                .with_context(|| format!("invalid request file {}", input.display()))?;
            let prompt = format!(
                "Submit {} requests to {} as a batch?",
                requests.len(),
                provider.provider
            );
            if !yes && !confirm(&prompt)? {
                eprintln!("Aborted.");
                return Ok(());
            }
            let job = translator(config, &provider)?
                .create_batch(&requests, max_tokens)
                .await?;
            println!("{}", job.summary());
        }
        BatchCommand::Status { provider, id } => {
            let job = translator(config, &provider)?.get_batch_status(&id).await?;
            print_status(&job);
        }
        BatchCommand::Results {
            provider,
            id,
            output_dir,
        } => {
            let path = results_path(&output_dir, &id)?;
            let entries = translator(config, &provider)?.get_batch_results(&id).await?;
            let mut out = String::new();
            for entry in &entries {
                out.push_str(&serde_json::to_string(entry)?);
                out.push('\n');
            }
            tokio::fs::write(&path, out)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            let translated = entries.iter().filter(|e| e.text.is_some()).count();
            println!(
                "{} results ({translated} translated) written to {}",
                entries.len(),
                path.display()
            );
        }
        BatchCommand::Cancel { provider, id, yes } => {
            if !yes && !confirm(&format!("Cancel batch {id}?"))? {
                eprintln!("Aborted.");
                return Ok(());
            }
            let ack = translator(config, &provider)?.cancel_batch(&id).await?;
            println!("{}", serde_json::to_string_pretty(&ack)?);
        }
        BatchCommand::List { provider, limit } => {
            let page = translator(config, &provider)?.list_batches(limit).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }
    Ok(())
}

fn print_status(job: &BatchJob) {
    println!("{}", job.summary());
    if job.vendor_status != job.status.as_str() {
        println!("vendor status: {}", job.vendor_status);
    }
    if job.status.is_terminal() && job.has_results() {
        println!("results are ready to download");
    }
}

/// Parse one `TranslationRequest` per non-blank line.
pub fn parse_requests(content: &str) -> anyhow::Result<Vec<TranslationRequest>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<TranslationRequest>(line).with_context(|| format!("line {}", index + 1))
        })
        .collect()
}

/// Where `batch results` writes a batch's entries. The id must stay a single
/// file name component.
pub fn results_path(dir: &Path, batch_id: &str) -> anyhow::Result<PathBuf> {
    if batch_id.trim().is_empty() || batch_id.contains(['/', '\\']) || batch_id.contains("..") {
        anyhow::bail!("batch id `{batch_id}` cannot be used in a file name");
    }
    Ok(dir.join(format!("batch-results-{batch_id}.jsonl")))
}

/// Ask a yes/no question on stderr and read the answer from stdin.
fn confirm(prompt: &str) -> anyhow::Result<bool> {
    confirm_with(io::stdin().lock(), io::stderr(), prompt)
}

/// Anything other than `y` or `yes` (case-insensitive) declines, including EOF.
pub fn confirm_with<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    prompt: &str,
) -> anyhow::Result<bool> {
    write!(output, "{prompt} [y/N] ")?;
    output.flush()?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// One line of `check` output. Only the key length is shown.
pub fn credential_line(config: &TranslatorConfig, provider: ProviderId) -> String {
    credential_line_with(config, provider, |name| std::env::var(name).ok())
}

pub fn credential_line_with(
    config: &TranslatorConfig,
    provider: ProviderId,
    env: impl Fn(&str) -> Option<String>,
) -> String {
    let env_name = provider.definition().api_key_env;
    match config.effective_api_key_with(provider, env) {
        Some(key) => format!("{provider}: configured ({} chars)", key.chars().count()),
        None => format!("{provider}: missing (set {env_name} or run `dualtrans configure`)"),
    }
}

fn configure(mut config: TranslatorConfig, args: ConfigureArgs) -> anyhow::Result<()> {
    let settings = match args.provider {
        ProviderId::Anthropic => &mut config.anthropic,
        ProviderId::OpenAI => &mut config.openai,
    };
    if let Some(key) = args.api_key {
        settings.api_key = Some(key);
    }
    if let Some(model) = args.model {
        settings.model = Some(model);
    }
    if let Some(base_url) = args.base_url {
        settings.base_url = Some(base_url);
    }
    config.save().context("failed to save config")?;
    if let Some(path) = TranslatorConfig::config_path() {
        println!("Saved {} settings to {}", args.provider, path.display());
    }
    Ok(())
}
