use crate::{
    chat::ChatSession,
    completion::CompletionClient,
    config::Config,
    dispatch::{Dispatcher, Format, SUPPORTED_EXTENSIONS},
    document::Document,
    http::{ApiKey, HttpTransport},
    ocr::{OcrClient, OcrCredentials},
    pipeline::Pipeline,
    report::{AnalysisReport, ReportInput},
    util::{ensure_dir, hash_file, now_rfc3339},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "doc-analyst")]
#[command(about = "Extract text from PDF, Word, Excel and image files and analyse it with an LLM")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./doc-analyst.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract a document's text and ask the model about it.
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// Optional instruction placed before the document text.
        #[arg(long)]
        prompt: Option<String>,
        /// Print a JSON report instead of plain sections.
        #[arg(long)]
        json: bool,
    },
    /// List accepted file extensions.
    Formats {},
    /// Show effective endpoints and which credentials are present.
    Doctor {},
    /// Chat with the model over stdin, one message per line.
    Chat {
        #[arg(long, default_value = "local")]
        user: String,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Analyze {
            input,
            prompt,
            json,
        } => analyze(&cfg, input, prompt.as_deref(), *json),
        Command::Formats {} => {
            for ext in SUPPORTED_EXTENSIONS {
                println!(".{ext}");
            }
            Ok(())
        }
        Command::Doctor {} => doctor(&cfg),
        Command::Chat { user } => chat(&cfg, user),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("doc-analyst.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file || cfg.logging.file_path.is_empty() {
        return None;
    }
    Some(PathBuf::from(&cfg.logging.file_path))
}

fn completion_key(cfg: &Config) -> Result<ApiKey> {
    ApiKey::from_env(&cfg.completion.api_key_env).ok_or_else(|| {
        anyhow!(
            "environment variable {} is not set",
            cfg.completion.api_key_env
        )
    })
}

fn build_pipeline(cfg: &Config) -> Result<Pipeline<HttpTransport>> {
    let transport = HttpTransport::new(&cfg.completion.user_agent)?;
    let ocr_creds = OcrCredentials::from_env(&cfg.ocr);
    if ocr_creds.is_none() {
        warn!("no OCR credentials found; image inputs will fail");
    }
    let ocr = OcrClient::new(&cfg.ocr, ocr_creds, transport.clone());
    let dispatcher = Dispatcher::new(&cfg.limits, Box::new(ocr));
    let completion = CompletionClient::new(cfg, completion_key(cfg)?, transport);
    Ok(Pipeline::new(cfg, dispatcher, completion))
}

fn analyze(cfg: &Config, input: &Path, prompt: Option<&str>, json: bool) -> Result<()> {
    let pipeline = build_pipeline(cfg)?;
    let doc = Document::from_path(input);

    let started = now_rfc3339();
    let (extracted_text, analysis) = pipeline.analyze(Some(&doc), prompt);
    let finished = now_rfc3339();

    if json {
        let sha256 = match hash_file(input) {
            Ok(h) => Some(h),
            Err(err) => {
                warn!("could not fingerprint input: {err:#}");
                None
            }
        };
        let report = AnalysisReport {
            input: ReportInput {
                path: input.display().to_string(),
                extension: doc.extension.clone(),
                format: Format::from_extension(&doc.extension),
                size_bytes: doc.size_bytes,
                sha256,
            },
            started,
            finished,
            prompt: prompt.map(str::to_string),
            extracted_text,
            analysis,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("=== Extracted text ===\n{extracted_text}\n");
        println!("=== Analysis ===\n{analysis}");
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    let present = |var: &str| ApiKey::from_env(var).is_some();
    let diag = serde_json::json!({
        "completion": {
            "endpoint": cfg.completion.endpoint,
            "model": cfg.completion.model,
            "api_key_env": cfg.completion.api_key_env,
            "api_key_set": present(&cfg.completion.api_key_env),
        },
        "ocr": {
            "endpoint": cfg.ocr.endpoint,
            "access_token_set": present(&cfg.ocr.access_token_env),
            "api_key_set": present(&cfg.ocr.api_key_env),
            "secret_key_set": present(&cfg.ocr.secret_key_env),
        },
        "retry": cfg.retry,
        "supported_extensions": SUPPORTED_EXTENSIONS,
    });
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn chat(cfg: &Config, user: &str) -> Result<()> {
    let transport = HttpTransport::new(&cfg.completion.user_agent)?;
    let client = CompletionClient::new(cfg, completion_key(cfg)?, transport);
    let mut session = ChatSession::new(&cfg.chat, user);
    info!(user, "chat session started");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = line.with_context(|| "reading stdin")?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let reply = session.reply(&client, text);
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}
