//! CLI binary for inkdraft.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `GenerationRequest` + `GenerateConfig` and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use inkdraft::{
    generate, GenerateConfig, GenerationMode, GenerationRequest, GenerationResult, Outcome,
    PageType, SectionStyle, Style,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Hand-drawn style outline
  inkdraft "秋季护肤指南"

  # Classic style with reference images
  inkdraft --style classic -i cover.jpg -i palette.png "咖啡入门"

  # Poster layout as JSON
  inkdraft --mode poster --json "久坐的危害"

PROVIDER CONFIGURATION (text_providers.yaml):
  active_provider: google_gemini
  providers:
    google_gemini:
      type: google_gemini          # or openai_compatible / openai
      model: gemini-2.0-flash-exp
      temperature: 1.0
      max_output_tokens: 8000
      api_key: "..."
      # base_url: https://api.deepseek.com/v1   (openai_compatible only)

  The file is re-read on every run. Without it, a Gemini provider with no
  API key is assumed and generation stops with a hint to add one.

ENVIRONMENT VARIABLES:
  INKDRAFT_PROVIDERS      Path to text_providers.yaml
  INKDRAFT_PROMPTS_DIR    Directory with outline_prompt_sketch.txt,
                          outline_prompt_classic.txt and poster_prompt.txt
  RUST_LOG                Override the log filter
"#;

/// Generate slide outlines and poster layouts from a topic with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "inkdraft",
    version,
    about = "Generate slide outlines and poster layouts from a topic with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Topic to generate content for.
    topic: String,

    /// What to generate.
    #[arg(long, value_enum, default_value = "outline")]
    mode: ModeArg,

    /// Outline template style (ignored in poster mode).
    #[arg(long, value_enum, default_value = "sketch")]
    style: StyleArg,

    /// Reference image file (repeatable, order preserved).
    #[arg(short, long = "image")]
    images: Vec<PathBuf>,

    /// Provider configuration file.
    #[arg(long, env = "INKDRAFT_PROVIDERS", default_value = "text_providers.yaml")]
    providers: PathBuf,

    /// Directory of prompt template files; built-in templates if unset.
    #[arg(long, env = "INKDRAFT_PROMPTS_DIR")]
    prompts_dir: Option<PathBuf>,

    /// HTTP timeout in seconds for providers without `timeout_secs`.
    #[arg(long, env = "INKDRAFT_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Print the result record as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Outline,
    Poster,
}

impl From<ModeArg> for GenerationMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Outline => GenerationMode::Outline,
            ModeArg::Poster => GenerationMode::Poster,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    Sketch,
    Classic,
}

impl From<StyleArg> for Style {
    fn from(v: StyleArg) -> Self {
        match v {
            StyleArg::Sketch => Style::Sketch,
            StyleArg::Classic => Style::Classic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build request ────────────────────────────────────────────────────
    let mut images = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {:?}", path))?;
        images.push(bytes);
    }

    let request = match GenerationRequest::new(&cli.topic, cli.mode.into(), cli.style.into(), images)
    {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(exit_code(e.kind().status_code()));
        }
    };

    let config = build_config(&cli)?;

    // ── Run generation ───────────────────────────────────────────────────
    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Generating");
        bar.set_message(format!("{} · {}", request.mode, request.style));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = generate(&request, &config).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    // ── Print ────────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else {
        print_result(&result);
    }

    if let Some(err) = result.error() {
        if !cli.quiet && !cli.json {
            eprintln!("{} {}", red("✘"), err);
        }
        std::process::exit(exit_code(result.status_code()));
    }

    if !cli.quiet && !cli.json {
        eprintln!("{} {} generated", green("✔"), bold(result.mode.as_str()));
    }
    Ok(())
}

/// Process exit code for a failed request: 2 for invalid input, 1 otherwise.
fn exit_code(status: u16) -> i32 {
    if status == 400 {
        2
    } else {
        1
    }
}

/// Map CLI args to `GenerateConfig`.
fn build_config(cli: &Cli) -> Result<GenerateConfig> {
    let mut builder = GenerateConfig::builder()
        .providers_file(&cli.providers)
        .default_timeout_secs(cli.timeout);
    if let Some(ref dir) = cli.prompts_dir {
        builder = builder.templates_dir(dir);
    }
    builder.build().context("Invalid configuration")
}

fn print_result(result: &GenerationResult) {
    match &result.outcome {
        Outcome::Outline { pages, .. } => {
            for page in pages {
                let label = match page.page_type {
                    PageType::Cover => "cover",
                    PageType::Content => "content",
                    PageType::Summary => "summary",
                };
                println!(
                    "{} {}",
                    cyan(&format!("── Page {}", page.index + 1)),
                    dim(&format!("[{label}]"))
                );
                println!("{}\n", page.content);
            }
        }
        Outcome::Poster { poster_data, .. } => {
            println!("{}", bold(&poster_data.title));
            if let Some(ref s) = poster_data.subtitle {
                println!("{}", dim(s));
            }
            if let Some(ref q) = poster_data.quote {
                println!("\n  “{}”", q);
            }
            for section in &poster_data.sections {
                let marker = match section.style {
                    SectionStyle::Positive => green("+"),
                    SectionStyle::Negative => red("-"),
                    SectionStyle::Neutral => dim("·"),
                };
                let icon = section
                    .icon
                    .as_deref()
                    .map(|i| format!(" {}", dim(&format!("({i})"))))
                    .unwrap_or_default();
                println!("\n{} {}{}", marker, bold(&section.heading), icon);
                println!("  {}", section.content);
            }
            if let Some(ref s) = poster_data.summary {
                println!("\n{}", s);
            }
        }
        Outcome::Failed { outline, .. } => {
            if let Some(raw) = outline {
                eprintln!("{}", dim("Raw model output:"));
                eprintln!("{}", raw);
            }
        }
    }
}
