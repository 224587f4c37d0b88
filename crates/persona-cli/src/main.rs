//! Persona CLI - Command-line interface
//!
//! Usage:
//!   persona extract "Министр финансов Иван Петров заявил..."
//!   persona extract --file article.txt --json
//!   persona eval --gold gold.jsonl
//!   persona terms --lang ru --filter министр

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{debug, info};

use persona_core::{AppConfig, Lexicon, LoggingConfig, ReferentSpan, Tokenizer};
use persona_extractor::analyzer::{AnalysisResult, MentionKind};
use persona_extractor::metrics::{AggregateMetrics, Evaluator, GoldDocument, MatchMode};
use persona_extractor::{EntityExtractor, PersonExtractor, Terminology};

#[derive(Parser)]
#[command(name = "persona")]
#[command(about = "Person name, position and identity document extraction")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract persons from text
    Extract {
        /// Text to analyse; stdin when neither text nor file is given
        text: Option<String>,
        /// Read the text from a file
        #[arg(long, short)]
        file: Option<PathBuf>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Input is a JSON document with text and pre-resolved referents
        #[arg(long)]
        input_json: bool,
    },
    /// Evaluate extraction against a gold file (JSON lines)
    Eval {
        #[arg(long)]
        gold: PathBuf,
        /// Require exact spans instead of text matches
        #[arg(long, conflicts_with = "overlap")]
        strict: bool,
        /// Count overlapping spans as matches
        #[arg(long)]
        overlap: bool,
    },
    /// List the loaded attribute terminology
    Terms {
        /// ru, ua or en
        #[arg(long)]
        lang: Option<String>,
        /// Only terms containing this text
        #[arg(long)]
        filter: Option<String>,
    },
}

/// `--input-json` document
#[derive(Deserialize)]
struct InputDocument {
    text: String,
    #[serde(default)]
    referents: Vec<ReferentSpan>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &logging.level;
        format!("persona_cli={level},persona_extractor={level},persona_core={level}").into()
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(p) => AppConfig::from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display()))?,
        None => AppConfig::default(),
    };
    config.with_env_override().context("Invalid environment configuration")
}

fn build_extractor(config: &AppConfig) -> anyhow::Result<PersonExtractor> {
    let lexicon = match &config.resources.lexicon_path {
        Some(p) => Arc::new(
            Lexicon::from_file(p)
                .with_context(|| format!("Failed to load lexicon {}", p.display()))?,
        ),
        None => Lexicon::shared().context("Failed to load built-in lexicon")?,
    };
    let terms = load_terminology(config)?;
    Ok(PersonExtractor::with_resources(
        Tokenizer::new(lexicon),
        terms,
        config.analysis.clone(),
    ))
}

fn load_terminology(config: &AppConfig) -> anyhow::Result<Arc<Terminology>> {
    match &config.resources.terminology_dir {
        Some(dir) => Ok(Arc::new(
            Terminology::load_from_dir(dir)
                .with_context(|| format!("Failed to load terminology from {}", dir.display()))?,
        )),
        None => Terminology::shared().context("Failed to load built-in terminology"),
    }
}

fn read_input(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    match (text, file) {
        (Some(_), Some(_)) => bail!("Give either a text or --file, not both"),
        (Some(t), None) => Ok(t),
        (None, Some(f)) => {
            std::fs::read_to_string(&f).with_context(|| format!("Failed to read {}", f.display()))
        }
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_result(res: &AnalysisResult) {
    for (i, p) in res.persons.iter().enumerate() {
        println!("PERSON #{i}: {p}");
        for (name, value) in p.slots() {
            println!("    {name:<10} {value}");
        }
    }
    for (i, p) in res.properties.iter().enumerate() {
        println!("PERSONPROPERTY #{i}: {}", p.name);
    }
    for (i, d) in res.identities.iter().enumerate() {
        println!("PERSONIDENTITY #{i}: {d}");
    }
    if !res.mentions.is_empty() {
        println!();
    }
    for m in &res.mentions {
        let target = match (m.kind, m.person) {
            (MentionKind::Property, Some(p)) => format!("person #{p}"),
            _ => format!("#{}", m.index),
        };
        println!("[{}..{}] {:<15} {} -> {}", m.start, m.end, m.kind, m.text, target);
    }
}

fn run_extract(
    config: &AppConfig,
    text: Option<String>,
    file: Option<PathBuf>,
    json: bool,
    input_json: bool,
) -> anyhow::Result<()> {
    let extractor = build_extractor(config)?;
    let input = read_input(text, file)?;
    let res = if input_json {
        let doc: InputDocument = serde_json::from_str(&input).context("Invalid input document")?;
        debug!(referents = doc.referents.len(), "Using pre-resolved referents");
        extractor.analyze_with_referents(&doc.text, &doc.referents)
    } else {
        extractor.analyze(&input)
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&res)?);
    } else {
        print_result(&res);
    }
    Ok(())
}

fn run_eval(config: &AppConfig, gold: &Path, mode: MatchMode) -> anyhow::Result<()> {
    let extractor = build_extractor(config)?;
    let content = std::fs::read_to_string(gold)
        .with_context(|| format!("Failed to read {}", gold.display()))?;
    let evaluator = Evaluator::new().with_mode(mode);
    let mut agg = AggregateMetrics::new(mode);
    for (i, line) in content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
        let doc: GoldDocument = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid gold document", gold.display(), i + 1))?;
        let predicted = extractor.extract(&doc.text)?;
        let m = agg.add_document(&evaluator, &predicted, &doc.entities);
        debug!(
            line = i + 1,
            tp = m.true_positives,
            fp = m.false_positives,
            fn_ = m.false_negatives,
            "Document scored"
        );
    }
    info!(documents = agg.num_documents, mode = agg.mode.as_str(), "Evaluation finished");
    println!("{}", agg.report());
    Ok(())
}

fn run_terms(
    config: &AppConfig,
    lang: Option<String>,
    filter: Option<String>,
) -> anyhow::Result<()> {
    let terms = load_terminology(config)?;
    let lang = lang.map(|l| l.to_lowercase());
    if let Some(l) = lang.as_deref() {
        if !matches!(l, "ru" | "ua" | "en") {
            bail!("Unknown language {l}, expected ru, ua or en");
        }
    }
    let filter = filter.map(|f| f.to_uppercase());
    let mut count = 0;
    for t in terms.termins() {
        let lang_ok = match lang.as_deref() {
            Some("ru") => t.lang.is_ru(),
            Some("ua") => t.lang.is_ua(),
            Some("en") => t.lang.is_en(),
            _ => true,
        };
        if !lang_ok || filter.as_deref().is_some_and(|f| !t.canonical.contains(f)) {
            continue;
        }
        println!("{:<12} {:<10} {}", t.kind, t.kind2.as_str(), t.display_name());
        count += 1;
    }
    println!("\n{count} terms");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Extract {
            text,
            file,
            json,
            input_json,
        } => run_extract(&config, text, file, json, input_json),
        Commands::Eval { gold, strict, overlap } => {
            let mode = if strict {
                MatchMode::Strict
            } else if overlap {
                MatchMode::Overlap
            } else {
                MatchMode::Text
            };
            run_eval(&config, &gold, mode)
        }
        Commands::Terms { lang, filter } => run_terms(&config, lang, filter),
    }
}
