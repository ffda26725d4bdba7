use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use repofinder_core::document::Document;
use repofinder_core::licenses::LicenseCategory;
use repofinder_core::persist::{save_corpus, CorpusPaths};
use repofinder_core::store::DocumentStore;
use serde::Deserialize;
use time::Date;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Ingestion-boundary record: one repository as produced by the scraping
/// collaborator's listing export.
#[derive(Debug, Deserialize)]
struct InputDoc {
    url: String,
    name: String,
    #[serde(default)]
    organisation: String,
    language: Option<String>,
    license: Option<String>,
    description: Option<String>,
    readme: Option<String>,
    #[serde(default)]
    optimised_description: Option<String>,
    #[serde(default)]
    optimised_readme: Option<String>,
    latest_update: Option<Date>,
    last_commit: Option<Date>,
    #[serde(default)]
    is_fork: bool,
}

impl From<InputDoc> for Document {
    fn from(doc: InputDoc) -> Self {
        let license_category = LicenseCategory::from_license_name(doc.license.as_deref());
        Document {
            url: doc.url,
            name: doc.name,
            organisation: doc.organisation,
            language: doc.language,
            license: doc.license,
            license_category,
            description: doc.description,
            readme: doc.readme,
            optimised_description: doc.optimised_description,
            optimised_readme: doc.optimised_readme,
            latest_update: doc.latest_update,
            last_commit: doc.last_commit,
            is_fork: doc.is_fork,
        }
    }
}

#[derive(Parser)]
#[command(name = "repofinder-indexer")]
#[command(about = "Build the repository corpus consumed by the search server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the corpus from listing JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output corpus directory
        #[arg(long)]
        output: String,
        /// Only keep the first N records
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            limit,
        } => build_corpus(&input, &output, limit),
    }
}

fn build_corpus(input: &str, output: &str, limit: Option<usize>) -> Result<()> {
    let input_path = Path::new(input);

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        bail!("input path does not exist: {input}");
    }

    let mut documents: Vec<Document> = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut documents)?;
        } else {
            read_json(&file, &mut documents)?;
        }
    }
    if let Some(limit) = limit {
        documents.truncate(limit);
    }
    tracing::info!(documents = documents.len(), "ingested listing records");

    // Validation (unique non-empty urls, license categories) happens here so
    // a broken listing never produces a corpus file.
    let store = DocumentStore::load(documents)?;
    let paths = CorpusPaths::new(output);
    save_corpus(&paths, store.documents()?)?;

    tracing::info!(output, "corpus build complete");
    Ok(())
}

fn read_jsonl(file: &Path, documents: &mut Vec<Document>) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: InputDoc = serde_json::from_str(&line)?;
        documents.push(doc.into());
    }
    Ok(())
}

fn read_json(file: &Path, documents: &mut Vec<Document>) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(f))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                documents.push(doc.into());
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            documents.push(doc.into());
        }
        _ => {}
    }
    Ok(())
}
