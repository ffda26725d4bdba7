use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

use crate::document::Document;

pub const CORPUS_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u64,
    pub created_at: String,
    pub version: u32,
}

pub struct CorpusPaths {
    pub root: PathBuf,
}

impl CorpusPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
    fn documents(&self) -> PathBuf {
        self.root.join("documents.bin")
    }
    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
}

/// Write the corpus as a count-prefixed stream of bincode records plus a
/// meta.json sidecar.
pub fn save_corpus(paths: &CorpusPaths, documents: &[Document]) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut w = BufWriter::new(File::create(paths.documents())?);
    bincode::serialize_into(&mut w, &(documents.len() as u64))?;
    for doc in documents {
        bincode::serialize_into(&mut w, doc)?;
    }
    w.flush()?;

    let meta = MetaFile {
        num_docs: documents.len() as u64,
        created_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: CORPUS_FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    Ok(())
}

pub fn save_meta(paths: &CorpusPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &CorpusPaths) -> Result<MetaFile> {
    let f = File::open(paths.meta())?;
    let meta: MetaFile = serde_json::from_reader(BufReader::new(f))?;
    Ok(meta)
}

/// Materialize the whole corpus in memory.
pub fn load_corpus(paths: &CorpusPaths) -> Result<Vec<Document>> {
    iter_corpus(paths, None)?.collect()
}

/// Stream the corpus one record at a time. When `size_limit` is set, any
/// single free-text field exceeding that many bytes is truncated (logged,
/// record kept) so peak memory stays bounded while the document is still
/// partially indexed.
pub fn iter_corpus(
    paths: &CorpusPaths,
    size_limit: Option<usize>,
) -> Result<impl Iterator<Item = Result<Document>>> {
    let mut r = BufReader::new(File::open(paths.documents())?);
    let count: u64 = bincode::deserialize_from(&mut r)?;
    Ok((0..count).map(move |_| -> Result<Document> {
        let mut doc: Document = bincode::deserialize_from(&mut r)?;
        if let Some(limit) = size_limit {
            truncate_text_fields(&mut doc, limit);
        }
        Ok(doc)
    }))
}

fn truncate_text_fields(doc: &mut Document, limit: usize) {
    let url = doc.url.clone();
    let fields = [
        ("description", &mut doc.description),
        ("readme", &mut doc.readme),
        ("optimised_description", &mut doc.optimised_description),
        ("optimised_readme", &mut doc.optimised_readme),
    ];
    for (name, field) in fields {
        if let Some(text) = field {
            if text.len() > limit {
                warn!(
                    url = %url,
                    field = name,
                    bytes = text.len(),
                    limit,
                    "truncating oversized text field"
                );
                let mut end = limit;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
            }
        }
    }
}
