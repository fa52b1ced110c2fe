//! Corpus records and paged corpus sources.
//!
//! A corpus is read one page at a time so arbitrarily large snapshots never
//! have to fit in memory. Two sources are provided: [`VecCorpus`] for records
//! already in memory, and [`JsonlCorpus`] for JSON Lines files with one
//! `{"id", "text", "metadata"}` object per line.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{MigrationError, MigrationResult};

/// Metadata attached to a corpus record. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusMetadata {
    #[serde(default)]
    pub source_author: Option<String>,
    #[serde(default)]
    pub source_title: Option<String>,
    #[serde(default)]
    pub layer: Option<String>,
    /// Kept raw: ingestion snapshots carry integers, floats and strings here.
    #[serde(default)]
    pub trust_tier: Option<serde_json::Value>,
    #[serde(default)]
    pub tradition: Option<String>,
    #[serde(default)]
    pub planets: Option<String>,
    #[serde(default)]
    pub signs: Option<String>,
    #[serde(default)]
    pub houses: Option<String>,
    #[serde(default)]
    pub aspects: Option<String>,
    #[serde(default)]
    pub techniques: Option<String>,
}

/// One pre-chunked passage from the ingestion snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: CorpusMetadata,
}

impl CorpusRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: CorpusMetadata::default(),
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.metadata.source_author = Some(author.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.metadata.source_title = Some(title.into());
        self
    }

    pub fn layer(mut self, layer: impl Into<String>) -> Self {
        self.metadata.layer = Some(layer.into());
        self
    }

    pub fn trust_tier(mut self, tier: i64) -> Self {
        self.metadata.trust_tier = Some(serde_json::Value::from(tier));
        self
    }

    pub fn tradition(mut self, tradition: impl Into<String>) -> Self {
        self.metadata.tradition = Some(tradition.into());
        self
    }

    pub fn planets(mut self, tags: impl Into<String>) -> Self {
        self.metadata.planets = Some(tags.into());
        self
    }

    pub fn signs(mut self, tags: impl Into<String>) -> Self {
        self.metadata.signs = Some(tags.into());
        self
    }

    pub fn houses(mut self, tags: impl Into<String>) -> Self {
        self.metadata.houses = Some(tags.into());
        self
    }

    pub fn aspects(mut self, tags: impl Into<String>) -> Self {
        self.metadata.aspects = Some(tags.into());
        self
    }

    pub fn techniques(mut self, tags: impl Into<String>) -> Self {
        self.metadata.techniques = Some(tags.into());
        self
    }
}

/// A record the source could not decode. Counts toward progress but is
/// never written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    /// Zero-based position in the corpus.
    pub position: usize,
    pub reason: String,
}

/// One page of a corpus.
#[derive(Debug, Clone, Default)]
pub struct CorpusPage {
    pub records: Vec<CorpusRecord>,
    pub rejected: Vec<RejectedRecord>,
}

impl CorpusPage {
    /// Number of corpus positions this page covers.
    pub fn len(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A corpus that can be read in bounded pages.
pub trait CorpusSource {
    /// Total number of records, used for progress reporting.
    fn total(&mut self) -> MigrationResult<usize>;

    /// Up to `limit` records starting at `offset`. An empty page ends the run.
    fn page(&mut self, offset: usize, limit: usize) -> MigrationResult<CorpusPage>;
}

// ── In-memory source ────────────────────────────────────────────────────

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecCorpus {
    records: Vec<CorpusRecord>,
}

impl VecCorpus {
    pub fn new(records: Vec<CorpusRecord>) -> Self {
        Self { records }
    }
}

impl CorpusSource for VecCorpus {
    fn total(&mut self) -> MigrationResult<usize> {
        Ok(self.records.len())
    }

    fn page(&mut self, offset: usize, limit: usize) -> MigrationResult<CorpusPage> {
        let records = self
            .records
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(CorpusPage {
            records,
            rejected: Vec::new(),
        })
    }
}

// ── JSON Lines source ───────────────────────────────────────────────────

/// A JSON Lines corpus file. Blank lines are ignored; lines that do not
/// decode are reported as rejected records.
///
/// Pages are read sequentially from one open reader; asking for an offset
/// behind the cursor reopens the file.
pub struct JsonlCorpus {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    /// Position of the next non-blank line the reader will yield.
    cursor: usize,
}

impl JsonlCorpus {
    pub fn open(path: impl AsRef<Path>) -> MigrationResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut corpus = Self {
            path,
            lines: None,
            cursor: 0,
        };
        corpus.rewind()?;
        Ok(corpus)
    }

    fn io_error(&self, source: std::io::Error) -> MigrationError {
        MigrationError::CorpusIo {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn rewind(&mut self) -> MigrationResult<()> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        self.lines = Some(BufReader::new(file).lines());
        self.cursor = 0;
        Ok(())
    }

    /// Next non-blank line, or `None` at end of file.
    fn next_line(&mut self) -> MigrationResult<Option<String>> {
        loop {
            let next = match self.lines.as_mut() {
                Some(lines) => lines.next(),
                None => None,
            };
            match next {
                None => return Ok(None),
                Some(Err(e)) => return Err(self.io_error(e)),
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => {
                    self.cursor += 1;
                    return Ok(Some(line));
                }
            }
        }
    }
}

impl CorpusSource for JsonlCorpus {
    fn total(&mut self) -> MigrationResult<usize> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut total = 0;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_error(e))?;
            if !line.trim().is_empty() {
                total += 1;
            }
        }
        Ok(total)
    }

    fn page(&mut self, offset: usize, limit: usize) -> MigrationResult<CorpusPage> {
        if offset < self.cursor {
            self.rewind()?;
        }
        while self.cursor < offset {
            if self.next_line()?.is_none() {
                return Ok(CorpusPage::default());
            }
        }

        let mut page = CorpusPage::default();
        while page.len() < limit {
            let position = self.cursor;
            let Some(line) = self.next_line()? else {
                break;
            };
            match serde_json::from_str::<CorpusRecord>(&line) {
                Ok(record) => page.records.push(record),
                Err(e) => page.rejected.push(RejectedRecord {
                    position,
                    reason: e.to_string(),
                }),
            }
        }
        Ok(page)
    }
}

impl std::fmt::Debug for JsonlCorpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlCorpus")
            .field("path", &self.path)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn vec_corpus_pages() {
        let records: Vec<_> = (0..5)
            .map(|i| CorpusRecord::new(format!("c{i}"), "text"))
            .collect();
        let mut corpus = VecCorpus::new(records);
        assert_eq!(corpus.total().unwrap(), 5);
        assert_eq!(corpus.page(0, 2).unwrap().records.len(), 2);
        assert_eq!(corpus.page(4, 2).unwrap().records.len(), 1);
        assert!(corpus.page(5, 2).unwrap().is_empty());
    }

    #[test]
    fn jsonl_reads_records_and_metadata() {
        let file = write_corpus(&[
            r#"{"id": "c1", "text": "Mars in Aries", "metadata": {"source_author": "Valens", "trust_tier": 1, "signs": "aries"}}"#,
            "",
            r#"{"id": "c2", "text": "No metadata"}"#,
        ]);
        let mut corpus = JsonlCorpus::open(file.path()).unwrap();
        assert_eq!(corpus.total().unwrap(), 2);

        let page = corpus.page(0, 10).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].metadata.source_author.as_deref(), Some("Valens"));
        assert_eq!(page.records[0].metadata.trust_tier, Some(serde_json::json!(1)));
        assert_eq!(page.records[1].metadata, CorpusMetadata::default());
    }

    #[test]
    fn jsonl_rejects_bad_lines_without_stopping() {
        let file = write_corpus(&[
            r#"{"id": "c1", "text": "ok"}"#,
            "not json",
            r#"{"id": "c3", "text": "ok"}"#,
        ]);
        let mut corpus = JsonlCorpus::open(file.path()).unwrap();
        let page = corpus.page(0, 10).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.rejected.len(), 1);
        assert_eq!(page.rejected[0].position, 1);
    }

    #[test]
    fn jsonl_pages_sequentially_and_rewinds() {
        let lines: Vec<String> = (0..7)
            .map(|i| format!(r#"{{"id": "c{i}", "text": "t"}}"#))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_corpus(&refs);
        let mut corpus = JsonlCorpus::open(file.path()).unwrap();

        let first = corpus.page(0, 3).unwrap();
        let second = corpus.page(3, 3).unwrap();
        let third = corpus.page(6, 3).unwrap();
        assert_eq!(first.records[0].id, "c0");
        assert_eq!(second.records[0].id, "c3");
        assert_eq!(third.records.len(), 1);
        assert!(corpus.page(7, 3).unwrap().is_empty());

        let again = corpus.page(2, 1).unwrap();
        assert_eq!(again.records[0].id, "c2");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = JsonlCorpus::open("/nonexistent/corpus.jsonl").unwrap_err();
        assert!(matches!(err, MigrationError::CorpusIo { .. }));
    }
}
