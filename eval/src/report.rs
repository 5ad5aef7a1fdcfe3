// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Metrics aggregation and reporting sinks
//!
//! [`MetricsReport`] normalises per-model or per-bracket scores into a
//! stable ordered table without touching the filesystem. Sinks implementing
//! [`ReportSink`] are injected into a [`Reporter`], which publishes to each
//! of them.

use crate::corpus::{Bracket, CorpusStats};
use crate::harness::ModelResult;
use crate::pipeline::{BracketResult, EvaluationResults, GLOBAL_ROW};
use crate::sentiment::GameSentiment;
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// One row per classifier
    Models,
    /// One row per bracket plus `Global`
    Brackets,
}

impl ReportKind {
    fn key_column(self) -> &'static str {
        match self {
            ReportKind::Models => "model",
            ReportKind::Brackets => "bracket",
        }
    }

    fn table(self) -> &'static str {
        match self {
            ReportKind::Models => "model_performance",
            ReportKind::Brackets => "bracket_scores",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub kind: ReportKind,
    pub rows: Vec<MetricRow>,
    pub corpus_stats: Option<CorpusStats>,
}

impl MetricsReport {
    /// Rows in battery order
    pub fn from_models(results: &[ModelResult]) -> Self {
        Self {
            kind: ReportKind::Models,
            rows: results
                .iter()
                .map(|r| MetricRow {
                    name: r.model_name.clone(),
                    precision: r.precision,
                    recall: r.recall,
                    f1: r.f1,
                })
                .collect(),
            corpus_stats: None,
        }
    }

    /// Brackets in numeric order, `Global` last
    pub fn from_brackets(results: &[BracketResult]) -> Self {
        let mut rows: Vec<(Option<Bracket>, MetricRow)> = results
            .iter()
            .map(|r| {
                let bracket = if r.bracket == GLOBAL_ROW { None } else { r.bracket.parse().ok() };
                let row = MetricRow {
                    name: r.bracket.clone(),
                    precision: r.precision,
                    recall: r.recall,
                    f1: r.f1,
                };
                (bracket, row)
            })
            .collect();

        // parsed brackets first, then other names, Global last
        rows.sort_by(|a, b| match (&a.0, &b.0) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => (a.1.name == GLOBAL_ROW).cmp(&(b.1.name == GLOBAL_ROW)),
        });

        Self {
            kind: ReportKind::Brackets,
            rows: rows.into_iter().map(|(_, row)| row).collect(),
            corpus_stats: None,
        }
    }

    pub fn with_corpus_stats(mut self, stats: CorpusStats) -> Self {
        self.corpus_stats = Some(stats);
        self
    }

    /// Plain text dump of the table and file statistics
    pub fn format(&self) -> String {
        let mut out = String::new();
        let key = self.kind.key_column();
        let _ = writeln!(out, "{:<24} {:>10} {:>10} {:>10}", key, "precision", "recall", "f1");
        let _ = writeln!(out, "{:-<57}", "");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:<24} {:>10.4} {:>10.4} {:>10.4}",
                row.name, row.precision, row.recall, row.f1
            );
        }

        if let Some(stats) = &self.corpus_stats {
            let _ = writeln!(out);
            let _ = writeln!(out, "Files analysed:        {}", stats.total_files);
            let _ = writeln!(out, "Reviews used:          {}", stats.used);
            let _ = writeln!(out, "Ignored (no label):    {}", stats.ignored_no_label);
            let _ = writeln!(out, "Ignored (too short):   {}", stats.ignored_too_short);
            let _ = writeln!(out, "Ignored (not review):  {}", stats.ignored_not_a_review);
            let _ = writeln!(out, "Unreadable:            {}", stats.unreadable);
        }
        out
    }
}

/// Destination for a finished report
pub trait ReportSink {
    fn name(&self) -> &str;

    fn publish(&mut self, report: &MetricsReport) -> Result<()>;
}

/// Fans a report out to every registered sink
#[derive(Default)]
pub struct Reporter {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Every sink is attempted even when an earlier one fails
    pub fn publish(&mut self, report: &MetricsReport) -> Result<()> {
        let mut failed = Vec::new();
        for sink in &mut self.sinks {
            match sink.publish(report) {
                Ok(()) => tracing::info!("Report published to {}", sink.name()),
                Err(e) => {
                    tracing::error!("Sink {} failed: {:#}", sink.name(), e);
                    failed.push(sink.name().to_string());
                }
            }
        }

        if !failed.is_empty() {
            bail!("{} of {} sinks failed: {}", failed.len(), self.sinks.len(), failed.join(", "));
        }
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Pretty JSON file
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn publish(&mut self, report: &MetricsReport) -> Result<()> {
        ensure_parent(&self.path)?;
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&self.path, json).with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Plain text dump
pub struct TextSink {
    path: PathBuf,
}

impl TextSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for TextSink {
    fn name(&self) -> &str {
        "text"
    }

    fn publish(&mut self, report: &MetricsReport) -> Result<()> {
        ensure_parent(&self.path)?;
        fs::write(&self.path, report.format()).with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Semicolon-delimited table
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn publish(&mut self, report: &MetricsReport) -> Result<()> {
        ensure_parent(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_path(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;

        writer.write_record([report.kind.key_column(), "precision", "recall", "f1"])?;
        for row in &report.rows {
            writer.write_record([
                row.name.clone(),
                format!("{:.4}", row.precision),
                format!("{:.4}", row.recall),
                format!("{:.4}", row.f1),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Embedded SQLite results database
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let conn = Connection::open(path).with_context(|| format!("Failed to open database {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Replace the table matching `report.kind` with the report rows
    pub fn save_report(&mut self, report: &MetricsReport) -> Result<()> {
        let table = report.kind.table();
        let key = report.kind.key_column();

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} ({key} TEXT, precision REAL, recall REAL, f1 REAL);
             DELETE FROM {table};"
        ))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table} ({key}, precision, recall, f1) VALUES (?1, ?2, ?3, ?4)"
            ))?;
            for row in &report.rows {
                stmt.execute(params![row.name, row.precision, row.recall, row.f1])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_report_rows(&self, kind: ReportKind) -> Result<Vec<MetricRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}, precision, recall, f1 FROM {} ORDER BY rowid",
            kind.key_column(),
            kind.table()
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MetricRow {
                    name: row.get(0)?,
                    precision: row.get(1)?,
                    recall: row.get(2)?,
                    f1: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Insert or replace one row per game
    pub fn save_game_sentiment(&mut self, games: &[GameSentiment]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS game_sentiment (
                game TEXT PRIMARY KEY,
                bracket TEXT,
                mean_sentiment REAL,
                review_count INTEGER,
                deviation REAL
            );",
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO game_sentiment (game, bracket, mean_sentiment, review_count, deviation)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for game in games {
                stmt.execute(params![
                    game.game,
                    game.bracket.to_string(),
                    game.mean_sentiment,
                    game.review_count as i64,
                    game.deviation
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn game_sentiment_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM game_sentiment", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

pub struct SqliteSink {
    path: PathBuf,
}

impl SqliteSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn publish(&mut self, report: &MetricsReport) -> Result<()> {
        SqliteStore::open(&self.path)?.save_report(report)
    }
}

/// Keeps published reports in memory; clones share the same storage
#[derive(Clone, Default)]
pub struct MemorySink {
    published: Arc<Mutex<Vec<MetricsReport>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<MetricsReport> {
        self.published.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn publish(&mut self, report: &MetricsReport) -> Result<()> {
        self.published
            .lock()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?
            .push(report.clone());
        Ok(())
    }
}

/// Markdown report of a classifier comparison
pub fn render_markdown(results: &EvaluationResults) -> String {
    let mut report = String::new();

    report.push_str("# Review Classifier Comparison Report\n\n");
    report.push_str(&format!("**Generated:** {}\n\n", results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
    report.push_str(&format!("**Version:** {}\n\n", results.version));

    let stats = &results.corpus_stats;
    report.push_str("## Corpus\n\n");
    report.push_str(&format!("- **Root:** {}\n", results.config.corpus.root.display()));
    let brackets: Vec<String> = results.config.corpus.brackets.iter().map(|b| b.to_string()).collect();
    report.push_str(&format!("- **Brackets:** {}\n", brackets.join(", ")));
    report.push_str(&format!("- **Files:** {} ({} used)\n", stats.total_files, stats.used));
    report.push_str(&format!(
        "- **Ignored:** no label={}, too short={}, not a review={}, unreadable={}\n",
        stats.ignored_no_label, stats.ignored_too_short, stats.ignored_not_a_review, stats.unreadable
    ));
    report.push_str(&format!(
        "- **Split:** Train={}, Test={}, Balanced train={}{}\n",
        results.split.train_samples,
        results.split.test_samples,
        results.split.balanced_train_samples,
        if results.split.resampled { " (oversampled)" } else { "" }
    ));
    report.push_str(&format!("- **Vocabulary:** {} terms\n\n", results.split.vocabulary_size));

    report.push_str("## Summary\n\n");
    report.push_str(&format!(
        "**Best Model:** {} (F1={:.4})\n\n",
        results.summary.best_model, results.summary.best_f1
    ));

    report.push_str("### Model Comparison\n\n");
    report.push_str("| Model | Precision | Recall | F1 Score | Accuracy | MCC |\n");
    report.push_str("|-------|-----------|--------|----------|----------|-----|\n");
    for result in &results.model_results {
        report.push_str(&format!(
            "| {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} |\n",
            result.model_name,
            result.precision,
            result.recall,
            result.f1,
            result.report.accuracy,
            result.report.mcc
        ));
    }

    report.push_str("\n## Detailed Results\n\n");
    for result in &results.model_results {
        report.push_str(&format!("### {}\n\n", result.model_name));
        report.push_str(&format!("*{}*\n\n", result.model_description));
        report.push_str(&format!("- Training samples: {}\n", result.training_samples));
        report.push_str(&format!("- Test samples: {}\n\n", result.test_samples));
        report.push_str(&format!("```\n{}\n```\n\n", result.report.format()));
    }

    report.push_str("## Configuration\n\n");
    report.push_str(&format!(
        "```json\n{}\n```\n",
        serde_json::to_string_pretty(&results.config).unwrap_or_default()
    ));

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bracket_result(name: &str, f1: f64) -> BracketResult {
        BracketResult {
            bracket: name.to_string(),
            precision: f1,
            recall: f1,
            f1,
            support: 10,
            degraded: 0,
        }
    }

    fn sample_report() -> MetricsReport {
        MetricsReport::from_brackets(&[
            bracket_result(GLOBAL_ROW, 0.7),
            bracket_result("90-100", 0.9),
            bracket_result("5-10", 0.5),
            bracket_result("30-40", 0.6),
        ])
    }

    #[test]
    fn test_bracket_rows_are_ordered() {
        let names: Vec<String> = sample_report().rows.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["5-10", "30-40", "90-100", "Global"]);
    }

    /// Always fails, to exercise the reporter's error path
    struct BrokenSink;

    impl ReportSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        fn publish(&mut self, _report: &MetricsReport) -> Result<()> {
            bail!("disk full")
        }
    }

    #[test]
    fn test_reporter_publishes_to_every_sink() {
        let memory = MemorySink::new();
        let mut reporter = Reporter::new().with_sink(BrokenSink).with_sink(memory.clone());

        let err = reporter.publish(&sample_report()).unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert_eq!(memory.reports().len(), 1);
        assert_eq!(memory.reports()[0], sample_report());
    }

    #[test]
    fn test_file_sinks() {
        let dir = TempDir::new().unwrap();
        let report = sample_report().with_corpus_stats(CorpusStats {
            total_files: 12,
            used: 10,
            ignored_no_label: 2,
            ..CorpusStats::default()
        });

        let mut reporter = Reporter::new()
            .with_sink(JsonSink::new(dir.path().join("out/scores.json")))
            .with_sink(TextSink::new(dir.path().join("out/scores.txt")))
            .with_sink(CsvSink::new(dir.path().join("out/scores.csv")));
        reporter.publish(&report).unwrap();

        let json: MetricsReport =
            serde_json::from_str(&fs::read_to_string(dir.path().join("out/scores.json")).unwrap()).unwrap();
        assert_eq!(json, report);

        let text = fs::read_to_string(dir.path().join("out/scores.txt")).unwrap();
        assert!(text.contains("Reviews used:          10"));

        let csv = fs::read_to_string(dir.path().join("out/scores.csv")).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("bracket;precision;recall;f1"));
        assert_eq!(lines.next(), Some("5-10;0.5000;0.5000;0.5000"));
    }

    #[test]
    fn test_sqlite_table_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.db");

        let mut sink = SqliteSink::new(&path);
        sink.publish(&sample_report()).unwrap();
        sink.publish(&sample_report()).unwrap();

        let store = SqliteStore::open(&path).unwrap();
        let rows = store.load_report_rows(ReportKind::Brackets).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].name, GLOBAL_ROW);
    }

    #[test]
    fn test_game_sentiment_upsert() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let game = GameSentiment {
            game: "Portal".to_string(),
            bracket: Bracket::new(90, 100),
            mean_sentiment: 0.6,
            review_count: 3,
            degraded_reviews: 0,
            deviation: 0.35,
        };
        store.save_game_sentiment(&[game.clone()]).unwrap();
        store
            .save_game_sentiment(&[GameSentiment {
                mean_sentiment: 0.2,
                ..game
            }])
            .unwrap();
        assert_eq!(store.game_sentiment_count().unwrap(), 1);
    }
}
