// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Review corpus loading
//!
//! The corpus lives on disk as `root/<bracket>/<game>/review_<n>.txt`. Each
//! review file starts with a `Note` line carrying a thumbs-up or thumbs-down
//! glyph, followed by the review body.

use crate::error::PipelineError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

/// Glyph marking a recommended review
pub const POSITIVE_MARK: &str = "👍";
/// Glyph marking a not-recommended review
pub const NEGATIVE_MARK: &str = "👎";
/// Prefix of the label line
pub const NOTE_MARKER: &str = "Note";

/// Binary review label, ordered Negative < Positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Negative, Label::Positive];

    pub fn from_positive(positive: bool) -> Self {
        if positive {
            Label::Positive
        } else {
            Label::Negative
        }
    }

    /// 1 for positive, 0 for negative
    pub fn to_binary(self) -> u8 {
        match self {
            Label::Positive => 1,
            Label::Negative => 0,
        }
    }

    pub fn index(self) -> usize {
        self.to_binary() as usize
    }

    pub fn marker(self) -> &'static str {
        match self {
            Label::Positive => POSITIVE_MARK,
            Label::Negative => NEGATIVE_MARK,
        }
    }
}

/// Count labels per class
pub fn label_distribution(labels: &[Label]) -> HashMap<Label, usize> {
    let mut dist = HashMap::new();
    for label in labels {
        *dist.entry(*label).or_insert(0) += 1;
    }
    dist
}

fn bracket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,3})-(\d{1,3})$").expect("static regex"))
}

/// A critic score range such as `30-40`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bracket {
    pub lower: u16,
    pub upper: u16,
}

impl Bracket {
    pub fn new(lower: u16, upper: u16) -> Self {
        Self { lower, upper }
    }

    /// Whether a directory name follows the bracket naming pattern
    pub fn matches(name: &str) -> bool {
        bracket_pattern().is_match(name)
    }
}

impl FromStr for Bracket {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = bracket_pattern()
            .captures(s.trim())
            .ok_or_else(|| PipelineError::InvalidBracket(s.to_string()))?;
        let lower = caps[1]
            .parse()
            .map_err(|_| PipelineError::InvalidBracket(s.to_string()))?;
        let upper = caps[2]
            .parse()
            .map_err(|_| PipelineError::InvalidBracket(s.to_string()))?;
        Ok(Self { lower, upper })
    }
}

impl TryFrom<String> for Bracket {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bracket> for String {
    fn from(bracket: Bracket) -> Self {
        bracket.to_string()
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

impl PartialOrd for Bracket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bracket {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.lower, self.upper).cmp(&(other.lower, other.upper))
    }
}

/// File naming convention of review files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLayout {
    pub prefix: String,
    pub extension: String,
}

impl Default for ReviewLayout {
    fn default() -> Self {
        Self {
            prefix: "review_".to_string(),
            extension: "txt".to_string(),
        }
    }
}

impl ReviewLayout {
    fn has_extension(&self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext == self.extension)
    }

    fn is_review(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.prefix) && self.has_extension(file_name)
    }

    pub fn file_name(&self, index: usize) -> String {
        format!("{}{}.{}", self.prefix, index, self.extension)
    }
}

/// Parsed content of a single review file
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewFile {
    /// First line, if any
    pub header: Option<String>,
    /// Label read from a `Note` header
    pub label: Option<Label>,
    /// Remaining lines joined with single spaces
    pub body: String,
}

impl ReviewFile {
    pub fn parse(content: &str) -> Self {
        let mut lines = content.lines();
        let header = lines
            .next()
            .map(|line| line.trim_start_matches('\u{feff}').to_string());

        let label = header.as_deref().and_then(|line| {
            line.starts_with(NOTE_MARKER)
                .then(|| Label::from_positive(line.contains(POSITIVE_MARK)))
        });

        let body = lines.collect::<Vec<_>>().join(" ").trim().to_string();

        Self {
            header,
            label,
            body,
        }
    }

    /// Label from an explicit thumbs glyph in the first line
    pub fn thumb(&self) -> Option<Label> {
        let header = self.header.as_deref()?;
        if header.contains(POSITIVE_MARK) {
            Some(Label::Positive)
        } else if header.contains(NEGATIVE_MARK) {
            Some(Label::Negative)
        } else {
            None
        }
    }

    /// Text handed to the sentiment oracle: the body of labeled files, the
    /// whole content otherwise
    pub fn scoring_text(&self) -> String {
        match (&self.label, &self.header) {
            (None, Some(header)) => format!("{} {}", header, self.body).trim().to_string(),
            _ => self.body.clone(),
        }
    }
}

/// Write a review in the corpus file format, returning the created path
pub fn write_review_file(
    dir: &Path,
    layout: &ReviewLayout,
    index: usize,
    label: Label,
    body: &str,
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(layout.file_name(index));
    fs::write(&path, format!("{} : {}\n\n{}", NOTE_MARKER, label.marker(), body))?;
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Review,
    NotAReview,
}

/// One text file found under a bracket/game directory
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub bracket: Bracket,
    pub game: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Validated listing of the text files under the selected brackets
#[derive(Debug, Clone, Default)]
pub struct ReviewManifest {
    pub entries: Vec<ManifestEntry>,
}

impl ReviewManifest {
    pub fn scan(root: &Path, brackets: &[Bracket], layout: &ReviewLayout) -> Result<Self, PipelineError> {
        if !root.is_dir() {
            return Err(PipelineError::MissingRoot(root.to_path_buf()));
        }

        let mut entries = Vec::new();

        for bracket in brackets {
            let Some(bracket_dir) = resolve_bracket_dir(root, bracket)? else {
                return Err(PipelineError::MissingBracket {
                    bracket: bracket.to_string(),
                    root: root.to_path_buf(),
                });
            };

            for game_dir in list_dir(&bracket_dir)? {
                if !game_dir.is_dir() {
                    continue;
                }
                let game = file_name(&game_dir);

                for path in list_dir(&game_dir)? {
                    let name = file_name(&path);
                    if !path.is_file() || !layout.has_extension(&name) {
                        continue;
                    }
                    let kind = if layout.is_review(&name) {
                        EntryKind::Review
                    } else {
                        EntryKind::NotAReview
                    };
                    entries.push(ManifestEntry {
                        bracket: *bracket,
                        game: game.clone(),
                        path,
                        kind,
                    });
                }
            }
        }

        entries.sort_by(|a, b| {
            (a.bracket, &a.game, &a.path).cmp(&(b.bracket, &b.game, &b.path))
        });

        Ok(Self { entries })
    }

    pub fn reviews(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Review)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))? {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        paths.push(entry.path());
    }
    Ok(paths)
}

/// Directory holding `bracket`, accepting zero-padded names such as `05-10`
/// when the canonical `5-10` is absent
fn resolve_bracket_dir(root: &Path, bracket: &Bracket) -> Result<Option<PathBuf>, PipelineError> {
    let canonical = root.join(bracket.to_string());
    if canonical.is_dir() {
        return Ok(Some(canonical));
    }

    let mut candidates: Vec<PathBuf> = list_dir(root)?
        .into_iter()
        .filter(|dir| dir.is_dir() && file_name(dir).parse::<Bracket>().ok().as_ref() == Some(bracket))
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// A bracket directory found under the review root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketSummary {
    pub bracket: Bracket,
    pub games: usize,
    pub review_files: usize,
}

/// List the bracket directories under `root`, ignoring names that are not
/// score ranges
pub fn discover_brackets(root: &Path, layout: &ReviewLayout) -> Result<Vec<BracketSummary>, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::MissingRoot(root.to_path_buf()));
    }

    let mut summaries = Vec::new();
    for dir in list_dir(root)? {
        let name = file_name(&dir);
        if !dir.is_dir() || !Bracket::matches(&name) {
            continue;
        }
        let bracket: Bracket = name.parse()?;

        let mut games = 0;
        let mut review_files = 0;
        for game_dir in list_dir(&dir)? {
            if !game_dir.is_dir() {
                continue;
            }
            games += 1;
            review_files += list_dir(&game_dir)?
                .iter()
                .filter(|p| p.is_file() && layout.is_review(&file_name(p)))
                .count();
        }

        summaries.push(BracketSummary {
            bracket,
            games,
            review_files,
        });
    }

    summaries.sort_by_key(|s| s.bracket);
    Ok(summaries)
}

/// A labeled review taken from one corpus file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub text: String,
    pub label: Label,
    pub bracket: Bracket,
    pub game: String,
}

/// File accounting for one corpus load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_files: usize,
    pub ignored_no_label: usize,
    pub ignored_too_short: usize,
    pub ignored_not_a_review: usize,
    pub unreadable: usize,
    pub used: usize,
}

impl CorpusStats {
    /// Every counted file lands in exactly one bucket
    pub fn is_consistent(&self) -> bool {
        self.used
            + self.ignored_no_label
            + self.ignored_too_short
            + self.ignored_not_a_review
            + self.unreadable
            == self.total_files
    }

    pub fn merge(&mut self, other: &CorpusStats) {
        self.total_files += other.total_files;
        self.ignored_no_label += other.ignored_no_label;
        self.ignored_too_short += other.ignored_too_short;
        self.ignored_not_a_review += other.ignored_not_a_review;
        self.unreadable += other.unreadable;
        self.used += other.used;
    }
}

/// Where and how to load reviews
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub root: PathBuf,
    pub brackets: Vec<Bracket>,
    /// Minimum body length in characters
    pub min_length: usize,
    pub layout: ReviewLayout,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("reviews"),
            brackets: Vec::new(),
            min_length: 1,
            layout: ReviewLayout::default(),
        }
    }
}

/// Labeled reviews of the selected brackets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub records: Vec<ReviewRecord>,
    pub stats: CorpusStats,
}

impl Corpus {
    pub fn load(config: &CorpusConfig) -> Result<Self, PipelineError> {
        let manifest = ReviewManifest::scan(&config.root, &config.brackets, &config.layout)?;
        let corpus = Self::from_manifest(&manifest, config.min_length);

        tracing::info!(
            "Corpus loaded from {}: {} used of {} files (no label={}, too short={}, not a review={}, unreadable={})",
            config.root.display(),
            corpus.stats.used,
            corpus.stats.total_files,
            corpus.stats.ignored_no_label,
            corpus.stats.ignored_too_short,
            corpus.stats.ignored_not_a_review,
            corpus.stats.unreadable
        );

        Ok(corpus)
    }

    pub fn from_manifest(manifest: &ReviewManifest, min_length: usize) -> Self {
        let mut corpus = Self::default();

        for entry in &manifest.entries {
            corpus.stats.total_files += 1;

            if entry.kind == EntryKind::NotAReview {
                corpus.stats.ignored_not_a_review += 1;
                continue;
            }

            let content = match fs::read_to_string(&entry.path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Skipping unreadable review {}: {}", entry.path.display(), e);
                    corpus.stats.unreadable += 1;
                    continue;
                }
            };

            let file = ReviewFile::parse(&content);
            let Some(label) = file.label else {
                corpus.stats.ignored_no_label += 1;
                continue;
            };

            if file.body.chars().count() < min_length {
                corpus.stats.ignored_too_short += 1;
                continue;
            }

            corpus.records.push(ReviewRecord {
                text: file.body,
                label,
                bracket: entry.bracket,
                game: entry.game.clone(),
            });
            corpus.stats.used += 1;
        }

        corpus
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.records.iter().map(|r| r.label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    fn corpus_config(root: &Path, brackets: &[&str], min_length: usize) -> CorpusConfig {
        CorpusConfig {
            root: root.to_path_buf(),
            brackets: brackets.iter().map(|b| b.parse().unwrap()).collect(),
            min_length,
            layout: ReviewLayout::default(),
        }
    }

    #[test]
    fn test_parse_positive_review() {
        let file = ReviewFile::parse("Note: 👍\nGreat game");
        assert_eq!(file.label, Some(Label::Positive));
        assert_eq!(file.body, "Great game");
    }

    #[test]
    fn test_parse_joins_body_lines() {
        let file = ReviewFile::parse("Note : 👎\n\nToo many bugs.\nRefunded.\n");
        assert_eq!(file.label, Some(Label::Negative));
        assert_eq!(file.body, "Too many bugs. Refunded.");
        assert_eq!(file.thumb(), Some(Label::Negative));
    }

    #[test]
    fn test_parse_without_marker() {
        let file = ReviewFile::parse("Just some text\nmore text");
        assert_eq!(file.label, None);
        assert_eq!(file.scoring_text(), "Just some text more text");

        let empty = ReviewFile::parse("");
        assert_eq!(empty.label, None);
        assert!(empty.body.is_empty());
    }

    #[test]
    fn test_bracket_parsing() {
        let bracket: Bracket = "30-40".parse().unwrap();
        assert_eq!(bracket, Bracket::new(30, 40));
        assert_eq!(bracket.to_string(), "30-40");

        assert!("30-40-50".parse::<Bracket>().is_err());
        assert!("abc".parse::<Bracket>().is_err());
        assert!("1000-2000".parse::<Bracket>().is_err());
        assert!(Bracket::new(9, 10) < Bracket::new(10, 20));
    }

    #[test]
    fn test_label_round_trip_through_file() {
        let tmp = TempDir::new().unwrap();
        let game_dir = tmp.path().join("70-80").join("Some Game");
        let layout = ReviewLayout::default();

        write_review_file(&game_dir, &layout, 1, Label::Positive, "Loved it").unwrap();
        write_review_file(&game_dir, &layout, 2, Label::Negative, "Hated it").unwrap();

        let corpus = Corpus::load(&corpus_config(tmp.path(), &["70-80"], 1)).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.records[0].label, Label::Positive);
        assert_eq!(corpus.records[0].text, "Loved it");
        assert_eq!(corpus.records[1].label, Label::Negative);
        assert_eq!(corpus.records[1].game, "Some Game");
        assert_eq!(corpus.records[1].bracket, Bracket::new(70, 80));
    }

    #[test]
    fn test_load_accounts_for_every_file() {
        let tmp = TempDir::new().unwrap();
        let game = tmp.path().join("30-40").join("Game A");
        write(&game, "review_1.txt", "Note : 👍\n\nGood fun");
        write(&game, "review_2.txt", "Note : 👎\n\n");
        write(&game, "review_3.txt", "no marker here\nbody");
        write(&game, "notes.txt", "Note : 👍\n\nnot a review file");
        write(&game, "cover.png", "binary");
        fs::write(game.join("review_4.txt"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let other = tmp.path().join("30-40").join("Game B");
        write(&other, "review_1.txt", "Note : 👎\n\nBoring");

        let corpus = Corpus::load(&corpus_config(tmp.path(), &["30-40"], 1)).unwrap();
        let stats = &corpus.stats;

        assert_eq!(stats.total_files, 6);
        assert_eq!(stats.used, 2);
        assert_eq!(stats.ignored_too_short, 1);
        assert_eq!(stats.ignored_no_label, 1);
        assert_eq!(stats.ignored_not_a_review, 1);
        assert_eq!(stats.unreadable, 1);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_empty_body_excluded_with_positive_minimum() {
        let tmp = TempDir::new().unwrap();
        let game = tmp.path().join("10-20").join("G");
        write(&game, "review_1.txt", "Note : 👍\n");

        let strict = Corpus::load(&corpus_config(tmp.path(), &["10-20"], 1)).unwrap();
        assert_eq!(strict.stats.ignored_too_short, 1);
        assert!(strict.is_empty());

        let lenient = Corpus::load(&corpus_config(tmp.path(), &["10-20"], 0)).unwrap();
        assert_eq!(lenient.len(), 1);
    }

    #[test]
    fn test_missing_bracket_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("30-40")).unwrap();

        let err = Corpus::load(&corpus_config(tmp.path(), &["50-60"], 1)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingBracket { .. }));

        let err = Corpus::load(&corpus_config(&tmp.path().join("nope"), &["30-40"], 1)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingRoot(_)));
    }

    #[test]
    fn test_discover_brackets_ignores_other_directories() {
        let tmp = TempDir::new().unwrap();
        let layout = ReviewLayout::default();
        write(&tmp.path().join("90-100").join("G"), "review_1.txt", "Note : 👍\n\nx");
        write(&tmp.path().join("90-100").join("G"), "review_2.txt", "Note : 👍\n\ny");
        write(&tmp.path().join("0-10").join("H"), "review_1.txt", "Note : 👎\n\nz");
        fs::create_dir_all(tmp.path().join("misc")).unwrap();
        fs::create_dir_all(tmp.path().join("30-40-old")).unwrap();
        write(tmp.path(), "10-20", "a file, not a directory");

        let found = discover_brackets(tmp.path(), &layout).unwrap();
        let names: Vec<String> = found.iter().map(|s| s.bracket.to_string()).collect();

        assert_eq!(names, vec!["0-10", "90-100"]);
        assert_eq!(found[1].review_files, 2);
        assert_eq!(found[1].games, 1);
    }

    #[test]
    fn test_zero_padded_bracket_directory_loads() {
        let tmp = TempDir::new().unwrap();
        let layout = ReviewLayout::default();
        write(&tmp.path().join("00-10").join("G"), "review_1.txt", "Note : 👍\n\nfine");
        write(&tmp.path().join("05-15").join("H"), "review_1.txt", "Note : 👎\n\nmeh");

        let brackets: Vec<Bracket> = discover_brackets(tmp.path(), &layout)
            .unwrap()
            .into_iter()
            .map(|s| s.bracket)
            .collect();
        assert_eq!(brackets, vec![Bracket::new(0, 10), Bracket::new(5, 15)]);

        let config = CorpusConfig {
            root: tmp.path().to_path_buf(),
            brackets,
            min_length: 1,
            layout,
        };
        let corpus = Corpus::load(&config).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.records[0].bracket, Bracket::new(0, 10));
        assert_eq!(corpus.records[0].game, "G");
        assert_eq!(corpus.records[1].text, "meh");
    }

    #[test]
    fn test_canonical_bracket_directory_preferred() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("5-10").join("A"), "review_1.txt", "Note : 👍\n\ncanonical");
        write(&tmp.path().join("05-10").join("B"), "review_1.txt", "Note : 👍\n\npadded");

        let corpus = Corpus::load(&corpus_config(tmp.path(), &["5-10"], 1)).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.records[0].text, "canonical");
    }
}
