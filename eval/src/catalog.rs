// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Descriptive statistics over game metadata
//!
//! Reads the game catalog from a CSV export or from the `jeux` table of a
//! catalog database, maps Steam rating labels to an ordinal score, and
//! summarises critic scores against user reviews.

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Steam rating labels, English and French, on a -4..=4 scale
const RATING_SCALE: &[(&str, i8)] = &[
    ("overwhelmingly negative", -4),
    ("extremely negative", -4),
    ("very negative", -3),
    ("negative", -2),
    ("mostly negative", -1),
    ("mixed", 0),
    ("positive", 1),
    ("mostly positive", 2),
    ("very positive", 3),
    ("overwhelmingly positive", 4),
    ("extremely positive", 4),
    ("extrêmement négatives", -4),
    ("très négatives", -3),
    ("négatives", -2),
    ("plutôt négatives", -1),
    ("moyennes", 0),
    ("positives", 1),
    ("plutôt positives", 2),
    ("très positives", 3),
    ("extrêmement positives", 4),
];

fn normalise_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Ordinal score of a Steam rating label, case and whitespace insensitive
pub fn rating_score(label: &str) -> Option<i8> {
    let key = normalise_label(label);
    RATING_SCALE.iter().find(|(name, _)| *name == key).map(|(_, score)| *score)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    name: String,
    #[serde(default)]
    app_id: String,
    #[serde(default)]
    metacritic: String,
    #[serde(default)]
    steam_rating: String,
    #[serde(default)]
    reviews_total: String,
    #[serde(default)]
    reviews_positive: String,
    #[serde(default)]
    reviews_negative: String,
    #[serde(default)]
    controversies: String,
}

/// Catalog table of a game metadata database
pub const CATALOG_TABLE: &str = "jeux";

/// Columns are declared TEXT or INTEGER but SQLite stores whatever it was given
fn sql_text(value: Value) -> String {
    match value {
        Value::Null | Value::Blob(_) => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => t,
    }
}

fn numeric(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn text(field: &str) -> Option<String> {
    let trimmed = field.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// One game of the catalog; unparsable numbers become `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub app_id: Option<u32>,
    pub metacritic: Option<f64>,
    pub steam_rating: Option<String>,
    pub reviews_total: Option<f64>,
    pub reviews_positive: Option<f64>,
    pub reviews_negative: Option<f64>,
    pub controversies: Option<String>,
}

impl GameMetadata {
    fn from_row(row: CatalogRow) -> Self {
        Self {
            name: row.name.trim().to_string(),
            app_id: row.app_id.trim().parse().ok(),
            metacritic: numeric(&row.metacritic),
            steam_rating: text(&row.steam_rating),
            reviews_total: numeric(&row.reviews_total),
            reviews_positive: numeric(&row.reviews_positive),
            reviews_negative: numeric(&row.reviews_negative),
            controversies: text(&row.controversies),
        }
    }

    pub fn rating_score(&self) -> Option<i8> {
        self.steam_rating.as_deref().and_then(rating_score)
    }

    /// Positive share of all reviews, 0 when it cannot be computed
    pub fn positive_ratio(&self) -> f64 {
        match (self.reviews_positive, self.reviews_total) {
            (Some(pos), Some(total)) if total > 0.0 => pos / total,
            _ => 0.0,
        }
    }
}

/// Count, mean, sample standard deviation and quartiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// 0.0 for fewer than two values
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// `None` for an empty input
pub fn describe(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n < 2 {
        0.0
    } else {
        (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    };

    Some(Summary {
        count: n,
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Frequency summary of a text column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: usize,
}

pub fn describe_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> LabelSummary {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut count = 0;
    for label in labels {
        *counts.entry(normalise_label(label)).or_insert(0) += 1;
        count += 1;
    }
    // most frequent, alphabetical among equals
    let top = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(label, freq)| (label.clone(), *freq));

    LabelSummary {
        count,
        unique: counts.len(),
        freq: top.as_ref().map_or(0, |(_, f)| *f),
        top: top.map(|(label, _)| label),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub r: f64,
    /// Two-sided p-value of the Student t test on `r`
    pub p_value: f64,
    pub n: usize,
}

/// Pearson correlation; `None` with fewer than 3 pairs or a constant side
pub fn pearson(pairs: &[(f64, f64)]) -> Option<Correlation> {
    let n = pairs.len();
    if n < 3 {
        return None;
    }

    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let p_value = if (1.0 - r.abs()) < 1e-15 {
        0.0
    } else {
        let t2 = r * r * df / (1.0 - r * r);
        regularized_beta(df / 2.0, 0.5, df / (df + t2))
    };

    Some(Correlation { r, p_value, n })
}

const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin().abs()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + 7.5;
    let mut a = LANCZOS[0];
    for (i, c) in LANCZOS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// Continued fraction for the incomplete beta function (modified Lentz)
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 3e-15;
    const FPMIN: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta function I_x(a, b)
fn regularized_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Review totals of the games whose critic score falls in one band of ten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    /// Lower bound, `floor(metacritic / 10) * 10`
    pub band: i64,
    pub games: usize,
    pub reviews_total: f64,
    pub reviews_positive: f64,
    pub reviews_negative: f64,
    pub mean_positive_ratio: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub games: Vec<GameMetadata>,
}

impl Catalog {
    pub fn from_reader<R: std::io::Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let mut games = Vec::new();
        for (line, row) in rdr.deserialize::<CatalogRow>().enumerate() {
            match row {
                Ok(row) => games.push(GameMetadata::from_row(row)),
                Err(e) => tracing::warn!("Skipping catalog row {}: {}", line + 2, e),
            }
        }
        Ok(Self { games })
    }

    pub fn load(path: &Path, delimiter: u8) -> Result<Self> {
        let file = fs::File::open(path).with_context(|| format!("Failed to open catalog {}", path.display()))?;
        let catalog = Self::from_reader(file, delimiter)?;
        tracing::info!("Loaded {} games from {}", catalog.games.len(), path.display());
        Ok(catalog)
    }

    /// Read every row of the catalog table, in insertion order
    pub fn from_sqlite(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open catalog database {}", path.display()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT nom, app_id, note_metacritic, evaluation_steam, reviews_total, reviews_pos, reviews_neg, controverses \
                 FROM {} ORDER BY rowid",
                CATALOG_TABLE
            ))
            .with_context(|| format!("No readable {} table in {}", CATALOG_TABLE, path.display()))?;

        let rows = stmt.query_map([], |row| {
            Ok(CatalogRow {
                name: sql_text(row.get(0)?),
                app_id: sql_text(row.get(1)?),
                metacritic: sql_text(row.get(2)?),
                steam_rating: sql_text(row.get(3)?),
                reviews_total: sql_text(row.get(4)?),
                reviews_positive: sql_text(row.get(5)?),
                reviews_negative: sql_text(row.get(6)?),
                controversies: sql_text(row.get(7)?),
            })
        })?;

        let mut games = Vec::new();
        for row in rows {
            games.push(GameMetadata::from_row(row?));
        }

        tracing::info!("Loaded {} games from {}", games.len(), path.display());
        Ok(Self { games })
    }

    pub fn metacritic_scores(&self) -> Vec<f64> {
        self.games.iter().filter_map(|g| g.metacritic).collect()
    }

    /// Ordinal Steam rating scores of the games whose label is known
    pub fn rating_scores(&self) -> Vec<f64> {
        self.games.iter().filter_map(|g| g.rating_score()).map(f64::from).collect()
    }

    /// Correlation between critic score and Steam rating score
    pub fn score_correlation(&self) -> Option<Correlation> {
        let pairs: Vec<(f64, f64)> = self
            .games
            .iter()
            .filter_map(|g| Some((g.metacritic?, f64::from(g.rating_score()?))))
            .collect();
        pearson(&pairs)
    }

    /// Bands in ascending order; games without a critic score are left out
    pub fn score_bands(&self) -> Vec<ScoreBand> {
        let mut groups: BTreeMap<i64, Vec<&GameMetadata>> = BTreeMap::new();
        for game in &self.games {
            if let Some(score) = game.metacritic {
                let band = (score / 10.0).floor() as i64 * 10;
                groups.entry(band).or_default().push(game);
            }
        }

        groups
            .into_iter()
            .map(|(band, games)| {
                let sum = |f: fn(&GameMetadata) -> Option<f64>| games.iter().filter_map(|g| f(g)).sum::<f64>();
                ScoreBand {
                    band,
                    games: games.len(),
                    reviews_total: sum(|g| g.reviews_total),
                    reviews_positive: sum(|g| g.reviews_positive),
                    reviews_negative: sum(|g| g.reviews_negative),
                    mean_positive_ratio: games.iter().map(|g| g.positive_ratio()).sum::<f64>() / games.len() as f64,
                }
            })
            .collect()
    }

    pub fn report(&self) -> CatalogReport {
        CatalogReport {
            games: self.games.len(),
            metacritic: describe(&self.metacritic_scores()),
            steam_rating: describe_labels(self.games.iter().filter_map(|g| g.steam_rating.as_deref())),
            rating_scores: describe(&self.rating_scores()),
            correlation: self.score_correlation(),
            bands: self.score_bands(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogReport {
    pub games: usize,
    pub metacritic: Option<Summary>,
    pub steam_rating: LabelSummary,
    pub rating_scores: Option<Summary>,
    pub correlation: Option<Correlation>,
    pub bands: Vec<ScoreBand>,
}

fn push_summary(out: &mut String, summary: &Option<Summary>) {
    match summary {
        Some(s) => {
            let _ = writeln!(out, "count  {}", s.count);
            let _ = writeln!(out, "mean   {:.4}", s.mean);
            let _ = writeln!(out, "std    {:.4}", s.std);
            let _ = writeln!(out, "min    {:.4}", s.min);
            let _ = writeln!(out, "25%    {:.4}", s.q25);
            let _ = writeln!(out, "50%    {:.4}", s.median);
            let _ = writeln!(out, "75%    {:.4}", s.q75);
            let _ = writeln!(out, "max    {:.4}", s.max);
        }
        None => {
            let _ = writeln!(out, "no values");
        }
    }
}

impl CatalogReport {
    /// Plain text dump of every statistic
    pub fn format(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Games: {}\n", self.games);

        let _ = writeln!(out, "--- Metacritic score ---");
        push_summary(&mut out, &self.metacritic);

        let _ = writeln!(out, "\n--- Steam rating ---");
        let _ = writeln!(out, "count  {}", self.steam_rating.count);
        let _ = writeln!(out, "unique {}", self.steam_rating.unique);
        let _ = writeln!(out, "top    {}", self.steam_rating.top.as_deref().unwrap_or("-"));
        let _ = writeln!(out, "freq   {}", self.steam_rating.freq);

        let _ = writeln!(out, "\n--- Steam rating score ---");
        push_summary(&mut out, &self.rating_scores);

        match &self.correlation {
            Some(c) => {
                let _ = writeln!(out, "\nMetacritic / Steam rating correlation: {:.2} (p={:.3}, n={})", c.r, c.p_value, c.n);
            }
            None => {
                let _ = writeln!(out, "\nMetacritic / Steam rating correlation: not computable");
            }
        }

        let _ = writeln!(out, "\n--- Summary by Metacritic band ---");
        let _ = writeln!(
            out,
            "{:>6} {:>6} {:>14} {:>14} {:>14} {:>8}",
            "band", "games", "total", "positive", "negative", "ratio"
        );
        for band in &self.bands {
            let _ = writeln!(
                out,
                "{:>6} {:>6} {:>14} {:>14} {:>14} {:>8.4}",
                band.band, band.games, band.reviews_total, band.reviews_positive, band.reviews_negative, band.mean_positive_ratio
            );
        }
        out
    }

    pub fn write_text(&self, path: &Path) -> Result<()> {
        fs::write(path, self.format()).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Semicolon-delimited export of the band summary
pub fn export_bands_csv(bands: &[ScoreBand], path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(["metacritic_band", "reviews_total", "reviews_positive", "reviews_negative", "positive_ratio"])?;
    for band in bands {
        writer.write_record([
            band.band.to_string(),
            band.reviews_total.to_string(),
            band.reviews_positive.to_string(),
            band.reviews_negative.to_string(),
            format!("{:.4}", band.mean_positive_ratio),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = "\
name,app_id,metacritic,steam_rating,reviews_total,reviews_positive,reviews_negative,controversies
Portal 2,620,95,Overwhelmingly Positive,1000,980,20,
Hades,1145360,93,  très positives ,500,480,20,
No Man's Sky,275850,71,Mostly Positive,800,600,200,launch
Cyberpunk 2077,1091500,78,Mixed,0,0,0,bugs
Unknown,abc,n/a,Mixed,10,5,5,
";

    fn catalog() -> Catalog {
        Catalog::from_reader(CATALOG.as_bytes(), b',').unwrap()
    }

    #[test]
    fn test_rating_score() {
        assert_eq!(rating_score("Overwhelmingly Positive"), Some(4));
        assert_eq!(rating_score("  mostly   NEGATIVE "), Some(-1));
        assert_eq!(rating_score("Plutôt positives"), Some(2));
        assert_eq!(rating_score("Extrêmement négatives"), Some(-4));
        assert_eq!(rating_score("No user reviews"), None);
    }

    #[test]
    fn test_lenient_parsing() {
        let catalog = catalog();
        assert_eq!(catalog.games.len(), 5);
        let unknown = &catalog.games[4];
        assert_eq!(unknown.app_id, None);
        assert_eq!(unknown.metacritic, None);
        assert_eq!(catalog.games[1].rating_score(), Some(3));
        assert_eq!(catalog.games[2].controversies.as_deref(), Some("launch"));
    }

    #[test]
    fn test_describe() {
        let s = describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.5).abs() < 1e-12);
        assert!((s.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((s.q25 - 1.75).abs() < 1e-12);
        assert!((s.median - 2.5).abs() < 1e-12);
        assert!((s.q75 - 3.25).abs() < 1e-12);
        assert_eq!((s.min, s.max), (1.0, 4.0));

        assert!(describe(&[]).is_none());
        assert_eq!(describe(&[7.0]).unwrap().std, 0.0);
    }

    #[test]
    fn test_pearson() {
        let perfect = pearson(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0), (4.0, 8.0)]).unwrap();
        assert!((perfect.r - 1.0).abs() < 1e-12);
        assert_eq!(perfect.p_value, 0.0);

        // one degree of freedom: t follows a Cauchy law, p = 1 - 2/pi * atan(|t|)
        let weak = pearson(&[(1.0, 1.0), (2.0, 3.0), (3.0, 2.0)]).unwrap();
        assert!((weak.r - 0.5).abs() < 1e-12);
        assert!((weak.p_value - 2.0 / 3.0).abs() < 1e-9);

        assert!(pearson(&[(1.0, 1.0), (2.0, 2.0)]).is_none());
        assert!(pearson(&[(1.0, 5.0), (2.0, 5.0), (3.0, 5.0)]).is_none());
    }

    #[test]
    fn test_p_value_larger_sample() {
        // r = 0.6 with n = 10: t = 2.1213, df = 8, two-sided p ~= 0.0667
        let p = regularized_beta(4.0, 0.5, 8.0 / (8.0 + 4.5));
        assert!((p - 0.0667).abs() < 5e-4);
    }

    #[test]
    fn test_load_from_database() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("steam.db");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE jeux (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nom TEXT NOT NULL,
                app_id TEXT,
                note_metacritic TEXT,
                evaluation_steam TEXT,
                reviews_total INTEGER,
                reviews_pos INTEGER,
                reviews_neg INTEGER,
                controverses TEXT
            );
            INSERT INTO jeux (nom, app_id, note_metacritic, evaluation_steam, reviews_total, reviews_pos, reviews_neg, controverses)
                VALUES ('Portal 2', '620', '95', 'Très positives', 1000, 980, 20, NULL);
            INSERT INTO jeux (nom, app_id, note_metacritic, evaluation_steam, reviews_total, reviews_pos, reviews_neg, controverses)
                VALUES ('Mystery', NULL, NULL, NULL, 0, 0, 0, 'none');",
        )
        .unwrap();
        drop(conn);

        let catalog = Catalog::from_sqlite(&db).unwrap();
        assert_eq!(catalog.games.len(), 2);

        let portal = &catalog.games[0];
        assert_eq!(portal.name, "Portal 2");
        assert_eq!(portal.app_id, Some(620));
        assert_eq!(portal.metacritic, Some(95.0));
        assert_eq!(portal.rating_score(), Some(3));
        assert_eq!(portal.reviews_positive, Some(980.0));
        assert_eq!(portal.controversies, None);

        let mystery = &catalog.games[1];
        assert_eq!(mystery.metacritic, None);
        assert_eq!(mystery.steam_rating, None);
        assert_eq!(mystery.positive_ratio(), 0.0);

        assert!(Catalog::from_sqlite(&dir.path().join("missing.db")).is_err());
    }

    #[test]
    fn test_score_bands() {
        let bands = catalog().score_bands();
        assert_eq!(bands.iter().map(|b| b.band).collect::<Vec<_>>(), vec![70, 90]);

        let seventies = &bands[0];
        assert_eq!(seventies.games, 2);
        assert_eq!(seventies.reviews_total, 800.0);
        // 600/800 and 0 for the game without reviews
        assert!((seventies.mean_positive_ratio - 0.375).abs() < 1e-12);

        let nineties = &bands[1];
        assert_eq!(nineties.reviews_positive, 1460.0);
    }

    #[test]
    fn test_report_and_exports() {
        let dir = TempDir::new().unwrap();
        let report = catalog().report();

        assert_eq!(report.games, 5);
        assert_eq!(report.metacritic.unwrap().count, 4);
        assert_eq!(report.steam_rating.top.as_deref(), Some("mixed"));
        assert_eq!(report.steam_rating.freq, 2);
        assert_eq!(report.correlation.unwrap().n, 4);

        let txt = dir.path().join("stats.txt");
        report.write_text(&txt).unwrap();
        assert!(fs::read_to_string(&txt).unwrap().contains("Summary by Metacritic band"));

        let csv_path = dir.path().join("bands.csv");
        export_bands_csv(&report.bands, &csv_path).unwrap();
        let csv = fs::read_to_string(&csv_path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("metacritic_band;reviews_total;reviews_positive;reviews_negative;positive_ratio")
        );
        assert_eq!(lines.next(), Some("70;800;600;200;0.3750"));
    }
}
