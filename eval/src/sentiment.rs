// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Language-aware heuristic sentiment oracle
//!
//! The oracle is an advisory label source: it detects whether a review is
//! English or French, applies a small lexicon scorer for that language and
//! never fails. Anything it cannot score comes back as a neutral `0.0`
//! tagged with a [`ScoreStatus`] explaining why.

use crate::corpus::{Bracket, Label};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    French,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }
}

/// How a sentiment score was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Scored(Language),
    /// A language was recognised but has no scorer
    Unsupported,
    /// No usable words, or no clear language signal
    Undetectable,
    /// The scorer produced a non-finite value
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentOutcome {
    /// Signed polarity in [-1, 1], 0.0 whenever `status` is not `Scored`
    pub score: f64,
    pub status: ScoreStatus,
}

impl SentimentOutcome {
    fn scored(score: f64, language: Language) -> Self {
        if !score.is_finite() {
            return Self::neutral(ScoreStatus::Failed);
        }
        Self {
            score: score.clamp(-1.0, 1.0),
            status: ScoreStatus::Scored(language),
        }
    }

    fn neutral(status: ScoreStatus) -> Self {
        Self { score: 0.0, status }
    }

    /// Positive iff the score is strictly above zero
    pub fn label(&self) -> Label {
        Label::from_positive(self.score > 0.0)
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self.status, ScoreStatus::Scored(_))
    }
}

const ENGLISH_STOPWORDS: &[&str] = &[
    "the", "and", "is", "it", "this", "that", "of", "to", "in", "was", "for", "with", "you", "are", "but",
    "have", "be", "not", "game", "my", "so", "if", "just", "very", "they", "what", "at", "can", "would",
    "there", "all", "i", "its", "it's", "from", "or", "an", "as", "been", "too", "really", "get", "don't",
];

const FRENCH_STOPWORDS: &[&str] = &[
    "le", "la", "les", "de", "des", "du", "et", "est", "un", "une", "que", "qui", "pas", "pour", "dans",
    "ce", "il", "elle", "je", "mais", "avec", "sur", "au", "aux", "ne", "jeu", "tres", "très", "c", "j",
    "n", "y", "bien", "tout", "sont", "ou", "vous", "nous", "mon", "son", "sa", "ses", "cette", "ça",
];

const FRENCH_ACCENTS: &[char] = &['à', 'â', 'ç', 'é', 'è', 'ê', 'ë', 'î', 'ï', 'ô', 'û', 'ù', 'ü', 'ÿ', 'œ'];

/// Outcome of language detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Detected(Language),
    Unsupported,
    Undetectable,
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphabetic() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stopword-profile language detection
///
/// Text without any alphabetic word, or with as many English as French
/// hits, is undetectable. Without any stopword hit the sentiment lexicons
/// decide; words that match neither mean some other language, which is
/// unsupported.
pub fn detect_language(text: &str) -> Detection {
    let tokens = words(text);
    if tokens.is_empty() {
        return Detection::Undetectable;
    }

    let english: HashSet<&str> = ENGLISH_STOPWORDS.iter().copied().collect();
    let french: HashSet<&str> = FRENCH_STOPWORDS.iter().copied().collect();

    let mut en_hits = 0usize;
    let mut fr_hits = 0usize;
    for token in &tokens {
        if english.contains(token.as_str()) {
            en_hits += 1;
        }
        // apostrophes split French elisions such as "n'est"
        let parts: Vec<&str> = token.split('\'').collect();
        if parts.iter().any(|p| french.contains(*p)) || token.contains(FRENCH_ACCENTS) {
            fr_hits += 1;
        }
    }

    if en_hits == 0 && fr_hits == 0 {
        return detect_by_lexicon(&tokens);
    }

    match en_hits.cmp(&fr_hits) {
        std::cmp::Ordering::Greater => Detection::Detected(Language::English),
        std::cmp::Ordering::Less => Detection::Detected(Language::French),
        std::cmp::Ordering::Equal => Detection::Undetectable,
    }
}

fn in_lexicon(lexicon: &[(&str, f64)], token: &str) -> bool {
    lexicon.iter().any(|(word, _)| *word == token)
}

/// Fallback for short reviews such as "Masterpiece" that carry no stopword.
/// Words found in both lexicons read as English.
fn detect_by_lexicon(tokens: &[String]) -> Detection {
    let en_hits = tokens.iter().filter(|t| in_lexicon(ENGLISH_LEXICON, t.as_str())).count();
    let fr_hits = tokens.iter().filter(|t| in_lexicon(FRENCH_LEXICON, t.as_str())).count();

    if en_hits == 0 && fr_hits == 0 {
        Detection::Unsupported
    } else if en_hits >= fr_hits {
        Detection::Detected(Language::English)
    } else {
        Detection::Detected(Language::French)
    }
}

const ENGLISH_LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8), ("awesome", 3.1), ("beautiful", 2.9), ("best", 3.2), ("brilliant", 2.8),
    ("charming", 2.2), ("cool", 1.3), ("enjoy", 2.2), ("enjoyable", 1.9), ("enjoyed", 2.3),
    ("excellent", 2.7), ("fantastic", 2.6), ("fun", 2.3), ("funny", 1.9), ("good", 1.9),
    ("gorgeous", 3.0), ("great", 3.1), ("happy", 2.7), ("incredible", 2.4), ("like", 1.5),
    ("liked", 1.8), ("love", 3.2), ("loved", 2.9), ("masterpiece", 3.1), ("nice", 1.8),
    ("perfect", 2.7), ("polished", 1.8), ("recommend", 1.5), ("recommended", 1.6), ("relaxing", 2.2),
    ("satisfying", 2.0), ("smooth", 1.3), ("solid", 1.2), ("superb", 3.1), ("wonderful", 2.7),
    ("addictive", 1.2), ("beautifully", 2.7), ("worth", 0.9), ("win", 2.8), ("better", 1.9),
    ("bad", -2.5), ("boring", -1.3), ("broken", -2.2), ("buggy", -1.9), ("bugs", -1.1),
    ("crash", -1.7), ("crashes", -1.7), ("disappointing", -2.2), ("disappointed", -1.9), ("dull", -1.7),
    ("garbage", -2.4), ("hate", -2.7), ("hated", -3.2), ("horrible", -2.5), ("lame", -1.8),
    ("mediocre", -1.6), ("mess", -1.5), ("annoying", -1.8), ("poor", -2.1), ("refund", -1.0),
    ("sad", -2.1), ("terrible", -2.1), ("trash", -1.8), ("ugly", -2.3), ("unplayable", -2.5),
    ("waste", -1.8), ("worse", -2.1), ("worst", -3.1), ("awful", -2.0), ("frustrating", -1.9),
    ("lag", -1.2), ("laggy", -1.5), ("overpriced", -1.6), ("repetitive", -1.2), ("scam", -2.8),
];

const ENGLISH_BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", 0.293), ("completely", 0.293), ("extremely", 0.293), ("incredibly", 0.293),
    ("really", 0.293), ("so", 0.293), ("totally", 0.293), ("very", 0.293), ("super", 0.293),
    ("barely", -0.293), ("kinda", -0.293), ("slightly", -0.293), ("somewhat", -0.293), ("little", -0.293),
];

const ENGLISH_NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "cannot", "without", "hardly",
];

/// Scaling of a valence under negation
const NEGATION_SCALAR: f64 = -0.74;
/// Shift added to an ALL-CAPS sentiment word in mixed-case text
const CAPS_INCREMENT: f64 = 0.733;
/// Emphasis per exclamation mark, up to four marks
const EXCLAMATION_INCREMENT: f64 = 0.292;
/// Normalisation constant of the compound score
const COMPOUND_ALPHA: f64 = 15.0;

/// Lexicon scorer producing a compound score in [-1, 1]
#[derive(Debug, Clone)]
pub struct EnglishScorer {
    lexicon: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
}

impl EnglishScorer {
    pub fn new() -> Self {
        Self {
            lexicon: ENGLISH_LEXICON.iter().copied().collect(),
            boosters: ENGLISH_BOOSTERS.iter().copied().collect(),
            negations: ENGLISH_NEGATIONS.iter().copied().collect(),
        }
    }

    fn is_negation(&self, word: &str) -> bool {
        self.negations.contains(word) || word.ends_with("n't")
    }

    pub fn score(&self, text: &str) -> f64 {
        let tokens: Vec<(&str, String)> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
            .filter(|t| !t.is_empty())
            .map(|t| (t, t.to_lowercase()))
            .collect();

        let shouting = |t: &str| t.chars().any(char::is_alphabetic) && !t.chars().any(char::is_lowercase);
        let caps_differential = tokens.iter().any(|(t, _)| shouting(*t)) && tokens.iter().any(|(t, _)| !shouting(*t));

        let mut valences = Vec::with_capacity(tokens.len());
        for (i, (original, lower)) in tokens.iter().enumerate() {
            let Some(&base) = self.lexicon.get(lower.as_str()) else {
                valences.push(0.0);
                continue;
            };

            let mut valence = base;
            if caps_differential && shouting(*original) {
                valence += CAPS_INCREMENT * valence.signum();
            }

            for distance in 1..=3 {
                let Some(j) = i.checked_sub(distance) else {
                    break;
                };
                let previous = tokens[j].1.as_str();

                if let Some(&boost) = self.boosters.get(previous) {
                    let decay = match distance {
                        1 => 1.0,
                        2 => 0.95,
                        _ => 0.9,
                    };
                    valence += boost * decay * valence.signum();
                }
                if self.is_negation(previous) {
                    valence *= NEGATION_SCALAR;
                }
            }
            valences.push(valence);
        }

        // what follows "but" outweighs what precedes it
        if let Some(pivot) = tokens.iter().position(|(_, lower)| lower == "but") {
            for (i, valence) in valences.iter_mut().enumerate() {
                if i < pivot {
                    *valence *= 0.5;
                } else if i > pivot {
                    *valence *= 1.5;
                }
            }
        }

        let mut sum: f64 = valences.iter().sum();
        if sum != 0.0 {
            let marks = text.matches('!').count().min(4) as f64;
            sum += marks * EXCLAMATION_INCREMENT * sum.signum();
        }

        sum / (sum * sum + COMPOUND_ALPHA).sqrt()
    }
}

impl Default for EnglishScorer {
    fn default() -> Self {
        Self::new()
    }
}

const FRENCH_LEXICON: &[(&str, f64)] = &[
    ("bon", 0.7), ("bonne", 0.7), ("bien", 0.5), ("excellent", 1.0), ("excellente", 1.0),
    ("génial", 0.9), ("geniale", 0.9), ("super", 0.8), ("magnifique", 0.9), ("beau", 0.7),
    ("belle", 0.7), ("superbe", 0.9), ("parfait", 1.0), ("parfaite", 1.0), ("incroyable", 0.8),
    ("amusant", 0.6), ("drôle", 0.6), ("plaisir", 0.6), ("adore", 0.9), ("aime", 0.6),
    ("recommande", 0.6), ("sympa", 0.6), ("chef-d'œuvre", 1.0), ("fluide", 0.4), ("addictif", 0.5),
    ("mauvais", -0.7), ("mauvaise", -0.7), ("nul", -0.8), ("nulle", -0.8), ("horrible", -1.0),
    ("ennuyeux", -0.6), ("décevant", -0.7), ("décevante", -0.7), ("déçu", -0.7), ("mal", -0.6),
    ("moche", -0.6), ("injouable", -0.9), ("buggé", -0.6), ("bugs", -0.4), ("cher", -0.3),
    ("répétitif", -0.5), ("lent", -0.4), ("pire", -0.9), ("arnaque", -0.9), ("déteste", -0.9),
];

const FRENCH_INTENSIFIERS: &[&str] = &["très", "tres", "vraiment", "tellement", "extrêmement", "hyper", "trop"];

const FRENCH_NEGATIONS: &[&str] = &["ne", "n", "pas", "jamais", "rien", "aucun", "aucune", "sans", "guère"];

const INTENSIFIER_SCALAR: f64 = 1.3;

/// Mean-polarity scorer for French text
#[derive(Debug, Clone)]
pub struct FrenchScorer {
    lexicon: HashMap<&'static str, f64>,
    intensifiers: HashSet<&'static str>,
    negations: HashSet<&'static str>,
}

impl FrenchScorer {
    pub fn new() -> Self {
        Self {
            lexicon: FRENCH_LEXICON.iter().copied().collect(),
            intensifiers: FRENCH_INTENSIFIERS.iter().copied().collect(),
            negations: FRENCH_NEGATIONS.iter().copied().collect(),
        }
    }

    pub fn score(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphabetic() || c == '-'))
            .filter(|t| !t.is_empty())
            .collect();

        let mut polarities = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            let Some(&base) = self.lexicon.get(*token) else {
                continue;
            };

            let window = &tokens[i.saturating_sub(3)..i];
            let mut polarity = base;
            if window.iter().any(|t| self.intensifiers.contains(*t)) {
                polarity *= INTENSIFIER_SCALAR;
            }
            if window.iter().any(|t| self.negations.contains(*t)) {
                polarity = -polarity;
            }
            polarities.push(polarity.clamp(-1.0, 1.0));
        }

        if polarities.is_empty() {
            return 0.0;
        }
        (polarities.iter().sum::<f64>() / polarities.len() as f64).clamp(-1.0, 1.0)
    }
}

impl Default for FrenchScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Explicitly constructed oracle; holds no state between calls
#[derive(Debug, Clone, Default)]
pub struct SentimentOracle {
    english: EnglishScorer,
    french: FrenchScorer,
}

impl SentimentOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, text: &str) -> SentimentOutcome {
        match detect_language(text) {
            Detection::Undetectable => SentimentOutcome::neutral(ScoreStatus::Undetectable),
            Detection::Unsupported => SentimentOutcome::neutral(ScoreStatus::Unsupported),
            Detection::Detected(language) => {
                let score = match language {
                    Language::English => self.english.score(text),
                    Language::French => self.french.score(text),
                };
                let outcome = SentimentOutcome::scored(score, language);
                if outcome.status == ScoreStatus::Failed {
                    tracing::debug!("{} scorer returned a non-finite value", language.code());
                }
                outcome
            }
        }
    }
}

/// Expected normalised sentiment implied by a bracket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BracketMapping {
    /// `(lower + offset) / scale`
    LowerBoundOffset { offset: f64, scale: f64 },
    /// `(lower + upper) / 2 / scale`
    Midpoint { scale: f64 },
}

impl Default for BracketMapping {
    fn default() -> Self {
        BracketMapping::LowerBoundOffset {
            offset: 5.0,
            scale: 100.0,
        }
    }
}

impl BracketMapping {
    pub fn expected(&self, bracket: &Bracket) -> f64 {
        match *self {
            BracketMapping::LowerBoundOffset { offset, scale } => (bracket.lower as f64 + offset) / scale,
            BracketMapping::Midpoint { scale } => (bracket.lower as f64 + bracket.upper as f64) / 2.0 / scale,
        }
    }
}

/// Mean oracle sentiment of one game's reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSentiment {
    pub game: String,
    pub bracket: Bracket,
    /// Degraded reviews count as 0.0
    pub mean_sentiment: f64,
    pub review_count: usize,
    /// Reviews whose outcome was not `Scored`
    pub degraded_reviews: usize,
    /// Bracket-implied expectation minus `mean_sentiment`
    pub deviation: f64,
}

impl GameSentiment {
    pub fn from_outcomes(
        game: &str,
        bracket: Bracket,
        outcomes: &[SentimentOutcome],
        mapping: &BracketMapping,
    ) -> Self {
        let review_count = outcomes.len();
        let mean_sentiment = if review_count == 0 {
            0.0
        } else {
            outcomes.iter().map(|o| o.score).sum::<f64>() / review_count as f64
        };

        Self {
            game: game.to_string(),
            bracket,
            mean_sentiment,
            review_count,
            degraded_reviews: outcomes.iter().filter(|o| o.is_degraded()).count(),
            deviation: mapping.expected(&bracket) - mean_sentiment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(
            detect_language("This is a great game and I love it"),
            Detection::Detected(Language::English)
        );
        assert_eq!(
            detect_language("Le jeu est très bon, je le recommande"),
            Detection::Detected(Language::French)
        );
        assert_eq!(detect_language("12345 !!! ???"), Detection::Undetectable);
        assert_eq!(detect_language("Das Spiel ist gut"), Detection::Unsupported);
    }

    #[test]
    fn test_single_word_reviews_are_scored() {
        let oracle = SentimentOracle::new();
        for text in ["Good", "Amazing!", "Masterpiece", "EXCELLENT"] {
            let outcome = oracle.score(text);
            assert_eq!(outcome.status, ScoreStatus::Scored(Language::English), "{text}");
            assert_eq!(outcome.label(), Label::Positive, "{text}");
        }

        let boring = oracle.score("Boring");
        assert_eq!(boring.status, ScoreStatus::Scored(Language::English));
        assert!(boring.score < 0.0);

        let nul = oracle.score("Nul");
        assert_eq!(nul.status, ScoreStatus::Scored(Language::French));
        assert!(nul.score < 0.0);

        assert_eq!(detect_language("Wunderbar"), Detection::Unsupported);
    }

    #[test]
    fn test_undetectable_text_is_neutral() {
        let oracle = SentimentOracle::new();
        let outcome = oracle.score("1234 5678 :) :)");
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.status, ScoreStatus::Undetectable);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.label(), Label::Negative);

        let unsupported = oracle.score("Das Spiel macht Spaß");
        assert_eq!(unsupported.score, 0.0);
        assert_eq!(unsupported.status, ScoreStatus::Unsupported);
    }

    #[test]
    fn test_english_polarity() {
        let scorer = EnglishScorer::new();
        assert!(scorer.score("This game is great and fun") > 0.5);
        assert!(scorer.score("This game is boring and broken") < -0.3);
        assert_eq!(scorer.score("This is a game"), 0.0);
    }

    #[test]
    fn test_english_negation_and_emphasis() {
        let scorer = EnglishScorer::new();
        let plain = scorer.score("the game is good");
        let negated = scorer.score("the game is not good");
        let boosted = scorer.score("the game is very good");
        let shouted = scorer.score("the game is very good!!!");

        assert!(negated < 0.0);
        assert!(boosted > plain);
        assert!(shouted > boosted);
        assert!(shouted < 1.0);
    }

    #[test]
    fn test_english_but_shifts_weight() {
        let scorer = EnglishScorer::new();
        assert!(scorer.score("the graphics are great but the story is terrible") < 0.0);
        assert!(scorer.score("the story is terrible but the graphics are great") > 0.0);
    }

    #[test]
    fn test_french_polarity() {
        let scorer = FrenchScorer::new();
        assert!(scorer.score("un jeu vraiment génial") > 0.9);
        assert!(scorer.score("c'est nul") < 0.0);
        assert!(scorer.score("ce n'est pas bon") < 0.0);
        assert!(scorer.score("pas mal du tout") > 0.0);
        assert_eq!(scorer.score("un jeu de course"), 0.0);
    }

    #[test]
    fn test_oracle_routes_by_language() {
        let oracle = SentimentOracle::new();
        let en = oracle.score("I love this game, it is great");
        assert_eq!(en.status, ScoreStatus::Scored(Language::English));
        assert_eq!(en.label(), Label::Positive);

        let fr = oracle.score("Le jeu est horrible et ennuyeux");
        assert_eq!(fr.status, ScoreStatus::Scored(Language::French));
        assert_eq!(fr.label(), Label::Negative);
    }

    #[test]
    fn test_bracket_mapping() {
        let bracket = Bracket::new(70, 80);
        assert!((BracketMapping::default().expected(&bracket) - 0.75).abs() < 1e-12);
        assert!((BracketMapping::Midpoint { scale: 100.0 }.expected(&bracket) - 0.75).abs() < 1e-12);

        let low = Bracket::new(30, 40);
        assert!((BracketMapping::default().expected(&low) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_game_sentiment_counts_degraded_as_zero() {
        let outcomes = vec![
            SentimentOutcome::scored(0.8, Language::English),
            SentimentOutcome::scored(0.4, Language::French),
            SentimentOutcome::neutral(ScoreStatus::Undetectable),
            SentimentOutcome::scored(f64::NAN, Language::English),
        ];
        let game = GameSentiment::from_outcomes("Portal", Bracket::new(90, 100), &outcomes, &BracketMapping::default());

        assert_eq!(game.review_count, 4);
        assert_eq!(game.degraded_reviews, 2);
        assert!((game.mean_sentiment - 0.3).abs() < 1e-12);
        assert!((game.deviation - (0.95 - 0.3)).abs() < 1e-12);
    }
}
