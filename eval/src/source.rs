// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Raw review retrieval
//!
//! A [`ReviewSource`] returns whatever reviews it could get and never
//! fails: transport errors, non-success responses and malformed payloads
//! all come back as an empty list.

use crate::corpus::{write_review_file, Label, ReviewLayout};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const STEAM_REVIEWS_URL: &str = "https://store.steampowered.com/appreviews";

/// One review as returned by a source, before it becomes a corpus file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReview {
    pub text: String,
    pub positive: bool,
}

pub trait ReviewSource {
    fn fetch(&self, app_id: u32, count: usize, language: &str) -> Vec<RawReview>;
}

#[derive(Debug, Deserialize)]
struct SteamResponse {
    #[serde(default)]
    reviews: Vec<SteamReview>,
}

#[derive(Debug, Deserialize)]
struct SteamReview {
    #[serde(default)]
    review: String,
    #[serde(default)]
    voted_up: bool,
}

/// Decode an `appreviews` JSON payload
pub fn parse_reviews_response(body: &str) -> Vec<RawReview> {
    match serde_json::from_str::<SteamResponse>(body) {
        Ok(response) => response
            .reviews
            .into_iter()
            .map(|r| RawReview {
                text: r.review,
                positive: r.voted_up,
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Malformed review payload: {}", e);
            Vec::new()
        }
    }
}

/// Steam store review endpoint over a blocking HTTP client
pub struct SteamReviewSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl SteamReviewSource {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url(STEAM_REVIEWS_URL)
    }

    pub fn with_base_url(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn request_url(&self, app_id: u32) -> String {
        format!("{}/{}", self.base_url, app_id)
    }
}

impl ReviewSource for SteamReviewSource {
    fn fetch(&self, app_id: u32, count: usize, language: &str) -> Vec<RawReview> {
        let url = self.request_url(app_id);
        tracing::info!("Fetching {} {} reviews from {}", count, language, url);

        let query = [
            ("json", "1".to_string()),
            ("num_per_page", count.to_string()),
            ("language", language.to_string()),
            ("purchase_type", "all".to_string()),
        ];

        let response = match self.client.get(&url).query(&query).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Request to {} failed: {}", url, e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Review request for app {} returned {}", app_id, response.status());
            return Vec::new();
        }

        match response.text() {
            Ok(body) => parse_reviews_response(&body),
            Err(e) => {
                tracing::warn!("Failed to read review response for app {}: {}", app_id, e);
                Vec::new()
            }
        }
    }
}

/// Write non-blank reviews as corpus files numbered by their 1-based position
pub fn save_reviews(reviews: &[RawReview], dir: &Path, layout: &ReviewLayout) -> std::io::Result<usize> {
    let mut written = 0;
    for (i, review) in reviews.iter().enumerate() {
        let body = review.text.trim();
        if body.is_empty() {
            continue;
        }
        write_review_file(dir, layout, i + 1, Label::from_positive(review.positive), body)?;
        written += 1;
    }
    tracing::info!("Saved {} reviews to {}", written, dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ReviewFile;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reviews_response() {
        let body = r#"{
            "success": 1,
            "query_summary": {"num_reviews": 3},
            "reviews": [
                {"recommendationid": "1", "review": "Great game", "voted_up": true},
                {"recommendationid": "2", "review": "Too many bugs", "voted_up": false},
                {"recommendationid": "3", "review": "No vote recorded"}
            ]
        }"#;

        let reviews = parse_reviews_response(body);
        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews[0], RawReview { text: "Great game".to_string(), positive: true });
        assert!(!reviews[1].positive);
        assert!(!reviews[2].positive);
    }

    #[test]
    fn test_malformed_payload_is_empty() {
        assert!(parse_reviews_response("<html>busy</html>").is_empty());
        assert!(parse_reviews_response(r#"{"success": 2}"#).is_empty());
    }

    #[test]
    fn test_request_url() {
        let source = SteamReviewSource::with_base_url("http://localhost:9/appreviews/").unwrap();
        assert_eq!(source.request_url(620), "http://localhost:9/appreviews/620");
    }

    #[test]
    fn test_save_reviews_skips_blank_and_keeps_positions() {
        let dir = TempDir::new().unwrap();
        let reviews = vec![
            RawReview { text: "  Great game\n".to_string(), positive: true },
            RawReview { text: "   ".to_string(), positive: true },
            RawReview { text: "Crashes on launch".to_string(), positive: false },
        ];

        let written = save_reviews(&reviews, dir.path(), &ReviewLayout::default()).unwrap();
        assert_eq!(written, 2);
        assert!(!dir.path().join("review_2.txt").exists());

        let first = fs::read_to_string(dir.path().join("review_1.txt")).unwrap();
        assert_eq!(first, "Note : 👍\n\nGreat game");

        let third = ReviewFile::parse(&fs::read_to_string(dir.path().join("review_3.txt")).unwrap());
        assert_eq!(third.label, Some(Label::Negative));
        assert_eq!(third.body, "Crashes on launch");
    }
}
