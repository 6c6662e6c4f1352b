//! Destination extraction from raw page markup.
//!
//! The target page is localized free text, so extraction works from a fixed
//! vocabulary: a destination is an offer when the trigger phrase is directly
//! followed by its local name. Price and dates are searched in a bounded
//! window after the first match. A second pass over flight-related anchors
//! picks up names that only appear as link text.

use std::collections::HashSet;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{
    DestinationName, DestinationRecord, ExtractionConfig, NOT_AVAILABLE, SourceHint,
};

/// Currency sign followed by digits.
const PRICE_TOKEN: &str = r"([₪$€][0-9]+)";

/// Weekday-labeled date, e.g. `יום ה' 12/06`.
const DATE_TOKEN: &str = r"יום [א-ת]' ([0-9]{2}/[0-9]{2})";

/// Departure token, range separator, then the return token.
const RETURN_TOKEN: &str =
    r"יום [א-ת]' [0-9]{2}/[0-9]{2} - יום [א-ת]' ([0-9]{2}/[0-9]{2})";

/// Substrings of an anchor href that mark it as flight-related.
const LINK_KEYWORDS: [&str; 3] = ["flight", "destination", "טיסה"];

const ANCHOR_SELECTOR: &str = "a[href]";

/// Strategy that turns page markup into destination records.
///
/// Implementations must not fail: unusable markup yields an empty list.
pub trait DestinationExtractor: Send + Sync {
    fn extract(&self, markup: &str) -> Vec<DestinationRecord>;
}

/// Vocabulary entry with its compiled trigger pattern.
struct NamePattern {
    name: DestinationName,
    trigger: Regex,
}

/// Trigger-phrase and hyperlink extractor over a fixed translation table.
pub struct PatternExtractor {
    names: Vec<NamePattern>,
    price: Regex,
    departure: Regex,
    return_date: Regex,
    images: Regex,
    anchors: Selector,
}

impl PatternExtractor {
    /// Compile all patterns for the given vocabulary.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        config.validate()?;

        let names = config
            .destinations
            .iter()
            .map(|name| -> Result<NamePattern> {
                let pattern = format!(
                    "{}{}",
                    regex::escape(&config.trigger_phrase),
                    regex::escape(&name.local_name)
                );
                Ok(NamePattern {
                    name: name.clone(),
                    trigger: Regex::new(&pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let window = |token: &str| {
            Regex::new(&format!(r"\A[\s\S]{{0,{}}}?{}", config.lookahead_chars, token))
        };

        Ok(Self {
            names,
            price: window(PRICE_TOKEN)?,
            departure: window(DATE_TOKEN)?,
            return_date: window(RETURN_TOKEN)?,
            images: Regex::new(&config.image_pattern)?,
            anchors: Selector::parse(ANCHOR_SELECTOR)
                .map_err(|e| AppError::selector(ANCHOR_SELECTOR, format!("{e:?}")))?,
        })
    }

    /// Number of destination image assets referenced by the markup.
    pub fn count_destination_images(&self, markup: &str) -> usize {
        self.images.find_iter(markup).count()
    }

    fn match_body_text(&self, entry: &NamePattern, markup: &str) -> Option<DestinationRecord> {
        let mut matches = entry.trigger.find_iter(markup);
        let first = matches.next()?;
        let occurrences = 1 + matches.count();

        let window = &markup[first.end()..];

        Some(DestinationRecord {
            local_name: entry.name.local_name.clone(),
            display_name: entry.name.display_name.clone(),
            price: capture_or_sentinel(&self.price, window),
            departure_date: capture_or_sentinel(&self.departure, window),
            return_date: capture_or_sentinel(&self.return_date, window),
            occurrences,
            source: SourceHint::BodyText,
        })
    }

    /// Indices of vocabulary entries named in flight-related anchor text.
    fn linked_names(&self, markup: &str) -> HashSet<usize> {
        let document = Html::parse_document(markup);
        let mut found = HashSet::new();

        for anchor in document.select(&self.anchors) {
            let href = anchor
                .value()
                .attr("href")
                .unwrap_or_default()
                .to_lowercase();
            if !LINK_KEYWORDS.iter().any(|keyword| href.contains(keyword)) {
                continue;
            }

            let text: String = anchor.text().collect();
            for (idx, entry) in self.names.iter().enumerate() {
                if text.contains(&entry.name.local_name) {
                    found.insert(idx);
                }
            }
        }
        found
    }
}

impl DestinationExtractor for PatternExtractor {
    fn extract(&self, markup: &str) -> Vec<DestinationRecord> {
        let linked = self.linked_names(markup);

        // Output follows table order; body-text results shadow link results.
        let destinations: Vec<DestinationRecord> = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| {
                self.match_body_text(entry, markup).or_else(|| {
                    linked.contains(&idx).then(|| {
                        DestinationRecord::from_link(
                            &entry.name.local_name,
                            &entry.name.display_name,
                        )
                    })
                })
            })
            .collect();

        let images = self.count_destination_images(markup);
        if images > 0 {
            log::debug!("Found {} destination images", images);
        }

        destinations
    }
}

fn capture_or_sentinel(pattern: &Regex, text: &str) -> String {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
