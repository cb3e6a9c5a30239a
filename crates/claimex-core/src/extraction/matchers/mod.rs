//! Pattern matching strategies.
//!
//! Every [`PatternStrategy`] variant carries a payload type implementing
//! [`PatternMatcher`]; [`ExtractionPattern::attempt`] selects the matcher
//! from the variant.

mod expression;
mod keyword;
mod layout;
mod table;

pub use table::{parse_medications, parse_services, parse_test_results};

use crate::models::template::{ExtractionPattern, PatternStrategy, Region};
use crate::models::value::{CandidateValue, FieldType};

use super::ExtractionMatch;

/// Base confidence of a regex match.
pub const REGEX_CONFIDENCE: f32 = 0.8;
/// Regex match on a currency field carrying an amount and a currency marker.
pub const CURRENCY_CONFIDENCE: f32 = 0.95;
/// Regex match on a date field with a D/M/YYYY value.
pub const DATE_CONFIDENCE: f32 = 0.9;
/// Keyword match with a non-empty remainder.
pub const KEYWORD_CONFIDENCE: f32 = 0.7;
/// Table matcher with at least one parsed row.
pub const TABLE_CONFIDENCE: f32 = 0.85;

/// What a matcher knows about the field and pattern it serves.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub field_type: FieldType,
    pub keywords: &'a [String],
    pub region: Option<&'a Region>,
}

/// A strategy for locating a field's value in OCR text.
pub trait PatternMatcher {
    /// Attempt to locate a value. `None` means no match (confidence 0).
    fn attempt(
        &self,
        text: &str,
        ctx: &MatchContext<'_>,
    ) -> Option<ExtractionMatch<CandidateValue>>;
}

impl PatternStrategy {
    /// The matcher implementing this strategy.
    pub fn matcher(&self) -> &dyn PatternMatcher {
        match self {
            PatternStrategy::Regex(p) => p,
            PatternStrategy::Keyword(p) => p,
            PatternStrategy::Position(p) => p,
            PatternStrategy::Table(p) => p,
            PatternStrategy::Form(p) => p,
        }
    }
}

impl ExtractionPattern {
    /// Run this pattern against `text` for a field of `field_type`.
    pub fn attempt(
        &self,
        text: &str,
        field_type: FieldType,
    ) -> Option<ExtractionMatch<CandidateValue>> {
        let ctx = MatchContext {
            field_type,
            keywords: &self.keywords,
            region: self.region.as_ref(),
        };
        self.strategy
            .matcher()
            .attempt(text, &ctx)
            .filter(|m| m.confidence > 0.0)
    }
}
