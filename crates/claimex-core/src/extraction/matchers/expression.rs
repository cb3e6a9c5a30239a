//! Regular-expression matcher.

use crate::extraction::ExtractionMatch;
use crate::extraction::rules::dates::is_dmy_shaped;
use crate::extraction::rules::patterns::{CURRENCY_MARKER, DECIMAL_AMOUNT};
use crate::models::template::RegexPattern;
use crate::models::value::{CandidateValue, FieldType};

use super::{CURRENCY_CONFIDENCE, DATE_CONFIDENCE, MatchContext, PatternMatcher, REGEX_CONFIDENCE};

impl PatternMatcher for RegexPattern {
    fn attempt(
        &self,
        text: &str,
        ctx: &MatchContext<'_>,
    ) -> Option<ExtractionMatch<CandidateValue>> {
        let caps = self.regex.captures(text)?;
        let full = caps.get(0)?;
        // First capture group when it took part in the match, else the whole match
        let value = caps.get(1).unwrap_or(full);

        let confidence = match ctx.field_type {
            FieldType::Currency
                if DECIMAL_AMOUNT.is_match(full.as_str())
                    && CURRENCY_MARKER.is_match(full.as_str()) =>
            {
                CURRENCY_CONFIDENCE
            }
            FieldType::Date if is_dmy_shaped(value.as_str()) => DATE_CONFIDENCE,
            _ => REGEX_CONFIDENCE,
        };

        Some(
            ExtractionMatch::new(
                CandidateValue::Text(value.as_str().to_string()),
                confidence,
                full.as_str(),
            )
            .with_position(value.start(), value.end()),
        )
    }
}
