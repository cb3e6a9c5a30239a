//! Layout-dependent matchers.
//!
//! Positional and form matching need OCR layout metadata (box coordinates,
//! detected form fields). Extraction only receives plain text, so both
//! strategies never match.

use tracing::trace;

use crate::extraction::ExtractionMatch;
use crate::models::template::{FormPattern, PositionPattern};
use crate::models::value::CandidateValue;

use super::{MatchContext, PatternMatcher};

impl PatternMatcher for PositionPattern {
    fn attempt(
        &self,
        _text: &str,
        ctx: &MatchContext<'_>,
    ) -> Option<ExtractionMatch<CandidateValue>> {
        trace!("Positional pattern (region {:?}) needs layout data", ctx.region);
        None
    }
}

impl PatternMatcher for FormPattern {
    fn attempt(
        &self,
        _text: &str,
        _ctx: &MatchContext<'_>,
    ) -> Option<ExtractionMatch<CandidateValue>> {
        trace!("Form pattern '{}' needs form field metadata", self.form);
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::models::template::{ExtractionPattern, Region};
    use crate::models::value::FieldType;

    #[test]
    fn test_layout_strategies_never_match() {
        let region = Region { x: 0.0, y: 0.0, width: 100.0, height: 20.0 };
        let text = "Họ tên: Nguyễn Văn An";

        assert!(
            ExtractionPattern::position(region, 1)
                .attempt(text, FieldType::Text)
                .is_none()
        );
        assert!(
            ExtractionPattern::form("patient_form", 1)
                .attempt(text, FieldType::Text)
                .is_none()
        );
    }
}
