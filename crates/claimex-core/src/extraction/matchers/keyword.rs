//! Keyword matcher: value follows a label on the same line.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::extraction::ExtractionMatch;
use crate::models::template::KeywordPattern;
use crate::models::value::CandidateValue;

use super::{KEYWORD_CONFIDENCE, MatchContext, PatternMatcher};

fn keyword_regex(keyword: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(keyword.trim()))
        .case_insensitive(true)
        .build()
        .map_err(|e| debug!("Skipping keyword '{}': {}", keyword, e))
        .ok()
}

impl PatternMatcher for KeywordPattern {
    fn attempt(
        &self,
        text: &str,
        ctx: &MatchContext<'_>,
    ) -> Option<ExtractionMatch<CandidateValue>> {
        let keywords = self.labels.get_or_init(|| {
            std::iter::once(self.keyword.as_str())
                .chain(ctx.keywords.iter().map(String::as_str))
                .filter(|k| !k.trim().is_empty())
                .filter_map(keyword_regex)
                .collect()
        });

        let mut offset = 0;
        for raw_line in text.split('\n') {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            let line_start = offset;
            offset += raw_line.len() + 1;

            let Some(found) = keywords.iter().find_map(|k| k.find(line)) else {
                continue;
            };

            // Only the first matching line is considered
            let after = &line[found.end()..];
            let rest = after.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
            let value = rest.trim_end();
            if value.is_empty() {
                return None;
            }

            let start = line_start + found.end() + (after.len() - rest.len());
            return Some(
                ExtractionMatch::new(
                    CandidateValue::Text(value.to_string()),
                    KEYWORD_CONFIDENCE,
                    line,
                )
                .with_position(start, start + value.len()),
            );
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use crate::models::template::{ExtractionPattern, PatternStrategy};
    use crate::models::value::{CandidateValue, FieldType};

    use super::*;

    #[test]
    fn test_value_after_keyword() {
        let text = "PHIẾU THU\nChẩn đoán :  Viêm họng cấp  \nGhi chú: không";
        let m = ExtractionPattern::keyword("chẩn đoán", 1)
            .attempt(text, FieldType::Text)
            .unwrap();

        assert_eq!(m.value, CandidateValue::Text("Viêm họng cấp".to_string()));
        assert_eq!(m.confidence, KEYWORD_CONFIDENCE);
        let (start, end) = m.position.unwrap();
        assert_eq!(&text[start..end], "Viêm họng cấp");
    }

    #[test]
    fn test_contextual_keywords_are_alternatives() {
        let pattern = ExtractionPattern::keyword("Bác sĩ", 1).with_keywords(["Người kê đơn"]);
        let m = pattern
            .attempt("Người kê đơn: Trần Văn Bình", FieldType::Text)
            .unwrap();
        assert_eq!(m.value, CandidateValue::Text("Trần Văn Bình".to_string()));
    }

    #[test]
    fn test_empty_remainder_is_no_match() {
        let text = "Chẩn đoán:\nChẩn đoán: Sốt";
        assert!(ExtractionPattern::keyword("Chẩn đoán", 1)
            .attempt(text, FieldType::Text)
            .is_none());
    }

    #[test]
    fn test_labels_compiled_once() {
        let pattern = ExtractionPattern::keyword("Chẩn đoán", 1).with_keywords(["Bệnh"]);
        let PatternStrategy::Keyword(keyword) = &pattern.strategy else {
            unreachable!();
        };
        assert!(keyword.labels.get().is_none());

        pattern.attempt("Chẩn đoán: Sốt", FieldType::Text).unwrap();
        let first = keyword.labels.get().unwrap().as_ptr();
        pattern.attempt("Bệnh: Cúm", FieldType::Text).unwrap();
        assert_eq!(keyword.labels.get().unwrap().as_ptr(), first);
        assert_eq!(keyword.labels.get().unwrap().len(), 2);
    }

    #[test]
    fn test_with_keywords_resets_labels() {
        let pattern = ExtractionPattern::keyword("Chẩn đoán", 1);
        pattern.attempt("Chẩn đoán: Sốt", FieldType::Text).unwrap();

        let pattern = pattern.with_keywords(["Bệnh"]);
        let m = pattern.attempt("Bệnh: Cúm", FieldType::Text).unwrap();
        assert_eq!(m.value, CandidateValue::Text("Cúm".to_string()));
    }

    #[test]
    fn test_keyword_absent() {
        assert!(ExtractionPattern::keyword("Mã BHYT", 1)
            .attempt("Họ tên: An", FieldType::Text)
            .is_none());
    }
}
