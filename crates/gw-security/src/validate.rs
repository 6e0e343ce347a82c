use crate::error::ResponseValidationError;
use gw_core::{Operation, ResultPayload, Sentiment, SentimentResult};

/// Verbatim-regurgitation threshold, in chars. Resolved to 250 consistently
/// per SPEC_FULL.md §9 (the source had this at 250 in one place and vague
/// elsewhere).
const REGURGITATION_THRESHOLD: usize = 250;

/// Forbidden-content patterns, case-insensitive substring match, grouped by
/// category purely for error messages. See SPEC_FULL.md §4.7, including the
/// `original_source`-grounded expansion.
const FORBIDDEN_PATTERNS: &[(&str, &str)] = &[
    ("system_prompt_leakage", "system prompt:"),
    ("system_prompt_leakage", "my instructions are"),
    ("system_prompt_leakage", "you are an ai assistant"),
    ("system_prompt_leakage", "as an ai, my purpose is"),
    ("system_prompt_leakage", "according to my instructions"),
    ("system_prompt_leakage", "i have been programmed to"),
    ("system_prompt_leakage", "i am an ai language model"),
    ("system_prompt_leakage", "i was instructed to"),
    ("system_prompt_leakage", "the system prompt says"),
    ("system_prompt_leakage", "my role is to"),
    ("internal_reasoning_leakage", "thinking step by step"),
    ("internal_reasoning_leakage", "chain of thought:"),
    ("internal_reasoning_leakage", "internal thoughts:"),
    ("internal_reasoning_leakage", "let me think about this"),
    ("internal_reasoning_leakage", "my reasoning is"),
    ("debug_artifact", "debug mode"),
    ("debug_artifact", "todo:"),
    ("debug_artifact", "fixme:"),
    ("debug_artifact", "console.log"),
    ("debug_artifact", "print("),
    ("debug_artifact", "development version"),
    ("debug_artifact", "test response"),
    ("debug_artifact", "placeholder text"),
    ("injection_echo", "ignore previous instructions"),
    ("injection_echo", "new instructions:"),
    ("injection_echo", "admin mode"),
    ("injection_echo", "disregard the above"),
    ("injection_echo", "forget everything"),
    ("injection_echo", "override:"),
    ("injection_echo", "developer mode"),
    ("jailbreak_echo", "pretend you are"),
    ("jailbreak_echo", "simulation mode"),
    ("jailbreak_echo", "hypothetical scenario"),
    ("jailbreak_echo", "act as if"),
    ("jailbreak_echo", "roleplaying as"),
];

const REFUSAL_PHRASES: &[&str] = &[
    "i cannot fulfill this request",
    "i am unable to",
    "i'm sorry, but as an ai model",
    "as a large language model",
    "i am not able to provide assistance with that",
    "my apologies, but i cannot",
];

/// Validates and shape-parses an upstream response, per SPEC_FULL.md §4.7.
/// Deterministic and side-effect-free: never rewrites content, only accepts
/// (producing the operation's [`ResultPayload`]) or rejects.
pub fn validate_response(
    operation: Operation,
    raw: &str,
    system_instruction: &str,
    original_text: &str,
) -> Result<ResultPayload, ResponseValidationError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return match operation {
            Operation::Summarize | Operation::Qa => Err(ResponseValidationError::Empty),
            // "otherwise empty is returned as-is" (§4.7): no shape check
            // applies, so these operations get an empty-shaped payload
            // rather than a validation failure.
            Operation::Sentiment => Ok(ResultPayload::Sentiment(SentimentResult {
                sentiment: Sentiment::Neutral,
                confidence: 0.0,
                explanation: String::new(),
            })),
            Operation::KeyPoints | Operation::Questions => Ok(ResultPayload::List(Vec::new())),
        };
    }

    check_forbidden_patterns(trimmed)?;
    check_leakage(trimmed, system_instruction, original_text)?;
    check_refusal(trimmed)?;

    shape_check(operation, trimmed)
}

fn check_forbidden_patterns(response: &str) -> Result<(), ResponseValidationError> {
    let lower = response.to_lowercase();
    for (category, pattern) in FORBIDDEN_PATTERNS {
        if lower.contains(pattern) {
            return Err(ResponseValidationError::ForbiddenPattern {
                pattern: format!("{category}: {pattern}"),
                matched: (*pattern).to_string(),
            });
        }
    }
    Ok(())
}

fn check_leakage(
    response: &str,
    system_instruction: &str,
    original_text: &str,
) -> Result<(), ResponseValidationError> {
    let lower_response = response.to_lowercase();

    if !system_instruction.trim().is_empty() {
        let lower_instruction = system_instruction.to_lowercase();
        if lower_response.contains(&lower_instruction) {
            return Err(ResponseValidationError::SystemInstructionLeaked);
        }
    }

    if original_text.chars().count() > REGURGITATION_THRESHOLD {
        let lower_original = original_text.to_lowercase();
        if lower_response.contains(&lower_original) {
            return Err(ResponseValidationError::VerbatimRegurgitation);
        }
    }

    Ok(())
}

fn check_refusal(response: &str) -> Result<(), ResponseValidationError> {
    let lower = response.to_lowercase();
    for phrase in REFUSAL_PHRASES {
        if lower.contains(phrase) {
            return Err(ResponseValidationError::Refusal { matched: (*phrase).to_string() });
        }
    }
    Ok(())
}

fn shape_check(operation: Operation, response: &str) -> Result<ResultPayload, ResponseValidationError> {
    let len = response.chars().count();
    match operation {
        Operation::Summarize => {
            require_min_len(operation, len, 10)?;
            Ok(ResultPayload::Text(response.to_string()))
        }
        Operation::Qa => {
            require_min_len(operation, len, 5)?;
            Ok(ResultPayload::Text(response.to_string()))
        }
        Operation::Sentiment => {
            require_min_len(operation, len, 5)?;
            Ok(ResultPayload::Sentiment(parse_sentiment(response)?))
        }
        Operation::KeyPoints => {
            require_min_len(operation, len, 5)?;
            Ok(ResultPayload::List(parse_list(response)))
        }
        Operation::Questions => {
            if !response.contains('?') && len < 10 {
                return Err(ResponseValidationError::MissingQuestionMark);
            }
            Ok(ResultPayload::List(parse_list(response)))
        }
    }
}

fn require_min_len(operation: Operation, len: usize, min: usize) -> Result<(), ResponseValidationError> {
    if len < min {
        return Err(ResponseValidationError::TooShort {
            operation: operation.as_str().to_string(),
            min,
            actual: len,
        });
    }
    Ok(())
}

/// Parses a free-form sentiment response. Tries a structured JSON shape
/// first (what a well-behaved provider returns), falling back to a
/// keyword heuristic over prose.
fn parse_sentiment(response: &str) -> Result<SentimentResult, ResponseValidationError> {
    if let Ok(parsed) = serde_json::from_str::<SentimentResult>(response) {
        return Ok(parsed);
    }

    let lower = response.to_lowercase();
    let sentiment = if lower.contains("positive") {
        Some(Sentiment::Positive)
    } else if lower.contains("negative") {
        Some(Sentiment::Negative)
    } else if lower.contains("neutral") {
        Some(Sentiment::Neutral)
    } else {
        None
    };

    match sentiment {
        Some(sentiment) => Ok(SentimentResult { sentiment, confidence: 0.5, explanation: response.to_string() }),
        None => Err(ResponseValidationError::MalformedSentiment {
            reason: "response names neither positive, negative, nor neutral".to_string(),
        }),
    }
}

/// Splits a free-form list response into an ordered list of strings,
/// stripping common bullet/numbering prefixes and blank lines.
fn parse_list(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let without_bullet =
        line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")).unwrap_or(line);

    match without_bullet.split_once(". ") {
        Some((prefix, rest)) if prefix.chars().all(|c| c.is_ascii_digit()) && !prefix.is_empty() => {
            rest.trim()
        }
        _ => without_bullet.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_thinking_step_by_step() {
        let err = validate_response(Operation::Qa, "Thinking step by step, the answer is 42.", "", "q").unwrap_err();
        assert!(matches!(err, ResponseValidationError::ForbiddenPattern { .. }));
    }

    #[test]
    fn rejects_system_instruction_leakage() {
        let err =
            validate_response(Operation::Summarize, "Summary includes SECRET SAUCE verbatim.", "secret sauce", "x")
                .unwrap_err();
        assert_eq!(err, ResponseValidationError::SystemInstructionLeaked);
    }

    #[test]
    fn rejects_verbatim_regurgitation_over_threshold() {
        let original = "a".repeat(300);
        let err = validate_response(Operation::Summarize, &original, "", &original).unwrap_err();
        assert_eq!(err, ResponseValidationError::VerbatimRegurgitation);
    }

    #[test]
    fn short_original_text_is_not_checked_for_regurgitation() {
        let original = "short text repeated";
        let ok = validate_response(Operation::Summarize, original, "", original);
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_refusals() {
        let err = validate_response(Operation::Qa, "I am unable to help with that particular request.", "", "q")
            .unwrap_err();
        assert!(matches!(err, ResponseValidationError::Refusal { .. }));
    }

    #[test]
    fn empty_response_fails_for_summarize_and_qa() {
        assert_eq!(
            validate_response(Operation::Summarize, "   ", "", "x").unwrap_err(),
            ResponseValidationError::Empty
        );
        assert_eq!(
            validate_response(Operation::Qa, "", "", "x").unwrap_err(),
            ResponseValidationError::Empty
        );
    }

    #[test]
    fn empty_response_passes_through_for_other_operations() {
        assert!(validate_response(Operation::KeyPoints, "", "", "x").is_ok());
        assert!(validate_response(Operation::Questions, "", "", "x").is_ok());
        assert!(validate_response(Operation::Sentiment, "", "", "x").is_ok());
    }

    #[test]
    fn questions_requires_question_mark_unless_long_enough() {
        assert!(validate_response(Operation::Questions, "no question mark", "", "x").is_ok());
        assert_eq!(
            validate_response(Operation::Questions, "short", "", "x").unwrap_err(),
            ResponseValidationError::MissingQuestionMark
        );
        assert!(validate_response(Operation::Questions, "What is this?", "", "x").is_ok());
    }

    #[test]
    fn parses_bulleted_key_points_into_ordered_list() {
        let raw = "- first point\n- second point\n1. third point";
        let result = validate_response(Operation::KeyPoints, raw, "", "x").unwrap();
        match result {
            ResultPayload::List(items) => {
                assert_eq!(items, vec!["first point", "second point", "third point"]);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn parses_structured_sentiment_json() {
        let raw = r#"{"sentiment":"positive","confidence":0.9,"explanation":"great news"}"#;
        let result = validate_response(Operation::Sentiment, raw, "", "x").unwrap();
        match result {
            ResultPayload::Sentiment(s) => {
                assert_eq!(s.sentiment, Sentiment::Positive);
                assert_eq!(s.confidence, 0.9);
            }
            other => panic!("expected sentiment, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_keyword_heuristic_for_prose_sentiment() {
        let result = validate_response(Operation::Sentiment, "This is clearly negative news.", "", "x").unwrap();
        match result {
            ResultPayload::Sentiment(s) => assert_eq!(s.sentiment, Sentiment::Negative),
            other => panic!("expected sentiment, got {other:?}"),
        }
    }

    #[test]
    fn malformed_sentiment_without_keyword_fails() {
        let err = validate_response(Operation::Sentiment, "xyzzy plugh", "", "x").unwrap_err();
        assert!(matches!(err, ResponseValidationError::MalformedSentiment { .. }));
    }

    #[test]
    fn validation_is_idempotent_over_accepted_payload() {
        let raw = "a perfectly acceptable summary of the input text";
        let first = validate_response(Operation::Summarize, raw, "", "x").unwrap();
        let ResultPayload::Text(t) = &first else { panic!("expected text") };
        let second = validate_response(Operation::Summarize, t, "", "x").unwrap();
        let ResultPayload::Text(t2) = &second else { panic!("expected text") };
        assert_eq!(t, t2);
    }
}
