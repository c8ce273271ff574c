//! Delay-hint extraction from quota error payloads.
//!
//! Rules are tried in order and the first match wins. Each rule captures a seconds value
//! as a decimal number.

// std
use std::sync::OnceLock;
// crates.io
use regex::Regex;
// self
use crate::_prelude::*;

/// Hints above this many seconds are clamped.
pub const MAX_HINT_SECS: f64 = 3_600.;

/// Named delay-hint rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HintRule {
	/// Stable rule name, reported alongside extracted hints.
	pub name: &'static str,
	/// Pattern whose first capture group is the delay in seconds.
	pub pattern: &'static str,
}

/// Recognized encodings, in priority order.
pub const HINT_RULES: [HintRule; 2] = [
	// `"retryDelay": "37s"`, `retry_delay { seconds: 37 }`, `'retry_delay': {'seconds': 37}`
	HintRule {
		name: "structured-retry-delay",
		pattern: r#"(?i)retry_?delay["']?\s*[:{]\s*(?:\{\s*)?(?:["']?seconds["']?\s*:\s*)?["']?(\d+(?:\.\d+)?)"#,
	},
	// `Please retry in 37.5s.`, `retry in 5 seconds`
	HintRule {
		name: "retry-in-phrase",
		pattern: r"(?i)retry\s+in\s+(\d+(?:\.\d+)?)\s*(?:s\b|sec|second)",
	},
];

/// Delay extracted by a [`HintRule`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryHint {
	/// Name of the rule that matched.
	pub rule: &'static str,
	/// Extracted delay.
	pub delay: Duration,
}

/// Returns the delay of the first matching rule.
pub fn extract_retry_hint(text: &str) -> Option<RetryHint> {
	compiled_rules().iter().find_map(|(rule, regex)| {
		let seconds = regex.as_ref()?.captures(text)?.get(1)?.as_str().parse::<f64>().ok()?;

		Some(RetryHint { rule: rule.name, delay: seconds_to_duration(seconds)? })
	})
}

/// Convenience wrapper returning only the delay.
pub fn extract_retry_delay(text: &str) -> Option<Duration> {
	extract_retry_hint(text).map(|hint| hint.delay)
}

fn compiled_rules() -> &'static [(HintRule, Option<Regex>)] {
	static RULES: OnceLock<Vec<(HintRule, Option<Regex>)>> = OnceLock::new();

	RULES.get_or_init(|| {
		HINT_RULES.iter().map(|rule| (*rule, Regex::new(rule.pattern).ok())).collect()
	})
}

fn seconds_to_duration(seconds: f64) -> Option<Duration> {
	if !seconds.is_finite() || seconds < 0. {
		return None;
	}

	Some(Duration::seconds_f64(seconds.min(MAX_HINT_SECS)))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn every_rule_compiles() {
		for (rule, regex) in compiled_rules() {
			assert!(regex.is_some(), "{} should compile", rule.name);
		}
	}

	#[test]
	fn structured_field_encodings_are_recognized() {
		let cases = [
			(r#"{"error":{"details":[{"retryDelay": "37s"}]}}"#, 37.),
			("retry_delay { seconds: 12 }", 12.),
			("{'retry_delay': {'seconds': 8}}", 8.),
			(r#""retryDelay":"2.5s""#, 2.5),
		];

		for (text, expected) in cases {
			let hint = extract_retry_hint(text).expect("Structured hint should be extracted.");

			assert_eq!(hint.rule, "structured-retry-delay", "{text}");
			assert_eq!(hint.delay, Duration::seconds_f64(expected), "{text}");
		}
	}

	#[test]
	fn free_text_phrase_is_recognized() {
		let hint = extract_retry_hint("429 Quota exceeded. Please retry in 37.5s.")
			.expect("Phrase hint should be extracted.");

		assert_eq!(hint.rule, "retry-in-phrase");
		assert_eq!(hint.delay, Duration::milliseconds(37_500));
		assert_eq!(extract_retry_delay("retry in 5 seconds"), Some(Duration::seconds(5)));
	}

	#[test]
	fn structured_field_wins_over_phrase() {
		let text = r#"Please retry in 90s. details: {"retryDelay": "30s"}"#;

		assert_eq!(extract_retry_delay(text), Some(Duration::seconds(30)));
	}

	#[test]
	fn unrelated_text_and_milliseconds_yield_nothing() {
		assert_eq!(extract_retry_delay("model is overloaded"), None);
		assert_eq!(extract_retry_delay("retry in 500ms"), None);
	}

	#[test]
	fn oversized_hints_are_clamped() {
		assert_eq!(
			extract_retry_delay("retry in 99999999999 seconds"),
			Some(Duration::seconds_f64(MAX_HINT_SECS))
		);
	}
}
