use anyhow::Result;
use regex::Regex;

use crate::log;

/// Everything that is not an ASCII word character or a Hangul syllable.
///
/// Removing these also removes legitimate separators ("12-34" → "1234").
const NOISE_PATTERN: &str = r"[^A-Za-z0-9_가-힣]";

/// Maximal runs of ASCII digits.
const DIGIT_RUN_PATTERN: &str = r"[0-9]+";

/// Maximal runs of Latin letters or Hangul syllables.
const LETTER_RUN_PATTERN: &str = r"[A-Za-z가-힣]+";

/// Extracts a candidate product code from raw OCR text.
///
/// 1. Strip noise characters (see [`NOISE_PATTERN`]).
/// 2. If any digit run exists, return the longest one (first wins on ties).
/// 3. Otherwise concatenate every letter run.
/// 4. Otherwise return an empty string; the caller prompts for manual entry.
pub fn extract_code(raw_text: &str) -> Result<String> {
    let noise = Regex::new(NOISE_PATTERN)?;
    let digit_runs = Regex::new(DIGIT_RUN_PATTERN)?;
    let letter_runs = Regex::new(LETTER_RUN_PATTERN)?;

    let cleaned = noise.replace_all(raw_text, "");

    let longest_digits = digit_runs
        .find_iter(&cleaned)
        .map(|m| m.as_str())
        .fold("", |longest, run| {
            if run.len() > longest.len() { run } else { longest }
        });

    let code = if !longest_digits.is_empty() {
        longest_digits.to_string()
    } else {
        letter_runs
            .find_iter(&cleaned)
            .map(|m| m.as_str())
            .collect::<String>()
    };

    log(&format!(
        "Code extraction: raw={:?} cleaned={:?} code={:?}",
        raw_text, cleaned, code
    ));

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_digit_run_wins() {
        assert_eq!(extract_code("OCR noise 12345 more").unwrap(), "12345");
        assert_eq!(extract_code("A12 B34567 C8").unwrap(), "34567");
    }

    #[test]
    fn test_digit_tie_keeps_first() {
        assert_eq!(extract_code("x111y222").unwrap(), "111");
    }

    #[test]
    fn test_letters_when_no_digits() {
        assert_eq!(extract_code("ABC").unwrap(), "ABC");
        assert_eq!(extract_code("AB-CD 카톤").unwrap(), "ABCD카톤");
    }

    #[test]
    fn test_only_noise_is_empty() {
        assert_eq!(extract_code("@@@").unwrap(), "");
        assert_eq!(extract_code("").unwrap(), "");
        assert_eq!(extract_code("   \n\t").unwrap(), "");
    }

    #[test]
    fn test_separators_are_dropped() {
        // Stripping punctuation merges digit groups
        assert_eq!(extract_code("품번: 8888-1234").unwrap(), "88881234");
        assert_eq!(extract_code("12 34 5").unwrap(), "12345");
    }

    #[test]
    fn test_other_scripts_are_noise() {
        // Kana is not kept; the digits still come through
        assert_eq!(extract_code("コード 4711").unwrap(), "4711");
        assert_eq!(extract_code("ß").unwrap(), "");
    }

    #[test]
    fn test_underscore_splits_letter_runs() {
        assert_eq!(extract_code("AB_CD").unwrap(), "ABCD");
    }
}
