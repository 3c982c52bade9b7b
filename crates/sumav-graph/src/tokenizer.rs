//! Maps raw AV-engine verdict strings to normalized token sequences.
//!
//! Deterministic and pure: lowercase, split on non-alphanumerics, keep
//! fragments shaped like `[a-z]+[0-9]{0,2}[a-z]*` within length [4, 30],
//! dropping purely decimal or purely hex fragments (version numbers,
//! checksums, random strings).

use regex::Regex;
use std::sync::OnceLock;

const MIN_LEN: usize = 4;
const MAX_LEN: usize = 30;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z]+[0-9]{0,2}[a-z]*$").unwrap())
}

fn hex_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-f]+$").unwrap())
}

fn is_all_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Tokenize a single verdict string, preserving multiplicity/order within it.
fn tokenize_one(verdict: &str, out: &mut Vec<String>) {
    let lowered = verdict.to_lowercase();
    for fragment in lowered.split(|c: char| !matches!(c, '0'..='9' | 'a'..='z')) {
        if fragment.is_empty() {
            continue;
        }
        if !token_pattern().is_match(fragment) {
            continue;
        }
        if fragment.len() < MIN_LEN || fragment.len() > MAX_LEN {
            continue;
        }
        if is_all_decimal(fragment) {
            continue;
        }
        if hex_pattern().is_match(fragment) {
            continue;
        }
        out.push(fragment.to_string());
    }
}

/// Tokenize a bag of (possibly absent) verdict strings into the ordered,
/// multiplicity-preserving token sequence used by the Builder and Searcher.
pub fn make_tokens(verdicts: &[Option<&str>]) -> Vec<String> {
    let mut tokens = Vec::new();
    for verdict in verdicts.iter().flatten() {
        tokenize_one(verdict, &mut tokens);
    }
    tokens
}

/// Tokenize and reduce to the sorted distinct set, used to enumerate
/// co-occurrence edges.
pub fn make_unique_tokens(verdicts: &[Option<&str>]) -> Vec<String> {
    let mut tokens = make_tokens(verdicts);
    tokens.sort();
    tokens.dedup();
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_long_hex_and_short_alpha() {
        let toks = make_tokens(&[Some("Generic.mg.a24374c791796544")]);
        assert_eq!(toks, vec!["generic".to_string()]);
    }

    #[test]
    fn extracts_family_words_from_mixed_verdict() {
        let toks = make_tokens(&[Some("Win32/Nabucur")]);
        assert_eq!(toks, vec!["win32".to_string(), "nabucur".to_string()]);
    }

    #[test]
    fn skips_none_entries() {
        let toks = make_tokens(&[None, Some("Win32:VirLock"), None]);
        assert_eq!(toks, vec!["win32".to_string(), "virlock".to_string()]);
    }

    #[test]
    fn output_is_within_length_bounds_and_alphanumeric_pattern() {
        let pattern = token_pattern();
        for tok in make_tokens(&[Some(
            "Packed.Win32.Graybird.B@5hgpd5 W32/S-27bc0672!Eldorado",
        )]) {
            assert!(tok.len() >= MIN_LEN && tok.len() <= MAX_LEN);
            assert!(pattern.is_match(&tok));
        }
    }

    #[test]
    fn idempotent_when_rejoined_and_retokenized() {
        let input = vec![Some(
            "Win32/Nabucur Win32:VirLock Win32.Virus.Virlock.a",
        )];
        let first = make_tokens(&input);
        let joined = first.join(" ");
        let second = make_tokens(&[Some(joined.as_str())]);
        assert_eq!(first, second);
    }

    #[test]
    fn unique_tokens_are_sorted_and_deduplicated() {
        let uniq = make_unique_tokens(&[Some("win32.win32.ransom")]);
        assert_eq!(uniq, vec!["ransom".to_string(), "win32".to_string()]);
    }

    #[test]
    fn all_decimal_fragment_is_rejected() {
        assert!(make_tokens(&[Some("12345678")]).is_empty());
    }

    #[test]
    fn all_hex_fragment_is_rejected_even_when_short() {
        // "deadbeef" matches token pattern shape-wise only if it has no digit
        // infix constraint violation, but is purely hex and must be dropped.
        assert!(make_tokens(&[Some("deadbeefcafe")]).is_empty());
    }
}
