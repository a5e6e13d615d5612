//! Sentence atomization and PII scrubbing.
//!
//! Pure functions, no state. Raw client text is split into sentence-level
//! atoms, then each atom is scrubbed before it can reach storage or the
//! Oracle:
//! - e-mail-shaped substrings
//! - 13–16 digit grouped runs (card-shaped)
//! - standalone 4–6 digit runs (PIN/code-shaped; intentionally aggressive)

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder for redacted e-mail addresses.
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";
/// Placeholder for redacted card-shaped numeric runs.
pub const CARD_PLACEHOLDER: &str = "[CREDIT_CARD]";
/// Placeholder for redacted short numeric codes.
pub const CODE_PLACEHOLDER: &str = "[SENSITIVE_CODE]";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+").unwrap());

static CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d[ -]*?){13,16}\b").unwrap());

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4,6}\b").unwrap());

/// Split raw text into ordered sentence-level atoms.
///
/// A split happens after `.`, `!` or `?` when the next character is
/// whitespace, an ASCII uppercase letter, or the end of input — so an
/// abbreviation like "e.g. this" does not split, while "Hello.Next" does.
/// Atoms are trimmed; atoms with fewer than 2 non-space characters are
/// dropped. Empty input yields an empty vec.
pub fn atomize(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut atoms = Vec::new();
    let chars: Vec<(usize, char)> = trimmed.char_indices().collect();
    let mut start = 0;

    for i in 0..chars.len() {
        let (idx, c) = chars[i];
        if matches!(c, '.' | '!' | '?') {
            let boundary = match chars.get(i + 1) {
                None => true,
                Some(&(_, next)) => next.is_whitespace() || next.is_ascii_uppercase(),
            };
            if boundary {
                let end = idx + c.len_utf8();
                push_atom(&mut atoms, &trimmed[start..end]);
                start = end;
            }
        }
    }
    if start < trimmed.len() {
        push_atom(&mut atoms, &trimmed[start..]);
    }

    atoms
}

fn push_atom(atoms: &mut Vec<String>, raw: &str) {
    let atom = raw.trim();
    if atom.chars().filter(|c| !c.is_whitespace()).count() >= 2 {
        atoms.push(atom.to_string());
    }
}

/// Redact PII from one atom.
///
/// The 4–6 digit rule also swallows years and counts; that false-positive
/// rate is a known product decision and must not be narrowed here.
pub fn scrub_pii(atom: &str) -> String {
    if atom.is_empty() {
        return String::new();
    }

    let scrubbed = EMAIL_RE.replace_all(atom, EMAIL_PLACEHOLDER);
    let scrubbed = CARD_RE.replace_all(&scrubbed, CARD_PLACEHOLDER);
    CODE_RE.replace_all(&scrubbed, CODE_PLACEHOLDER).into_owned()
}
