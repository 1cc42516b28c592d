//! Locale-aware folding and numeric-aware ordering of cell text

use crate::config::Locale;
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold text for comparison: trim, collapse inner whitespace, lower-case per
/// `locale`, then drop diacritics.
///
/// Letters are decomposed (NFD) and combining marks removed, so `"Žurnal"`
/// folds to `"zurnal"` in every locale. Under [`Locale::Turkish`] `I`
/// lower-cases to dotless `ı` and `İ` to `i` first; the invariant rules turn
/// `İ` into `i` plus a combining dot, which is then dropped.
pub fn fold(text: &str, locale: Locale) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, word) in text.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut lowered = String::with_capacity(word.len());
        for c in word.chars() {
            match (locale, c) {
                (Locale::Turkish, 'I') => lowered.push('ı'),
                (Locale::Turkish, 'İ') => lowered.push('i'),
                _ => lowered.extend(c.to_lowercase()),
            }
        }
        out.extend(
            lowered
                .nfd()
                .filter(|c| !is_combining_mark(*c))
                .map(base_letter),
        );
    }
    out
}

/// Letters whose accent is not a combining mark under NFD
fn base_letter(c: char) -> char {
    match c {
        'ı' => 'i',
        'ø' => 'o',
        'ł' => 'l',
        'đ' => 'd',
        'ħ' => 'h',
        other => other,
    }
}

/// True when folded `haystack` contains any folded keyword.
pub fn contains_any(haystack: &str, keywords: &[String], locale: Locale) -> bool {
    let folded = fold(haystack, locale);
    keywords
        .iter()
        .map(|k| fold(k, locale))
        .any(|k| !k.is_empty() && folded.contains(&k))
}

/// Compare two strings the way a person sorts a column: case and diacritics
/// ignored, runs of digits compared by numeric value (so `"9" < "10"`).
pub fn natural_cmp(a: &str, b: &str, locale: Locale) -> Ordering {
    let a = fold(a, locale);
    let b = fold(b, locale);
    let mut left = Chunks::new(&a);
    let mut right = Chunks::new(&b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l, r) {
                    (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
                    (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
                    (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
                    (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn cmp_digits(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

#[derive(Debug, Clone, Copy)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}
