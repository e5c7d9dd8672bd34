//! Compiled regex patterns for fact extraction from official pages

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::types::FactKind;

/// Characters before a date searched for a deadline keyword
const KEYWORD_WINDOW: usize = 80;
/// Characters after a language keyword searched for language names
const LANGUAGE_WINDOW: usize = 60;
/// Characters of context kept on each side of a match
const EXCERPT_CONTEXT: usize = 40;

pub static DEADLINE_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(frist|deadline|bewerbungsschluss|anmeldeschluss|einschreibeschluss|\buntil\b|\bbis\b|spätestens)")
        .expect("DEADLINE_KEYWORD regex is valid")
});

pub static DATE_DE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\.\s?(\d{1,2})\.\s?(\d{4})\b").expect("DATE_DE regex is valid")
});

pub static DATE_ISO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("DATE_ISO regex is valid")
});

pub static FEE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:[.,]\d{3})+|\d+)(?:[.,](\d{2}))?\s*(?:€|eur\b|euro\b)")
        .expect("FEE_SUFFIX regex is valid")
});

pub static FEE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:€|\beur\b)\s*(\d{1,3}(?:[.,]\d{3})+|\d+)(?:[.,](\d{2}))?\b")
        .expect("FEE_PREFIX regex is valid")
});

pub static CREDITS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*(?:ects|cp\b|credit points|credits|leistungspunkte)")
        .expect("CREDITS regex is valid")
});

pub static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:-\s*)?(?:semestern|semesters|semester)\b")
        .expect("DURATION regex is valid")
});

pub static LANGUAGE_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(unterrichtssprache|lehrsprache|studiensprache|language of instruction|taught in)")
        .expect("LANGUAGE_KEYWORD regex is valid")
});

pub static LANGUAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(deutsch|englisch|german|english)\b").expect("LANGUAGE_NAME regex is valid")
});

/// A normalized fact found in a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub kind: FactKind,
    /// Normalized value (ISO date, cents, number, language list)
    pub value: String,
    /// Text around the match
    pub excerpt: String,
}

/// Extract every recognizable fact from a text
pub fn extract_facts(text: &str) -> Vec<Fact> {
    let mut facts = Vec::new();
    extract_deadlines(text, &mut facts);
    extract_fees(text, &mut facts);

    for caps in CREDITS.captures_iter(text) {
        if let (Some(all), Some(n)) = (caps.get(0), caps.get(1)) {
            facts.push(fact(text, FactKind::Credits, trim_number(n.as_str()), all.start(), all.end()));
        }
    }

    for caps in DURATION.captures_iter(text) {
        if let (Some(all), Some(n)) = (caps.get(0), caps.get(1)) {
            facts.push(fact(text, FactKind::Duration, trim_number(n.as_str()), all.start(), all.end()));
        }
    }

    extract_languages(text, &mut facts);
    facts
}

fn extract_deadlines(text: &str, facts: &mut Vec<Fact>) {
    let dates = DATE_DE
        .captures_iter(text)
        .filter_map(|c| {
            let m = c.get(0)?;
            let iso = iso_date(c.get(3)?.as_str(), c.get(2)?.as_str(), c.get(1)?.as_str())?;
            Some((m.start(), m.end(), iso))
        })
        .chain(DATE_ISO.captures_iter(text).filter_map(|c| {
            let m = c.get(0)?;
            let iso = iso_date(c.get(1)?.as_str(), c.get(2)?.as_str(), c.get(3)?.as_str())?;
            Some((m.start(), m.end(), iso))
        }));

    for (start, end, iso) in dates {
        let window = &text[floor_boundary(text, start.saturating_sub(KEYWORD_WINDOW))..start];
        // Only the sentence the date appears in
        let window = window
            .rsplit('\n')
            .next()
            .and_then(|line| line.rsplit(". ").next())
            .unwrap_or_default();
        if DEADLINE_KEYWORD.is_match(window) {
            facts.push(fact(text, FactKind::Deadline, iso, start, end));
        }
    }
}

fn extract_fees(text: &str, facts: &mut Vec<Fact>) {
    for regex in [&*FEE_SUFFIX, &*FEE_PREFIX] {
        for caps in regex.captures_iter(text) {
            let (Some(all), Some(units)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let units: String = units.as_str().chars().filter(char::is_ascii_digit).collect();
            let cents = caps.get(2).map_or("00", |c| c.as_str());
            let Ok(value) = format!("{}{}", units, cents).parse::<u64>() else {
                continue;
            };
            facts.push(fact(text, FactKind::Fee, value.to_string(), all.start(), all.end()));
        }
    }
}

fn extract_languages(text: &str, facts: &mut Vec<Fact>) {
    for keyword in LANGUAGE_KEYWORD.find_iter(text) {
        let end = ceil_boundary(text, (keyword.end() + LANGUAGE_WINDOW).min(text.len()));
        let window = &text[keyword.end()..end];
        // Stop at the end of the sentence
        let window = window.split(['.', '\n']).next().unwrap_or_default();

        let names: BTreeSet<&'static str> = LANGUAGE_NAME
            .find_iter(window)
            .map(|m| normalize_language(m.as_str()))
            .collect();
        if names.is_empty() {
            continue;
        }

        let value = names.into_iter().collect::<Vec<_>>().join(",");
        facts.push(fact(text, FactKind::Language, value, keyword.start(), keyword.end() + window.len()));
    }
}

/// German and English spellings mapped to lowercase english names
fn normalize_language(name: &str) -> &'static str {
    match name.to_lowercase().as_str() {
        "deutsch" | "german" => "german",
        _ => "english",
    }
}

fn iso_date(year: &str, month: &str, day: &str) -> Option<String> {
    let year: u32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(year as i32, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

fn trim_number(raw: &str) -> String {
    raw.parse::<u32>().map(|n| n.to_string()).unwrap_or_else(|_| raw.to_string())
}

fn fact(text: &str, kind: FactKind, value: String, start: usize, end: usize) -> Fact {
    Fact {
        kind,
        value,
        excerpt: excerpt(text, start, end),
    }
}

/// Whitespace-collapsed text around `start..end`
pub fn excerpt(text: &str, start: usize, end: usize) -> String {
    let from = floor_boundary(text, start.saturating_sub(EXCERPT_CONTEXT));
    let to = ceil_boundary(text, (end + EXCERPT_CONTEXT).min(text.len()));
    text[from..to].split_whitespace().collect::<Vec<_>>().join(" ")
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str, kind: FactKind) -> Vec<String> {
        extract_facts(text)
            .into_iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.value)
            .collect()
    }

    #[test]
    fn test_deadlines_need_a_keyword() {
        let text = "Bewerbungsschluss ist der 15.07.2025. Vorlesungsbeginn am 01.10.2025.";
        assert_eq!(values(text, FactKind::Deadline), vec!["2025-07-15"]);

        let iso = "Applications are open until 2025-01-15 for the summer term.";
        assert_eq!(values(iso, FactKind::Deadline), vec!["2025-01-15"]);

        let invalid = "Frist: 31.02.2025";
        assert!(values(invalid, FactKind::Deadline).is_empty());
    }

    #[test]
    fn test_fees_in_cents() {
        let text = "Der Semesterbeitrag beträgt 391,50 € und der Verwaltungskostenbeitrag 1.500 Euro. \
                    Late fee: EUR 20.";
        assert_eq!(values(text, FactKind::Fee), vec!["39150", "150000", "2000"]);
    }

    #[test]
    fn test_credits_and_duration() {
        let text = "Der Studiengang umfasst 210 ECTS bei einer Regelstudienzeit von 7 Semestern. \
                    Im 3. Semester folgt das Praxisprojekt mit 15 CP.";
        assert_eq!(values(text, FactKind::Credits), vec!["210", "15"]);
        assert_eq!(values(text, FactKind::Duration), vec!["7"]);
    }

    #[test]
    fn test_language_normalized() {
        let text = "Unterrichtssprache: Deutsch und Englisch. Sonst nichts.";
        assert_eq!(values(text, FactKind::Language), vec!["english,german"]);

        let text = "The programme is taught in English.";
        assert_eq!(values(text, FactKind::Language), vec!["english"]);
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let text = format!("{} Frist 15.07.2025 {}", "ä".repeat(100), "ö".repeat(100));
        let facts = extract_facts(&text);
        assert_eq!(facts.len(), 1);
        assert!(facts[0].excerpt.contains("Frist 15.07.2025"));
        assert!(facts[0].excerpt.chars().count() < 120);
    }
}
