//! Grade extraction from reviewer output.
//!
//! Sources are tried in order, the first hit wins:
//!
//! | Source | Example |
//! |--------|---------|
//! | Structured field | `{"grade": "PASS"}` (the last such object counts) |
//! | Labelled line | `**GRADE: FAIL**`, scanned bottom-up |
//! | Trailing token | a last non-empty line that is only `PASS` or `FAIL` |
//!
//! Text in `>` quoted lines, inside code fences (for the free-text sources),
//! between double quotes or between backticks never counts. If nothing
//! matches the grade is [`Grade::Unknown`], which [`Grade::effective`] maps
//! to `Fail`.

use serde::{Deserialize, Serialize};

/// Reviewer verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    Pass,
    Fail,
    Unknown,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Pass => "PASS",
            Grade::Fail => "FAIL",
            Grade::Unknown => "UNKNOWN",
        }
    }

    /// `Unknown` counts as `Fail`, never as a silent pass.
    pub fn effective(&self) -> Grade {
        match self {
            Grade::Pass => Grade::Pass,
            Grade::Fail | Grade::Unknown => Grade::Fail,
        }
    }

    fn from_token(token: &str) -> Option<Grade> {
        match token.trim().to_ascii_uppercase().as_str() {
            "PASS" => Some(Grade::Pass),
            "FAIL" => Some(Grade::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a grade was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeSource {
    StructuredField,
    LabelledLine,
    TrailingToken,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedGrade {
    pub grade: Grade,
    pub source: GradeSource,
}

/// Extract the reviewer's grade; `Unknown` when none is recognizable.
pub fn parse_grade(text: &str) -> Grade {
    parse_grade_detailed(text).grade
}

pub fn parse_grade_detailed(text: &str) -> ParsedGrade {
    let found = |grade, source| ParsedGrade { grade, source };

    if let Some(grade) = structured_grade(text) {
        return found(grade, GradeSource::StructuredField);
    }

    let lines = visible_lines(text);
    if let Some(grade) = lines.iter().rev().find_map(|l| labelled_grade(l)) {
        return found(grade, GradeSource::LabelledLine);
    }
    if let Some(grade) = lines
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .and_then(|l| trailing_token(l))
    {
        return found(grade, GradeSource::TrailingToken);
    }

    found(Grade::Unknown, GradeSource::NotFound)
}

/// Last JSON object with a string `grade` field, outside quoted lines and
/// backtick spans.
fn structured_grade(text: &str) -> Option<Grade> {
    let cleaned: String = text
        .lines()
        .filter(|l| !is_quote_line(l))
        .map(|l| {
            if l.trim_start().starts_with("```") {
                String::new()
            } else {
                strip_spans(l, &[('`', '`')])
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut last = None;
    for (start, _) in cleaned.match_indices('{') {
        let mut stream =
            serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<serde_json::Value>();
        if let Some(Ok(serde_json::Value::Object(map))) = stream.next()
            && let Some(grade) = map
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("grade"))
                .and_then(|(_, v)| v.as_str())
                .and_then(Grade::from_token)
        {
            last = Some(grade);
        }
    }
    last
}

/// Lines outside code fences and `>` quotes, with quoted spans blanked.
fn visible_lines(text: &str) -> Vec<String> {
    let mut in_fence = false;
    let mut lines = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || is_quote_line(line) {
            continue;
        }
        lines.push(strip_spans(
            line,
            &[('"', '"'), ('`', '`'), ('\u{201c}', '\u{201d}')],
        ));
    }
    lines
}

fn is_quote_line(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

/// Replace text between each (open, close) delimiter pair with spaces.
fn strip_spans(line: &str, pairs: &[(char, char)]) -> String {
    let mut out = String::with_capacity(line.len());
    let mut closing: Option<char> = None;
    for c in line.chars() {
        match closing {
            Some(close) if c == close => {
                closing = None;
                out.push(' ');
            }
            Some(_) => out.push(' '),
            None => match pairs.iter().find(|(open, _)| *open == c) {
                Some((_, close)) => {
                    closing = Some(*close);
                    out.push(' ');
                }
                None => out.push(c),
            },
        }
    }
    out
}

fn words(line: &str) -> Vec<&str> {
    line.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .collect()
}

/// `GRADE: PASS`, `Grade - fail`, `**GRADE:** PASS`
fn labelled_grade(line: &str) -> Option<Grade> {
    let words = words(line);
    let label = words.iter().rposition(|w| w.eq_ignore_ascii_case("grade"))?;
    words.get(label + 1).and_then(|w| Grade::from_token(w))
}

/// A line holding nothing but the verdict: `PASS`, `**fail**`, `Pass.`
///
/// Prose that merely mentions the word ("still does not pass") never counts.
fn trailing_token(line: &str) -> Option<Grade> {
    match words(line).as_slice() {
        [only] => Grade::from_token(only),
        _ => None,
    }
}
