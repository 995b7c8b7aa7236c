//! Text-level helpers for CHECK clause pattern matching.
//!
//! Catalogs hand back CHECK text in many shapes: PostgreSQL wraps every
//! sub-expression in parentheses and sprinkles `::type` casts everywhere,
//! MySQL quotes identifiers with backticks, SQL Server with brackets. These
//! helpers strip that noise so the matchers in `constraint` only have to
//! recognise the plain forms.

use regex::Regex;
use std::sync::LazyLock;

/// PostgreSQL `::type` casts, including multi-word types, type modifiers and
/// array suffixes (`::character varying(20)[]`).
static CAST_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)::\s*(?:character\s+varying\b|double\s+precision\b|bit\s+varying\b|timestamp(?:\s+with(?:out)?\s+time\s+zone)?\b|time(?:\s+with(?:out)?\s+time\s+zone)?\b|"[^"]+"|[a-z_][a-z0-9_]*(?:\.[a-z_][a-z0-9_]*)?)(?:\s*\(\s*\d+(?:\s*,\s*\d+)?\s*\))?(?:\s*\[\s*\])*"#,
    )
    .expect("cast regex is valid")
});

/// `CAST(expr AS type)` -> `expr`
static CAST_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bCAST\s*\(\s*([^()]+?|\([^()]*\))\s+AS\s+[a-z_][a-z0-9_ ]*(?:\(\s*\d+(?:\s*,\s*\d+)?\s*\))?\s*\)",
    )
    .expect("cast call regex is valid")
});

/// A parenthesized bare identifier that is not a function argument:
/// `(status)` -> `status`, but `length(status)` is left alone.
static PAREN_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|[^\w])\(\s*((?:[A-Za-z_][\w$]*|"[^"]+"|`[^`]+`|\[[^\]]+\])(?:\.(?:[A-Za-z_][\w$]*|"[^"]+"|`[^`]+`|\[[^\]]+\]))*)\s*\)"#)
        .expect("paren ident regex is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Regex fragment matching a possibly qualified, possibly quoted identifier.
pub(crate) const IDENT: &str = r#"(?:[A-Za-z_][\w$]*|"[^"]+"|`[^`]+`|\[[^\]]+\])(?:\s*\.\s*(?:[A-Za-z_][\w$]*|"[^"]+"|`[^`]+`|\[[^\]]+\]))*"#;

/// Normalize a raw CHECK clause into a single-line expression without casts,
/// without a leading `CHECK` keyword and without redundant parentheses.
pub fn normalize_clause(raw: &str) -> String {
    let mut expr = WHITESPACE.replace_all(raw.trim(), " ").into_owned();

    if expr.len() >= 5 && expr[..5].eq_ignore_ascii_case("check") {
        expr = expr[5..].trim_start().to_string();
    }

    expr = CAST_SUFFIX.replace_all(&expr, "").into_owned();
    for _ in 0..4 {
        let next = CAST_CALL.replace_all(&expr, "$1").into_owned();
        if next == expr {
            break;
        }
        expr = next;
    }
    for _ in 0..8 {
        let next = PAREN_IDENT.replace_all(&expr, "${1}${2}").into_owned();
        if next == expr {
            break;
        }
        expr = next;
    }

    strip_outer_parens(&expr).to_string()
}

/// Remove parentheses that wrap the whole expression, repeatedly.
pub fn strip_outer_parens(expr: &str) -> &str {
    let mut current = expr.trim();
    while current.starts_with('(') && current.ends_with(')') && wraps_whole(current) {
        current = current[1..current.len() - 1].trim();
    }
    current
}

/// True when the opening parenthesis at index 0 closes at the last byte.
fn wraps_whole(expr: &str) -> bool {
    let mut depth = 0i32;
    let mut in_quote = false;
    let bytes = expr.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    return i == bytes.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Boolean connective used by [`split_top_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn keyword(self) -> &'static [u8] {
        match self {
            Connective::And => b"and",
            Connective::Or => b"or",
        }
    }
}

/// Split an expression on a connective that appears outside parentheses and
/// string literals. The `AND` belonging to `BETWEEN x AND y` is not a split
/// point.
pub fn split_top_level(expr: &str, connective: Connective) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let keyword = connective.keyword();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut pending_between = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' {
            in_quote = !in_quote;
            i += 1;
            continue;
        }
        if in_quote {
            i += 1;
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && at_word_start(bytes, i) {
            if word_at(bytes, i, b"between") {
                pending_between = true;
            } else if word_at(bytes, i, keyword) {
                if connective == Connective::And && pending_between {
                    pending_between = false;
                } else {
                    parts.push(expr[start..i].trim());
                    start = i + keyword.len();
                    i = start;
                    continue;
                }
            }
        }
        i += 1;
    }
    parts.push(expr[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn at_word_start(bytes: &[u8], i: usize) -> bool {
    i == 0 || !is_word_byte(bytes[i - 1])
}

fn word_at(bytes: &[u8], i: usize, word: &[u8]) -> bool {
    let end = i + word.len();
    end <= bytes.len()
        && bytes[i..end].eq_ignore_ascii_case(word)
        && (end == bytes.len() || !is_word_byte(bytes[end]))
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Split a literal list (`'a', 'b, c', 3`) on commas outside quotes and
/// parentheses.
pub fn split_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;
    for (i, b) in list.bytes().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'(' | b'[' if !in_quote => depth += 1,
            b')' | b']' if !in_quote => depth -= 1,
            b',' if !in_quote && depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Reduce a possibly qualified, possibly quoted identifier to its bare,
/// lowercase column name: `"public"."users"."Email"` -> `email`.
pub fn identifier_name(ident: &str) -> String {
    let last = split_qualified(ident).pop().unwrap_or_default();
    unquote_identifier(&last).to_lowercase()
}

/// Like [`identifier_name`] but keeps the original case.
pub fn identifier_display(ident: &str) -> String {
    let last = split_qualified(ident).pop().unwrap_or_default();
    unquote_identifier(&last)
}

fn split_qualified(ident: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in ident.trim().chars() {
        match (quote, ch) {
            (None, '"') | (None, '`') | (None, '[') => {
                quote = Some(if ch == '[' { ']' } else { ch });
                current.push(ch);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(ch);
            }
            (None, '.') => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

fn unquote_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    for (open, close) in [('"', '"'), ('`', '`'), ('[', ']')] {
        if trimmed.len() >= 2 && trimmed.starts_with(open) && trimmed.ends_with(close) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

/// A literal on the right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    /// Quote-stripped string literal.
    Text(String),
    /// Anything else: keywords, identifiers, function calls.
    Bare(String),
}

impl Literal {
    /// The literal as it should appear in an allowed-value set.
    pub fn as_value(&self) -> String {
        match self {
            Literal::Number(n) => format_number(*n),
            Literal::Text(s) | Literal::Bare(s) => s.clone(),
        }
    }
}

/// Parse a literal, tolerating surrounding parentheses, `E'..'`/`N'..'`
/// prefixes and doubled single quotes.
pub fn parse_literal(raw: &str) -> Literal {
    let trimmed = strip_outer_parens(raw);

    let quoted = trimmed
        .strip_prefix(['E', 'e', 'N', 'n'])
        .filter(|rest| rest.starts_with('\''))
        .unwrap_or(trimmed);
    if quoted.len() >= 2 && quoted.starts_with('\'') && quoted.ends_with('\'') {
        return Literal::Text(quoted[1..quoted.len() - 1].replace("''", "'"));
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.parse::<f64>() {
        Ok(n) if n.is_finite() => Literal::Number(n),
        _ => Literal::Bare(trimmed.to_string()),
    }
}

/// Render a number without a trailing `.0` for whole values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
