//! Low-level scanning routines.
//!
//! Each routine takes the input positioned at the start of a construct and
//! reports what it recognized and how many bytes it consumed. None of them
//! keep state beyond a cursor.

use super::error::ScanError;
use super::fields::Registry;

/// A recognized `[-]field:` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedField {
    /// The field as written, without the leading `-`.
    pub field: String,
    pub negated: bool,
    /// Bytes consumed, including the `-` and the `:`.
    pub len: usize,
}

/// Scans an optional `-`, then ASCII letters, then `:`. Returns `None` unless
/// the letters name a recognized field (case-insensitively).
pub fn scan_field(buf: &str, registry: &Registry) -> Option<ScannedField> {
    let mut chars = buf.char_indices();
    let (_, first) = chars.next()?;
    if first != '-' && !first.is_ascii_alphabetic() {
        return None;
    }

    let mut colon = None;
    for (i, c) in chars {
        if c.is_ascii_alphabetic() {
            continue;
        }
        if c == ':' {
            colon = Some(i);
        }
        break;
    }

    let colon = colon?;
    let negated = first == '-';
    let field = if negated { &buf[1..colon] } else { &buf[..colon] };
    if field.is_empty() || !registry.is_field(field) {
        return None;
    }

    Some(ScannedField {
        field: field.to_string(),
        negated,
        len: colon + 1,
    })
}

pub fn is_field(buf: &str, registry: &Registry) -> bool {
    scan_field(buf, registry).is_some()
}

/// Reports whether `buf` starts with `and`, `or` or `not` followed by
/// whitespace.
fn starts_with_keyword(buf: &str) -> bool {
    ["and", "or", "not"].iter().any(|keyword| {
        buf.get(..keyword.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
            && buf[keyword.len()..].starts_with(char::is_whitespace)
    })
}

/// Reports whether any whitespace-separated token of `s` is `and` or `or`.
pub fn contains_and_or_keyword(s: &str) -> bool {
    s.split_whitespace()
        .any(|token| token.eq_ignore_ascii_case("and") || token.eq_ignore_ascii_case("or"))
}

/// Scans a pattern that may contain balanced parentheses, including
/// whitespace inside them.
///
/// Scanning stops at whitespace when the parentheses are balanced. An
/// unmatched `)` ends the scan just before it, since it may close an outer
/// group. The scan is rejected when an opening parenthesis is followed by a
/// field or keyword, when any token is a field, when the text contains `and`
/// or `or`, or when the parentheses do not balance: in all these cases the
/// parentheses are grouping syntax, not pattern text.
pub fn scan_balanced_pattern(buf: &str, registry: &Registry) -> Option<(String, usize)> {
    let mut balanced = 0i32;
    let mut result = String::new();
    let mut token = String::new();
    let mut count = 0;

    let mut chars = buf.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c.is_whitespace() && balanced == 0 => break,
            '(' => {
                let rest = &buf[i + 1..];
                if is_field(rest, registry) || starts_with_keyword(rest) {
                    return None;
                }
                balanced += 1;
                result.push(c);
            }
            ')' => {
                balanced -= 1;
                if balanced < 0 {
                    // Balanced up to here; the paren belongs to the caller.
                    balanced = 0;
                    break;
                }
                result.push(c);
            }
            c if c.is_whitespace() => {
                if is_field(&token, registry) {
                    return None;
                }
                token.clear();
                result.push(c);
            }
            '\\' => {
                result.push('\\');
                if let Some((j, escaped)) = chars.next() {
                    result.push(escaped);
                    count = j + escaped.len_utf8();
                    continue;
                }
            }
            c => {
                token.push(c);
                result.push(c);
            }
        }
        count = i + c.len_utf8();
    }

    if balanced != 0 || result.is_empty() {
        return None;
    }
    if is_field(&token, registry) || contains_and_or_keyword(&result) {
        return None;
    }
    Some((result, count))
}

/// Scans up to whitespace. Parentheses end the value unless
/// `allow_dangling_parens` is set, in which case they are kept. The third
/// element reports whether the kept parentheses were unbalanced.
pub fn scan_value(buf: &str, allow_dangling_parens: bool) -> (String, usize, bool) {
    let mut balanced = 0i32;
    let mut result = String::new();
    let mut count = 0;

    let mut chars = buf.char_indices();
    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() {
            break;
        }
        if c == '(' || c == ')' {
            balanced += if c == '(' { 1 } else { -1 };
            if !allow_dangling_parens {
                break;
            }
            result.push(c);
            count = i + 1;
            continue;
        }
        if c == '\\' {
            if let Some((j, escaped)) = chars.next() {
                result.push('\\');
                result.push(escaped);
                count = j + escaped.len_utf8();
                continue;
            }
        }
        result.push(c);
        count = i + c.len_utf8();
    }
    (result, count, balanced != 0)
}

/// Scans a value delimited by `delimiter`, which `buf` must start with.
///
/// Returns the unescaped value and the number of bytes consumed including
/// both delimiters. `\n`, `\t` and `\r` are interpreted, `\\` and an escaped
/// delimiter yield the character itself, and `\a`, `\b`, `\f`, `\v` are kept
/// verbatim. Any other escape is an error in `strict` mode and kept verbatim
/// otherwise.
pub fn scan_delimited(buf: &str, strict: bool, delimiter: char) -> Result<(String, usize), ScanError> {
    let mut chars = buf.char_indices();
    match chars.next() {
        Some((_, c)) if c == delimiter => {}
        _ => return Err(ScanError::UnterminatedLiteral(delimiter)),
    }

    let mut result = String::new();
    while let Some((i, c)) = chars.next() {
        if c == delimiter {
            return Ok((result, i + c.len_utf8()));
        }
        if c != '\\' {
            result.push(c);
            continue;
        }
        let Some((_, escaped)) = chars.next() else {
            return Err(ScanError::UnterminatedLiteral(delimiter));
        };
        match escaped {
            'a' | 'b' | 'f' | 'v' => {
                result.push('\\');
                result.push(escaped);
            }
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            c if c == '\\' || c == delimiter => result.push(c),
            c => {
                if strict {
                    return Err(ScanError::UnrecognizedEscape);
                }
                result.push('\\');
                result.push(c);
            }
        }
    }
    Err(ScanError::UnterminatedLiteral(delimiter))
}

/// Scans a parenthesized argument list starting at `(` up to its matching
/// `)`. A backslash skips the following character, so escaped parentheses do
/// not count. Returns the bytes consumed including both parentheses.
pub fn scan_balanced_parens(buf: &str) -> Option<usize> {
    if !buf.starts_with('(') {
        return None;
    }

    let mut depth = 0usize;
    let mut chars = buf.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Scans a predicate call such as `contains.file(path:a)` in the value of
/// `field`. Returns the call text and its length.
pub fn scan_predicate(field: &str, buf: &str, registry: &Registry) -> Option<(String, usize)> {
    let field = registry.canonical(field)?;
    let predicates = registry.predicates();
    if !predicates.has_field(field) {
        return None;
    }

    let name_len = buf
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '.'))
        .unwrap_or(buf.len());
    let name = &buf[..name_len];
    if name.is_empty() || !predicates.contains(field, name) {
        return None;
    }

    let args_len = scan_balanced_parens(&buf[name_len..])?;
    let len = name_len + args_len;
    Some((buf[..len].to_string(), len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> &'static Registry {
        Registry::standard()
    }

    #[test]
    fn test_scan_field() {
        let f = scan_field("repo:foo", registry()).unwrap();
        assert_eq!((f.field.as_str(), f.negated, f.len), ("repo", false, 5));

        let f = scan_field("-File:x", registry()).unwrap();
        assert_eq!((f.field.as_str(), f.negated, f.len), ("File", true, 6));
    }

    #[test]
    fn test_scan_field_rejects() {
        assert!(scan_field("-:foo", registry()).is_none());
        assert!(scan_field("-", registry()).is_none());
        assert!(scan_field("foo:bar", registry()).is_none());
        assert!(scan_field("repo", registry()).is_none());
        assert!(scan_field("re1po:x", registry()).is_none());
        assert!(scan_field(":x", registry()).is_none());
    }

    #[test]
    fn test_scan_balanced_pattern_accepts_parens() {
        assert_eq!(
            scan_balanced_pattern("(hello there)", registry()),
            Some(("(hello there)".to_string(), 13))
        );
        assert_eq!(
            scan_balanced_pattern("foo() bar", registry()),
            Some(("foo()".to_string(), 5))
        );
    }

    #[test]
    fn test_scan_balanced_pattern_rejects_groups() {
        assert!(scan_balanced_pattern("(foo OR bar)", registry()).is_none());
        assert!(scan_balanced_pattern("repo:foo bar", registry()).is_none());
        assert!(scan_balanced_pattern("(repo:foo bar)", registry()).is_none());
        assert!(scan_balanced_pattern("(not foo)", registry()).is_none());
        assert!(scan_balanced_pattern("(unbalanced", registry()).is_none());
    }

    #[test]
    fn test_scan_balanced_pattern_stops_at_unmatched_close() {
        assert_eq!(
            scan_balanced_pattern("foo) bar", registry()),
            Some(("foo".to_string(), 3))
        );
        assert!(scan_balanced_pattern(")", registry()).is_none());
    }

    #[test]
    fn test_scan_balanced_pattern_keeps_escapes() {
        assert_eq!(
            scan_balanced_pattern(r"a\ b c", registry()),
            Some((r"a\ b".to_string(), 4))
        );
    }

    #[test]
    fn test_scan_value() {
        assert_eq!(scan_value("foo(bar) baz", false), ("foo".to_string(), 3, true));
        assert_eq!(scan_value("foo(bar) baz", true), ("foo(bar)".to_string(), 8, false));
        assert_eq!(scan_value("bar( x", true), ("bar(".to_string(), 4, true));
    }

    #[test]
    fn test_scan_delimited() {
        assert_eq!(scan_delimited(r#""a b" c"#, false, '"'), Ok(("a b".to_string(), 5)));
        assert_eq!(scan_delimited(r#""a\"b""#, true, '"'), Ok((r#"a"b"#.to_string(), 6)));
        assert_eq!(scan_delimited(r#"'a\nb'"#, true, '\''), Ok(("a\nb".to_string(), 6)));
        assert_eq!(scan_delimited(r#""a\db""#, false, '"'), Ok((r"a\db".to_string(), 6)));
        assert_eq!(
            scan_delimited(r#""a\db""#, true, '"'),
            Err(ScanError::UnrecognizedEscape)
        );
        assert_eq!(
            scan_delimited(r#""abc"#, false, '"'),
            Err(ScanError::UnterminatedLiteral('"'))
        );
        assert_eq!(
            scan_delimited("\"", false, '"'),
            Err(ScanError::UnterminatedLiteral('"'))
        );
    }

    #[test]
    fn test_scan_balanced_parens() {
        assert_eq!(scan_balanced_parens("(a(b)c) d"), Some(7));
        assert_eq!(scan_balanced_parens(r"(a\)b)"), Some(6));
        assert_eq!(scan_balanced_parens("(a(b)"), None);
        assert_eq!(scan_balanced_parens("a"), None);
    }

    #[test]
    fn test_scan_predicate() {
        assert_eq!(
            scan_predicate("repo", "contains.file(path:foo) bar", registry()),
            Some(("contains.file(path:foo)".to_string(), 23))
        );
        assert_eq!(
            scan_predicate("r", "has.description(x)", registry()),
            Some(("has.description(x)".to_string(), 18))
        );
        assert!(scan_predicate("repo", "contains.file", registry()).is_none());
        assert!(scan_predicate("repo", "nope(x)", registry()).is_none());
        assert!(scan_predicate("lang", "contains.file(x)", registry()).is_none());
    }

    #[test]
    fn test_contains_and_or_keyword() {
        assert!(contains_and_or_keyword("(a OR b)"));
        assert!(contains_and_or_keyword("x and y"));
        assert!(!contains_and_or_keyword("(android orange)"));
    }
}
