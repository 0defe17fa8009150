//! Parsers for typed field values: booleans, yes/no/only switches,
//! durations, dates and language names.

use std::time::Duration;

use chrono::{DateTime, Days, Months, NaiveDate, TimeDelta, Utc};

use super::error::{QueryError, Result};

/// Parses the boolean spellings accepted by `case:` and similar fields.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "y" | "Y" | "yes" | "YES" | "Yes" | "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "n" | "N" | "no" | "NO" | "No" | "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(QueryError::validation(format!("invalid boolean {value:?}"))),
    }
}

/// Tri-state switch used by `fork:`, `archived:` and `index:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNoOnly {
    Yes,
    No,
    Only,
}

pub fn parse_yes_no_only(value: &str) -> Option<YesNoOnly> {
    match value {
        "o" | "only" | "ONLY" | "Only" => Some(YesNoOnly::Only),
        _ => parse_bool(value)
            .ok()
            .map(|b| if b { YesNoOnly::Yes } else { YesNoOnly::No }),
    }
}

fn unit_nanos(unit: &str) -> Option<f64> {
    Some(match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60.0 * 1e9,
        "h" => 3600.0 * 1e9,
        _ => return None,
    })
}

/// Parses durations like `300ms`, `1.5h` or `1m30s`.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || QueryError::validation(format!("invalid duration {value:?}"));
    if value == "0" {
        return Ok(Duration::ZERO);
    }
    if value.is_empty() {
        return Err(invalid());
    }

    let mut nanos = 0f64;
    let mut rest = value;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = unit_nanos(&rest[..unit_len]).ok_or_else(invalid)?;
        rest = &rest[unit_len..];

        nanos += number * unit;
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Parses a date relative to now. See [`parse_date_at`].
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    parse_date_at(value, Utc::now())
}

/// Parses `YYYY-MM-DD`, RFC 3339 timestamps and relative phrases such as
/// `yesterday`, `last week` or `3 days ago`, resolving the latter against
/// `now`.
pub fn parse_date_at(value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let invalid = || QueryError::validation(format!("invalid date {value:?}"));
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(invalid);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let lower = value.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    match words.as_slice() {
        ["now"] => Ok(now),
        ["today"] => Ok(now),
        ["yesterday"] => now.checked_sub_days(Days::new(1)).ok_or_else(invalid),
        ["last", unit] => subtract(now, 1, unit).ok_or_else(invalid),
        [n, unit, "ago"] => {
            let n: u32 = n.parse().map_err(|_| invalid())?;
            subtract(now, n, unit).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn subtract(now: DateTime<Utc>, n: u32, unit: &str) -> Option<DateTime<Utc>> {
    let n64 = i64::from(n);
    match unit.trim_end_matches('s') {
        "second" | "sec" => now.checked_sub_signed(TimeDelta::try_seconds(n64)?),
        "minute" | "min" => now.checked_sub_signed(TimeDelta::try_minutes(n64)?),
        "hour" => now.checked_sub_signed(TimeDelta::try_hours(n64)?),
        "day" => now.checked_sub_days(Days::new(u64::from(n))),
        "week" => now.checked_sub_days(Days::new(7 * u64::from(n))),
        "month" => now.checked_sub_months(Months::new(n)),
        "year" => now.checked_sub_months(Months::new(12 * n)),
        _ => None,
    }
}

/// Languages and their lowercase aliases. The first entry is the display
/// name.
const LANGUAGES: &[(&str, &[&str])] = &[
    ("Bash", &["bash", "sh", "shell", "zsh"]),
    ("C", &["c", "h"]),
    ("C#", &["c#", "csharp", "cs"]),
    ("C++", &["c++", "cpp", "cc", "cxx", "hpp"]),
    ("Clojure", &["clojure", "clj"]),
    ("CSS", &["css"]),
    ("Dart", &["dart"]),
    ("Dockerfile", &["dockerfile", "docker"]),
    ("Elixir", &["elixir", "ex", "exs"]),
    ("Erlang", &["erlang", "erl"]),
    ("Go", &["go", "golang"]),
    ("GraphQL", &["graphql", "gql"]),
    ("Haskell", &["haskell", "hs"]),
    ("HTML", &["html", "htm"]),
    ("Java", &["java"]),
    ("JavaScript", &["javascript", "js", "jsx", "node"]),
    ("JSON", &["json"]),
    ("Kotlin", &["kotlin", "kt"]),
    ("Lua", &["lua"]),
    ("Makefile", &["makefile", "make"]),
    ("Markdown", &["markdown", "md"]),
    ("Nix", &["nix"]),
    ("Objective-C", &["objective-c", "objc", "objectivec"]),
    ("OCaml", &["ocaml", "ml"]),
    ("Perl", &["perl", "pl"]),
    ("PHP", &["php"]),
    ("Protocol Buffer", &["protocol buffer", "protobuf", "proto"]),
    ("Python", &["python", "py"]),
    ("R", &["r"]),
    ("Ruby", &["ruby", "rb"]),
    ("Rust", &["rust", "rs"]),
    ("Scala", &["scala"]),
    ("SQL", &["sql"]),
    ("Swift", &["swift"]),
    ("Terraform", &["terraform", "hcl", "tf"]),
    ("TOML", &["toml"]),
    ("TypeScript", &["typescript", "ts", "tsx"]),
    ("Vue", &["vue"]),
    ("XML", &["xml"]),
    ("YAML", &["yaml", "yml"]),
    ("Zig", &["zig"]),
];

/// Resolves a language name or alias, in any case, to its display name.
pub fn lookup_language(value: &str) -> Option<&'static str> {
    let lower = value.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(_, aliases)| aliases.contains(&lower.as_str()))
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_bool() {
        for v in ["y", "Y", "yes", "YES", "Yes", "true", "1"] {
            assert!(parse_bool(v).unwrap(), "{v}");
        }
        for v in ["n", "N", "no", "NO", "No", "false", "0"] {
            assert!(!parse_bool(v).unwrap(), "{v}");
        }
        assert_eq!(parse_bool("yep").unwrap_err().to_string(), r#"invalid boolean "yep""#);
    }

    #[test]
    fn test_parse_yes_no_only() {
        assert_eq!(parse_yes_no_only("only"), Some(YesNoOnly::Only));
        assert_eq!(parse_yes_no_only("o"), Some(YesNoOnly::Only));
        assert_eq!(parse_yes_no_only("Yes"), Some(YesNoOnly::Yes));
        assert_eq!(parse_yes_no_only("n"), Some(YesNoOnly::No));
        assert_eq!(parse_yes_no_only("sometimes"), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5 minutes").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_parse_date_absolute() {
        let date = parse_date("2021-03-04").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2021, 3, 4, 0, 0, 0).unwrap());
        let ts = parse_date("2021-03-04T10:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 3, 4, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_relative() {
        let now = Utc.with_ymd_and_hms(2022, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(
            parse_date_at("3 days ago", now).unwrap(),
            Utc.with_ymd_and_hms(2022, 6, 12, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("yesterday", now).unwrap(),
            Utc.with_ymd_and_hms(2022, 6, 14, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("last week", now).unwrap(),
            Utc.with_ymd_and_hms(2022, 6, 8, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("1 month ago", now).unwrap(),
            Utc.with_ymd_and_hms(2022, 5, 15, 12, 0, 0).unwrap()
        );
        assert!(parse_date_at("whenever", now).is_err());
        assert!(parse_date_at("3 fortnights ago", now).is_err());
    }

    #[test]
    fn test_lookup_language() {
        assert_eq!(lookup_language("Go"), Some("Go"));
        assert_eq!(lookup_language("golang"), Some("Go"));
        assert_eq!(lookup_language("TS"), Some("TypeScript"));
        assert_eq!(lookup_language("brainfudge"), None);
    }
}
