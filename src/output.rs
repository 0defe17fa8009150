//! Terminal output for plans, query trees and errors

use std::io::{self, Write};
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::changeset::TextSearchTerm;
use crate::query::printer::string_human;
use crate::query::{Basic, Node, Plan};

fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Print a plan, one basic query per line
pub fn print_plan(plan: &Plan, color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));
    write_plan(&mut stdout, plan)
}

pub fn write_plan(out: &mut impl WriteColor, plan: &Plan) -> io::Result<()> {
    for (i, basic) in plan.iter().enumerate() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}", i + 1)?;
        out.reset()?;
        write!(out, ": ")?;
        write_basic(out, basic)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Parameters first, then the pattern, separated by spaces
fn write_basic(out: &mut impl WriteColor, basic: &Basic) -> io::Result<()> {
    let mut first = true;
    for parameter in &basic.parameters {
        if !first {
            write!(out, " ")?;
        }
        first = false;
        let rendered = string_human(&[Node::Parameter(parameter.clone())]);
        let (field, value) = rendered.split_once(':').unwrap_or((rendered.as_str(), ""));
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{field}")?;
        out.reset()?;
        write!(out, ":{value}")?;
    }

    if let Some(pattern) = &basic.pattern {
        if !first {
            write!(out, " ")?;
        }
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", string_human(std::slice::from_ref(pattern)))?;
        out.reset()?;
    }
    Ok(())
}

/// Print a single line of text, such as a rendered query
pub fn print_line(line: &str) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Never);
    writeln!(stdout, "{line}")
}

/// Print changeset search terms, `+` for required and `-` for excluded
pub fn print_terms(terms: &[TextSearchTerm], color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));
    write_terms(&mut stdout, terms)
}

pub fn write_terms(out: &mut impl WriteColor, terms: &[TextSearchTerm]) -> io::Result<()> {
    for term in terms {
        let (sign, fg) = if term.not { ('-', Color::Red) } else { ('+', Color::Green) };
        out.set_color(ColorSpec::new().set_fg(Some(fg)))?;
        write!(out, "{sign}")?;
        out.reset()?;
        writeln!(out, "{}", term.term)?;
    }
    Ok(())
}

/// Print an error and its causes to stderr
pub fn print_error(err: &anyhow::Error, color: bool) -> io::Result<()> {
    let mut stderr = StandardStream::stderr(color_choice(color));
    write_error(&mut stderr, err)
}

pub fn write_error(out: &mut impl WriteColor, err: &anyhow::Error) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    write!(out, "error")?;
    out.reset()?;
    writeln!(out, ": {err}")?;
    for cause in err.chain().skip(1) {
        writeln!(out, "  caused by: {cause}")?;
    }
    Ok(())
}

/// Render into an uncoloured string, for tests and non-terminal callers
pub fn render(write: impl FnOnce(&mut Buffer) -> io::Result<()>) -> io::Result<String> {
    let mut buffer = Buffer::no_color();
    write(&mut buffer)?;
    Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SearchType, init, pipeline};
    use anyhow::Context;

    fn plan(input: &str) -> Plan {
        pipeline(vec![init(input, SearchType::Standard)]).unwrap()
    }

    #[test]
    fn test_write_plan() {
        let out = render(|buf| write_plan(buf, &plan("repo:a or repo:b"))).unwrap();
        assert_eq!(out, "1: repo:a\n2: repo:b\n");
        let out = render(|buf| write_plan(buf, &plan("repo:a -file:test foo"))).unwrap();
        assert_eq!(out, "1: repo:a -file:test foo\n");
    }

    #[test]
    fn test_write_plan_pattern_only() {
        let out = render(|buf| write_plan(buf, &plan("foo or bar"))).unwrap();
        assert_eq!(out, "1: foo OR bar\n");
    }

    #[test]
    fn test_write_terms() {
        let terms = vec![
            TextSearchTerm { term: "foo".to_string(), not: false },
            TextSearchTerm { term: "bar baz".to_string(), not: true },
        ];
        let out = render(|buf| write_terms(buf, &terms)).unwrap();
        assert_eq!(out, "+foo\n-bar baz\n");
    }

    #[test]
    fn test_write_error_with_causes() {
        let err = Err::<(), _>(std::io::Error::other("disk full"))
            .context("Failed to write config file")
            .unwrap_err();
        let out = render(|buf| write_error(buf, &err)).unwrap();
        assert_eq!(out, "error: Failed to write config file\n  caused by: disk full\n");
    }
}
