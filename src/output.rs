//! Colored terminal output for the binary

use crate::index::dynamic::Mismatch;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print the verdict of comparing two indexes, followed by the first mismatch
pub fn print_comparison(mismatch: Option<&Mismatch>, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);
    write_comparison(&mut stdout, mismatch)
}

fn write_comparison<W: WriteColor>(out: &mut W, mismatch: Option<&Mismatch>) -> io::Result<()> {
    match mismatch {
        None => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
            writeln!(out, "The indexes are identical")?;
            out.reset()?;
        }
        Some(mismatch) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            writeln!(out, "The indexes are different")?;
            out.reset()?;

            let label = match mismatch {
                Mismatch::Header { .. } => "Headers differ".to_string(),
                Mismatch::Record { comp, .. } => format!("Records differ at index {}", comp),
            };
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(out, "{}", label)?;
            out.reset()?;
            writeln!(out, "{}", mismatch)?;
        }
    }
    Ok(())
}

/// Print the result of an LF query
pub fn print_lf(from: usize, offset: usize, result: Option<(usize, usize)>, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);
    write!(stdout, "LF({}, {}) = ", from, offset)?;
    match result {
        Some((node, pos)) => {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            writeln!(stdout, "({}, {})", node, pos)?;
        }
        None => {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            writeln!(stdout, "invalid")?;
        }
    }
    stdout.reset()
}
