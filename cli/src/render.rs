//! Rendering of display directives to the local terminal.
//!
//! Wrapped lines are broken on word boundaries at the terminal width;
//! preformatted lines are printed as-is. Inverted lines use reverse video.

use std::io::{self, Write};

use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::{queue, terminal};

use terminal_core::output::DisplayDirective;


const FALLBACK_WIDTH: usize = 80;


pub fn terminal_width() -> usize {
    terminal::size()
        .map(|(cols, _)| cols as usize)
        .ok()
        .filter(|w| *w > 0)
        .unwrap_or(FALLBACK_WIDTH)
}


/// Write directives to `out`.
pub fn render(out: &mut impl Write, directives: &[DisplayDirective], width: usize) -> io::Result<()> {
    for directive in directives {
        let lines = if directive.mode.no_wrap {
            vec![directive.text.clone()]
        } else {
            wrap(&directive.text, width)
        };
        for line in lines {
            if directive.mode.inverted {
                queue!(
                    out,
                    SetAttribute(Attribute::Reverse),
                    Print(line),
                    SetAttribute(Attribute::Reset),
                    Print("\n")
                )?;
            } else {
                queue!(out, Print(line), Print("\n"))?;
            }
        }
    }
    out.flush()
}


/// Greedy word wrap. A line that already fits is kept verbatim; otherwise
/// its leading indent is repeated on every wrapped line. Words longer than
/// the remaining width are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    if text.chars().count() <= width {
        return vec![text.to_string()];
    }

    let body = text.trim_start();
    let mut indent = &text[..text.len() - body.len()];
    if indent.chars().count() >= width {
        indent = "";
    }
    let room = width - indent.chars().count();

    let mut lines = Vec::new();
    let mut current = String::new();
    let push = |line: &mut String, lines: &mut Vec<String>| {
        lines.push(format!("{}{}", indent, std::mem::take(line)));
    };

    for word in body.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > room {
            if !current.is_empty() {
                push(&mut current, &mut lines);
            }
            let mut split: String = word.chars().take(room).collect();
            word = word.chars().skip(room).collect();
            push(&mut split, &mut lines);
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > room && !current.is_empty() {
            push(&mut current, &mut lines);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        push(&mut current, &mut lines);
    }
    lines
}
