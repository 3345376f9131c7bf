//! Help text: Formatting for command listings and per-command help.
//!
//! Two levels of detail:
//!
//! 1. **Listing** (`HELP`, `HELP 2`): one row per command, paged.
//! 2. **Command help** (`HELP SAMPLE`, `SAMPLE --help`): usage, description
//!    and the option table built from the command's `OptionSet`.

use crate::options::OptionSet;
use crate::output::{CommandResult, DisplayMode};
use crate::registry::CommandDescriptor;


/// Detailed help lines for one command.
pub fn command_help(descriptor: &CommandDescriptor, options: &OptionSet) -> Vec<String> {
    let mut lines = Vec::new();
    if descriptor.parameters.is_empty() {
        lines.push(descriptor.name.to_string());
    } else {
        lines.push(format!("{} {}", descriptor.name, descriptor.parameters));
    }
    lines.push(String::new());
    lines.push(descriptor.description.to_string());

    let rows = options.rows();
    if !rows.is_empty() {
        lines.push(String::new());
        lines.push("Options:".to_string());
        let width = rows.iter().map(|(sig, _)| sig.len()).max().unwrap_or(0);
        for (sig, description) in rows {
            lines.push(format!("  {:<width$}  {}", sig, description, width = width));
        }
    }
    lines
}


/// Write a command's detailed help. Lines are preformatted so the option
/// table keeps its columns.
pub fn write_help(output: &mut CommandResult, descriptor: &CommandDescriptor) {
    let options = (descriptor.options)();
    for line in command_help(descriptor, &options) {
        output.write_line_with(DisplayMode::PREFORMATTED, line);
    }
}


/// One page of the command listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpPage {
    /// 1-based page number actually shown (clamped into range).
    pub page: u32,
    pub pages: u32,
    pub header: String,
    /// Column-aligned command rows.
    pub rows: Vec<String>,
    pub footer: Vec<String>,
}


pub fn page_count(total: usize, page_size: usize) -> u32 {
    let size = page_size.max(1);
    (total.div_ceil(size)).max(1) as u32
}


/// Format one page of a command listing. Out-of-range pages are clamped.
pub fn listing_page(commands: &[&CommandDescriptor], page: u32, page_size: usize) -> HelpPage {
    let size = page_size.max(1);
    let pages = page_count(commands.len(), size);
    let page = page.clamp(1, pages);

    let start = (page as usize - 1) * size;
    let shown = commands.iter().skip(start).take(size);

    let name_width = commands.iter().map(|d| d.name.len()).max().unwrap_or(0);
    let param_width = commands.iter().map(|d| d.parameters.len()).max().unwrap_or(0);

    let header = format!("Available commands (page {} of {}):", page, pages);
    let mut rows = Vec::new();
    for d in shown {
        rows.push(format!(
            "  {:<nw$}  {:<pw$}  {}",
            d.name,
            d.parameters,
            d.description,
            nw = name_width,
            pw = param_width
        ));
    }
    let mut footer = Vec::new();
    if pages > 1 {
        if page < pages {
            footer.push(format!("Type {} to see the next page.", page + 1));
        } else {
            footer.push("Type a page number to go back.".to_string());
        }
    }
    footer.push("Type HELP <command> for details on a command.".to_string());

    HelpPage {
        page,
        pages,
        header,
        rows,
        footer,
    }
}


/// Write a listing page. Rows are preformatted so their columns survive.
pub fn write_listing(output: &mut CommandResult, page: &HelpPage) {
    output.write_line_with(DisplayMode::INVERTED, page.header.as_str());
    for row in &page.rows {
        output.write_line_with(DisplayMode::PREFORMATTED, row.as_str());
    }
    for line in &page.footer {
        output.write_line(line.as_str());
    }
}
