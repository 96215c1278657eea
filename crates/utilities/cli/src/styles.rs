//! Terminal styles for clap help output.

use clap::builder::styling::{AnsiColor, Color, Style, Styles};

/// Returns the styles used by every quarry command.
pub fn cli_styles() -> Styles {
    Styles::styled()
        .header(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .usage(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .literal(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .valid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))))
}
