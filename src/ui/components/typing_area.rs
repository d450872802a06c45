use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::engine::phrase_match::{self, CharStatus};
use crate::ui::theme::Theme;

/// Target text with the typed line overlaid character by character.
pub struct TypingArea<'a> {
    title: &'a str,
    target: &'a str,
    typed: &'a str,
    theme: &'a Theme,
}

impl<'a> TypingArea<'a> {
    pub fn new(title: &'a str, target: &'a str, typed: &'a str, theme: &'a Theme) -> Self {
        Self {
            title,
            target,
            typed,
            theme,
        }
    }
}

/// A render token maps a single target character to its display representation.
struct RenderToken {
    display: String,
    is_line_break: bool,
}

/// Expand target chars into render tokens, handling whitespace display.
fn build_render_tokens(target: &[char]) -> Vec<RenderToken> {
    let mut tokens = Vec::new();
    let mut col = 0usize;

    for &ch in target {
        match ch {
            '\r' | '\n' => {
                tokens.push(RenderToken {
                    display: "\u{21b5}".to_string(), // ↵
                    is_line_break: ch == '\n',
                });
                if ch == '\n' {
                    col = 0;
                }
            }
            '\t' => {
                let tab_width = 4 - (col % 4);
                let mut display = String::from("\u{2192}"); // →
                for _ in 1..tab_width {
                    display.push('\u{00b7}'); // ·
                }
                tokens.push(RenderToken {
                    display,
                    is_line_break: false,
                });
                col += tab_width;
            }
            _ => {
                tokens.push(RenderToken {
                    display: ch.to_string(),
                    is_line_break: false,
                });
                col += 1;
            }
        }
    }

    tokens
}

impl Widget for TypingArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let target: Vec<char> = self.target.chars().collect();
        let tokens = build_render_tokens(&target);
        let statuses = phrase_match::char_statuses(self.target, self.typed);
        let cursor = self.typed.chars().count();

        let mut lines: Vec<Line> = Vec::new();
        let mut current: Vec<Span> = Vec::new();

        for (idx, (token, status)) in tokens.iter().zip(&statuses).enumerate() {
            let style = match status {
                CharStatus::Correct => Style::default().fg(colors.text_correct()),
                CharStatus::Incorrect(_) => Style::default()
                    .fg(colors.text_incorrect())
                    .bg(colors.text_incorrect_bg())
                    .add_modifier(Modifier::UNDERLINED),
                CharStatus::Pending if idx == cursor => Style::default()
                    .fg(colors.text_cursor_fg())
                    .bg(colors.text_cursor_bg()),
                CharStatus::Pending => Style::default().fg(colors.text_pending()),
            };

            // Show what was actually typed, except over whitespace markers.
            let display = match status {
                CharStatus::Incorrect(actual) if !target[idx].is_whitespace() => {
                    actual.to_string()
                }
                _ => token.display.clone(),
            };
            current.push(Span::styled(display, style));

            if token.is_line_break {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
        }

        // Overflow past the end of the target.
        let overflow: String = self.typed.chars().skip(target.len()).collect();
        if !overflow.is_empty() {
            current.push(Span::styled(
                overflow,
                Style::default()
                    .fg(colors.text_incorrect())
                    .bg(colors.text_incorrect_bg()),
            ));
        }
        lines.push(Line::from(current));

        let block = Block::bordered()
            .title(format!(" {} ", self.title))
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });

        paragraph.render(area, buf);
    }
}
