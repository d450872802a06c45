use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::engine::catalog::{Catalog, CurriculumEntry, DisplayAs};
use crate::engine::ledger::CompletionLedger;
use crate::ui::theme::Theme;

/// Read-only view of the whole curriculum with completion marks.
pub struct CurriculumTree<'a> {
    catalog: &'a Catalog,
    tutorials: &'a CompletionLedger,
    phrases: &'a CompletionLedger,
    selected: usize,
    theme: &'a Theme,
}

impl<'a> CurriculumTree<'a> {
    pub fn new(
        catalog: &'a Catalog,
        tutorials: &'a CompletionLedger,
        phrases: &'a CompletionLedger,
        selected: usize,
        theme: &'a Theme,
    ) -> Self {
        Self {
            catalog,
            tutorials,
            phrases,
            selected,
            theme,
        }
    }

    fn is_done(&self, entry: &CurriculumEntry) -> bool {
        match entry.display_as {
            DisplayAs::Tutorial => self.tutorials.has(&entry.key),
            DisplayAs::Game => self.phrases.has(&entry.key),
            DisplayAs::None => false,
        }
    }
}

/// Unlock text with control characters made visible.
pub fn display_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\r' | '\n' => '\u{21b5}',
            '\t' => '\u{2192}',
            _ => c,
        })
        .collect()
}

impl Widget for CurriculumTree<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Curriculum ")
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(4),
                Constraint::Length(1),
            ])
            .split(inner);

        self.render_list(layout[0], buf);

        let sep = Paragraph::new(Line::from(Span::styled(
            "\u{2500}".repeat(layout[1].width as usize),
            Style::default().fg(colors.border()),
        )));
        sep.render(layout[1], buf);

        self.render_detail(layout[2], buf);

        let footer = Paragraph::new(Line::from(Span::styled(
            " [\u{2191}\u{2193}/jk] Navigate   [q/Esc] Back ",
            Style::default().fg(colors.text_pending()),
        )));
        footer.render(layout[3], buf);
    }
}

impl CurriculumTree<'_> {
    fn render_list(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let entries = self.catalog.entries();
        let height = area.height as usize;
        let offset = if height == 0 {
            0
        } else {
            self.selected.saturating_sub(height - 1)
        };

        let mut lines: Vec<Line> = Vec::new();
        for (i, entry) in entries.iter().enumerate().skip(offset).take(height) {
            let done = self.is_done(entry);
            let is_selected = i == self.selected;
            let marker = if done { "\u{2605}" } else { "\u{00b7}" };
            let indent = if entry.is_game() { "    " } else { "" };
            let cursor = if is_selected { ">" } else { " " };

            let mut style = if done {
                Style::default().fg(colors.text_correct())
            } else {
                Style::default().fg(colors.text_pending())
            };
            if is_selected {
                style = style.fg(colors.accent()).add_modifier(Modifier::BOLD);
            }

            let mut spans = vec![Span::styled(
                format!("{cursor} {indent}{marker} {}", display_text(&entry.key)),
                style,
            )];
            if entry.is_tutorial()
                && let Some(group) = entry.group.as_deref()
            {
                spans.push(Span::styled(
                    format!("  [{group}]"),
                    Style::default().fg(colors.text_pending()),
                ));
            }
            lines.push(Line::from(spans));
        }

        Paragraph::new(lines).render(area, buf);
    }

    fn render_detail(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let Some(entry) = self.catalog.entries().get(self.selected) else {
            return;
        };

        let kind = match entry.display_as {
            DisplayAs::Tutorial => "Lesson",
            DisplayAs::Game => "Phrase",
            DisplayAs::None => "Entry",
        };
        let mut lines = vec![Line::from(vec![
            Span::styled(
                format!(" {kind}: "),
                Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                display_text(entry.unlock_text().unwrap_or("")),
                Style::default().fg(colors.fg()),
            ),
        ])];
        if let Some(desc) = entry.description.as_deref() {
            lines.push(Line::from(Span::styled(
                format!(" {desc}"),
                Style::default().fg(colors.fg()),
            )));
        }
        let status = match self.phrases.achieved_wpm(&entry.key) {
            Some(wpm) => format!(" Achieved at {wpm:.1} WPM"),
            None if self.is_done(entry) => " Complete".to_string(),
            None => " Not yet complete".to_string(),
        };
        lines.push(Line::from(Span::styled(
            status,
            Style::default().fg(colors.text_pending()),
        )));

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
