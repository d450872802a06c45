use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::ui::theme::Theme;

pub struct MenuItem {
    pub command: &'static str,
    pub description: &'static str,
}

pub const MENU_ITEMS: &[MenuItem] = &[
    MenuItem {
        command: "tut",
        description: "Continue the lessons (tut -r starts over)",
    },
    MenuItem {
        command: "play",
        description: "Practice phrases you have not mastered yet",
    },
    MenuItem {
        command: "tree",
        description: "Browse the curriculum",
    },
    MenuItem {
        command: "edit",
        description: "Free typing in a scratch buffer",
    },
    MenuItem {
        command: "quit",
        description: "Leave keystep",
    },
];

/// Normal-mode command overview. Highlights commands matching what has been typed.
pub struct Menu<'a> {
    typed: &'a str,
    theme: &'a Theme,
}

impl<'a> Menu<'a> {
    pub fn new(typed: &'a str, theme: &'a Theme) -> Self {
        Self { typed, theme }
    }

    fn matches(&self, item: &MenuItem) -> bool {
        let word = self.typed.split_whitespace().next().unwrap_or("");
        !word.is_empty() && item.command.starts_with(word)
    }
}

impl Widget for Menu<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(inner);

        let title_lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "keystep",
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Type a command and press Enter",
                Style::default().fg(colors.fg()),
            )),
        ];
        Paragraph::new(title_lines)
            .alignment(Alignment::Center)
            .render(layout[0], buf);

        let lines: Vec<Line> = MENU_ITEMS
            .iter()
            .map(|item| {
                let highlighted = self.matches(item);
                let command_style = Style::default()
                    .fg(if highlighted {
                        colors.accent()
                    } else {
                        colors.fg()
                    })
                    .add_modifier(Modifier::BOLD);
                Line::from(vec![
                    Span::styled(format!("  {:<6}", item.command), command_style),
                    Span::styled(item.description, Style::default().fg(colors.text_pending())),
                ])
            })
            .collect();
        Paragraph::new(lines).render(layout[1], buf);
    }
}
