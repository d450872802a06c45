use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use tracing_subscriber::EnvFilter;

use keystep::app::{App, StatusKind};
use keystep::config::Config;
use keystep::engine::activity::Activity;
use keystep::engine::catalog::Catalog;
use keystep::event::{AppEvent, EventHandler};
use keystep::store::KeyValueStore;
use keystep::store::json_store::JsonStore;
use keystep::store::memory_store::MemoryStore;
use keystep::ui::components::curriculum_tree::{CurriculumTree, display_text};
use keystep::ui::components::menu::Menu;
use keystep::ui::components::progress_bar::ProgressBar;
use keystep::ui::components::typing_area::TypingArea;
use keystep::ui::layout::{AppLayout, pack_hint_lines};
use keystep::ui::theme::Theme;

#[derive(Parser)]
#[command(
    name = "keystep",
    version,
    about = "Terminal typing tutor with a lesson curriculum and a phrase game"
)]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short = 'w', long, help = "Session WPM a phrase must beat to be recorded")]
    target_wpm: Option<u32>,

    #[arg(long, help = "Directory for progress and session files")]
    data_dir: Option<PathBuf>,

    #[arg(long, help = "Mark every lesson complete and go straight to phrases")]
    skip_tutorial: bool,

    #[arg(long, help = "Forget all lesson and phrase progress")]
    reset: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("failed to load config")?;
    let first_run = !Config::config_path().exists();
    let file_config = config.clone();
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(target_wpm) = cli.target_wpm {
        config.target_wpm = target_wpm;
    }
    if let Some(data_dir) = cli.data_dir {
        config.log_file = data_dir.join("keystep.log");
        config.data_dir = data_dir;
    }

    init_logging(&config.log_file)?;

    // Leave an editable config behind, without the CLI overrides.
    if first_run && let Err(e) = file_config.save() {
        tracing::warn!(error = %e, "could not write default config");
    }

    let available = Theme::available_themes();
    let names: Vec<&str> = available.iter().map(String::as_str).collect();
    config.validate(&names);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        target_wpm = config.target_wpm,
        "starting keystep"
    );

    let catalog = Catalog::builtin().context("built-in curriculum is malformed")?;
    let store = open_store(&config.data_dir);
    tracing::debug!(store = store.name(), "progress store ready");
    let theme: &'static Theme =
        Box::leak(Box::new(Theme::load(&config.theme).unwrap_or_default()));

    let mut app = App::new(config, theme, store, catalog);
    if cli.reset {
        app.mediator.reset_progress();
    }
    if cli.skip_tutorial {
        app.mediator.complete_all_tutorials();
    }
    app.drain_events();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        tracing::error!(error = ?err, "exiting with error");
    }
    result
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env("KEYSTEP_LOG")
        .unwrap_or_else(|_| EnvFilter::new("keystep=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

fn open_store(data_dir: &Path) -> Rc<dyn KeyValueStore> {
    match JsonStore::with_base_dir(data_dir.to_path_buf()) {
        Ok(store) => Rc::new(store),
        Err(e) => {
            tracing::warn!(
                error = %e,
                dir = %data_dir.display(),
                "data directory unavailable, progress will not be saved"
            );
            Rc::new(MemoryStore::new())
        }
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick | AppEvent::Resize => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('d') {
        app.should_quit = true;
        return;
    }

    if app.activity() == Activity::Tree {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => app.tree_prev(),
            KeyCode::Down | KeyCode::Char('j') => app.tree_next(),
            KeyCode::Char('q') | KeyCode::Esc => app.cancel(),
            _ => {}
        }
        return;
    }

    let result = app.input.handle(key);
    app.handle_input(result);
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    let layout = AppLayout::new(area);
    render_header(frame, app, &layout);

    match app.activity() {
        Activity::Normal => render_normal(frame, app, &layout),
        Activity::Tutorial | Activity::Game => render_typing(frame, app, &layout),
        Activity::Edit => render_edit(frame, app, &layout),
        Activity::Tree => {
            let tree = CurriculumTree::new(
                app.mediator.catalog(),
                app.mediator.tutorials(),
                app.mediator.phrases(),
                app.tree_selected,
                app.theme,
            );
            frame.render_widget(tree, layout.main);
        }
    }

    if let Some(sidebar) = layout.sidebar {
        render_sidebar(frame, app, sidebar);
    }
    if app.activity() != Activity::Tree {
        render_input(frame, app, &layout);
    }
    render_footer(frame, app, &layout);
}

fn render_header(frame: &mut ratatui::Frame, app: &App, layout: &AppLayout) {
    let colors = &app.theme.colors;
    let mut info = format!(" {} ", app.activity().label());
    if let Some(group) = app.mediator.group() {
        info.push_str(&format!("| {group} "));
    }
    if !layout.tier.show_sidebar() {
        let catalog = app.mediator.catalog();
        info.push_str(&format!(
            "| lessons {:.0}% | phrases {:.0}% ",
            catalog.tutorial_progress(app.mediator.tutorials()) * 100.0,
            catalog.phrase_progress(app.mediator.phrases()) * 100.0,
        ));
    }
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " keystep ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            info,
            Style::default()
                .fg(colors.text_pending())
                .bg(colors.header_bg()),
        ),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, layout.header);
}

fn render_normal(frame: &mut ratatui::Frame, app: &App, layout: &AppLayout) {
    let colors = &app.theme.colors;
    let menu_height = 11.min(layout.main.height);
    let [menu_area, scroll_area] = Layout::vertical([
        Constraint::Length(menu_height),
        Constraint::Min(0),
    ])
    .areas(layout.main);

    frame.render_widget(Menu::new(app.input.value(), app.theme), menu_area);

    let visible = scroll_area.height as usize;
    let start = app.scrollback.len().saturating_sub(visible);
    let lines: Vec<Line> = app.scrollback[start..]
        .iter()
        .map(|l| Line::from(Span::styled(format!(" {l}"), Style::default().fg(colors.fg()))))
        .collect();
    frame.render_widget(Paragraph::new(lines), scroll_area);
}

fn render_typing(frame: &mut ratatui::Frame, app: &App, layout: &AppLayout) {
    let colors = &app.theme.colors;
    let entry = app.mediator.current_entry();
    let target = app.target_text().unwrap_or("");
    let title = match app.activity() {
        Activity::Tutorial => "Lesson",
        _ => "Phrase",
    };

    let [hint_area, typing_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(3),
    ])
    .areas(layout.main);

    let hint = entry
        .and_then(|e| e.description.as_deref())
        .unwrap_or("Type the text below and press Enter.");
    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {hint}"), Style::default().fg(colors.fg())))
            .wrap(Wrap { trim: false }),
        hint_area,
    );

    // Tutorials compare the raw line; an empty line is the Enter key.
    let typing = TypingArea::new(title, target, app.input.value(), app.theme);
    frame.render_widget(typing, typing_area);
}

fn render_edit(frame: &mut ratatui::Frame, app: &App, layout: &AppLayout) {
    let colors = &app.theme.colors;
    let block = Block::bordered()
        .title(" Scratch ")
        .border_style(Style::default().fg(colors.border()));
    let lines: Vec<Line> = app
        .scratch
        .iter()
        .map(|l| Line::from(Span::styled(l.as_str(), Style::default().fg(colors.fg()))))
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        layout.main,
    );
}

fn render_sidebar(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let catalog = app.mediator.catalog();
    let [lessons, phrases, summary] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let tutorials_total = catalog.tutorials().count();
    let tutorials_done = catalog
        .tutorials()
        .filter(|e| app.mediator.tutorials().has(&e.key))
        .count();
    frame.render_widget(
        ProgressBar::new("Lessons", tutorials_done, tutorials_total, app.theme),
        lessons,
    );

    let phrases_total = catalog.game_phrases().count();
    let phrases_done = catalog
        .game_phrases()
        .filter(|e| app.mediator.phrases().has(&e.key))
        .count();
    frame.render_widget(
        ProgressBar::new("Phrases", phrases_done, phrases_total, app.theme),
        phrases,
    );

    let mut lines = vec![Line::from(Span::styled(
        format!(" Target: {} WPM", app.mediator.target_wpm()),
        Style::default().fg(colors.fg()),
    ))];
    if let Some(last) = app.mediator.last_summary() {
        lines.push(Line::from(Span::styled(
            format!(" Last line: {:.1} WPM", last.average),
            Style::default().fg(colors.accent()),
        )));
    }
    let block = Block::bordered()
        .title(" Session ")
        .border_style(Style::default().fg(colors.border()));
    frame.render_widget(Paragraph::new(lines).block(block), summary);
}

fn render_input(frame: &mut ratatui::Frame, app: &App, layout: &AppLayout) {
    let colors = &app.theme.colors;
    let prompt = match app.activity() {
        Activity::Normal => "$ ",
        Activity::Edit => "+ ",
        _ => "> ",
    };
    let (before, cursor, after) = app.input.render_parts();
    let cursor_text = cursor.map(|c| display_text(&c.to_string())).unwrap_or_else(|| " ".to_string());

    let line = Line::from(vec![
        Span::styled(prompt, Style::default().fg(colors.accent())),
        Span::styled(before, Style::default().fg(colors.fg())),
        Span::styled(
            cursor_text,
            Style::default()
                .fg(colors.text_cursor_fg())
                .bg(colors.text_cursor_bg()),
        ),
        Span::styled(after, Style::default().fg(colors.fg())),
    ]);

    let mut border = colors.border();
    if let Some(live) = app.mediator.live_feedback(app.input.value())
        && app.activity() == Activity::Game
        && live.has_mismatch
    {
        border = colors.error();
    }
    let block = Block::bordered().border_style(Style::default().fg(border));
    frame.render_widget(Paragraph::new(line).block(block), layout.input);
}

fn render_footer(frame: &mut ratatui::Frame, app: &App, layout: &AppLayout) {
    let colors = &app.theme.colors;
    let line = match &app.status {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Info => colors.fg(),
                StatusKind::Success => colors.success(),
                StatusKind::Warning => colors.warning(),
                StatusKind::Error => colors.error(),
            };
            Line::from(Span::styled(format!(" {}", status.text), Style::default().fg(color)))
        }
        None => {
            let hints: &[&str] = match app.activity() {
                Activity::Normal => &["[Enter] Run", "[Tab] Complete", "[Ctrl-D] Quit"],
                Activity::Tree => &[],
                _ => &["[Enter] Submit", "[Esc] Clear, again to leave"],
            };
            let packed = pack_hint_lines(hints, layout.footer.width as usize);
            Line::from(Span::styled(
                packed.into_iter().next().unwrap_or_default(),
                Style::default().fg(colors.text_pending()),
            ))
        }
    };
    frame.render_widget(Paragraph::new(line), layout.footer);
}
