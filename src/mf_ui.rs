use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Span, Spans, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use std::error::Error;
use std::io;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

use crate::mf_color::{Depth, Palette};
use crate::mf_error::AddFrameError;
use crate::mf_frame::{FrameSession, FrameStatus, LocalHost, SafeAreaInsets, EVENT_LOG_LEN};
use crate::mf_game::{save_config, Cell, Config, Game};
use crate::mf_lang::{fill, Assets, Lang};

const MIN_PANEL_WIDTH: u16 = 50;
const MIN_TERMINAL_WIDTH: u16 = 80;

/// Something the user asked for, decoded from a key or mouse event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Reveal(usize, usize),
    RevealCursor,
    MoveCursor(isize, isize),
    NewGame,
    AddFrame,
    RemoveFrame,
    ToggleNotifications,
    PrimaryButton,
    Exit,
}

/// Clickable thing under the mouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Cell(usize, usize),
    NewGame,
}

// Runtime UI variables; rects are refreshed on every draw for mouse hit-testing
#[derive(Debug, Default)]
struct UiState {
    board_rect: Option<Rect>, // inner board area, two columns per cell
    new_game_rect: Option<Rect>,
    left_press: Option<Target>,
    hover: Option<Target>,
}

/// What a cell shows on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Glyph {
    Hidden,
    Mine,
    Count(u8),
    Blank,
}

impl Glyph {
    fn of(cell: &Cell) -> Glyph {
        if !cell.is_revealed() {
            Glyph::Hidden
        } else if cell.is_mine() {
            Glyph::Mine
        } else if cell.adjacent_mines() > 0 {
            Glyph::Count(cell.adjacent_mines())
        } else {
            Glyph::Blank
        }
    }

    fn text(self, ascii: bool) -> String {
        match self {
            Glyph::Hidden => (if ascii { "#" } else { "■" }).to_string(),
            Glyph::Mine => (if ascii { "*" } else { "☼" }).to_string(),
            Glyph::Count(n) => n.to_string(),
            Glyph::Blank => " ".to_string(),
        }
    }
}

/// Everything a draw pass reads
struct View<'a> {
    game: &'a Game,
    status: &'a FrameStatus,
    safe_area: SafeAreaInsets,
    assets: &'a Assets,
    palette: &'a Palette,
    ascii: bool,
}

pub fn run(cfg: &mut Config, lang: &Lang) -> Result<(), Box<dyn Error>> {
    let mut game = Game::from_config(cfg)?;
    let palette = Palette::new(Depth::detect());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnableMouseCapture, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut game, cfg, lang, &palette);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    game: &mut Game,
    cfg: &mut Config,
    lang: &Lang,
    palette: &Palette,
) -> Result<(), Box<dyn Error>> {
    let assets = &lang.assets;
    terminal.draw(|f| draw_loading(f, assets))?;

    let mut session = FrameSession::mount(LocalHost::new(cfg.host.clone()));
    let mut ui = UiState::default();

    let poll_timeout = Duration::from_millis(200);

    loop {
        {
            let status = session.status();
            let view = View {
                game: &*game,
                status: &status,
                safe_area: session.safe_area(),
                assets,
                palette,
                ascii: cfg.ascii_icons,
            };
            terminal.draw(|f| draw(f, &view, &mut ui))?;
        }

        if event::poll(poll_timeout)? {
            let action = match event::read()? {
                Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) => key_action(code),
                Event::Mouse(me) => mouse_action(&mut ui, game, me),
                _ => None,
            };
            if let Some(action) = action {
                if apply(action, game, &mut session)? {
                    break;
                }
            }
        }
    }

    // Host state outlives the session; the board does not
    cfg.host.added = session.host().config().added;
    save_config(cfg);
    Ok(())
}

fn key_action(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Up | KeyCode::Char('k') => Action::MoveCursor(-1, 0),
        KeyCode::Down | KeyCode::Char('j') => Action::MoveCursor(1, 0),
        KeyCode::Left | KeyCode::Char('h') => Action::MoveCursor(0, -1),
        KeyCode::Right | KeyCode::Char('l') => Action::MoveCursor(0, 1),
        KeyCode::Char(' ') | KeyCode::Enter => Action::RevealCursor,
        KeyCode::F(2) | KeyCode::Char('n') => Action::NewGame,
        KeyCode::Char('a') => Action::AddFrame,
        KeyCode::Char('r') => Action::RemoveFrame,
        KeyCode::Char('t') => Action::ToggleNotifications,
        KeyCode::Char('p') => Action::PrimaryButton,
        KeyCode::Esc | KeyCode::Char('q') => Action::Exit,
        _ => return None,
    };
    Some(action)
}

/// Press and release must land on the same target, like a button
fn mouse_action(ui: &mut UiState, game: &mut Game, me: MouseEvent) -> Option<Action> {
    let target = hit_test(ui, game.size, me.column, me.row);
    match me.kind {
        MouseEventKind::Moved => {
            ui.hover = target;
            if let Some(Target::Cell(y, x)) = target {
                game.cursor = (y, x);
            }
            None
        }
        MouseEventKind::Down(MouseButton::Left) => {
            ui.left_press = target;
            None
        }
        MouseEventKind::Up(MouseButton::Left) => {
            let pressed = ui.left_press.take();
            match (pressed, target) {
                (Some(a), Some(b)) if a == b => Some(match b {
                    Target::Cell(y, x) => Action::Reveal(y, x),
                    Target::NewGame => Action::NewGame,
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

fn hit_test(ui: &UiState, size: usize, column: u16, row: u16) -> Option<Target> {
    if let Some(btn) = ui.new_game_rect {
        if contains(btn, column, row) {
            return Some(Target::NewGame);
        }
    }
    let board = ui.board_rect?;
    cell_at(board, size, column, row).map(|(y, x)| Target::Cell(y, x))
}

/// Map a terminal position inside the board area to (y, x)
/// Each cell is drawn as a padding column followed by its glyph
fn cell_at(board: Rect, size: usize, column: u16, row: u16) -> Option<(usize, usize)> {
    if !contains(board, column, row) {
        return None;
    }
    let x = ((column - board.x) / 2) as usize;
    let y = (row - board.y) as usize;
    (x < size && y < size).then_some((y, x))
}

fn contains(r: Rect, column: u16, row: u16) -> bool {
    column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height
}

/// Returns true when the panel should close
fn apply(action: Action, game: &mut Game, session: &mut FrameSession<LocalHost>) -> Result<bool, Box<dyn Error>> {
    match action {
        Action::Reveal(y, x) => {
            game.cursor = (y, x);
            game.reveal(y, x)?;
        }
        Action::RevealCursor => {
            game.reveal_at_cursor()?;
        }
        Action::MoveCursor(dy, dx) => game.step_cursor(dy, dx),
        Action::NewGame => game.new_game()?,
        Action::AddFrame => session.add_frame(),
        Action::RemoveFrame => session.host_mut().remove_frame(),
        Action::ToggleNotifications => {
            let enabled = session.host().notifications_enabled();
            session.host_mut().set_notifications(!enabled);
        }
        Action::PrimaryButton => session.host_mut().click_primary_button(),
        Action::Exit => return Ok(true),
    }
    Ok(false)
}

fn add_frame_message(err: &AddFrameError, assets: &Assets) -> String {
    match err {
        AddFrameError::RejectedByUser(msg) | AddFrameError::InvalidDomainManifest(msg) => {
            fill(assets.add_not_added_fmt, &[msg])
        }
        AddFrameError::Other(_) => fill(assets.add_error_fmt, &[err]),
    }
}

fn draw_loading<B: Backend>(f: &mut Frame<B>, assets: &Assets) {
    let size = f.size();
    let area = center_rect((assets.loading.width() as u16).min(size.width), 1u16.min(size.height), size);
    f.render_widget(Paragraph::new(assets.loading), area);
}

fn draw<B: Backend>(f: &mut Frame<B>, view: &View, ui: &mut UiState) {
    let size = f.size();
    let assets = view.assets;

    ui.board_rect = None;
    ui.new_game_rect = None;

    // Nothing but the placeholder until the host has signalled ready
    if !view.status.ready {
        draw_loading(f, assets);
        return;
    }

    let area = inset(size, view.safe_area);
    let n = view.game.size as u16;

    let board_w = n * 2 + 3;
    let card_h = n + 9;
    let panel_w = (board_w + 4).max(MIN_PANEL_WIDTH);
    let panel_h = 3 + card_h + EVENT_LOG_LEN as u16 + 2;
    let min_w = panel_w.max(MIN_TERMINAL_WIDTH);
    let min_h = panel_h + 3;

    // If terminal too small, render a centered warning and skip normal UI
    if area.width < min_w || area.height < min_h {
        let insets = view.safe_area;
        let need_w = min_w.saturating_add(insets.left).saturating_add(insets.right);
        let need_h = min_h.saturating_add(insets.top).saturating_add(insets.bottom);
        let warn_lines = vec![
            Spans::from(Span::raw(assets.tsmsg_line1)),
            Spans::from(Span::raw(fill(assets.tsmsg_line2, &[&need_w, &need_h]))),
        ];
        let warn = Paragraph::new(Text::from(warn_lines))
            .block(Block::default().borders(Borders::ALL).title(assets.tsmsg_title))
            .alignment(Alignment::Center);
        f.render_widget(Clear, size);
        let w = 40u16.min(size.width);
        let h = 4u16.min(size.height);
        f.render_widget(warn, center_rect(w, h, size));
        return;
    }

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(panel_h), Constraint::Length(3)].as_ref())
        .split(area);
    let panel = center_rect(panel_w, panel_h, outer[0]);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(card_h),
                Constraint::Length(EVENT_LOG_LEN as u16 + 2),
            ]
            .as_ref(),
        )
        .split(panel);

    let header = Paragraph::new(Span::styled(assets.project_title, Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(header, rows[0]);

    draw_card(f, view, ui, rows[1]);
    draw_events(f, view, rows[2]);
    draw_keys(f, view, outer[1]);
}

fn draw_card<B: Backend>(f: &mut Frame<B>, view: &View, ui: &mut UiState, area: Rect) {
    let assets = view.assets;
    let palette = view.palette;
    let game = view.game;
    let n = game.size as u16;

    let card = Block::default().borders(Borders::ALL).title(assets.card_title).title_alignment(Alignment::Center);
    let inner = card.inner(area);
    f.render_widget(card, area);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(n + 2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(inner);

    let description = fill(assets.card_description_fmt, &[&game.mines]);
    f.render_widget(Paragraph::new(description).alignment(Alignment::Center), parts[0]);

    // board: each cell is " X", plus one trailing padding column
    let board_area = center_rect(n * 2 + 3, n + 2, parts[2]);
    let mut lines = vec![];
    for (y, row) in game.board.rows().enumerate() {
        let mut spans = vec![];
        for (x, cell) in row.iter().enumerate() {
            let glyph = Glyph::of(cell);
            let mut style = Style::default().bg(palette.board_bg);
            style = match glyph {
                Glyph::Hidden => style.fg(palette.hidden),
                Glyph::Mine => style.fg(palette.mine).add_modifier(Modifier::BOLD),
                Glyph::Count(k) => style.fg(palette.number(k)),
                Glyph::Blank => style,
            };
            if game.cursor == (y, x) && !game.game_over {
                style = style.bg(palette.cursor_bg);
            }
            spans.push(Span::styled(format!(" {}", glyph.text(view.ascii)), style));
        }
        spans.push(Span::styled(" ", Style::default().bg(palette.board_bg)));
        lines.push(Spans::from(spans));
    }
    let board = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
    f.render_widget(board, board_area);
    ui.board_rect = Some(Rect::new(board_area.x + 1, board_area.y + 1, n * 2, n));

    if game.game_over {
        let over = Paragraph::new(Span::styled(
            assets.game_over,
            Style::default().fg(palette.alert).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        f.render_widget(over, parts[3]);
    }

    let label = assets.btn_new_game;
    let btn = center_rect(label.width() as u16, 1, parts[4]);
    let mut btn_style = Style::default().bg(palette.button_bg).fg(palette.button_fg).add_modifier(Modifier::BOLD);
    if ui.hover == Some(Target::NewGame) || ui.left_press == Some(Target::NewGame) {
        btn_style = btn_style.add_modifier(Modifier::REVERSED);
    }
    f.render_widget(Paragraph::new(Span::styled(label, btn_style)), btn);
    ui.new_game_rect = Some(btn);

    let frame_line = match &view.status.last_add_error {
        Some(err) => Span::styled(add_frame_message(err, assets), Style::default().fg(palette.alert)),
        None if view.status.added => Span::styled(assets.frame_added, Style::default().fg(palette.dim)),
        None => Span::styled(assets.frame_not_added, Style::default().fg(palette.dim)),
    };
    f.render_widget(Paragraph::new(frame_line).alignment(Alignment::Center), parts[5]);
}

fn draw_events<B: Backend>(f: &mut Frame<B>, view: &View, area: Rect) {
    let lines: Vec<Spans> = view
        .status
        .events
        .iter()
        .map(|e| Spans::from(Span::styled(format!(" {}", e), Style::default().fg(view.palette.dim))))
        .collect();
    let events = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL).title(view.assets.events_title));
    f.render_widget(events, area);
}

fn draw_keys<B: Backend>(f: &mut Frame<B>, view: &View, area: Rect) {
    let a = view.assets;
    let items = [
        ("Space", a.key_reveal),
        ("F2", a.key_new),
        ("a", a.key_add),
        ("r", a.key_remove),
        ("t", a.key_notify),
        ("p", a.key_primary),
        ("Esc", a.key_exit),
    ];
    let key_style = Style::default().fg(view.palette.key).add_modifier(Modifier::BOLD);
    let mut spans = vec![Span::raw(" ")];
    for (i, (key, rest)) in items.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(key.to_string(), key_style));
        spans.push(Span::raw(format!(": {}", rest)));
    }
    let status = Paragraph::new(Spans::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

/// Shrink `r` by the host's safe-area insets
fn inset(r: Rect, insets: SafeAreaInsets) -> Rect {
    let left = insets.left.min(r.width);
    let top = insets.top.min(r.height);
    Rect::new(
        r.x + left,
        r.y + top,
        r.width.saturating_sub(insets.left.saturating_add(insets.right)),
        r.height.saturating_sub(insets.top.saturating_add(insets.bottom)),
    )
}

fn center_rect(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
