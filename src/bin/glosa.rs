use std::{
    fs::File,
    io,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{info, warn};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use glosa_tui::{
    chapter::{Book, Chapter},
    config::{CliArgs, InputProfile},
    gloss::{DEFAULT_TIMEOUT, GlossService, GlossSession, GlossState, HttpGlossService},
    layout::{CellMetrics, Point, SurfaceLayout},
    popup::place_popup,
    render::{RenderOptions, RenderResult, render_surface},
    resolver::{
        InputEvent, NativeSelection, ResolverConfig, SelectionHost, SelectionResolver,
    },
    store::{FileStore, KeyValueStore, ReadingPosition},
    surface::{TextPosition, TextRange, TextSurface},
    theme::Theme,
};

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const MOUSE_SCROLL_LINES: usize = 3;
const POPUP_MAX_WIDTH: u16 = 52;

fn main() -> Result<()> {
    run()
}

fn editor_wrap_configuration(width: usize) -> (usize, usize) {
    if width == 0 {
        return (1, 0);
    }
    if width < 60 {
        let wrap_width = width.saturating_sub(1).max(1);
        return (wrap_width, 0);
    }
    if width < 100 {
        let padding = 2.min(width / 2);
        let wrap_width = width.saturating_sub(padding.saturating_mul(2)).max(1);
        return (wrap_width, padding);
    }
    let mut left_padding = width.saturating_sub(100) / 2 + 4;
    let max_padding = width.saturating_sub(1) / 2;
    if left_padding > max_padding {
        left_padding = max_padding;
    }
    let wrap_width = width.saturating_sub(left_padding.saturating_mul(2)).max(1);
    (wrap_width, left_padding)
}

fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("failed to initialize logging")?;
    Ok(())
}

fn run() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_file.as_deref())?;

    let book = args.book();
    let data_dir = args.data_dir()?;
    let store = FileStore::open(&data_dir).context("failed to open reader store")?;
    let service: Option<Arc<dyn GlossService>> = match args.gloss_endpoint.as_deref() {
        Some(endpoint) => {
            let service = HttpGlossService::new(endpoint, DEFAULT_TIMEOUT)
                .context("failed to create gloss client")?;
            Some(Arc::new(service) as Arc<dyn GlossService>)
        }
        None => None,
    };
    info!(
        "opening {:?} ({} chapters), glosses {}",
        book.title,
        book.chapter_count(),
        if service.is_some() { "enabled" } else { "unavailable" }
    );

    let mut app = App::new(book, store, service, args.input, args.resolver_config())?;

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    let saved = app.save_position();
    res.and(saved)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit() {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let tick_rate = app.tick_rate();
        let mut timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if let Some(deadline) = app.resolver.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
        }

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if app.on_deadline(Instant::now()) {
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            if app.on_tick() {
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// The chapter as the resolver sees it: text, where it was last drawn, and
/// the emulated native selection.
struct ReaderHost {
    surface: TextSurface,
    layout: SurfaceLayout,
    selection: Option<NativeSelection>,
}

impl ReaderHost {
    fn new(surface: TextSurface) -> Self {
        Self {
            surface,
            layout: SurfaceLayout::default(),
            selection: None,
        }
    }

    /// Character cell under `point`, or `None` outside the text area.
    fn position_at(&self, point: Point) -> Option<TextPosition> {
        if !self.layout.contains_point(point) {
            return None;
        }
        self.layout.glyph_near(point).map(|glyph| glyph.position)
    }
}

impl SelectionHost for ReaderHost {
    fn surface(&self) -> &TextSurface {
        &self.surface
    }

    fn layout(&self) -> &SurfaceLayout {
        &self.layout
    }

    fn native_selection(&self) -> Option<NativeSelection> {
        self.selection
    }

    fn set_native_selection(&mut self, range: Option<TextRange>) {
        self.selection = range.map(NativeSelection::from_range);
    }
}

/// Terminal cells select inclusively, so the later endpoint covers its cell.
fn drag_selection(anchor: Option<TextPosition>, focus: Option<TextPosition>) -> NativeSelection {
    let after = |p: TextPosition| TextPosition::new(p.paragraph, p.offset + 1);
    match (anchor, focus) {
        (Some(a), Some(f)) if f >= a => NativeSelection::new(Some(a), Some(after(f))),
        (Some(a), Some(f)) => NativeSelection::new(Some(after(a)), Some(f)),
        (a, f) => NativeSelection::new(a, f),
    }
}

#[derive(Clone, Copy)]
struct DragState {
    origin: (u16, u16),
    anchor: Option<TextPosition>,
    moved: bool,
}

struct App {
    book: Book,
    store: FileStore,
    gloss: GlossSession,
    theme: Theme,
    metrics: CellMetrics,
    input: InputProfile,
    resolver_config: ResolverConfig,
    chapter_index: usize,
    chapter: Chapter,
    host: ReaderHost,
    resolver: SelectionResolver,
    scroll_top: usize,
    last_view_height: usize,
    last_total_lines: usize,
    drag: Option<DragState>,
    popup_area: Option<Rect>,
    pointer_on_popup: bool,
    status_message: Option<(String, Instant)>,
    should_quit: bool,
}

impl App {
    fn new(
        book: Book,
        store: FileStore,
        service: Option<Arc<dyn GlossService>>,
        input: InputProfile,
        resolver_config: ResolverConfig,
    ) -> Result<Self> {
        let position = ReadingPosition::load(&store, &book.id).unwrap_or_default();
        let chapter_index = position.chapter.min(book.chapter_count().saturating_sub(1));
        let chapter = book
            .load_chapter(chapter_index)
            .context("book has no chapters")?
            .context("failed to load chapter")?;
        let host = ReaderHost::new(chapter.surface());
        let resolver = SelectionResolver::new(resolver_config.clone());

        Ok(Self {
            book,
            store,
            gloss: GlossSession::new(service),
            theme: Theme::default(),
            metrics: CellMetrics::default(),
            input,
            resolver_config,
            chapter_index,
            chapter,
            host,
            resolver,
            scroll_top: position.scroll,
            last_view_height: 1,
            last_total_lines: 0,
            drag: None,
            popup_area: None,
            pointer_on_popup: false,
            status_message: None,
            should_quit: false,
        })
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn tick_rate(&self) -> Duration {
        if self.gloss.is_loading() {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(250)
        }
    }

    fn save_position(&mut self) -> Result<()> {
        ReadingPosition {
            chapter: self.chapter_index,
            scroll: self.scroll_top,
        }
        .save(&mut self.store, &self.book.id);
        self.store.flush().context("failed to save reading position")?;
        Ok(())
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height < 3 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);
        let title_area = vertical[0];
        let text_area = vertical[1];
        let status_area = vertical[2];

        let title = Paragraph::new(Line::from(vec![
            Span::styled(self.book.title.clone(), self.theme.title_style()),
            Span::raw(" · "),
            Span::raw(self.chapter.title.clone()),
        ]));
        frame.render_widget(title, title_area);

        let viewport_height = text_area.height as usize;
        self.last_view_height = viewport_height.max(1);
        let mut render = self.render_text(text_area);
        if self.adjust_scroll(&render, viewport_height) {
            render = self.render_text(text_area);
        }
        self.last_total_lines = render.total_lines;

        let paragraph = Paragraph::new(Text::from(render.lines))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top.min(u16::MAX as usize) as u16, 0));
        frame.render_widget(paragraph, text_area);
        self.host.layout = render.layout;

        self.popup_area = None;
        self.render_popup(frame, text_area);

        let status_widget = Paragraph::new(self.status_line(status_area.width as usize))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);
    }

    fn render_text(&self, text_area: Rect) -> RenderResult {
        let (wrap_width, left_padding) = editor_wrap_configuration(text_area.width as usize);
        let options = RenderOptions {
            area: text_area,
            wrap_width,
            left_padding,
            scroll_top: self.scroll_top,
            metrics: self.metrics,
            selection: self.host.selection.and_then(|selection| selection.range()),
        };
        render_surface(&self.host.surface, &options, &self.theme)
    }

    /// Clamps the scroll offset to the rendered text. True when it moved.
    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) -> bool {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
            return true;
        }
        false
    }

    fn render_popup(&mut self, frame: &mut Frame, text_area: Rect) {
        let Some(result) = self.resolver.current() else {
            return;
        };
        // Hidden while the selection is scrolled out of view.
        let Some(bounds) = self.host.layout.range_bounds(result.range) else {
            return;
        };
        let anchor = self.metrics.to_cells(bounds);

        let mut lines = vec![
            Line::from(Span::styled(
                result.text.clone(),
                self.theme.popup_heading_style(),
            )),
            Line::from(Span::styled(
                result.sentence.clone(),
                self.theme.muted_style(),
            )),
            Line::from(""),
        ];
        match self.gloss.state() {
            GlossState::Idle => {}
            GlossState::Loading => lines.push(Line::from(Span::styled(
                "Looking up…",
                self.theme.muted_style(),
            ))),
            GlossState::Ready(gloss) => {
                lines.push(Line::from(Span::styled(
                    gloss.translation.clone(),
                    self.theme.popup_style(),
                )));
                for extra in [&gloss.contextual_meaning, &gloss.grammar] {
                    if !extra.is_empty() {
                        lines.push(Line::from(Span::styled(
                            extra.clone(),
                            self.theme.popup_style(),
                        )));
                    }
                }
                if !gloss.pronunciation.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("[{}]", gloss.pronunciation),
                        self.theme.muted_style(),
                    )));
                }
            }
            GlossState::Failed(message) => lines.push(Line::from(Span::styled(
                message.clone(),
                self.theme.error_style(),
            ))),
            GlossState::Unavailable => lines.push(Line::from(Span::styled(
                "No gloss service configured",
                self.theme.muted_style(),
            ))),
        }

        let width = POPUP_MAX_WIDTH.min(text_area.width);
        let inner_width = width.saturating_sub(2).max(1) as usize;
        let content_height: usize = lines
            .iter()
            .map(|line| {
                let line_width: usize = line
                    .spans
                    .iter()
                    .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
                    .sum();
                line_width.div_ceil(inner_width).max(1)
            })
            .sum();
        let height = (content_height + 2).min(u16::MAX as usize) as u16;

        let Some(placement) = place_popup(anchor, width, height, text_area) else {
            return;
        };
        frame.render_widget(Clear, placement.area);
        let popup = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .style(self.theme.popup_style())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .style(self.theme.popup_style())
                    .border_style(self.theme.popup_border_style()),
            );
        frame.render_widget(popup, placement.area);
        self.popup_area = Some(placement.area);
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        let chapter = format!(
            "Ch. {}/{}",
            self.chapter_index + 1,
            self.book.chapter_count()
        );
        let max_scroll = self
            .last_total_lines
            .saturating_sub(self.last_view_height)
            .max(1);
        let percent = (self.scroll_top.min(max_scroll) * 100) / max_scroll;

        let mut spans = vec![Span::raw(format!("{chapter} {percent}%"))];
        if let Some((message, _)) = &self.status_message {
            spans.push(Span::raw(format!(" | {message}")));
        } else if !self.resolver.word_tap_available() {
            spans.push(Span::raw(" | word taps unavailable, drag to select"));
        }

        let shortcuts = match self.input {
            InputProfile::Mouse => "Esc:Clear n/p:Chapter q:Quit",
            InputProfile::Touch => "touch Esc:Clear n/p:Chapter q:Quit",
        };
        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let shortcuts_width = shortcuts.chars().count();
        if left_width + 1 + shortcuts_width <= terminal_width {
            spans.push(Span::raw(
                " ".repeat(terminal_width - left_width - shortcuts_width),
            ));
            spans.push(Span::raw(shortcuts));
        }
        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn scroll_by_lines(&mut self, delta: isize) {
        let max_scroll = self
            .last_total_lines
            .saturating_sub(self.last_view_height.max(1)) as isize;
        let new_scroll = (self.scroll_top as isize + delta).clamp(0, max_scroll.max(0));
        self.scroll_top = new_scroll as usize;
    }

    fn open_chapter(&mut self, index: usize) {
        if index == self.chapter_index || index >= self.book.chapter_count() {
            return;
        }
        let chapter = match self.book.load_chapter(index) {
            Some(Ok(chapter)) => chapter,
            Some(Err(err)) => {
                warn!("{err}");
                self.set_status(err.to_string());
                return;
            }
            None => return,
        };

        self.resolver.unmount(&mut self.host);
        self.gloss.on_selection(None, &self.book, &self.store);
        self.host = ReaderHost::new(chapter.surface());
        self.resolver = SelectionResolver::new(self.resolver_config.clone());
        self.chapter = chapter;
        self.chapter_index = index;
        self.scroll_top = 0;
        self.drag = None;
    }

    /// Passes one event to the resolver and lets the gloss session follow.
    fn dispatch(&mut self, event: InputEvent) {
        self.resolver.handle(&mut self.host, event);
        self.sync_gloss();
    }

    fn sync_gloss(&mut self) {
        self.gloss
            .on_selection(self.resolver.current(), &self.book, &self.store);
    }

    fn on_deadline(&mut self, now: Instant) -> bool {
        if self.resolver.poll(&mut self.host, now).is_some() {
            self.sync_gloss();
            return true;
        }
        false
    }

    fn on_tick(&mut self) -> bool {
        let had_message = self.status_message.is_some();
        self.prune_status_message();
        let gloss_changed = self.gloss.poll(&mut self.store);
        gloss_changed || (had_message && self.status_message.is_none())
    }

    fn set_selection(&mut self, selection: Option<NativeSelection>, at: Instant) {
        if self.host.selection == selection {
            return;
        }
        self.host.selection = selection;
        self.dispatch(InputEvent::SelectionChange { at });
    }

    fn handle_mouse_event(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollUp => {
                self.scroll_by_lines(-(MOUSE_SCROLL_LINES as isize));
            }
            MouseEventKind::ScrollDown => {
                self.scroll_by_lines(MOUSE_SCROLL_LINES as isize);
            }
            MouseEventKind::Down(MouseButton::Left) => self.handle_mouse_down(event),
            MouseEventKind::Drag(MouseButton::Left) => self.handle_mouse_drag(event),
            MouseEventKind::Up(MouseButton::Left) => self.handle_mouse_up(event),
            _ => {}
        }
    }

    fn handle_mouse_down(&mut self, event: MouseEvent) {
        if self
            .popup_area
            .is_some_and(|area| area.contains((event.column, event.row).into()))
        {
            self.pointer_on_popup = true;
            return;
        }

        let now = Instant::now();
        let point = self.metrics.point_at(event.column, event.row);
        if self.input == InputProfile::Touch {
            self.dispatch(InputEvent::TouchStart { point, at: now });
        }

        let anchor = self.host.position_at(point);
        self.drag = Some(DragState {
            origin: (event.column, event.row),
            anchor,
            moved: false,
        });
        if let Some(position) = anchor {
            self.set_selection(Some(NativeSelection::collapsed_at(position)), now);
        }
    }

    fn handle_mouse_drag(&mut self, event: MouseEvent) {
        if self.pointer_on_popup {
            return;
        }
        let Some(mut drag) = self.drag else {
            return;
        };
        if (event.column, event.row) == drag.origin && !drag.moved {
            return;
        }
        drag.moved = true;
        self.drag = Some(drag);

        let point = self.metrics.point_at(event.column, event.row);
        let focus = self.host.position_at(point);
        if drag.anchor.is_none() && focus.is_none() {
            return;
        }
        self.set_selection(Some(drag_selection(drag.anchor, focus)), Instant::now());
    }

    fn handle_mouse_up(&mut self, event: MouseEvent) {
        if std::mem::take(&mut self.pointer_on_popup) {
            return;
        }
        let Some(drag) = self.drag.take() else {
            return;
        };

        let now = Instant::now();
        let point = self.metrics.point_at(event.column, event.row);
        match self.input {
            InputProfile::Touch => {
                self.dispatch(InputEvent::TouchEnd { point, at: now });
                self.dispatch(InputEvent::Click { point, at: now });
            }
            InputProfile::Mouse => {
                if !drag.moved && (event.column, event.row) == drag.origin {
                    self.dispatch(InputEvent::Click { point, at: now });
                }
            }
        }
    }

    fn clear_selection(&mut self) {
        self.resolver.clear(&mut self.host);
        self.sync_gloss();
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => match (code, modifiers) {
                (KeyCode::Char('q'), _) => {
                    self.should_quit = true;
                }
                (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.should_quit = true;
                }
                (KeyCode::Esc, _) => self.clear_selection(),
                (KeyCode::Char('n'), _) | (KeyCode::Right, _) => {
                    self.open_chapter(self.chapter_index + 1);
                }
                (KeyCode::Char('p'), _) | (KeyCode::Left, _) => {
                    if let Some(previous) = self.chapter_index.checked_sub(1) {
                        self.open_chapter(previous);
                    }
                }
                (KeyCode::Up, _) | (KeyCode::Char('k'), _) => self.scroll_by_lines(-1),
                (KeyCode::Down, _) | (KeyCode::Char('j'), _) => self.scroll_by_lines(1),
                (KeyCode::PageUp, _) => {
                    self.scroll_by_lines(-(self.last_view_height.max(1) as isize));
                }
                (KeyCode::PageDown, _) | (KeyCode::Char(' '), _) => {
                    self.scroll_by_lines(self.last_view_height.max(1) as isize);
                }
                (KeyCode::Home, _) => self.scroll_top = 0,
                (KeyCode::End, _) => {
                    self.scroll_top = self.last_total_lines.saturating_sub(self.last_view_height);
                }
                _ => {}
            },
            Event::Mouse(mouse_event) => {
                self.handle_mouse_event(mouse_event);
            }
            _ => {}
        }
        Ok(())
    }
}
