/// Terminal front-end for arranging mesh footprints on a sheet
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::Color,
    terminal,
};
use footprint_core::{LoadOutcome, Session};
use log::{debug, error, info};
use nalgebra::Vector2;
use std::collections::VecDeque;
use std::io::{self, stdout, Write};
use std::path::Path;
use std::time::Duration;

pub mod renderer;

pub use renderer::{SheetRenderer, Viewport};

/// Keyboard nudge step in millimeters; Shift multiplies it by ten
const NUDGE_MM: f64 = 1.0;

const HELP: &str = "a:add c:clear e:export Tab:select arrows:nudge q:quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    AddModels,
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Prompt { kind: PromptKind, buffer: String },
}

/// A blocking message box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    fn info(title: &str, message: String) -> Self {
        Self {
            title: title.to_string(),
            message,
            is_error: false,
        }
    }

    fn error(title: &str, message: String) -> Self {
        Self {
            title: title.to_string(),
            message,
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    index: usize,
    column: u16,
    row: u16,
}

/// Main application struct for the interactive layout session
pub struct TerminalApp {
    session: Session,
    renderer: SheetRenderer,
    viewport: Viewport,
    mode: Mode,
    notices: VecDeque<Notice>,
    selected: Option<usize>,
    drag: Option<Drag>,
    running: bool,
}

impl TerminalApp {
    /// Create an app drawing into a `width` x `height` terminal
    pub fn new(session: Session, width: u16, height: u16) -> Self {
        let viewport = Self::fit_viewport(&session, width, height);
        Self {
            session,
            renderer: SheetRenderer::new(width as usize, height as usize),
            viewport,
            mode: Mode::Normal,
            notices: VecDeque::new(),
            selected: None,
            drag: None,
            running: true,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Notification currently shown, if any
    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Load a batch of model files, queueing a notification per failure
    pub fn add_models<P: AsRef<Path>>(&mut self, paths: &[P]) {
        let outcomes = self.session.add_models(paths);
        self.report_outcomes(&outcomes);
    }

    fn report_outcomes(&mut self, outcomes: &[LoadOutcome]) {
        for outcome in outcomes {
            match &outcome.result {
                Ok(index) => self.selected = Some(*index),
                Err(e) => self.notices.push_back(Notice::error(
                    "Could not add model",
                    format!("{}: {}", outcome.path.display(), e),
                )),
            }
        }
    }

    fn export(&mut self, base: &str) {
        let result = if base.is_empty() {
            self.session.export(None)
        } else {
            self.session.export(Some(Path::new(base)))
        };

        match result {
            Ok(Some(report)) => self.notices.push_back(Notice::info(
                "Exported",
                format!(
                    "Wrote {} and {}",
                    report.pdf_path.display(),
                    report.json_path.display()
                ),
            )),
            Ok(None) => debug!("Nothing to export"),
            Err(e) => {
                error!("Export failed: {}", e);
                self.notices
                    .push_back(Notice::error("Export failed", e.to_string()));
            }
        }
    }

    fn fit_viewport(session: &Session, width: u16, height: u16) -> Viewport {
        // Bottom row is the status line
        let area = renderer::view_area(session.sheet());
        Viewport::fit(&area, width, height.saturating_sub(1))
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.renderer.resize(width as usize, height as usize);
        self.viewport = Self::fit_viewport(&self.session, width, height);
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        self.resize(width, height);
        self.render()?;

        while self.running {
            if event::poll(Duration::from_millis(250))? {
                self.handle_event(event::read()?);
                self.render()?;
            }
        }

        info!("Session closed with {} items", self.session.sheet().len());
        Ok(())
    }

    /// Apply one terminal event to the session
    pub fn handle_event(&mut self, event: Event) {
        if let Event::Resize(width, height) = event {
            self.resize(width, height);
            return;
        }

        // A notification swallows all input until a key dismisses it
        if !self.notices.is_empty() {
            if let Event::Key(KeyEvent {
                kind: KeyEventKind::Press,
                ..
            }) = event
            {
                self.notices.pop_front();
            }
            return;
        }

        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if let Mode::Prompt { kind, buffer } = &mut self.mode {
            match key.code {
                KeyCode::Char(c) => buffer.push(c),
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Enter => {
                    let (kind, input) = (*kind, std::mem::take(buffer));
                    self.mode = Mode::Normal;
                    self.submit(kind, &input);
                }
                _ => {}
            }
            return;
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            NUDGE_MM * 10.0
        } else {
            NUDGE_MM
        };

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('a') => {
                self.mode = Mode::Prompt {
                    kind: PromptKind::AddModels,
                    buffer: String::new(),
                };
            }
            KeyCode::Char('c') => {
                self.session.clear();
                self.selected = None;
                self.drag = None;
            }
            KeyCode::Char('e') => {
                self.mode = Mode::Prompt {
                    kind: PromptKind::Export,
                    buffer: self.session.config().export_name.clone(),
                };
            }
            KeyCode::Tab => {
                let len = self.session.sheet().len();
                self.selected = match self.selected {
                    _ if len == 0 => None,
                    Some(i) => Some((i + 1) % len),
                    None => Some(0),
                };
            }
            KeyCode::Up => self.nudge(0.0, -step),
            KeyCode::Down => self.nudge(0.0, step),
            KeyCode::Left => self.nudge(-step, 0.0),
            KeyCode::Right => self.nudge(step, 0.0),
            _ => {}
        }
    }

    fn submit(&mut self, kind: PromptKind, input: &str) {
        match kind {
            PromptKind::AddModels => {
                let paths: Vec<&str> = input.split_whitespace().collect();
                if !paths.is_empty() {
                    self.add_models(&paths);
                }
            }
            PromptKind::Export => self.export(input.trim()),
        }
    }

    /// Move the selection by a distance in millimeters (Y down)
    fn nudge(&mut self, dx_mm: f64, dy_mm: f64) {
        if let Some(index) = self.selected {
            let units = self.session.sheet().scale().units_per_mm();
            let delta = Vector2::new(dx_mm, dy_mm) * units;
            self.session.sheet_mut().move_by(index, &delta);
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let point = self.viewport.cell_center(mouse.column, mouse.row);
                self.selected = self.session.sheet().item_at(&point);
                self.drag = self.selected.map(|index| Drag {
                    index,
                    column: mouse.column,
                    row: mouse.row,
                });
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(drag) = &mut self.drag {
                    let delta = self.viewport.cell_delta(
                        i32::from(mouse.column) - i32::from(drag.column),
                        i32::from(mouse.row) - i32::from(drag.row),
                    );
                    drag.column = mouse.column;
                    drag.row = mouse.row;
                    let index = drag.index;
                    self.session.sheet_mut().move_by(index, &delta);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.drag = None;
            }
            _ => {}
        }
    }

    fn status_line(&self) -> String {
        match &self.mode {
            Mode::Prompt {
                kind: PromptKind::AddModels,
                buffer,
            } => format!("Add models (paths separated by spaces): {}_", buffer),
            Mode::Prompt {
                kind: PromptKind::Export,
                buffer,
            } => format!("Export to (base name): {}_", buffer),
            Mode::Normal => {
                let sheet = self.session.sheet();
                let (w, h) = sheet.size_mm();
                let selection = self
                    .selected
                    .and_then(|i| sheet.items().get(i))
                    .map(|item| {
                        let p = item.position_mm(sheet.scale());
                        format!(" | {} at ({:.1}, {:.1}) mm", item.name, p.x, p.y)
                    })
                    .unwrap_or_default();
                format!(
                    "{:?} {}x{} mm | {} items{} | {}",
                    self.session.config().page,
                    w,
                    h,
                    sheet.len(),
                    selection,
                    HELP
                )
            }
        }
    }

    /// Draw the current state into the character buffer
    pub fn compose(&mut self) -> &SheetRenderer {
        self.renderer.clear();
        self.renderer
            .render_sheet(self.session.sheet(), &self.viewport, self.selected);

        let status = self.status_line();
        let last = self.renderer.height().saturating_sub(1);
        self.renderer.print(0, last, &status, Color::Yellow);

        if let Some(notice) = self.notices.front() {
            let color = if notice.is_error { Color::Red } else { Color::Green };
            self.renderer
                .draw_notice(&notice.title, &notice.message, color);
        }
        &self.renderer
    }

    fn render(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.compose().draw(&mut stdout)?;
        stdout.flush()?;
        Ok(())
    }
}
