use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::info;

use super::ui;
use crate::poller::PollerHandle;
use crate::state::StateCell;

const UI_TICK: Duration = Duration::from_millis(100);

pub struct App {
    cell: StateCell,
    endpoint: String,
    exit: bool,
}

impl App {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            cell: StateCell::new(),
            endpoint: endpoint.into(),
            exit: false,
        }
    }

    pub fn cell(&self) -> &StateCell {
        &self.cell
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn run(&mut self, poller: &mut PollerHandle) -> io::Result<()> {
        let mut screen = Screen::enter()?;
        let res = self.run_loop(&mut screen.terminal, poller).await;
        screen.restore()?;
        res
    }

    async fn run_loop<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        poller: &mut PollerHandle,
    ) -> io::Result<()> {
        while !self.exit {
            terminal.draw(|f| ui::draw(f, self))?;

            tokio::select! {
                event = poller.next_event() => match event {
                    Some(event) => self.cell.apply(event),
                    None => self.exit = true,
                },
                _ = tokio::time::sleep(UI_TICK) => {}
            }
            while let Some(event) = poller.try_next_event() {
                self.cell.apply(event);
            }

            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.on_key(key.code, key.modifiers);
                    }
                }
            }
        }
        info!("leaving dashboard");
        Ok(())
    }

    fn on_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.exit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.exit = true,
            _ => {}
        }
    }
}

/// Raw mode + alternate screen for the lifetime of the dashboard.
struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    restored: bool,
}

impl Screen {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            restored: false,
        })
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        self.restored = true;
        Ok(())
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
