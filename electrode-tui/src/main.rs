//! TUI entrypoint: renders a 2D spike raster (time on X, neurons on Y) and
//! the electrode reading on the input neuron.
//! Controls: [s] Step, [r] Run/Pause, [p] Pin input, [q] Quit

mod app;
mod backend;
mod ui;

use anyhow::Result;
use app::App;
use backend::CoreBackend;
use ui::draw;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute, terminal,
};
use ratatui::{backend::CrosstermBackend, Terminal};

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    Ok(())
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    let mut app = App::new(CoreBackend::new()?, 80);
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        draw(terminal, &app)?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_millis(0));

        if event::poll(timeout)? {
            if let CEvent::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('s') => app.step()?,
                    KeyCode::Char('r') => app.toggle_running(),
                    KeyCode::Char('p') => app.toggle_pin(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if app.running {
                app.step()?;
            }
            last_tick = Instant::now();
        }
    }
}

fn main() -> Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    // Ensure terminal is restored on panic
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        default_hook(panic_info);
    }));

    let result = run(&mut terminal);
    restore_terminal()?;
    result
}
