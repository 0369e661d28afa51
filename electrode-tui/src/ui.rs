// TUI rendering: 2D spike raster (time on X, neurons on Y) + status panel.

use std::io::Stdout;

use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Text,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

use crate::app::App;
use crate::backend::SimBackend;

/// Draws the UI each frame:
/// - Top: spike raster as rows (neurons) x columns (time, circular).
/// - Bottom: tick, neuron count, run state, electrode reading, controls.
pub fn draw<B: SimBackend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &App<B>,
) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
            .split(f.size());

        let lines: Vec<String> = app
            .raster
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let mut line = format!("{:>4} |", app.backend.label(row_idx));
                line.extend(row.iter());
                line
            })
            .collect();

        let raster_widget = Paragraph::new(Text::from(lines.join("\n")))
            .block(Block::default().title("Spike Raster  (time →)").borders(Borders::ALL))
            .style(Style::default().fg(Color::White));
        f.render_widget(raster_widget, chunks[0]);

        let reading = match app.reading {
            Some(mv) => format!("{:.3}", mv),
            None => "-".to_string(),
        };
        let status = format!(
            "Tick: {} | Neurons: {} | Running: {} | Electrode: {} | Pin: {}\n\
             Controls: [s] Step  [r] Run/Pause  [p] Pin input  [q] Quit",
            app.tick,
            app.backend.neurons(),
            if app.running { "yes" } else { "no" },
            reading,
            if app.backend.pinned() { "on" } else { "off" },
        );
        let status_widget = Paragraph::new(status)
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().title("Status").borders(Borders::ALL));
        f.render_widget(status_widget, chunks[1]);
    })?;
    Ok(())
}
