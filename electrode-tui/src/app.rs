// Application state for the TUI, including a circular 2D spike raster.

use anyhow::Result;

use crate::backend::SimBackend;

pub struct App<B: SimBackend> {
    pub backend: B,
    pub tick: u64,
    pub width: usize,             // number of columns (time window)
    pub raster: Vec<Vec<char>>,   // [neuron][col]
    pub running: bool,
    pub reading: Option<f64>,
}

impl<B: SimBackend> App<B> {
    pub fn new(backend: B, width: usize) -> Self {
        let n = backend.neurons();
        let reading = backend.probe();
        Self {
            backend,
            tick: 0,
            width,
            raster: vec![vec![' '; width]; n],
            running: false,
            reading,
        }
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
    }

    pub fn toggle_pin(&mut self) {
        self.backend.toggle_pin();
    }

    /// Advance simulation by one tick and update the raster for the current column.
    pub fn step(&mut self) -> Result<()> {
        let spikes = self.backend.step()?;
        self.tick = self.tick.saturating_add(1);
        self.reading = self.backend.probe();

        let col = (self.tick as usize) % self.width;
        for row in self.raster.iter_mut() {
            row[col] = ' ';
        }
        for sp in spikes {
            if let Some(row) = self.raster.get_mut(sp.neuron as usize) {
                row[col] = '•';
            }
        }
        Ok(())
    }
}
