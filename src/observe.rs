//! Observation channel: what the coordinator does with each gathered
//! snapshot. Kept apart from the stencil so the core runs headless.

use std::io::Write;

use tracing::{info, warn};

use crate::error::BootstrapError;
use crate::stencil::{GlobalGrid, RunSummary};

/// Observer reply after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presentation {
    Continue,
    /// The user asked to stop (window closed, output gone, ...).
    Close,
}

/// Rendering collaborator driven by the coordinator only.
pub trait Observer: Send {
    /// Called once on the coordinator before generation 0. An error aborts
    /// every worker.
    fn start(&mut self, rows: usize, cols: usize) -> Result<(), BootstrapError> {
        let _ = (rows, cols);
        Ok(())
    }

    /// Read-only view of the grid after `generation` was computed.
    fn present(&mut self, generation: u64, snapshot: &GlobalGrid) -> Presentation;

    fn finish(&mut self, summary: &RunSummary) {
        let _ = summary;
    }
}

impl<O: Observer + ?Sized> Observer for Box<O> {
    fn start(&mut self, rows: usize, cols: usize) -> Result<(), BootstrapError> {
        (**self).start(rows, cols)
    }

    fn present(&mut self, generation: u64, snapshot: &GlobalGrid) -> Presentation {
        (**self).present(generation, snapshot)
    }

    fn finish(&mut self, summary: &RunSummary) {
        (**self).finish(summary)
    }
}

/// Never looks, never closes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Headless;

impl Observer for Headless {
    fn present(&mut self, _generation: u64, _snapshot: &GlobalGrid) -> Presentation {
        Presentation::Continue
    }
}

/// Logs per-state counts every `every` generations.
#[derive(Clone, Copy, Debug)]
pub struct CensusLog {
    every: u64,
}

impl CensusLog {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Observer for CensusLog {
    fn present(&mut self, generation: u64, snapshot: &GlobalGrid) -> Presentation {
        if generation % self.every == 0 {
            let census = snapshot.census();
            info!(
                generation,
                parasites = census.parasite,
                grown = census.grown,
                growing = census.growing,
                seeded = census.seeded,
                empty = census.empty,
                "census"
            );
        }
        Presentation::Continue
    }
}

/// Writes glyph frames (see `CellState::glyph`) to `out` every `every`
/// generations. A failed write counts as the user closing the view.
pub struct TextRenderer<W> {
    out: W,
    every: u64,
}

impl<W: Write + Send> TextRenderer<W> {
    pub fn new(out: W, every: u64) -> Self {
        Self {
            out,
            every: every.max(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn frame(&mut self, generation: u64, snapshot: &GlobalGrid) -> std::io::Result<()> {
        writeln!(self.out, "-- generation {generation}")?;
        self.out.write_all(snapshot.render().as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write + Send> Observer for TextRenderer<W> {
    fn start(&mut self, rows: usize, cols: usize) -> Result<(), BootstrapError> {
        writeln!(self.out, "parasites {rows}x{cols}")?;
        self.out.flush()?;
        Ok(())
    }

    fn present(&mut self, generation: u64, snapshot: &GlobalGrid) -> Presentation {
        if generation % self.every != 0 {
            return Presentation::Continue;
        }
        match self.frame(generation, snapshot) {
            Ok(()) => Presentation::Continue,
            Err(err) => {
                warn!(%err, generation, "renderer output closed");
                Presentation::Close
            }
        }
    }

    fn finish(&mut self, summary: &RunSummary) {
        let _ = writeln!(
            self.out,
            "-- {} generations on {}x{} ({:?})",
            summary.generations, summary.rows, summary.cols, summary.stop
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use super::{Observer, Presentation, TextRenderer};
    use crate::error::BootstrapError;
    use crate::stencil::GlobalGrid;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn renderer_writes_only_on_interval() {
        let grid = GlobalGrid::parse("GP\n.s\n").expect("grid");
        let mut renderer = TextRenderer::new(Vec::new(), 2);
        renderer.start(2, 2).expect("start");
        assert_eq!(renderer.present(1, &grid), Presentation::Continue);
        assert_eq!(renderer.present(2, &grid), Presentation::Continue);
        let text = String::from_utf8(renderer.into_inner()).expect("utf8");
        assert_eq!(text, "parasites 2x2\n-- generation 2\nGP\n.s\n");
    }

    #[test]
    fn renderer_bootstrap_failure_is_reported() {
        let mut renderer = TextRenderer::new(Broken, 1);
        assert!(matches!(renderer.start(4, 4), Err(BootstrapError::Io(_))));
    }

    #[test]
    fn lost_output_closes_the_view() {
        let grid = GlobalGrid::parse("G\n").expect("grid");
        let mut renderer = TextRenderer::new(Broken, 1);
        assert_eq!(renderer.present(0, &grid), Presentation::Close);
    }
}
