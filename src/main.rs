#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use parasites::{Boundary, CensusLog, Observer, ParasitesConfig, Simulation, TextRenderer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BoundaryArg {
    Bounded,
    Periodic,
}

impl From<BoundaryArg> for Boundary {
    fn from(arg: BoundaryArg) -> Self {
        match arg {
            BoundaryArg::Bounded => Boundary::Bounded,
            BoundaryArg::Periodic => Boundary::Periodic,
        }
    }
}

/// Grass and parasites on a grid split across worker threads.
#[derive(Parser, Debug)]
#[command(name = "parasites", version, about)]
struct Args {
    /// Requested grid rows; shrunk to a multiple of the worker count.
    #[arg(long, default_value_t = 300)]
    rows: usize,
    /// Grid columns [default: effective rows]
    #[arg(long)]
    cols: Option<usize>,
    /// Worker threads [default: physical cores]
    #[arg(short, long)]
    workers: Option<usize>,
    #[arg(long, value_enum, default_value_t = BoundaryArg::Bounded)]
    boundary: BoundaryArg,
    /// Generations to run; 0 runs until the output is closed.
    #[arg(long, default_value_t = 1000)]
    steps: u64,
    /// Seed for reproducible draws.
    #[arg(long)]
    seed: Option<u64>,
    /// Extra parasites scattered over the initial grid.
    #[arg(long, default_value_t = 0)]
    parasites: usize,
    /// Print text frames to stdout instead of logging a census.
    #[arg(long)]
    render: bool,
    /// Frame / census interval in generations.
    #[arg(long, default_value_t = 1)]
    every: u64,
}

impl Args {
    fn config(&self) -> ParasitesConfig {
        let mut config = ParasitesConfig::default()
            .rows(self.rows)
            .boundary(self.boundary.into());
        if let Some(cols) = self.cols {
            config = config.cols(cols);
        }
        if let Some(workers) = self.workers {
            config = config.workers(workers);
        }
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if self.steps == 0 {
            config.unbounded()
        } else {
            config.steps(self.steps)
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let sim = Simulation::with_config(args.config()).context("invalid configuration")?;
    let mut grid = sim.initial_grid();
    if args.parasites > 0 {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        grid.sprinkle_parasites(args.parasites, &mut rng);
    }

    let observer: Box<dyn Observer> = if args.render {
        Box::new(TextRenderer::new(std::io::stdout(), args.every))
    } else {
        Box::new(CensusLog::new(args.every))
    };

    let summary = sim.run(&grid, observer)?;
    info!(
        rows = summary.rows,
        cols = summary.cols,
        steps = summary.generations,
        "done"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
