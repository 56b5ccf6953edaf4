use std::sync::OnceLock;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, info_span};

use super::aggregate::{self, Aggregator, MemberLink, Verdict};
use super::cell::GlobalGrid;
use super::draws::{DrawSource, RngDraws, splitmix64};
use super::grid::LocalGrid;
use super::halo::{self, HaloLinks};
use super::kernel::{Frame, RowPlan, advance_rows};
use super::topology::{Boundary, Topology, effective_rows};
use crate::error::{ConfigError, Error};
use crate::observe::{Observer, Presentation};

const DEFAULT_ROWS: usize = 300;
const DEFAULT_STEPS: u64 = 1000;

static PHYSICAL_CORES: OnceLock<usize> = OnceLock::new();

fn physical_core_count() -> usize {
    *PHYSICAL_CORES.get_or_init(|| num_cpus::get_physical().max(1))
}

/// Configuration for a simulation run.
///
/// `ParasitesConfig::default()` reproduces the classic setup: a 300-row
/// square grid, bounded edges, 1000 generations, one worker per physical
/// core and entropy-seeded draws.
#[derive(Clone, Debug)]
pub struct ParasitesConfig {
    /// Requested rows; shrunk to a multiple of the worker count.
    pub rows: usize,
    /// `None` means square: as many columns as effective rows.
    pub cols: Option<usize>,
    /// `None` means one worker per physical core.
    pub workers: Option<usize>,
    pub boundary: Boundary,
    /// Step budget. `None` runs until the observer closes.
    pub steps: Option<u64>,
    /// `None` seeds every worker from OS entropy.
    pub seed: Option<u64>,
}

impl Default for ParasitesConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: None,
            workers: None,
            boundary: Boundary::Bounded,
            steps: Some(DEFAULT_STEPS),
            seed: None,
        }
    }
}

impl ParasitesConfig {
    pub fn rows(mut self, n: usize) -> Self {
        self.rows = n;
        self
    }

    pub fn cols(mut self, n: usize) -> Self {
        self.cols = Some(n);
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }

    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn steps(mut self, n: u64) -> Self {
        self.steps = Some(n);
        self
    }

    /// Run until the observer closes.
    pub fn unbounded(mut self) -> Self {
        self.steps = None;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    BudgetExhausted,
    ObserverClosed,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub rows: usize,
    pub cols: usize,
    pub workers: usize,
    /// Generations computed; also the generation counter at exit.
    pub generations: u64,
    pub stop: StopReason,
    pub elapsed: Duration,
    /// Last snapshot assembled by the coordinator.
    pub grid: GlobalGrid,
}

/// One worker: an owned slab plus its halo endpoints and draw source.
struct Worker<D> {
    grid: LocalGrid,
    halo: HaloLinks,
    draws: D,
    plan: RowPlan,
    wrap_cols: bool,
}

impl<D: DrawSource> Worker<D> {
    fn new(grid: LocalGrid, halo: HaloLinks, draws: D, boundary: Boundary) -> Self {
        let plan = RowPlan::new(grid.local_rows(), halo.has_north(), halo.has_south());
        Self {
            grid,
            halo,
            draws,
            plan,
            wrap_cols: boundary == Boundary::Periodic,
        }
    }

    /// Advance the slab by one generation.
    ///
    /// Order matters: boundaries go out first, rows that don't touch a ghost
    /// are computed while they travel, and the border rows wait for the
    /// neighbours' rows to land.
    fn step(&mut self, generation: u64) -> Result<(), Error> {
        let frame = Frame {
            generation,
            north_ghost: self.halo.has_north(),
            south_ghost: self.halo.has_south(),
            wrap_cols: self.wrap_cols,
        };
        self.halo.send_boundaries(&self.grid, generation)?;
        advance_rows(&mut self.grid, self.plan.interior.clone(), &frame, &mut self.draws);
        self.halo.receive_boundaries(&mut self.grid, generation)?;
        advance_rows(&mut self.grid, self.plan.border_rows(), &frame, &mut self.draws);
        self.grid.swap();
        Ok(())
    }

    fn run_member(mut self, link: MemberLink) -> Result<(), Error> {
        let mut generation = 0;
        loop {
            self.step(generation)?;
            link.submit(&self.grid, generation)?;
            let verdict = link.await_verdict()?;
            if verdict.stop {
                return Ok(());
            }
            generation = verdict.generation;
        }
    }

    /// Drives rank 0. Returning, on any path, drops the aggregator's
    /// verdict senders, which releases members still waiting on a verdict.
    fn run_coordinator<O: Observer>(
        mut self,
        mut aggregator: Aggregator,
        observer: &mut O,
        budget: Option<u64>,
    ) -> Result<(u64, StopReason, GlobalGrid), Error> {
        let mut generation = 0;
        loop {
            self.step(generation)?;
            let snapshot = aggregator.collect(&self.grid, generation)?;
            let presentation = observer.present(generation, snapshot);
            let next = generation + 1;
            let stop = if presentation == Presentation::Close {
                Some(StopReason::ObserverClosed)
            } else if budget.is_some_and(|steps| next >= steps) {
                Some(StopReason::BudgetExhausted)
            } else {
                None
            };
            debug!(generation, ?stop, "generation complete");
            aggregator.broadcast(Verdict {
                generation: next,
                stop: stop.is_some(),
            })?;
            if let Some(reason) = stop {
                return Ok((next, reason, aggregator.into_snapshot()));
            }
            generation = next;
        }
    }
}

/// Distributed simulation: `workers` threads, each owning a row slab of the
/// grid, stepping in lockstep.
pub struct Simulation {
    topology: Topology,
    steps: Option<u64>,
    seed: Option<u64>,
    pool: rayon::ThreadPool,
}

impl Simulation {
    pub fn new() -> Result<Self, Error> {
        Self::with_config(ParasitesConfig::default())
    }

    pub fn with_config(config: ParasitesConfig) -> Result<Self, Error> {
        let workers = config.workers.unwrap_or_else(physical_core_count);
        let cols = match config.cols {
            Some(cols) => cols,
            None => effective_rows(config.rows, workers)?,
        };
        let topology = Topology::new(workers, config.rows, cols, config.boundary)?;
        // One thread per worker: workers block on their neighbours, so each
        // needs its own thread for the whole run.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("parasites-worker-{i}"))
            .build()?;
        Ok(Self {
            topology,
            steps: config.steps,
            seed: config.seed,
            pool,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Grown grass everywhere with one parasite in the centre.
    pub fn initial_grid(&self) -> GlobalGrid {
        GlobalGrid::seeded(self.topology.rows(), self.topology.cols())
    }

    /// Run with the configured draw policy: per-worker `StdRng`, seeded from
    /// `seed` mixed with the rank, or from OS entropy.
    pub fn run<O: Observer>(&self, initial: &GlobalGrid, observer: O) -> Result<RunSummary, Error> {
        match self.seed {
            Some(seed) => self.run_with_draws(initial, observer, |rank| {
                RngDraws(StdRng::seed_from_u64(seed ^ splitmix64(rank as u64)))
            }),
            None => self.run_with_draws(initial, observer, |_| RngDraws(StdRng::from_os_rng())),
        }
    }

    /// Run with a caller-provided draw source per rank.
    pub fn run_with_draws<O, D, F>(
        &self,
        initial: &GlobalGrid,
        mut observer: O,
        draws_for: F,
    ) -> Result<RunSummary, Error>
    where
        O: Observer,
        D: DrawSource + Send,
        F: Fn(usize) -> D + Sync,
    {
        let topo = self.topology;
        if initial.rows() != topo.rows() || initial.cols() != topo.cols() {
            return Err(ConfigError::ShapeMismatch {
                rows: topo.rows(),
                cols: topo.cols(),
                found_rows: initial.rows(),
                found_cols: initial.cols(),
            }
            .into());
        }

        info!(
            rows = topo.rows(),
            cols = topo.cols(),
            workers = topo.workers(),
            boundary = ?topo.boundary(),
            steps = ?self.steps,
            "starting simulation"
        );
        let start = Instant::now();

        if self.steps == Some(0) {
            observer.start(topo.rows(), topo.cols())?;
            let summary = RunSummary {
                rows: topo.rows(),
                cols: topo.cols(),
                workers: topo.workers(),
                generations: 0,
                stop: StopReason::BudgetExhausted,
                elapsed: start.elapsed(),
                grid: initial.clone(),
            };
            observer.finish(&summary);
            return Ok(summary);
        }

        let (aggregator, members) = aggregate::wire(&topo);
        let mut blocks = aggregate::scatter(initial, &topo).into_iter();
        let mut halos = halo::wire(&topo).into_iter();
        let (Some(own_grid), Some(own_halo)) = (blocks.next(), halos.next()) else {
            return Err(ConfigError::NoWorkers.into());
        };

        let mut member_results: Vec<Option<Result<(), Error>>> =
            (1..topo.workers()).map(|_| None).collect();
        let mut coordinator_result = None;
        let draws_for = &draws_for;
        let budget = self.steps;

        self.pool.scope(|scope| {
            let members = blocks.zip(halos).zip(members).zip(member_results.iter_mut());
            for (rank, (((grid, halo), link), slot)) in (1..).zip(members) {
                scope.spawn(move |_| {
                    let _span = info_span!("worker", rank).entered();
                    let worker = Worker::new(grid, halo, draws_for(rank), topo.boundary());
                    let result = worker.run_member(link);
                    if let Err(err) = &result {
                        debug!(%err, "worker stopped");
                    }
                    *slot = Some(result);
                });
            }

            let _span = info_span!("worker", rank = 0).entered();
            coordinator_result = Some(
                observer
                    .start(topo.rows(), topo.cols())
                    .map_err(|err| {
                        error!(%err, "observer failed to start, aborting all workers");
                        Error::from(err)
                    })
                    .and_then(|()| {
                        Worker::new(own_grid, own_halo, draws_for(0), topo.boundary())
                            .run_coordinator(aggregator, &mut observer, budget)
                    }),
            );
        });

        // The coordinator's failure is the root cause of any member
        // disconnects it triggered.
        let (generations, stop, grid) = match coordinator_result {
            Some(Ok(outcome)) => outcome,
            Some(Err(err)) => return Err(err),
            None => return Err(ConfigError::NoWorkers.into()),
        };
        if let Some(err) = member_results.into_iter().flatten().find_map(Result::err) {
            return Err(err);
        }

        let summary = RunSummary {
            rows: topo.rows(),
            cols: topo.cols(),
            workers: topo.workers(),
            generations,
            stop,
            elapsed: start.elapsed(),
            grid,
        };
        info!(
            rows = summary.rows,
            cols = summary.cols,
            generations = summary.generations,
            stop = ?summary.stop,
            elapsed_ms = summary.elapsed.as_secs_f64() * 1000.0,
            "simulation finished"
        );
        observer.finish(&summary);
        Ok(summary)
    }
}
