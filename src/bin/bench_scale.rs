use parasites::{Boundary, Headless, ParasitesConfig, Simulation};

fn bench_parasites(rows: usize, workers: usize, iterations: u64) -> anyhow::Result<(f64, usize)> {
    let sim = Simulation::with_config(
        ParasitesConfig::default()
            .rows(rows)
            .workers(workers)
            .boundary(Boundary::Periodic)
            .steps(iterations)
            .seed(0x5EED_1234_ABCD_EF01),
    )?;
    let summary = sim.run(&sim.initial_grid(), Headless)?;
    let total_ms = summary.elapsed.as_secs_f64() * 1000.0;
    Ok((total_ms, summary.grid.census().parasite))
}

fn main() -> anyhow::Result<()> {
    let scales: &[(usize, u64)] = &[
        (240, 200),
        (480, 200),
        (960, 100),
        (1920, 50),
    ];
    let max_workers = num_cpus::get().max(1);
    let worker_counts: Vec<usize> = [1, 2, 4, 8, 16]
        .into_iter()
        .filter(|&n| n <= max_workers)
        .collect();

    println!(
        "{:<12} {:>8} {:>8} {:>12} {:>10} {:>10}",
        "Grid", "Workers", "Iters", "Total(ms)", "Avg(ms)", "Parasites"
    );
    println!("{}", "-".repeat(66));

    for &(rows, iters) in scales {
        for &workers in &worker_counts {
            let (total_ms, parasites) = bench_parasites(rows, workers, iters)?;
            let avg_ms = total_ms / iters as f64;
            println!(
                "{:<12} {:>8} {:>8} {:>12.1} {:>10.4} {:>10}",
                format!("{}x{}", rows, rows),
                workers,
                iters,
                total_ms,
                avg_ms,
                parasites
            );
        }
    }
    Ok(())
}
