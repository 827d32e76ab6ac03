//! Oblivious linear algebra demo
//!
//! Inverts a random diagonally dominant matrix, fits a least-squares model,
//! summarizes columns and clusters points over secret shares, then checks
//! every result against plaintext.
//!
//! # Usage
//!
//! ```bash
//! obliv-demo --size 6 --seed 7
//! obliv-demo --size 4 --pivoting
//! obliv-demo --iterations 8
//! RUST_LOG=obliv_linalg=debug obliv-demo
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use obliv_harness::{PlainMatrix, SecureSession};
use obliv_linalg::Pivoting;
use obliv_sharing::RuntimeConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "obliv-demo")]
#[command(version)]
#[command(about = "Oblivious matrix inversion and regression over secret shares")]
struct Cli {
    /// Dimension of the matrix to invert
    #[arg(short = 'n', long, default_value_t = 4)]
    size: usize,

    /// Seed for inputs and runtime randomness (overrides OBLIV_SEED)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Use oblivious partial pivoting
    #[arg(short, long)]
    pivoting: bool,

    /// Fractional bits (overrides OBLIV_SCALE)
    #[arg(long)]
    scale: Option<u8>,

    /// Lloyd iterations for the clustering run
    #[arg(long, default_value_t = 4)]
    iterations: usize,

    /// Maximum tolerated absolute error
    #[arg(long, default_value_t = 1e-2)]
    tolerance: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "obliv_linalg=info,obliv_sharing=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = RuntimeConfig::from_env();
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(scale) = cli.scale {
        config = config.with_scale(scale);
    }
    let seed = config.seed.unwrap_or_else(rand::random);
    config = config.with_seed(seed);

    tracing::info!("Starting obliv-demo v{}", env!("CARGO_PKG_VERSION"));
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut session = SecureSession::new(config).context("invalid runtime configuration")?;
    let config = session.runtime().config();
    tracing::info!(
        size = cli.size,
        seed,
        scale = config.scale,
        triple_batch = config.triple_batch,
        "Configuration"
    );

    // Matrix inversion
    let pivoting = if cli.pivoting {
        Pivoting::Oblivious
    } else {
        Pivoting::None
    };
    let m = PlainMatrix::random_diagonally_dominant(cli.size, &mut rng);
    let report = session
        .invert(&m, pivoting)
        .context("secure inversion failed")?;

    println!("\n--- Matrix Inversion ({}x{}, {:?}) ---", cli.size, cli.size, pivoting);
    for row in &report.secure {
        let cells: Vec<String> = row.iter().map(|x| format!("{:>10.5}", x)).collect();
        println!("  {}", cells.join(" "));
    }
    println!("Max error vs plaintext: {:.3e}", report.max_error);
    println!(
        "Multiplications: {}, divisions: {}, comparisons: {}",
        report.stats.multiplications, report.stats.divisions, report.stats.comparisons
    );
    report.check(cli.tolerance)?;

    // Least squares on a noisy linear target
    let samples = 4 * cli.size.max(2);
    let features = 2;
    let truth = [0.5, 1.5, -2.0];
    let x = PlainMatrix::new(
        samples,
        features,
        (0..samples * features)
            .map(|_| rng.gen_range(-2.0..2.0))
            .collect(),
    )?;
    let y: Vec<f64> = (0..samples)
        .map(|i| {
            let row = x.row(i);
            truth[0] + truth[1] * row[0] + truth[2] * row[1] + rng.gen_range(-0.05..0.05)
        })
        .collect();

    let report = session
        .fit(&x, &y, true)
        .context("secure regression failed")?;

    println!("\n--- Linear Regression ({} samples) ---", samples);
    println!("Secure coefficients:    {:?}", report.secure[0]);
    println!("Plaintext coefficients: {:?}", report.reference[0]);
    println!("Max error vs plaintext: {:.3e}", report.max_error);
    report.check(cli.tolerance)?;

    // Column statistics of the regression features
    let report = session.stats(&x).context("secure column statistics failed")?;

    println!("\n--- Column Statistics ({} samples) ---", samples);
    for (label, row) in ["average", "std dev", "min", "max"].iter().zip(&report.secure) {
        let cells: Vec<String> = row.iter().map(|v| format!("{:>10.5}", v)).collect();
        println!("  {:<8} {}", label, cells.join(" "));
    }
    println!("Max error vs plaintext: {:.3e}", report.max_error);
    report.check(cli.tolerance)?;

    // Two well separated blobs, started from two random samples
    let blobs = PlainMatrix::new(
        samples,
        features,
        (0..samples)
            .flat_map(|i| {
                let offset = if i % 2 == 0 { -3.0 } else { 3.0 };
                [offset + rng.gen_range(-1.0..1.0), offset + rng.gen_range(-1.0..1.0)]
            })
            .collect(),
    )?;
    let first = rng.gen_range(0..samples);
    let second = (first + 1 + rng.gen_range(0..samples - 1)) % samples;
    let initial =
        PlainMatrix::from_rows(&[blobs.row(first).to_vec(), blobs.row(second).to_vec()])?;

    let report = session
        .kmeans(&blobs, &initial, cli.iterations)
        .context("secure k-means failed")?;

    println!("\n--- k-means (k = 2, {} iterations) ---", cli.iterations);
    let (centres, sizes) = report.secure.split_at(report.secure.len() - 1);
    for (c, centre) in centres.iter().enumerate() {
        println!("  cluster {} size {:>4.0} centre {:?}", c + 1, sizes[0][c], centre);
    }
    println!("Max error vs plaintext: {:.3e}", report.max_error);
    report.check(cli.tolerance)?;

    session.runtime().log_stats();
    println!("\nAll results within tolerance {:.1e}", cli.tolerance);
    Ok(())
}
