//! Demonstration harness: seeds pseudo-random inputs, runs one multi-head
//! attention forward pass, and prints the output matrix.

use anyhow::{anyhow, Result};
use attnforge_kernels::config::AttentionShape;
use attnforge_kernels::multihead::{multi_head_attention, ProjectionWeights};
use attnforge_kernels::registry::KernelRegistry;
use clap::Parser;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "attnforge", about = "AttnForge multi-head attention demo")]
struct Cli {
    #[arg(long, default_value_t = 4)]
    seq_len: usize,

    #[arg(long, default_value_t = 8)]
    d_model: usize,

    #[arg(long, default_value_t = 2)]
    num_heads: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Matmul kernel to run the pipeline on ("reference" or "parallel").
    #[arg(long, default_value = "reference")]
    kernel: String,

    /// Print the problem shape as JSON before the output matrix.
    #[arg(long, default_value_t = false)]
    print_shape: bool,
}

fn random_matrix(rng: &mut ChaCha8Rng, rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0.0f32..1.0))
}

fn random_vector(rng: &mut ChaCha8Rng, len: usize) -> Array1<f32> {
    Array1::from_shape_fn(len, |_| rng.gen_range(0.0f32..1.0))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let shape = AttentionShape::new(cli.seq_len, cli.d_model, cli.num_heads);
    shape.validate()?;

    let registry = KernelRegistry::with_default_kernels();
    let kernel = registry
        .find_matmul_kernel(&cli.kernel)
        .ok_or_else(|| anyhow!("unknown matmul kernel {:?}", cli.kernel))?;

    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    let q = random_matrix(&mut rng, shape.seq_len, shape.d_model);
    let k = random_matrix(&mut rng, shape.seq_len, shape.d_model);
    let v = random_matrix(&mut rng, shape.seq_len, shape.d_model);
    let weights = ProjectionWeights::new(
        random_matrix(&mut rng, shape.d_model, shape.d_model),
        random_matrix(&mut rng, shape.d_model, shape.d_model),
        random_matrix(&mut rng, shape.d_model, shape.d_model),
        random_matrix(&mut rng, shape.d_model, shape.d_model),
    )
    .with_biases(
        random_vector(&mut rng, shape.d_model),
        random_vector(&mut rng, shape.d_model),
        random_vector(&mut rng, shape.d_model),
        random_vector(&mut rng, shape.d_model),
    );

    if cli.print_shape {
        println!("{}", serde_json::to_string_pretty(&shape)?);
    }

    info!(
        kernel = kernel.name(),
        flops = shape.flops(),
        "running forward pass"
    );
    let start = Instant::now();
    let output = multi_head_attention(
        q.view(),
        k.view(),
        v.view(),
        &weights,
        shape.num_heads,
        kernel.as_ref(),
    )?;
    info!(elapsed_ms = start.elapsed().as_secs_f64() * 1e3, "done");

    println!("Multi-head attention output:");
    for row in output.rows() {
        let line: Vec<String> = row.iter().map(|x| format!("{x:.2}")).collect();
        println!("{}", line.join(" "));
    }

    Ok(())
}
