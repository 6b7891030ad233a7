//! Distributed matrix-vector product: a 16x16 matrix is scattered row-wise,
//! the operand vector is broadcast whole, and each rank computes one dot
//! product per row it owns. The group size must divide the row count.

use rankwise::engine::{self, Role};
use rankwise::kernel::RowDotVector;
use rankwise::{channel, CommGroup, Error};

const N: usize = 16;

fn run(size: u32) -> Result<(), Error> {
    let results = channel::run_on_threads(size, move |group| {
        let kernel = RowDotVector::<f32>::new();
        let role = if group.rank() == 0 {
            println!("Number of processors: {}", group.size());
            let rows: Vec<Vec<f32>> = (0..N)
                .map(|i| (0..N).map(|j| (i * N + j) as f32).collect())
                .collect();
            let x: Vec<f32> = (0..N).map(|j| (j + 1) as f32).collect();
            Role::Root {
                operands: vec![rows],
                shared: x,
            }
        } else {
            Role::Worker
        };
        engine::run(&group, &kernel, N, role)
    })?;

    for result in results {
        if let Some(combined) = result? {
            println!("Matrix-Vector Multiplication Result (A * X):");
            for value in &combined.values {
                println!("{value:8.2}");
            }
            for p in &combined.provenance {
                log::info!("rows from rank {} computed on {}", p.rank, p.host);
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let size: u32 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    if let Err(e) = run(size) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
