//! Distributed elementwise sum of two 48-element integer arrays.
//!
//! Rank 0 fills A with 0..48 and B with 48..96, scatters both over the
//! group, every rank adds its chunks, and rank 0 prints each returned
//! segment with the host it came from. The group size must divide 48.

use rankwise::engine::{self, Role};
use rankwise::kernel::ElementwiseSum;
use rankwise::{channel, CommGroup, Error};

const LENGTH: usize = 48;

fn run(size: u32) -> Result<(), Error> {
    let results = channel::run_on_threads(size, move |group| {
        let kernel = ElementwiseSum::<i64>::new();
        let role = if group.rank() == 0 {
            let a: Vec<i64> = (0..LENGTH as i64).collect();
            let b: Vec<i64> = (LENGTH as i64..2 * LENGTH as i64).collect();
            println!(
                "Process 0 on host {} is distributing arrays A and B to all {} processes",
                group.host_label(),
                group.size()
            );
            Role::Root {
                operands: vec![a, b],
                shared: (),
            }
        } else {
            Role::Worker
        };
        engine::run(&group, &kernel, LENGTH, role)
    })?;

    for result in results {
        if let Some(combined) = result? {
            let chunk = LENGTH / size as usize;
            for (p, segment) in combined.provenance.iter().zip(combined.values.chunks(chunk)) {
                println!(
                    "Process {} on host {} has sum elements: {:?}",
                    p.rank, p.host, segment
                );
            }
            println!("Ready");
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
