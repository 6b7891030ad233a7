//! The partition-compute-recombine run: root scatters its operand arrays
//! and broadcasts the shared payload, every rank applies the kernel to its
//! chunk, and workers return host label and result to root over two fixed
//! tags for rank-ordered reassembly.

use crate::error::Error;
use crate::kernel::Kernel;
use crate::plan::PartitionPlan;
use crate::CommGroup;
use log::{debug, info};

/// Tag for the host-label message a worker returns ahead of its result.
pub const NAME_TAG: u32 = 42;
/// Tag for the result-chunk message. Distinct from NAME_TAG so the two
/// payloads can never match the wrong receive.
pub const DATA_TAG: u32 = 43;

/// Which side of the run this rank plays. Root owns the full operands
/// before distribution and the combined result after recombination;
/// workers bring no data of their own.
pub enum Role<K: Kernel> {
    Root {
        /// One full-length array per kernel operand, `Kernel::ARITY` of them.
        operands: Vec<Vec<K::Elem>>,
        /// Payload broadcast whole to every rank.
        shared: K::Shared,
    },
    Worker,
}

/// Where a result segment was computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub rank: u32,
    pub host: String,
}

/// Root's reassembled output: per-rank segments concatenated in rank order,
/// with the originating host of each segment.
#[derive(Debug, Clone)]
pub struct Combined<T> {
    pub values: Vec<T>,
    pub provenance: Vec<Provenance>,
}

/// Run one pass of the engine on this rank.
///
/// `total_len` is the caller-supplied workload length, known to every rank;
/// each rank re-derives the divisibility precondition from it before
/// touching the transport, so an indivisible workload aborts everywhere
/// without root having to say anything. Root returns `Some(Combined)`,
/// workers `None`.
pub fn run<G, K>(
    group: &G,
    kernel: &K,
    total_len: usize,
    role: Role<K>,
) -> Result<Option<Combined<K::Out>>, Error>
where
    G: CommGroup,
    K: Kernel,
{
    let rank = group.rank();
    let size = group.size();
    let plan = PartitionPlan::new(total_len, size as usize)?;

    match role {
        Role::Root { operands, shared } => {
            if rank != 0 {
                return Err(Error::RoleMismatch { rank, given: "root" });
            }
            if operands.len() != K::ARITY {
                return Err(Error::ShapeMismatch {
                    expected: K::ARITY,
                    got: operands.len(),
                });
            }
            for operand in &operands {
                if operand.len() != total_len {
                    return Err(Error::ShapeMismatch {
                        expected: total_len,
                        got: operand.len(),
                    });
                }
            }

            debug!(
                "root distributing {} operand(s) of {total_len} over {size} ranks",
                K::ARITY
            );
            let mut chunks = Vec::with_capacity(K::ARITY);
            for operand in &operands {
                chunks.push(group.scatter(operand)?);
            }
            group.bcast(&shared)?;

            let own = kernel.compute(&chunks, &shared);
            debug!("root computed its own segment of {}", own.len());

            let mut combined = Combined {
                values: own,
                provenance: vec![Provenance {
                    rank: 0,
                    host: group.host_label().to_string(),
                }],
            };
            for source in 1..size {
                let host: String = group.recv(source, NAME_TAG)?;
                let part: Vec<K::Out> = group.recv(source, DATA_TAG)?;
                if part.len() != plan.chunk_size() {
                    return Err(Error::ShapeMismatch {
                        expected: plan.chunk_size(),
                        got: part.len(),
                    });
                }
                debug!("root took segment {source} from {host}");
                combined.values.extend(part);
                combined.provenance.push(Provenance { rank: source, host });
            }
            info!(
                "run complete: {} values from {} ranks",
                combined.values.len(),
                size
            );
            Ok(Some(combined))
        }
        Role::Worker => {
            if rank == 0 {
                return Err(Error::RoleMismatch { rank, given: "worker" });
            }
            let mut chunks = Vec::with_capacity(K::ARITY);
            for _ in 0..K::ARITY {
                chunks.push(group.scatter_recv(0)?);
            }
            let shared: K::Shared = group.recv_bcast(0)?;

            let result = kernel.compute(&chunks, &shared);
            debug!("rank {rank} computed {} values", result.len());

            group.send(&group.host_label().to_string(), 0, NAME_TAG)?;
            group.send(&result, 0, DATA_TAG)?;
            Ok(None)
        }
    }
}
