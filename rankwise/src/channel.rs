//! Channel-backed implementation of CommGroup.
//!
//! Ranks live in one OS process, one thread each, wired together by a full
//! mesh of FIFO channels (one per ordered rank pair). Payloads cross the
//! mesh as bincode-encoded frames, so nothing is shared between ranks
//! except the channel endpoints themselves.

use crate::error::{Error, TransportError};
use crate::plan::PartitionPlan;
use crate::{CommGroup, DataType};
use log::{debug, trace};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Reserved tag for scatter block frames.
pub const SCATTER_TAG: u32 = 1;
/// Reserved tag for broadcast frames.
pub const BCAST_TAG: u32 = 2;
/// Reserved tag for collective gather frames.
pub const GATHER_TAG: u32 = 3;

/// How long a receive waits for its counterpart before the run is declared
/// dead. There is no retry; an expired window aborts the whole run.
pub const DEFAULT_LIVENESS: Duration = Duration::from_secs(30);

struct Frame {
    tag: u32,
    payload: Vec<u8>,
}

struct Endpoints {
    /// Senders indexed by destination rank.
    peers: Vec<Sender<Frame>>,
    /// Receivers indexed by source rank.
    inboxes: Vec<Receiver<Frame>>,
}

pub struct ChannelGroup {
    rank: u32,
    size: u32,
    host_label: String,
    liveness: Duration,
    endpoints: Option<Endpoints>,
}

impl ChannelGroup {
    /// Form a group of `size` ranks sharing a channel mesh. Host labels are
    /// derived from the local hostname plus the rank.
    pub fn form(size: u32) -> Result<Vec<ChannelGroup>, Error> {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let labels = (0..size).map(|r| format!("{host}:{r}")).collect();
        Self::form_labeled(labels)
    }

    /// Form a group with one explicit host label per rank.
    pub fn form_labeled(labels: Vec<String>) -> Result<Vec<ChannelGroup>, Error> {
        let size = labels.len();
        if size == 0 {
            return Err(Error::GroupFormation(
                "a group needs at least one rank".to_string(),
            ));
        }
        let size_u32 = u32::try_from(size)
            .map_err(|_| Error::GroupFormation(format!("group of {size} ranks is too large")))?;

        let mut peer_rows: Vec<Vec<Sender<Frame>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inbox_rows: Vec<Vec<Receiver<Frame>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        for source in 0..size {
            for dest in 0..size {
                let (tx, rx) = mpsc::channel();
                peer_rows[source].push(tx);
                inbox_rows[dest].push(rx);
            }
        }

        debug!("formed channel group of {size} ranks");
        Ok(peer_rows
            .into_iter()
            .zip(inbox_rows)
            .zip(labels)
            .enumerate()
            .map(|(rank, ((peers, inboxes), host_label))| ChannelGroup {
                rank: rank as u32,
                size: size_u32,
                host_label,
                liveness: DEFAULT_LIVENESS,
                endpoints: Some(Endpoints { peers, inboxes }),
            })
            .collect())
    }

    /// Override the bounded wait applied to every receive on this rank.
    pub fn with_liveness(mut self, liveness: Duration) -> Self {
        self.liveness = liveness;
        self
    }

    fn endpoints(&self) -> Result<&Endpoints, TransportError> {
        self.endpoints.as_ref().ok_or(TransportError::TornDown)
    }

    fn send_frame(&self, dest: u32, tag: u32, payload: Vec<u8>) -> Result<(), TransportError> {
        trace!("rank {} -> {} tag {} ({} bytes)", self.rank, dest, tag, payload.len());
        let endpoints = self.endpoints()?;
        let peer = endpoints
            .peers
            .get(dest as usize)
            .ok_or(TransportError::UnknownPeer {
                peer: dest,
                size: self.size,
            })?;
        peer.send(Frame { tag, payload })
            .map_err(|_| TransportError::Disconnected { peer: dest })
    }

    fn recv_frame(&self, source: u32, tag: u32) -> Result<Vec<u8>, TransportError> {
        let endpoints = self.endpoints()?;
        let inbox = endpoints
            .inboxes
            .get(source as usize)
            .ok_or(TransportError::UnknownPeer {
                peer: source,
                size: self.size,
            })?;
        let frame = match inbox.recv_timeout(self.liveness) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => {
                return Err(TransportError::PeerUnresponsive {
                    peer: source,
                    tag,
                    waited: self.liveness,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(TransportError::Disconnected { peer: source })
            }
        };
        if frame.tag != tag {
            return Err(TransportError::TagMismatch {
                peer: source,
                expected: tag,
                got: frame.tag,
            });
        }
        trace!("rank {} <- {} tag {} ({} bytes)", self.rank, source, tag, frame.payload.len());
        Ok(frame.payload)
    }

    /// Actual rank sitting at `virtual_rank` of the broadcast tree rooted
    /// at `root`.
    fn devirtualize(&self, virtual_rank: u32, root: u32) -> u32 {
        (virtual_rank + root) % self.size
    }
}

fn encode<T: serde::Serialize>(data: &T) -> Result<Vec<u8>, TransportError> {
    bincode::serialize(data).map_err(|e| TransportError::Payload(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(buffer: &[u8]) -> Result<T, TransportError> {
    bincode::deserialize(buffer).map_err(|e| TransportError::Payload(e.to_string()))
}

impl CommGroup for ChannelGroup {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn host_label(&self) -> &str {
        &self.host_label
    }

    fn send<T: DataType>(&self, data: &T, dest: u32, tag: u32) -> Result<(), Error> {
        self.send_frame(dest, tag, encode(data)?)?;
        Ok(())
    }

    fn recv<T: DataType>(&self, source: u32, tag: u32) -> Result<T, Error> {
        let buffer = self.recv_frame(source, tag)?;
        Ok(decode(&buffer)?)
    }

    /// Broadcast data from this process to all other processes.
    ///
    /// bcast() and recv_bcast() implement a binomial-tree broadcast rooted
    /// at the sending rank; re-ranking through virtual ranks keeps the tree
    /// shape the same whichever rank is the source.
    fn bcast<T: DataType>(&self, data: &T) -> Result<(), Error> {
        let buffer = encode(data)?;
        for child in [1, 2] {
            if child < self.size {
                let dest = self.devirtualize(child, self.rank);
                self.send_frame(dest, BCAST_TAG, buffer.clone())?;
            }
        }
        Ok(())
    }

    fn recv_bcast<T: DataType>(&self, root: u32) -> Result<T, Error> {
        if self.rank == root {
            return Err(Error::RoleMismatch {
                rank: self.rank,
                given: "broadcast receiver",
            });
        }
        let virtual_rank = (self.rank + self.size - root) % self.size;
        let parent = self.devirtualize((virtual_rank - 1) / 2, root);
        let buffer = self.recv_frame(parent, BCAST_TAG)?;

        // Forward down the tree before decoding.
        for child in [2 * virtual_rank + 1, 2 * virtual_rank + 2] {
            if child < self.size {
                let dest = self.devirtualize(child, root);
                self.send_frame(dest, BCAST_TAG, buffer.clone())?;
            }
        }

        Ok(decode(&buffer)?)
    }

    fn scatter<T: DataType>(&self, data: &[T]) -> Result<Vec<T>, Error> {
        let plan = PartitionPlan::new(data.len(), self.size as usize)?;
        for dest in 0..self.size {
            if dest == self.rank {
                continue;
            }
            let block = &data[plan.range(dest)];
            self.send_frame(dest, SCATTER_TAG, encode(&block)?)?;
        }
        // Root's block never touches the mesh.
        Ok(data[plan.range(self.rank)].to_vec())
    }

    fn scatter_recv<T: DataType>(&self, root: u32) -> Result<Vec<T>, Error> {
        let buffer = self.recv_frame(root, SCATTER_TAG)?;
        Ok(decode(&buffer)?)
    }

    fn gather<T: DataType>(&self, data: &[T]) -> Result<Vec<T>, Error> {
        let mut result = Vec::with_capacity(data.len() * self.size as usize);
        // Receiving rank by rank, not first-come-first-served, fixes the
        // segment order no matter when each peer finishes.
        for source in 0..self.size {
            if source == self.rank {
                result.extend_from_slice(data);
            } else {
                let buffer = self.recv_frame(source, GATHER_TAG)?;
                let part: Vec<T> = decode(&buffer)?;
                result.extend(part);
            }
        }
        Ok(result)
    }

    fn gather_send<T: DataType>(&self, root: u32, data: &[T]) -> Result<(), Error> {
        self.send_frame(root, GATHER_TAG, encode(&data)?)?;
        Ok(())
    }

    fn teardown(&mut self) {
        if self.endpoints.take().is_some() {
            debug!("rank {} tore down its endpoints", self.rank);
        }
    }
}

impl Drop for ChannelGroup {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Launch `size` ranks as scoped threads, hand each its group, and collect
/// the per-rank outputs in rank order.
///
/// This is the single-machine stand-in for an external process-group
/// launcher; the engine itself only needs the formed groups. A panicking
/// rank surfaces as `TransportError::RankFailed` after all ranks have been
/// joined.
pub fn run_on_threads<T, F>(size: u32, f: F) -> Result<Vec<T>, Error>
where
    T: Send,
    F: Fn(ChannelGroup) -> T + Send + Sync,
{
    let groups = ChannelGroup::form(size)?;
    let f = &f;
    let mut results: Vec<Option<T>> = (0..size).map(|_| None).collect();
    let mut failed = None;
    thread::scope(|scope| {
        let handles: Vec<_> = groups
            .into_iter()
            .map(|group| (group.rank(), scope.spawn(move || f(group))))
            .collect();
        for (rank, handle) in handles {
            match handle.join() {
                Ok(value) => results[rank as usize] = Some(value),
                Err(_) => {
                    if failed.is_none() {
                        failed = Some(rank);
                    }
                }
            }
        }
    });
    if let Some(rank) = failed {
        return Err(TransportError::RankFailed { rank }.into());
    }
    Ok(results.into_iter().flatten().collect())
}
