use serde::{de::DeserializeOwned, Serialize};

pub trait DataType: Serialize + DeserializeOwned + Default + Clone {}

impl<T> DataType for T where T: Serialize + DeserializeOwned + Default + Clone {}

/// A fixed group of cooperating ranks with point-to-point and collective
/// messaging.
///
/// Every collective is a blocking synchronization point: the call returns
/// only once this rank's part of the exchange is complete. Within one rank
/// the operations of a run execute strictly in program order; across ranks
/// the only ordering is the one each collective enforces.
pub trait CommGroup {
    /// Get the rank of the process in the group.
    fn rank(&self) -> u32;
    /// Get the size of this communication group.
    fn size(&self) -> u32;
    /// Identity label of the host this rank runs on. Diagnostic only.
    fn host_label(&self) -> &str;
    /// Send data to a destination process.
    fn send<T: DataType>(&self, data: &T, dest: u32, tag: u32) -> Result<(), Error>;
    /// Receive some data from a source process.
    ///
    /// Fails with `TransportError::TagMismatch` if the next frame from
    /// `source` carries a different tag; two logically distinct payloads
    /// must travel on two distinct tags.
    fn recv<T: DataType>(&self, source: u32, tag: u32) -> Result<T, Error>;
    /// Broadcast data from this process to all other processes.
    fn bcast<T: DataType>(&self, data: &T) -> Result<(), Error>;
    /// Receive a broadcast on all other processes.
    fn recv_bcast<T: DataType>(&self, root: u32) -> Result<T, Error>;
    /// Scatter the data from this sending process to all processes
    /// (including this source process).
    ///
    /// data.len() must be divisible by the number of processes; indivisible
    /// input is rejected before anything is sent.
    fn scatter<T: DataType>(&self, data: &[T]) -> Result<Vec<T>, Error>;
    /// Receive scattered data from a root process.
    fn scatter_recv<T: DataType>(&self, root: u32) -> Result<Vec<T>, Error>;
    /// Gather data from each process (including this one), reassembled in
    /// rank order regardless of arrival order.
    fn gather<T: DataType>(&self, data: &[T]) -> Result<Vec<T>, Error>;
    /// Send data to a root process to be gathered.
    fn gather_send<T: DataType>(&self, root: u32, data: &[T]) -> Result<(), Error>;
    /// Release this rank's transport endpoints. Idempotent; safe to call
    /// again after a failure. Operations after teardown fail with
    /// `TransportError::TornDown`.
    fn teardown(&mut self);
}

pub mod channel;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod plan;

pub use channel::{run_on_threads, ChannelGroup};
pub use error::{Error, TransportError};
pub use plan::PartitionPlan;
