//! Replication channel for ludus.
//!
//! The authoritative engine delivers every [`Notice`] to a set of observers.
//! Each (player, observer) registration carries its own sequence counter
//! that starts at 0 and grows by exactly 1 per delivery, so the first notice
//! an observer receives has sequence 1.
//!
//! ## Components
//!
//! - **Registry**: [`ObserverRegistry`] mints sequence numbers and resolves
//!   [`Recipients`] into [`Delivery`] handles
//! - **Observers**: the [`Observer`] trait plus ready-made sinks
//!   ([`Recorder`], tokio channels)
//! - **Cursor**: [`ReplicaCursor`] tracks the sequence a replica expects next
//!   and reports gaps as [`SyncError::Sequence`]
//! - **Envelope**: [`Envelope`] is the serde wire shape transports carry
//!
//! On a sequence error the replica discards incremental state and resyncs
//! from a full snapshot.
//!
//! [`Notice`]: ludus_types::Notice

mod cursor;
mod envelope;
mod error;
mod observer;
mod registry;

pub use cursor::ReplicaCursor;
pub use envelope::Envelope;
pub use error::{SyncError, SyncResult};
pub use observer::{Observer, ObserverId, Recorder};
pub use registry::{Delivery, ObserverRegistry, Recipients};
