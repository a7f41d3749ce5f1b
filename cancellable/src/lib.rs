//! # Cancellable
//!
//! Cancellable promises over callback-style deferred computations.
//!
//! Cancellable wraps a settle-once deferred in a promise that can be
//! cancelled while the underlying work is still pending, with support for:
//!
//! - **Deferred computations**: settle-once handles with `done`/`fail`/`always`/`progress` attachment
//! - **Cooperative cancellation**: force-reject the computation and drain registered cancel callbacks
//! - **Cancel prevention**: one call permanently disarms cancellation
//! - **Transport integration**: abort the in-flight request that backs the promise
//! - **Cancellation cascades**: one cancel fans out to dependent cancellables
//! - **Async bridging**: await settlement from async code alongside callbacks
//!
//! ## Quick Start
//!
//! ```rust
//! use cancellable::prelude::*;
//!
//! let promise: CancellablePromise<u32> = CancellablePromise::new();
//! promise
//!     .done(|value| println!("got {value}"))
//!     .on_cancel(|| println!("tearing down"));
//!
//! // The producer side settles through the shared deferred.
//! promise.deferred().resolve(7);
//!
//! // Once settled, cancellation is off the table.
//! promise.cancel();
//! assert!(!promise.is_cancelled());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cascade;
pub mod deferred;
pub mod errors;
pub mod promise;
pub mod testing;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cascade::Cancellable;
    pub use crate::deferred::{Deferred, Outcome, PromiseState};
    pub use crate::errors::{CancelRejection, CancellableError};
    pub use crate::promise::{CancelPhase, CancellablePromise};
    pub use crate::transport::{AbortTransport, CancelTransport};
}
