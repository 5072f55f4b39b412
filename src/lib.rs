//! # Vehicle Interface
//! Welcome to the `vehicle-interface` crate documentation. This crate bridges a raw CAN bus to a structured vehicle state, and turns desired steering and acceleration into rate limited, fault aware command frames.
//!
//! The pipeline is built leaf first:
//!  - [`schema`]: the declarative, statically validated message and signal definitions
//!  - [`codec`]: bit exact frame decoding and encoding, including checksums and rolling counters
//!  - [`state`]: aggregation of decoded signals into a [`state::VehicleState`] with staleness tracking
//!  - [`limiter`]: the safety envelope between the planner and the actuators
//!  - [`interface`]: one owner for all of the above, driven once per control cycle
//!
//! Transports plug in through [`can::CanAdapter`] and the [`can::AsyncCanAdapter`] wrapper. [`loopback::LoopbackAdapter`] is an in-memory bus for replays and tests.
//!
//! ## Control Loop Example
//!
//! Frames are received from any [`can::CanAdapter`] through the async wrapper, processed, and the limited command frames are queued without blocking.
//!
//! ```rust
//! use vehicle_interface::can::AsyncCanAdapter;
//! use vehicle_interface::interface::VehicleInterface;
//! use vehicle_interface::StreamExt;
//!
//! async fn control_loop(adapter: &AsyncCanAdapter, vehicle: &mut VehicleInterface<'_>) {
//!     let stream = adapter.recv();
//!     tokio::pin!(stream);
//!     let mut interval = tokio::time::interval(std::time::Duration::from_millis(10));
//!
//!     loop {
//!         tokio::select! {
//!             Some(frame) = stream.next() => {
//!                 let _ = vehicle.process(&frame);
//!             }
//!             _ = interval.tick() => {
//!                 let output = vehicle.command(0.0, 0.0, true).unwrap();
//!                 for frame in &output.frames {
//!                     adapter.try_send(frame).unwrap();
//!                 }
//!             }
//!         }
//!     }
//! }
//! ```

pub mod can;
pub mod codec;
mod error;
pub mod interface;
pub mod limiter;
pub mod loopback;
pub mod schema;
pub mod state;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use tokio_stream::{Stream, StreamExt};
