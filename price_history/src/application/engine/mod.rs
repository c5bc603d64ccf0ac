// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The linearized state engine: its on-disk layout, the batch writer and
//! price loader that read and write it, the snapshot view that bounds a
//! read to "as of" a point in time, the single-owner linearizer loop that
//! serializes all writes, and the startup routine that wires the above into
//! a running [`Engine`].

pub mod batch_writer;
pub mod check;
pub mod failure_counter;
pub mod layout;
pub mod linearizer;
pub mod memory_store;
pub mod price_loader;
pub mod snapshot;
pub mod startup;

pub use check::CheckReport;
pub use failure_counter::{FailureCategory, FailureCounter};
pub use linearizer::LinearizerHandle;
pub use memory_store::MemoryStore;
pub use startup::Engine;
