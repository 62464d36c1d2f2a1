// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Observers
//!
//! The search reports its progress through a [`ProgressSink`], a one-way,
//! write-only interface taking structured [`SearchRecord`]s. The driver owns
//! the receive side; typically this is the sending half of an
//! [`mpsc::channel`](`std::sync::mpsc::channel`) read on a UI or driver
//! thread while the search runs on a worker thread.
//!
//! The sink is invoked only at grid-cell boundaries and after search
//! milestones, never from inside the numerical routines.
//!
//! The observer [`SlogLogger`] logs every record to the terminal instead of
//! forwarding it. It requires the `slog-logger` feature.
//!
//! Custom sinks are implemented by implementing [`ProgressSink`].
//!
//! ## Example
//!
//! ```
//! use bift::core::{ProgressSink, SearchRecord};
//!
//! struct CountingSink {
//!     seen: usize,
//! }
//!
//! impl ProgressSink for CountingSink {
//!     fn notify(&mut self, _record: SearchRecord) -> Result<(), bift::core::Error> {
//!         self.seen += 1;
//!         Ok(())
//!     }
//! }
//! ```

#[cfg(feature = "slog-logger")]
pub mod slog_logger;

#[cfg(feature = "slog-logger")]
pub use slog_logger::SlogLogger;

use crate::core::{Error, SearchRecord};
use std::sync::mpsc::Sender;

/// An interface which every progress sink is required to implement.
///
/// Returning an error aborts the search; sinks that merely forward records
/// to an unreliable consumer should swallow delivery failures instead
/// (publication is best-effort).
pub trait ProgressSink {
    /// Called with every record the search produces, in order.
    fn notify(&mut self, record: SearchRecord) -> Result<(), Error>;
}

/// Best-effort forwarding into a channel.
///
/// A dropped receiver does not abort the search; records published after
/// the receiver disconnected are discarded.
impl ProgressSink for Sender<SearchRecord> {
    fn notify(&mut self, record: SearchRecord) -> Result<(), Error> {
        let _ = self.send(record);
        Ok(())
    }
}

/// A sink which drops every record.
///
/// Useful for driving a search to completion when only the returned
/// artifact is of interest.
#[derive(Clone, Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn notify(&mut self, _record: SearchRecord) -> Result<(), Error> {
        Ok(())
    }
}

/// A sink which collects every record in memory.
#[derive(Clone, Debug, Default)]
pub struct CollectingSink {
    /// The records received so far, in publication order.
    pub records: Vec<SearchRecord>,
}

impl CollectingSink {
    /// Construct a new, empty `CollectingSink`.
    pub fn new() -> Self {
        CollectingSink { records: vec![] }
    }
}

impl ProgressSink for CollectingSink {
    fn notify(&mut self, record: SearchRecord) -> Result<(), Error> {
        self.records.push(record);
        Ok(())
    }
}
