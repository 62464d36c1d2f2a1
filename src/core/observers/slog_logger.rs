// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Logger based on the `slog` crate

use crate::core::observers::ProgressSink;
use crate::core::{Error, SearchRecord};
use slog::{info, o, Drain};
use slog_async::OverflowStrategy;

/// A progress sink which logs every record with `slog`.
#[derive(Clone)]
pub struct SlogLogger {
    /// the logger
    logger: slog::Logger,
}

impl SlogLogger {
    /// Log to the terminal in a blocking way
    pub fn term() -> Self {
        SlogLogger::term_internal(OverflowStrategy::Block)
    }

    /// Log to the terminal in a non-blocking way (in case of overflow, messages are dropped)
    pub fn term_noblock() -> Self {
        SlogLogger::term_internal(OverflowStrategy::Drop)
    }

    /// Actual implementation of the logging to the terminal
    fn term_internal(overflow_strategy: OverflowStrategy) -> Self {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator)
            .use_original_order()
            .build()
            .fuse();
        let drain = slog_async::Async::new(drain)
            .overflow_strategy(overflow_strategy)
            .build()
            .fuse();
        SlogLogger {
            logger: slog::Logger::root(drain, o!()),
        }
    }
}

impl ProgressSink for SlogLogger {
    fn notify(&mut self, record: SearchRecord) -> Result<(), Error> {
        match record {
            SearchRecord::Update(update) => {
                info!(self.logger, "{}", update.status.as_deref().unwrap_or("");
                    "tpoint" => update.tpoint,
                    "spoint" => update.spoint,
                    "dmax" => update.dmax,
                    "chi" => update.chi,
                    "evidence" => update.evidence,
                    "alpha" => update.alpha,
                );
            }
            SearchRecord::Canceled => info!(self.logger, "search canceled"),
            SearchRecord::Failed => info!(self.logger, "search failed: no finite evidence"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    send_sync_test!(slog_logger, SlogLogger);
}
