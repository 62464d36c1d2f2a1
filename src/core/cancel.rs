// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Cancellation
//!
//! A long-running search is aborted out-of-band through a [`CancelToken`].
//! The driver keeps one clone and passes another into the search; the search
//! polls the token at grid-cell and simplex-iteration boundaries only, never
//! inside the numerical routines.

#[cfg(feature = "ctrlc")]
use crate::core::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to a shared cancellation flag.
///
/// The flag is write-once from the driver side and read-only from the search
/// side for the duration of a search. Cancellation is not restartable at the
/// granularity of a search: after a cancelled search, either [`clear`] the
/// token or create a fresh one before starting over.
///
/// [`clear`]: CancelToken::clear
///
/// # Example
///
/// ```
/// use bift::core::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
///
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Construct a new, untripped token.
    pub fn new() -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Trip the flag. All clones of this token observe the cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](`CancelToken::cancel`) has been called
    /// on any clone of this token.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Reset the flag so the token can drive a new search.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Trip this token when the process receives Ctrl-C.
    ///
    /// Installing a second handler within the same process is tolerated and
    /// leaves the first one in place.
    ///
    /// Only available when the `ctrlc` feature is set.
    #[cfg(feature = "ctrlc")]
    pub fn hook_ctrlc(&self) -> Result<(), Error> {
        let flag = Arc::clone(&self.flag);
        match ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        }) {
            Err(ctrlc::Error::MultipleHandlers) => Ok(()),
            r => r,
        }?;
        Ok(())
    }
}
