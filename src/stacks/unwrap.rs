//! Find the raw, address-level source underneath wrapper layers.

use super::source::{RawStackSource, StackSource};
use crate::utils::config::MAX_UNWRAP_DEPTH;
use log::{debug, warn};
use std::rc::Rc;

/// Walk `base()` links down to the raw source
///
/// Returns `None` when the chain stops at a layer that is its own base
/// without reaching address-level samples, or when it is deeper than
/// `MAX_UNWRAP_DEPTH`.
pub fn unwrap_to_raw(source: &StackSource) -> Option<Rc<RawStackSource>> {
    let mut current = source;

    for depth in 0..MAX_UNWRAP_DEPTH {
        if let StackSource::Raw(raw) = current {
            debug!("Found raw stack source after {} layer(s)", depth);
            return Some(Rc::clone(raw));
        }

        match current.base() {
            Some(base) => current = base,
            None => {
                debug!("Stack source chain ends at a {} source", current.kind());
                return None;
            }
        }
    }

    warn!(
        "Stack source chain is deeper than {} layers, giving up",
        MAX_UNWRAP_DEPTH
    );
    None
}
