//! Fragment transformer: raw upstream fragments to relay events.

use crate::event::RelayEvent;
use crate::ndjson::RawFragment;

/// Convert one upstream fragment into the events it produces.
///
/// Returns a vector because a terminal fragment with trailing text produces
/// both a `chunk` and the `end`. Empty non-terminal fragments produce nothing.
pub fn transform(fragment: RawFragment) -> Vec<RelayEvent> {
    let RawFragment { text, done, .. } = fragment;
    match (text.is_empty(), done) {
        (true, false) => Vec::new(),
        (false, false) => vec![RelayEvent::Chunk { text }],
        (true, true) => vec![RelayEvent::End],
        (false, true) => vec![RelayEvent::Chunk { text }, RelayEvent::End],
    }
}
