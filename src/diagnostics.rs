//! Diagnostic-only state: the `trace` hook and the process-wide last-bound
//! site URL (spec §5, "one process-wide variable holds the last-bound site
//! URL for diagnostic logging; it is written only during listener startup").

use std::sync::{Mutex, OnceLock};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

static LAST_BOUND_SITE_URL: OnceLock<Mutex<Option<String>>> = OnceLock::new();

/// Records the address the listener just bound, for diagnostic logging only.
/// Must never be consulted for request routing (spec §9, "Global diagnostic
/// URL"). A listener binds plain and, optionally, TLS in sequence during
/// startup, so this overwrites on every call rather than latching on the
/// first — "last-bound" means the most recent one, not the first.
pub fn record_bound_site_url(url: impl Into<String>) {
	let cell = LAST_BOUND_SITE_URL.get_or_init(|| Mutex::new(None));
	*cell.lock().expect(crate::error::SCOPE_VALIDITY) = Some(url.into());
}

pub fn last_bound_site_url() -> Option<String> {
	LAST_BOUND_SITE_URL
		.get()
		.and_then(|cell| cell.lock().expect(crate::error::SCOPE_VALIDITY).clone())
}

/// Emits a trace-level diagnostic event if `trace` is enabled. A thin
/// wrapper so call sites read as intent ("trace this") rather than repeating
/// the `if trace { ... }` guard everywhere.
pub fn trace_event(trace: bool, message: &str) {
	if trace {
		tracing::debug!("{message}");
	}
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trace_event_does_not_panic_when_disabled() {
		trace_event(false, "should not log");
	}
}
