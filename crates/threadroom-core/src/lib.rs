//! threadroom-core: thread-creation headroom diagnostics for Linux hosts.
//!
//! Provides:
//! - `collector`: `/proc` and cgroup readers behind a mockable filesystem
//! - `headroom`: the estimator that finds the binding thread-creation limit
//! - `diagnosis`: plugin contract, registry, and the bundled plugins
//! - `cancel`: cancellation token threaded into blocking helpers
//! - `config`: host paths and process-listing command settings
//! - `fmt`: plain-text and JSON rendering of diagnosis results

pub mod cancel;
pub mod collector;
pub mod config;
pub mod diagnosis;
pub mod fmt;
pub mod headroom;
