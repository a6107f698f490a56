//! Minute-bar analytics for futures instruments.
//!
//! The crate turns an ordered stream of OHLCV minute bars into a columnar
//! [`BarStore`] and answers questions about it:
//! - where trading sessions and their EU/RTH sub-windows start and end
//!   ([`session`]);
//! - what a range of rows looks like as one bar ([`aggregate`]);
//! - rolling statistics, extrema and run counts ([`window`]);
//! - turning points ([`swing`]);
//! - when a live value has crossed a level for long enough ([`notifier`]).
//!
//! Everything is synchronous and in-memory. Callers own the store and
//! serialize access to it.

pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod derived;
pub mod errors;
pub mod logging;
pub mod models;
pub mod notifier;
pub mod session;
pub mod store;
pub mod swing;
pub mod tz;
pub mod window;

pub use aggregate::{aggregate, aggregate_buckets, rth_bars, session_bars};
pub use config::{EngineConfig, load_config_path, load_config_str};
pub use errors::EngineError;
pub use models::{Bar, IndexEntry, RawBar, Swing, SwingKind};
pub use notifier::{Condition, MonitorSet, NotifierEvent, NotifierState, Operator, ThresholdNotifier};
pub use session::{SessionConfig, build_index, make_messages};
pub use store::BarStore;
pub use swing::detect_swings;
