//! # Key Runner
//!
//! Repeats a keyboard key sequence with configurable timing and repetition.
//!
//! ## Features
//!
//! - Comma-separated key sequences (`"a, b, enter"`)
//! - Inter-key delay and an optional pre-start countdown
//! - Infinite, fixed-count, or single-pass repetition
//! - Cooperative stop that never blocks the caller
//! - JSON configuration file support
//! - Cross-platform injection (`keybd_event` on Windows, `enigo` elsewhere)
//!
//! ## Example
//!
//! ```no_run
//! use key_runner::{default_injector, KeyRunner, RepeatChoice, RunInput};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let input = RunInput {
//!     keys: "a, b, enter".to_string(),
//!     delay: "0.5".to_string(),
//!     wait: "3".to_string(),
//!     repeat: RepeatChoice::Count,
//!     count: "10".to_string(),
//! };
//!
//! let mut runner = KeyRunner::new(default_injector()?.into());
//! runner.on_status(|status| println!("status: {status}"));
//! runner.start(input.parse()?)?;
//! runner.wait_idle().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```json
//! {
//!   "sequence": ["a", "b", "enter"],
//!   "inter_key_delay_secs": 0.5,
//!   "pre_start_wait_secs": 3,
//!   "repeat": { "mode": "fixed_count", "count": 10 }
//! }
//! ```

pub mod config;
pub mod error;
pub mod injector;
pub mod keymap;
pub mod runner;
pub mod status;

pub use config::{RepeatChoice, RepeatMode, RunConfig, RunInput};
pub use error::{ConfigError, InjectError, RuntimeError, StartError};
pub use injector::{default_injector, KeyInjector, NoopInjector};
pub use keymap::{KeyCode, KeySymbolTable};
pub use runner::{KeyRunner, RunState, SETTLE_DELAY};
pub use status::RunStatus;
