//! Boot orchestration for keel nodes.
//!
//! A [`Node`] turns one [`BootIntent`] into an ordered queue of tasks and runs
//! it strictly in sequence:
//!
//! ```text
//! probe repo (open + pre-start hooks)
//!   └── Init        if requested and no repo
//!         └── SetConfig   if requested and a repo exists (or was just queued)
//!               └── Start       if requested; fails fast without a repo
//! ```
//!
//! The first failing task aborts the rest. Every boot call publishes exactly
//! one [`LifecycleEvent::Ready`] or [`LifecycleEvent::Failed`].

mod builder;
mod error;
mod event;
mod hook;
mod intent;
mod node;
mod state;

pub use builder::NodeBuilder;
pub use error::{BootError, BootErrorKind, ConfigPersistError, InitError, StartError};
pub use event::LifecycleEvent;
pub use hook::{HookError, PreStartHook};
pub use intent::{BootIntent, DEFAULT_KEY_BITS, InitOptions, MIN_KEY_BITS};
pub use node::Node;
pub use state::{NodeState, RepoState};
