//! Load, query, mutate, and script Valve Pack (VPK v2) archives and plain directories through one
//! tree interface.
//!
//! Three backends implement the same [`tree::Tree`] contract: [`local::LocalTree`] over an
//! on-disk directory, [`mem::MemTree`] over a flat in-memory mapping, and [`vpk::VpkTree`] over a
//! parsed VPK archive. The [`script`] module ties named instances of any of these together with a
//! tiny DSL (`bind`/`copy`/`clone`/`remove`) and persists modified VPK-backed packs on completion.

pub mod config;
pub mod error;
pub mod local;
pub mod mem;
pub mod path;
pub mod script;
pub mod tree;
pub mod vpk;

pub use config::Config;
pub use error::{Error, Result};
pub use local::LocalTree;
pub use mem::MemTree;
pub use script::Interpreter;
pub use tree::{Entry, Tree};
pub use vpk::VpkTree;
