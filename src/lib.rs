//! Setpoint: contextual parameter editing for simulation job scripts
//!
//! Reads and rewrites named parameters in a line-oriented source file
//! where the same name occurs in many sections. A parameter is identified
//! by the text its line starts with and by a marker line somewhere in the
//! 30 lines above it, optionally carrying a `KEY == value` condition.
//!
//! # Core Concepts
//!
//! - **Descriptors**: How to find one parameter; built once into a registry
//! - **Sessions**: Batches of read/modify requests applied to one file
//! - **Snapshots**: Replayable tables of the values a session resolved
//! - **Run log**: One row per launched run, header growing with new keys
//!
//! # Example
//!
//! ```no_run
//! use setpoint::{Catalog, ContextDefaults, Session};
//! use std::path::Path;
//!
//! let registry = Catalog::builtin()?.build(&ContextDefaults::for_testcase("19"), Some("19"))?;
//! let mut session = Session::new();
//! session.set(&registry, "n", "256")?;
//! session.get(&registry, "m")?;
//! let outcome = session.process(Path::new("sunCAR30506.csh"))?;
//! println!("m = {:?}", outcome.value("m"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod cluster;
pub mod config;
pub mod descriptor;
pub mod edit;
pub mod launch;
pub mod locate;
pub mod runlog;
pub mod session;
pub mod snapshot;

pub use config::{Config, ConfigError};
pub use descriptor::{
    Catalog, CatalogError, ContextDefaults, DescriptorRegistry, ParameterDescriptor,
    ParameterRequest, RegistryError,
};
pub use launch::{LaunchError, LaunchOptions, LaunchReport, Launcher};
pub use locate::{Locator, Resolution, ResolutionRecord, SearchMode};
pub use runlog::{RunLog, RunLogError};
pub use session::{Session, SessionError, SessionOutcome, SessionResult};
pub use snapshot::{SnapshotError, SnapshotResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
