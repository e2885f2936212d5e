//! Task-side session for IVIS
//!
//! A task is a short-lived worker process started by the IVIS host. At
//! startup it reads one JSON document from stdin describing its parameters,
//! the entities it references, the objects it owns and any state saved by a
//! previous run. From then on it can ask the host to create signal sets and
//! signals, or to persist state, over a line-delimited JSON request channel.
//!
//! ```no_run
//! use ivis_config::ConfigLoader;
//! use ivis_task::{block_on_task, run_task, SignalSet};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().from_env()?;
//! block_on_task(run_task(&config, |session| async move {
//!     if session.prior_state().is_none() {
//!         session.create_signal_set(&SignalSet::new("temp1", "main")).await?;
//!     }
//!     session.store_state(&serde_json::json!({"initialized": true})).await?;
//!     Ok(())
//! }))??;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod error;
pub mod process;
pub mod requests;
pub mod search;
pub mod session;

pub use bootstrap::{read_bootstrap, BootstrapPayload, SearchEndpoint};
pub use error::{TaskError, TaskResult};
pub use process::{block_on_task, connect, exit_code, run_task, ProcessChannel};
pub use requests::{PayloadBuilder, Signal, SignalSet};
pub use search::SearchClient;
pub use session::Session;
