//! Lazy mock construction for unit tests
//!
//! A [`Handle`] stands in for a backing object. Navigating a path through
//! it creates the intermediate objects on demand, assignments write data,
//! and operator methods install functions, spies and lifecycle changes.
//! The code under test only ever sees the plain [`MockValue`] tree.
//!
//! # Example
//!
//! ```
//! use lazymock::{Config, Session};
//! use serde_json::json;
//!
//! let session = Session::with_config(Config::new().with_recorder());
//! let mock = session.create_handle();
//!
//! mock.get("config").get("retries").set(3).unwrap();
//! mock.get("client").get("fetch").call().unwrap().assign("status", 200).unwrap();
//!
//! let module = mock.value();
//! assert_eq!(module.get("config").to_json(), json!({"retries": 3}));
//!
//! let response = module.get("client").get("fetch").call(&[]).unwrap();
//! assert_eq!(response.to_json(), json!({"status": 200}));
//! assert_eq!(mock.get("client").get("fetch").spy().unwrap().call_count(), 1);
//! ```

pub mod attachment;
pub mod config;
pub mod error;
pub mod function;
pub mod handle;
mod registry;
pub mod session;
pub mod spy;
pub mod table;
pub mod value;

pub use config::Config;
pub use error::MockError;
pub use function::{Implementation, MockFunction};
pub use handle::{Handle, Operator, Outcome};
pub use session::{Session, SessionStats};
pub use spy::{Recorder, Spy, SpyConstructor, SpyRef};
pub use value::{CheapClone, Key, MockString, MockValue, NodeRef, Settlement, ShapeKind};
