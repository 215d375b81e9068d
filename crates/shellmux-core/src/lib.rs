//! Shared types used by the PTY shell factory and its PTY backend: the
//! error taxonomy, authentication context model, transport classification,
//! and small environment/path helpers.

pub mod errors;
pub mod paths;
pub mod replica;
pub mod session;
pub mod time;
pub mod transport;

pub use errors::{ErrorCode, ShellMuxError};
pub use replica::{FindMode, FindOutcome, ReplicaDirectory};
pub use session::{AuthContext, Session, SshCert};
pub use time::now_ms;
pub use transport::TransportType;
