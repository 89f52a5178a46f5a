//! Application layer: the backend contract and the clients the UI drives.

pub mod bridge;
pub mod events;
pub mod files;
pub mod local_backend;
pub mod parse_queue;
pub mod preview;
pub mod proxy;

pub use bridge::{Backend, BridgeError, BridgeResult};
pub use events::{ToastKind, UserEvent};
pub use files::ArtifactClient;
pub use local_backend::LocalBackend;
pub use parse_queue::{JobStatus, ParseJob, ParseQueue, QueueUpdate};
pub use preview::{PreviewTreeAdapter, SelectionSession, Submission, TreeActions, TreeSource};
pub use proxy::EventProxy;
