//! Command and event channel between a host and its rendering surfaces

pub mod dispatcher;
pub mod events;
pub mod pending;
pub mod types;

pub use dispatcher::{Bridge, EventStream, SurfaceEndpoint, ViewHandle};
pub use events::{AnnotationsChange, DocumentState, EventError, MenuButton, RemovedAnnotation, ViewEvent};
pub use pending::{Resolution, StaleRequest};
pub use types::{
    Command, CommandEnvelope, CommandError, DataReturned, DocumentSource, MenuItemGroup, RequestId,
    Thumbnail, ViewId, ViewMode, ViewProps,
};
