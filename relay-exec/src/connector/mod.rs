mod destination;
mod error;
mod source;

pub use destination::{Destination, PartialFailureIndexMap};
pub use error::{SendError, SourceError};
pub use source::{ReplayLineage, Source};
