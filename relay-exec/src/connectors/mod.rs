mod conversion_upload;
mod inline;
mod json_file;
mod log;

pub use conversion_upload::{ConversionUploadDestination, CONVERSION_UPLOAD_KIND};
pub use inline::{InlineSource, INLINE_KIND};
pub use json_file::{JsonFileSource, JSON_FILE_KIND};
pub use log::{LogDestination, LOG_KIND};

use relay_core::Record;

/// An empty field list selects every field.
fn select(record: &Record, fields: &[String]) -> Record {
    if fields.is_empty() {
        record.clone()
    } else {
        record.project(fields)
    }
}
