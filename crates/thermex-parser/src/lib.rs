pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::ParserError;
pub use model::{
    Cell, MetadataEntry, MetadataValue, RawRecord, SourceFormat, SourceRow, RETAINED_COLUMNS,
};
pub use registry::{is_supported_file_name, parse_tabular_file, reader_for, TabularReader};
