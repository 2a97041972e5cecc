mod common;
mod delimited;
mod workbook;

pub use delimited::DelimitedReader;
pub use workbook::WorkbookReader;

pub(crate) use common::assemble_record;
