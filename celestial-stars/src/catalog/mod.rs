//! Binary star catalog files: header, zone index, packed records.

pub mod bits;
pub mod header;
pub mod index;
pub mod reader;
pub mod record;
pub mod writer;

pub use header::{CatalogHeader, Endianness, MagnitudeTable, RecordVariant, CATALOG_MAGIC, HEADER_SIZE};
pub use index::ZoneIndex;
pub use reader::CatalogReader;
pub use record::{decode_records, encode_record, ZoneBasis};
pub use writer::{CatalogWriter, StarEntry};
