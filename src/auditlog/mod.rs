//! BigQuery audit log decoding: table identities, typed records, file reading.

pub mod read;
pub mod record;
pub mod table;

pub use read::{AUDIT_LOG_FILE_NAME, AuditLogReader, find_audit_log_files};
pub use record::AuditRecord;
pub use table::TableRef;
