//! Region resolution subsystem.
//!
//! # Data Flow
//! ```text
//! startup:
//!     config.regions (or built-in table)
//!     → table.rs (validate, index by label and key)
//!     → Arc<RegionTable> (frozen, shared with handlers)
//!
//! per request:
//!     sanitized region label → RegionTable::resolve → Region { key, prefix }
//! ```
//!
//! # Design Decisions
//! - Lookup is exact string equality, no case folding or trimming variants
//! - Keys are unique; prefixes may repeat across regions
//! - The table is never mutated after startup

pub mod table;

pub use table::{Region, RegionEntry, RegionTable, RegionTableError};
