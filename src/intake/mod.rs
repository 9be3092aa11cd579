//! Registration intake subsystem.
//!
//! # Data Flow
//! ```text
//! POST /save body
//!     → form.rs (RawForm, any JSON scalar per field)
//!     → sanitize.rs (trim, bound, coerce)
//!     → service.rs (resolve region, increment counter, persist)
//!     → error.rs (map failures to {"error": ...})
//! ```

pub mod error;
pub mod form;
pub mod sanitize;
pub mod service;

pub use error::{IntakeError, Stage};
pub use form::{RawForm, SanitizedForm};
pub use sanitize::sanitize;
pub use service::IntakeService;
