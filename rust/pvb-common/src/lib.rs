//! Core definitions shared by all pvb-* crates: the error type, the `Result`
//! alias and the argument/data verification macros.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
