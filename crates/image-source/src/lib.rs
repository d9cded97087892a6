//! Everything needed to turn one submitted form into one in-memory RGB image:
//! picking the winning source, validating it, fetching remote bytes and decoding.

mod acquire;
mod decode;
mod error;
mod fetch;
mod samples;
mod source;
mod validate;

pub use acquire::*;
pub use decode::*;
pub use error::*;
pub use fetch::*;
pub use samples::*;
pub use source::*;
pub use validate::*;
