pub mod error;
pub mod subject;
pub mod thesis;
pub mod traits;
pub mod types;

pub use error::*;
pub use subject::validate_subject;
pub use thesis::*;
pub use traits::*;
pub use types::*;
