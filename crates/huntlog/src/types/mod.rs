//! Wire types for the hunting log API: request bodies with their validation
//! rules, list query parameters, and response shapes that are not plain models.

mod queries;
mod requests;
mod responses;

pub use queries::*;
pub use requests::*;
pub use responses::*;
