//! Value objects - immutable types that represent domain concepts

mod phone;
mod store_id;

pub use phone::{PhoneNumber, PhoneParseError};
pub use store_id::{StoreId, StoreIdParseError};
