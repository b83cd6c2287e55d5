pub mod query;
pub mod user;

pub use query::{UserFilter, UserPatch};
pub use user::{Availability, User, UserStats, UserStatus};
