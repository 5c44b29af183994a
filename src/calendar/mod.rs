pub mod event;
pub mod fixtures;
pub mod permission;

pub use event::{Event, human_date};
pub use permission::{AuthorizationPolicy, UserEventPermission, authorize, is_valid_email, permitted_titles};
