mod handler;
pub mod model;

pub use handler::{change_password, delete_user, get_profile, get_user, list_users, update_user};
