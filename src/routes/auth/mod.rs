mod handler;
pub mod model;

pub use handler::{current_user, login, login_status, logout, register};
