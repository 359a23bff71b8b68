pub mod filename;
pub mod groups;
pub mod inventory;
pub mod next_version;
pub mod reserve;
pub mod sanitize;
pub mod status;

mod family;
mod listing;
