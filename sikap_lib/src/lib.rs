pub mod location_fix;
pub mod sikap_summary;
pub mod user;
