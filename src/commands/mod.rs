pub mod repo;
pub mod version;
