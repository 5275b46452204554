pub mod document;
pub mod extract;
pub mod fetcher;
pub mod types;
