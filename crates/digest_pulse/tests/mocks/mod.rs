pub mod fetcher;
pub mod generator;
pub mod merger;
pub mod store;
pub mod synthesizer;
