pub mod config;
pub mod consolidate;
pub mod delta;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod report;
