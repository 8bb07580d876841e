pub mod aggregate;
pub mod align;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod normalize;
pub mod output;
pub mod panel;
pub mod pipeline;
pub mod population;
pub mod region;
pub mod report;
pub mod schema;
pub mod types;
