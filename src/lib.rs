pub mod aggregate;
pub mod config;
pub mod fetch;
pub mod heatmap;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod stations;
pub mod transform;
pub mod types;
