pub mod calculator;
pub mod config;
pub mod data;
pub mod download;
pub mod export;
pub mod filters;
pub mod interpolate;
pub mod model;
