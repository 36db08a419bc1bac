pub mod adapters;
pub mod config;
pub mod error;
pub mod timer;
pub mod web;
