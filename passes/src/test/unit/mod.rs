mod config;
mod geometry;
