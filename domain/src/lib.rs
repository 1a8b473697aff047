//! Mesh metadata consumed by the varform rewriting passes.
//!
//! # Module Organization
//!
//! - [`cell`] - Reference cell types and their counts and volumes
//! - [`element`] - Coordinate element metadata (degrees, pullback, Sobolev space)
//! - [`mesh`] - [`Domain`], a mesh identified by its coordinate element
//! - [`error`] - Error types and result handling

pub mod cell;
pub mod element;
pub mod error;
pub mod mesh;


pub use cell::CellType;
pub use element::{CoordinateElement, Pullback, SobolevSpace};
pub use error::{Error, Result};
pub use mesh::Domain;
