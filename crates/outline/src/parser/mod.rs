//! Everything between raw PDF bytes and merged [`Line`](crate::types::Line)s.

pub mod backend;
pub mod lines;
pub mod runs;
