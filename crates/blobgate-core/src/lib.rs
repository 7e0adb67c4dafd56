//! Core types shared across the Blobgate crates

pub mod problemdetails;
pub use problemdetails::{Problem, ProblemDetails};
