//! Value types shared between the story engine and its front ends.

pub mod domain;
pub mod error;
pub mod protocol;
