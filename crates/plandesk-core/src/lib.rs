//! Core plan handling for plandesk.

pub mod plan;
