//! Mock device implementations for testing and development.
//!
//! This module provides a simulated reader module that can be controlled
//! programmatically without requiring physical hardware.

pub mod uhf;

// Re-export commonly used types
pub use uhf::{MockCall, MockUhfHandle, MockUhfReader};
