/*
 * This module provides the application logic layer, centered on
 * `SearchPanelLogic`, the facade the surrounding application drives. Unit
 * tests for `SearchPanelLogic` are in `handler_tests.rs`.
 */
pub mod handler;


pub use handler::{DocumentViewSnapshot, SearchPanelLogic};
