//! HTTP controllers.

pub mod book_controller;
pub mod health_controller;
