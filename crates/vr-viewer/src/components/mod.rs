pub mod screens;
pub mod viewer;
