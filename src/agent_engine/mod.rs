pub mod context;
pub mod engine;
pub mod history;
pub mod loop_control;
pub mod sentinel;
pub mod state;
