pub mod benchmark;
pub mod display;
pub mod lane;
pub mod preview;
pub mod workbench;
