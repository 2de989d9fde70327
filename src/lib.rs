#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod debounce;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;
