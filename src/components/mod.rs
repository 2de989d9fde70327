pub mod colors;
pub mod history;
pub mod strokes;
pub mod tools;
