pub mod decoder;

pub use decoder::{KeyEvent, ScanInputDecoder};
