pub mod camera;
pub mod controller;
pub mod line_camera;
pub mod payload;

pub use controller::{ScanEvent, ScannerController, ScannerState, ScannerStatus, Transition};
pub use payload::{DecodedPayload, ScanPayload};
