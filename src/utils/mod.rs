pub mod file_detection;
pub mod format;
pub mod test_helpers;
pub mod validation;
