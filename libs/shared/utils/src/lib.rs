pub mod extractor;
pub mod form;
pub mod jwt;
pub mod test_utils;
pub mod upload;
