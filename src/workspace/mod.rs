pub mod materializer;

pub use materializer::{Materializer, TEMPLATE_DIR};
