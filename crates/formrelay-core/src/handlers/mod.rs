//! Request handlers behind the router

pub mod pages;
pub mod static_files;
pub mod submit;

pub use pages::{Page, Pages};
pub use static_files::{mime_type, StaticFiles, FALLBACK_MIME_TYPE};
pub use submit::{Submit, SUBMIT_REDIRECT};
