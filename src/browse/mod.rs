//! Page browsing: page composition, cancellation, and background loading.

pub mod cancel;
pub mod navigator;
pub mod pages;

pub use navigator::Navigator;
pub use pages::{Destination, Page, PageView};
