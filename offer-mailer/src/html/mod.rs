//! Offer email rendering.
//!
//! ```text
//! Campaign + recipient → Renderer::render() → HTML body
//! ```

pub mod escape;
pub mod template;

pub use escape::escape_html;
pub use template::{OfferTemplate, Renderer};
