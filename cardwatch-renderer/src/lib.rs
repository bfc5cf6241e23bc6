//! cardwatch-renderer: commit cards rendered through Tera.
//!
//! The embedded `card.html.tera` can be replaced by dropping a file of the
//! same name into the style directory. Partials live under `_partials/`.

pub mod background;
pub mod capture;
pub mod context;
pub mod engine;
pub mod error;

pub use capture::{CaptureCommand, DEFAULT_CAPTURE_TIMEOUT};
pub use context::CardContext;
pub use engine::{CardEngine, CardRenderer, HtmlCardRenderer};
pub use error::RenderError;
