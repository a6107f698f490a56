pub mod bar;
pub mod index_entry;
pub mod swing;

pub use bar::{Bar, RawBar};
pub use index_entry::IndexEntry;
pub use swing::{Swing, SwingKind};
