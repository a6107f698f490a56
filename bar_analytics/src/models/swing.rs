use std::fmt;

/// Which side of the window a turning point sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwingKind {
    LocalHigh,
    LocalLow,
}

/// A local extremum found by [`crate::swing::detect_swings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swing {
    /// Row position in the store.
    pub position: usize,
    pub value: f64,
    pub kind: SwingKind,
}

impl fmt::Display for Swing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            SwingKind::LocalHigh => "HIGH",
            SwingKind::LocalLow => "LOW",
        };
        write!(f, "{tag}@{} {:.2}", self.position, self.value)
    }
}
