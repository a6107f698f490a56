//! Swing (turning point) detection.

use crate::{
    models::{Swing, SwingKind},
    store::BarStore,
    window::{local_maxima, local_minima},
};

/// Local highs over `highs` and local lows over `lows`, ordered by position.
///
/// Range and window follow [`local_maxima`]. When a row is both, its high
/// comes first.
pub fn detect_swings(
    highs: &[f64],
    lows: &[f64],
    start: isize,
    end: isize,
    window: usize,
) -> Vec<Swing> {
    let tops = local_maxima(highs, start, end, window)
        .into_iter()
        .map(|position| Swing {
            position,
            value: highs[position],
            kind: SwingKind::LocalHigh,
        });
    let bottoms = local_minima(lows, start, end, window)
        .into_iter()
        .map(|position| Swing {
            position,
            value: lows[position],
            kind: SwingKind::LocalLow,
        });

    let mut swings: Vec<Swing> = tops.chain(bottoms).collect();
    // stable: highs stay ahead of lows at the same row
    swings.sort_by_key(|s| s.position);
    swings
}

/// [`detect_swings`] over the store's high and low columns.
pub fn store_swings(store: &BarStore, start: isize, end: isize, window: usize) -> Vec<Swing> {
    detect_swings(store.high(), store.low(), start, end, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinciding_extrema_put_high_first() {
        let flat = [1.0; 3];
        let swings = detect_swings(&flat, &flat, 0, 0, 1);
        let kinds: Vec<_> = swings.iter().map(|s| (s.position, s.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (0, SwingKind::LocalHigh),
                (0, SwingKind::LocalLow),
                (1, SwingKind::LocalHigh),
                (1, SwingKind::LocalLow),
                (2, SwingKind::LocalHigh),
                (2, SwingKind::LocalLow),
            ]
        );
    }

    #[test]
    fn monotonic_decline_has_single_boundary_extrema() {
        let values: Vec<f64> = (0..8).map(|i| 10.0 - i as f64).collect();
        let swings = detect_swings(&values, &values, 0, 0, 2);
        assert_eq!(swings.len(), 2);
        assert_eq!((swings[0].position, swings[0].kind), (0, SwingKind::LocalHigh));
        assert_eq!((swings[1].position, swings[1].kind), (7, SwingKind::LocalLow));
        assert_eq!(swings[1].to_string(), "LOW@7 3.00");
    }
}
