use bar_analytics::window::{
    Comparison, count_prior_by, local_maxima, local_minima, normalize_range, rolling_mean,
    rolling_standardize,
};
use proptest::prelude::*;

fn comparison() -> impl Strategy<Value = Comparison> {
    prop_oneof![
        Just(Comparison::Greater),
        Just(Comparison::GreaterEq),
        Just(Comparison::Less),
        Just(Comparison::LessEq),
    ]
}

fn naive_count_prior(values: &[f64], cmp: Comparison) -> Vec<u32> {
    (0..values.len())
        .map(|i| {
            let mut k = i;
            while k > 0 && cmp.holds(values[i], values[k - 1]) {
                k -= 1;
            }
            (i - k) as u32
        })
        .collect()
}

#[test]
fn count_prior_reference_vectors() {
    let values = [1.0, 3.0, 5.0, 4.0, 2.0, 3.0, 1.0, 6.0, 7.0, 1.0];
    assert_eq!(
        count_prior_by(&values, 0, 0, Comparison::Greater),
        vec![0, 1, 2, 0, 0, 1, 0, 7, 8, 0]
    );
    assert_eq!(
        count_prior_by(&values, 0, 0, Comparison::Less),
        vec![0, 0, 0, 1, 3, 0, 5, 0, 0, 2]
    );
}

#[test]
fn sub_range_results_are_relative_to_resolved_start() {
    let values = [9.0, 1.0, 2.0, 3.0, 0.0];
    // start=2 resolves to row 1, end=-1 to row 4 (exclusive)
    assert_eq!(normalize_range(values.len(), 2, -1), Some(1..4));
    assert_eq!(count_prior_by(&values, 2, -1, Comparison::Greater), vec![0, 1, 2]);
    assert_eq!(local_maxima(&values, 2, -1, 1), vec![3]);
}

proptest! {
    #[test]
    fn strictly_decreasing_has_boundary_extrema(
        len in 2usize..60,
        window in 1usize..10,
        step in 0.01f64..5.0,
    ) {
        let values: Vec<f64> = (0..len).map(|i| 100.0 - i as f64 * step).collect();
        prop_assert_eq!(local_maxima(&values, 0, 0, window), vec![0]);
        prop_assert_eq!(local_minima(&values, 0, 0, window), vec![len - 1]);
    }

    #[test]
    fn plateau_yields_every_tied_index(m in 1usize..10, window in 1usize..6) {
        let mut values = vec![0.0];
        values.extend(std::iter::repeat_n(5.0, m));
        values.push(0.0);
        let expected: Vec<usize> = (1..=m).collect();
        prop_assert_eq!(local_maxima(&values, 0, 0, window), expected);
    }

    #[test]
    fn constant_series_mean_is_constant_and_zscore_zero(
        c in -1.0e4f64..1.0e4,
        len in 1usize..80,
        window in 1usize..20,
    ) {
        prop_assume!(window <= len);
        let values = vec![c; len];
        let means = rolling_mean(&values, 0, 0, window);
        prop_assert_eq!(means.len(), len);
        for (j, m) in means.iter().enumerate() {
            if j + 1 < window {
                prop_assert_eq!(*m, 0.0);
            } else {
                prop_assert!((m - c).abs() <= 1e-9 * c.abs().max(1.0));
            }
        }
        prop_assert!(rolling_standardize(&values, 0, 0, window).iter().all(|z| *z == 0.0));
    }

    #[test]
    fn count_prior_matches_backward_walk(
        ints in proptest::collection::vec(0i32..6, 0..120),
        cmp in comparison(),
    ) {
        let values: Vec<f64> = ints.into_iter().map(f64::from).collect();
        prop_assert_eq!(count_prior_by(&values, 0, 0, cmp), naive_count_prior(&values, cmp));
    }

    #[test]
    fn outputs_cover_the_resolved_range(
        len in 0usize..50,
        start in -60isize..60,
        end in -60isize..60,
    ) {
        let values: Vec<f64> = (0..len).map(|i| (i % 7) as f64).collect();
        let expected = normalize_range(len, start, end).map_or(0, |r| r.len());
        prop_assert_eq!(rolling_mean(&values, start, end, 3).len(), expected);
        prop_assert_eq!(rolling_standardize(&values, start, end, 3).len(), expected);
        prop_assert_eq!(count_prior_by(&values, start, end, Comparison::Greater).len(), expected);
    }
}
