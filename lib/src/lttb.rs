use crate::Point;

/// Largest Triangle Three Buckets (LTTB) downsampling algorithm.
///
/// Reduces a slice of points sorted by x to `threshold` points while
/// preserving the visual shape of the data. The first and last points are
/// always kept; every other output point is taken verbatim from one interior
/// bucket, picking the candidate that spans the largest triangle with the
/// previously selected point and the centroid of the following bucket.
///
/// Returns a copy of the input if `threshold >= data.len()` or `threshold < 3`.
/// The input is not sorted; unsorted data yields a deterministic but
/// meaningless selection.
pub fn downsample<P: Point + Clone>(data: &[P], threshold: usize) -> Vec<P> {
    let n = data.len();
    if threshold >= n || threshold < 3 {
        return data.to_vec();
    }

    let buckets = threshold - 2;
    let width = (n - 2) as f64 / buckets as f64;

    let mut sampled = Vec::with_capacity(threshold);
    sampled.push(data[0].clone());

    let mut a_idx = 0usize;

    for i in 0..buckets {
        let (start, end) = bucket_bounds(i, width, buckets, n);

        // The final interior bucket looks ahead to the last anchor alone.
        let (next_start, next_end) = if i + 1 < buckets {
            bucket_bounds(i + 1, width, buckets, n)
        } else {
            (n - 1, n)
        };
        let (cx, cy) = centroid(data, next_start, next_end);

        let (ax, ay) = (data[a_idx].x(), data[a_idx].y());
        let mut max_area = -1.0f64;
        let mut max_idx = start;

        for j in start..end {
            let (bx, by) = (data[j].x(), data[j].y());
            let area = 0.5 * ((ax - cx) * (by - ay) - (ax - bx) * (cy - ay)).abs();
            if area > max_area {
                max_area = area;
                max_idx = j;
            }
        }

        sampled.push(data[max_idx].clone());
        a_idx = max_idx;
    }

    sampled.push(data[n - 1].clone());
    sampled
}

/// Half-open index range of interior bucket `i`. Buckets tile `1..n-1`.
fn bucket_bounds(i: usize, width: f64, buckets: usize, n: usize) -> (usize, usize) {
    let start = (1.0 + i as f64 * width).floor() as usize;
    let end = if i + 1 == buckets {
        n - 1
    } else {
        ((1.0 + (i + 1) as f64 * width).floor() as usize).min(n - 1)
    };
    (start, end)
}

fn centroid<P: Point>(data: &[P], start: usize, end: usize) -> (f64, f64) {
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    for j in start..end {
        sum_x += data[j].x();
        sum_y += data[j].y();
    }
    let len = (end - start) as f64;
    (sum_x / len, sum_y / len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sample;
    use proptest::prelude::*;

    fn samples(pairs: &[(i64, f64)]) -> Vec<Sample> {
        pairs.iter().copied().map(Sample::from).collect()
    }

    #[test]
    fn peak_survives_single_bucket() {
        let data = samples(&[
            (1, 2.0),
            (2, 2.0),
            (3, 3.0),
            (4, 3.0),
            (5, 6.0),
            (6, 3.0),
            (7, 3.0),
            (8, 5.0),
            (9, 4.0),
            (10, 4.0),
            (11, 1.0),
            (12, 2.0),
        ]);
        let expected = samples(&[(1, 2.0), (5, 6.0), (12, 2.0)]);
        assert_eq!(downsample(&data, 3), expected);
    }

    #[test]
    fn empty_series() {
        let data: Vec<Sample> = Vec::new();
        assert!(downsample(&data, 0).is_empty());
        assert!(downsample(&data, 3).is_empty());
        assert!(downsample(&data, 500).is_empty());
    }

    #[test]
    fn threshold_ge_n_returns_input() {
        let data: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, i as f64)).collect();
        assert_eq!(downsample(&data, 5), data);
        assert_eq!(downsample(&data, 10), data);
    }

    #[test]
    fn threshold_lt_3_returns_input() {
        let data: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, i as f64)).collect();
        assert_eq!(downsample(&data, 2), data);
        assert_eq!(downsample(&data, 1), data);
        assert_eq!(downsample(&data, 0), data);
    }

    #[test]
    fn single_point() {
        let data = vec![(1.0, 1.0)];
        assert_eq!(downsample(&data, 5), data);
    }

    #[test]
    fn two_points() {
        let data = vec![(0.0, 0.0), (1.0, 1.0)];
        assert_eq!(downsample(&data, 5), data);
    }

    #[test]
    fn known_downsampling() {
        let data = vec![
            (0.0, 0.0),
            (1.0, 10.0),
            (2.0, 2.0),
            (3.0, 8.0),
            (4.0, 4.0),
            (5.0, 6.0),
            (6.0, 1.0),
            (7.0, 9.0),
            (8.0, 3.0),
            (9.0, 7.0),
        ];
        // Buckets are [1,3), [3,6) and [6,9).
        let result = downsample(&data, 5);
        assert_eq!(
            result,
            vec![(0.0, 0.0), (1.0, 10.0), (4.0, 4.0), (6.0, 1.0), (9.0, 7.0)]
        );
    }

    #[test]
    fn first_candidate_wins_ties() {
        // Every candidate is the same distance from the anchor-to-last line.
        let data = vec![(0i64, 0i64), (1, 1), (2, 1), (3, 1), (4, 0)];
        assert_eq!(downsample(&data, 3), vec![(0, 0), (1, 1), (4, 0)]);
    }

    #[test]
    fn centroid_of_following_bucket_drives_selection() {
        // Buckets [1,4) and [4,7). Against the second bucket's centroid (5, 10)
        // the trough at x=3 wins; the first bucket's own centroid (2, 0) would
        // have picked x=1.
        let data = vec![
            (0.0, 0.0),
            (1.0, 3.0),
            (2.0, 0.0),
            (3.0, -3.0),
            (4.0, 10.0),
            (5.0, 10.0),
            (6.0, 10.0),
            (7.0, 10.0),
        ];
        assert_eq!(
            downsample(&data, 4),
            vec![(0.0, 0.0), (3.0, -3.0), (4.0, 10.0), (7.0, 10.0)]
        );
    }

    #[test]
    fn last_bucket_reaches_final_anchor() {
        let data: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 0.0)).collect();
        let mut spiked = data.clone();
        spiked[8] = (8.0, 100.0);
        let result = downsample(&spiked, 4);
        assert_eq!(result.len(), 4);
        assert!(result.contains(&(8.0, 100.0)));
    }

    #[test]
    fn integer_timestamps_far_from_zero() {
        let base = 1_700_000_000_000i64;
        let data: Vec<Sample> = (0..100)
            .map(|i| Sample::new(base + i * 15_000, if i == 42 { 9.0 } else { 1.0 }))
            .collect();
        let result = downsample(&data, 3);
        assert_eq!(result[1], Sample::new(base + 42 * 15_000, 9.0));
    }

    #[test]
    fn nan_values_do_not_panic() {
        let data: Vec<(f64, f64)> = (0..20)
            .map(|i| (i as f64, if i % 3 == 0 { f64::NAN } else { i as f64 }))
            .collect();
        let result = downsample(&data, 6);
        assert_eq!(result.len(), 6);
        assert_eq!(result[0].0, 0.0);
        assert_eq!(result[5].0, 19.0);
    }

    #[test]
    fn borrowed_points() {
        let data: Vec<(f64, f64)> = (0..50).map(|i| (i as f64, (i % 7) as f64)).collect();
        let refs: Vec<&(f64, f64)> = data.iter().collect();
        let by_ref: Vec<(f64, f64)> = downsample(&refs, 10).into_iter().copied().collect();
        assert_eq!(by_ref, downsample(&data, 10));
    }

    #[test]
    fn concurrent_calls_agree() {
        let data: Vec<(f64, f64)> = (0..1000)
            .map(|i| (i as f64, (i as f64 / 10.0).sin()))
            .collect();
        let expected = downsample(&data, 100);
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| downsample(&data, 100))).collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }

    fn series() -> impl Strategy<Value = Vec<(i64, f64)>> {
        prop::collection::vec((1i64..1_000, -1e6f64..1e6), 0..400).prop_map(|steps| {
            let mut t = 0i64;
            steps
                .into_iter()
                .map(|(dt, v)| {
                    t += dt;
                    (t, v)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn short_series_pass_through(data in series(), extra in 0usize..10) {
            let threshold = data.len() + extra;
            prop_assert_eq!(downsample(&data, threshold), data);
        }

        #[test]
        fn reduces_to_exact_threshold(data in series(), threshold in 3usize..200) {
            prop_assume!(data.len() > threshold);
            let result = downsample(&data, threshold);
            prop_assert_eq!(result.len(), threshold);
            prop_assert_eq!(result[0], data[0]);
            prop_assert_eq!(result[threshold - 1], data[data.len() - 1]);
        }

        #[test]
        fn output_is_an_ordered_subsequence(data in series(), threshold in 0usize..200) {
            let result = downsample(&data, threshold);
            let mut rest = data.iter();
            for p in &result {
                prop_assert!(rest.any(|q| q == p), "{:?} not drawn from input in order", p);
            }
            for w in result.windows(2) {
                prop_assert!(w[0].0 < w[1].0);
            }
        }
    }
}
