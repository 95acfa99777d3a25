/// Indices of local maxima of `data` that are at least `distance` samples
/// apart.
///
/// A local maximum is a sample (or the middle of a flat plateau) whose
/// neighbours on both sides are strictly lower; the first and last samples
/// never qualify. When two maxima are closer than `distance`, the higher
/// one is kept. The result is sorted by index.
pub fn find_peaks(data: &[f64], distance: usize) -> Vec<usize> {
    let peaks = local_maxima(data);
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut keep = vec![true; peaks.len()];

    // Visit peaks from highest to lowest; on equal height the later peak
    // goes first.
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| data[peaks[a]].total_cmp(&data[peaks[b]]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(p))
        .collect()
}

fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if data.len() < 3 {
        return peaks;
    }
    let last = data.len() - 1;

    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_maxima() {
        let data = [0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 3.0, 3.0, 0.0, 5.0];
        // index 9 is the edge, plateau 5..=7 -> 6
        assert_eq!(find_peaks(&data, 1), vec![1, 3, 6]);
    }

    #[test]
    fn plateau_touching_edge_is_not_a_peak() {
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 1.0], 1), Vec::<usize>::new());
        assert_eq!(find_peaks(&[2.0, 1.0, 2.0], 1), Vec::<usize>::new());
    }

    #[test]
    fn distance_keeps_the_higher_peak() {
        let data = [0.0, 1.0, 0.0, 3.0, 0.0, 2.0, 0.0, 0.0, 0.0, 4.0, 0.0];
        assert_eq!(find_peaks(&data, 3), vec![3, 9]);
        assert_eq!(find_peaks(&data, 2), vec![1, 3, 5, 9]);
        assert_eq!(find_peaks(&data, 7), vec![1, 9]);
    }

    #[test]
    fn one_peak_per_period() {
        let period = 50;
        let data: Vec<f64> = (0..500)
            .map(|i| {
                let phase = (i % period) as f64 / period as f64;
                (2.0 * std::f64::consts::PI * phase).sin() + 0.1 * ((i * 7 % 5) as f64)
            })
            .collect();
        let peaks = find_peaks(&data, period);
        assert_eq!(peaks.len(), 10);
        for w in peaks.windows(2) {
            assert!(w[1] - w[0] >= period);
        }
    }

    #[test]
    fn flat_signal_has_no_peaks() {
        assert!(find_peaks(&[0.0; 100], 10).is_empty());
        assert!(find_peaks(&[], 10).is_empty());
    }
}
