//! Small numeric helpers shared by the learner and the driver.

/// Index of the first maximal element, or `None` for an empty slice.
///
/// NaN entries never win.
pub fn argmax_first(xs: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in xs.iter().enumerate() {
        if x.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if x <= b => {}
            _ => best = Some((i, x)),
        }
    }
    best.map(|(i, _)| i)
}

/// Most frequent value; on a tie, the value encountered first wins.
pub fn plurality_first(xs: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for &x in xs {
        let count = xs.iter().filter(|&&y| y == x).count();
        match best {
            Some((_, c)) if count <= c => {}
            _ => best = Some((x, count)),
        }
    }
    best.map(|(x, _)| x)
}

/// Arithmetic mean (0 for an empty slice).
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (0 for an empty slice).
pub fn population_std(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    (xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64).sqrt()
}

/// Column-wise mean of equal-length rows.
///
/// # Panics
///
/// Panics if `rows` is empty; callers always hold at least one experiment.
pub fn column_means(rows: &[Vec<f64>]) -> Vec<f64> {
    assert!(!rows.is_empty(), "column_means: no rows to aggregate");
    let width = rows[0].len();
    let n = rows.len() as f64;
    (0..width)
        .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
        .collect()
}

/// Running sum.
pub fn cumulative_sum(xs: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut acc = 0.0;
    xs.into_iter()
        .map(|x| {
            acc += x;
            acc
        })
        .collect()
}
