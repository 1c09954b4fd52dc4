/// Select the `k` highest scores from `(index, score)` pairs.
///
/// Ordering is score descending, then index ascending, so equal scores keep
/// their mapping order. Non-finite scores are dropped.
pub fn top_k<I>(scored: I, k: usize) -> Vec<(usize, f64)>
where
    I: IntoIterator<Item = (usize, f64)>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut items: Vec<(usize, f64)> = scored
        .into_iter()
        .filter(|(_, score)| score.is_finite())
        .collect();

    items.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.truncate(k);
    items
}
