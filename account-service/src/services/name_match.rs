//! Fuzzy comparison of a claimed account-holder name against the provider's.
//!
//! Providers format names inconsistently (a dropped middle initial, a stray
//! comma), so an exact match is not required. A claim matches when it is
//! byte-identical to the resolved name or within [`MAX_NAME_DISTANCE`] edits.

/// Largest Levenshtein distance still accepted as the same name.
pub const MAX_NAME_DISTANCE: usize = 2;

/// Decide whether `claimed` names the same holder as `resolved`.
///
/// Case-sensitive. Symmetric in its arguments.
pub fn matches(claimed: &str, resolved: &str) -> bool {
    if claimed == resolved {
        return true;
    }

    edit_distance(claimed, resolved) <= MAX_NAME_DISTANCE
}

/// Levenshtein distance counted in Unicode scalar values.
///
/// Minimum number of single-character insertions, deletions and
/// substitutions turning `a` into `b`.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows of the DP table; `prev[j]` is the distance between a[..i] and b[..j].
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
