fn fold(value: &str) -> Vec<char> {
    value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }
    row[b.len()]
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn distance(input: &[char], candidate: &[char]) -> Option<usize> {
    if input.is_empty() || candidate.is_empty() {
        return None;
    }
    if input == candidate {
        return Some(0);
    }
    if contains(input, candidate) || contains(candidate, input) {
        return Some(1);
    }
    Some(edit_distance(input, candidate))
}

fn tolerance(len: usize) -> usize {
    match len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        _ => (len * 35 / 100).max(3),
    }
}

/// Closest candidates to `input`, best first, at most `limit` of them.
///
/// Matching ignores case and punctuation, so `getPsaClients` finds
/// `get_psa_clients`.
pub fn suggest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let folded = fold(input);
    let allowed = tolerance(folded.len());
    if allowed == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, &String)> = candidates
        .iter()
        .filter_map(|candidate| {
            let score = distance(&folded, &fold(candidate))?;
            (score <= allowed).then_some((score, candidate))
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(b.1))
    });
    ranked.dedup_by(|a, b| a.1 == b.1);
    ranked
        .into_iter()
        .take(limit.max(1))
        .map(|(_, name)| name.clone())
        .collect()
}
