// =============================================================================
// similarity.rs: THE LONGEST-COMMON-BLOCK RATIO
// =============================================================================
//
// This is the Ratcliff/Obershelp "gestalt pattern matching" ratio, computed
// exactly the way difflib's SequenceMatcher computes it:
//
//     ratio(a, b) = 2 * M / T
//
//     T = len(a) + len(b)            (in chars, not bytes)
//     M = sum of the sizes of the matching blocks
//
// Matching blocks come from recursion: find the longest common contiguous
// block of a and b, then do the same thing to the pieces left of it and the
// pieces right of it, until nothing matches.
//
// Ties on block length go to the block starting earliest in `a`, then
// earliest in `b`. That tie-break makes the ratio slightly asymmetric
// ("tide" vs "diet" is 0.25, "diet" vs "tide" is 0.5). The 0.59 matching
// threshold was tuned against this exact behavior, so it is NOT an edit
// distance and must not be swapped for one.
//
// When `b` has 200 or more chars, chars occurring in more than 1% of it
// (plus one) are "popular" and cannot seed a match, as in difflib's autojunk.
// =============================================================================

use std::collections::HashMap;

/// Second sequences shorter than this never have popular elements.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Similarity ratio of `a` against `b`, in `[0, 1]`.
///
/// Two empty strings are identical (1.0). One empty string against a
/// non-empty one shares nothing (0.0).
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = BlockMatcher::new(&a, &b).matched_chars();
    2.0 * matched as f64 / total as f64
}

/// Index of `b` plus the recursive block search over `a` and `b`.
struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// For every (non-popular) char of `b`, the ascending positions it occupies.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` x `b[blo..bhi]`, as
    /// `(i, j, size)`. Size 0 means nothing matches.
    fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);

        // j2len[j] = length of the longest match ending at a[i-1] and b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = if j == 0 {
                        0
                    } else {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    };
                    let k = prev + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular chars cannot seed a block, but they may extend one.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    /// Total size of all matching blocks (the `M` in `2M/T`).
    fn matched_chars(&self) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }
}
