//! Alias-graph union-find and the string-similarity ratio
//! used to decide between a parent/child and an alias relation.

use std::collections::HashMap;

/// Union-find over token strings with path compression, used to resolve
/// chains of "these two tokens are aliases of each other" into a single
/// representative per equivalence class. The winner of each union is the
/// token with the larger `token_count`, passed in by the caller at union
/// time rather than stored here.
pub struct AliasGraph {
    parent: HashMap<String, String>,
}

impl AliasGraph {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        let parent = tokens.into_iter().map(|t| (t.clone(), t)).collect();
        Self { parent }
    }

    /// Resolve `token` to its current root, compressing the path as it goes.
    pub fn find(&mut self, token: &str) -> String {
        let mut path = Vec::new();
        let mut current = token.to_string();
        while let Some(next) = self.parent.get(&current) {
            if next == &current {
                break;
            }
            path.push(current.clone());
            current = next.clone();
        }
        for node in path {
            self.parent.insert(node, current.clone());
        }
        current
    }

    /// Union the equivalence classes of `a` and `b`. The root with the
    /// larger `token_count(root)` wins; ties favor `a`'s root (deterministic
    /// `>=` comparison\).
    pub fn union_by_count(&mut self, a: &str, b: &str, token_count: impl Fn(&str) -> u64) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        if token_count(&ra) >= token_count(&rb) {
            self.parent.insert(rb, ra);
        } else {
            self.parent.insert(ra, rb);
        }
    }
}

/// Longest-common-subsequence-based approximation of Python's
/// `difflib.SequenceMatcher.ratio`: `2*M/(len(a)+len(b))` where `M` is the
/// number of matched characters.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = longest_common_subsequence_len(a.as_bytes(), b.as_bytes());
    (2 * matched) as f64 / total as f64
}

fn longest_common_subsequence_len(a: &[u8], b: &[u8]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_ratio_one() {
        assert!((sequence_ratio("virlock", "virlock") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_strings_have_low_ratio() {
        assert!(sequence_ratio("abcd", "wxyz") < 0.1);
    }

    #[test]
    fn union_picks_the_larger_count_as_root() {
        let mut graph = AliasGraph::new(["a".to_string(), "b".to_string(), "c".to_string()]);
        let counts: HashMap<&str, u64> = [("a", 5), ("b", 10), ("c", 1)].into_iter().collect();
        graph.union_by_count("a", "b", |t| counts[t]);
        assert_eq!(graph.find("a"), "b");
        assert_eq!(graph.find("b"), "b");

        graph.union_by_count("c", "b", |t| counts[t]);
        assert_eq!(graph.find("c"), "b");
    }

    #[test]
    fn union_is_a_noop_when_already_in_the_same_class() {
        let mut graph = AliasGraph::new(["x".to_string(), "y".to_string()]);
        let counts: HashMap<&str, u64> = [("x", 1), ("y", 2)].into_iter().collect();
        graph.union_by_count("x", "y", |t| counts[t]);
        let root_before = graph.find("x");
        graph.union_by_count("x", "y", |t| counts[t]);
        assert_eq!(graph.find("x"), root_before);
    }
}
