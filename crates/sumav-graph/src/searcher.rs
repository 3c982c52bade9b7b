//! Graph Searcher: representative-token selection, token-relation
//! queries, per-sample graph extraction, and bulk scoring.

use std::collections::HashMap;

use sumav_core::{Relation, TokenNode};

use crate::error::GraphError;
use crate::store::{DetectionStore, GraphStore};
use crate::tokenizer::make_unique_tokens;

/// Loaded, read-only snapshot of the token graph, the Searcher's hot path.
pub struct Searcher<'a> {
    detections: &'a dyn DetectionStore,
    graph: &'a dyn GraphStore,
    nodes: HashMap<String, TokenNode>,
    /// `alias[t]` is `t` itself when the token has no alias.
    alias: HashMap<String, String>,
    intersection_ratio: f64,
}

/// Options for [`Searcher::representative_token`], with the tool's defaults.
#[derive(Debug, Clone)]
pub struct RepresentativeTokenOptions {
    pub weight_param: f64,
    pub general_param: f64,
    pub use_alias: bool,
    pub return_none_less_than: u64,
}

impl Default for RepresentativeTokenOptions {
    fn default() -> Self {
        Self {
            weight_param: 4.1,
            general_param: 225.0,
            use_alias: false,
            return_none_less_than: 0,
        }
    }
}

/// One candidate entry, with its computed `score`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredToken {
    pub token: String,
    pub score: f64,
}

/// Result of [`Searcher::compare_tokens`].
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub p_a_given_b: f64,
    pub p_b_given_a: f64,
    pub intersection_row_count: u64,
    pub relation: Relation,
}

/// Result of [`Searcher::get_related_tokens`].
#[derive(Debug, Clone, Default)]
pub struct RelatedTokens {
    pub supersets: Vec<String>,
    pub subsets: Vec<String>,
    pub equalsets: Vec<String>,
    pub relations: HashMap<String, Comparison>,
}

/// One row of [`Searcher::get_sumav_results`].
#[derive(Debug, Clone)]
pub struct SumavResult {
    pub hash: String,
    pub ground_truth: Option<String>,
    pub sumav_label: Option<String>,
}

impl<'a> Searcher<'a> {
    /// Load all nodes from the Graph Store into memory; fails if no nodes
    /// are present.
    pub fn load(
        detections: &'a dyn DetectionStore,
        graph: &'a dyn GraphStore,
        intersection_ratio: f64,
    ) -> Result<Self, GraphError> {
        let loaded = graph.load_all_nodes()?;
        if loaded.is_empty() {
            return Err(GraphError::GraphNotLoaded);
        }

        let mut nodes = HashMap::with_capacity(loaded.len());
        let mut alias = HashMap::with_capacity(loaded.len());
        for node in loaded {
            alias.insert(node.token.clone(), node.alias.clone().unwrap_or_else(|| node.token.clone()));
            nodes.insert(node.token.clone(), node);
        }

        Ok(Self {
            detections,
            graph,
            nodes,
            alias,
            intersection_ratio,
        })
    }

    /// Single best token.
    pub fn representative_token(
        &self,
        tokens: &[String],
        opts: &RepresentativeTokenOptions,
    ) -> Option<ScoredToken> {
        self.representative_tokens_top_n(tokens, None, opts).into_iter().next()
    }

    /// Ranked top-N candidates, insertion-order tie-break.
    pub fn representative_tokens_top_n(
        &self,
        tokens: &[String],
        top_n: Option<usize>,
        opts: &RepresentativeTokenOptions,
    ) -> Vec<ScoredToken> {
        let remapped: Vec<String> = if opts.use_alias {
            tokens
                .iter()
                .map(|t| self.alias.get(t).cloned().unwrap_or_else(|| t.clone()))
                .collect()
        } else {
            tokens.to_vec()
        };

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for t in &remapped {
            if !counts.contains_key(t) {
                order.push(t.clone());
            }
            *counts.entry(t.clone()).or_insert(0) += 1;
        }

        let num_nodes = self.nodes.len().max(1) as f64;

        let mut candidates: Vec<ScoredToken> = Vec::new();
        for t in &order {
            let Some(node) = self.nodes.get(t) else {
                continue;
            };
            let c = counts[t] as f64;
            let w = if opts.weight_param > 1.0 {
                c.log(opts.weight_param)
            } else {
                0.0
            };
            let i = node.token_count as f64 / node.row_count.max(1) as f64;
            let g = node.num_subsets as f64 / num_nodes * opts.general_param;
            candidates.push(ScoredToken {
                token: t.clone(),
                score: w + i - g,
            });
        }

        if candidates.is_empty() {
            return Vec::new();
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let ia = order.iter().position(|t| t == &a.token).unwrap_or(usize::MAX);
                    let ib = order.iter().position(|t| t == &b.token).unwrap_or(usize::MAX);
                    ia.cmp(&ib)
                })
        });

        if let Some(best) = candidates.first() {
            let multiplicity = counts.get(&best.token).copied().unwrap_or(0);
            if multiplicity <= opts.return_none_less_than {
                return Vec::new();
            }
        }

        match top_n {
            None => candidates.into_iter().take(1).collect(),
            Some(n) => candidates.into_iter().take(n).collect(),
        }
    }

    /// `a ⊂ b` when `p(b|a)` is high and `p(a|b)` is not; `a ⊃ b` mirrors it.
    /// Swapping the call order swaps `pb_given_a`/`pa_given_b` and flips
    /// Subset/Superset, leaving Equal/Disjoint/Partial unchanged. This is
    /// what makes `compare_tokens(a,b)` and `compare_tokens(b,a)` mirror
    /// each other exactly.
    fn relation_for(&self, pa_given_b: f64, pb_given_a: f64) -> Relation {
        let tau = self.intersection_ratio;
        let lo = 1.0 - tau;
        if pb_given_a > tau {
            if pa_given_b > tau {
                Relation::Equal
            } else {
                Relation::Subset
            }
        } else if pb_given_a < lo {
            if pa_given_b < lo {
                Relation::Disjoint
            } else if pa_given_b > tau {
                Relation::Superset
            } else {
                Relation::Partial
            }
        } else if pa_given_b > tau {
            Relation::Superset
        } else {
            Relation::Partial
        }
    }

    /// Compare two tokens' edge statistics.
    pub fn compare_tokens(&self, a: &str, b: &str) -> Result<Option<Comparison>, GraphError> {
        let Some(edge) = self.graph.get_edge(a, b)? else {
            return Ok(None);
        };
        let (lo, _hi) = sumav_core::TokenEdge::canonical_pair(a, b);
        let (pa_given_b, pb_given_a) = if lo == a {
            (edge.p_a_given_b, edge.p_b_given_a)
        } else {
            (edge.p_b_given_a, edge.p_a_given_b)
        };
        Ok(Some(Comparison {
            p_a_given_b: pa_given_b,
            p_b_given_a: pb_given_a,
            intersection_row_count: edge.intersection_row_count,
            relation: self.relation_for(pa_given_b, pb_given_a),
        }))
    }

    /// Related-token lists for `t`.
    pub fn get_related_tokens(&self, t: &str) -> Result<RelatedTokens, GraphError> {
        let mut out = RelatedTokens::default();
        let edges = self.graph.edges_touching(t)?;
        let t_count = self.nodes.get(t).map(|n| n.token_count).unwrap_or(0);

        for edge in edges {
            let other = if edge.token_a == t { &edge.token_b } else { &edge.token_a };
            let Some(cmp) = self.compare_tokens(t, other)? else {
                continue;
            };
            match cmp.relation {
                // `t ⊂ other`: other is the more general token.
                Relation::Subset => out.supersets.push(other.clone()),
                // `t ⊃ other`: other is the more specific token.
                Relation::Superset => out.subsets.push(other.clone()),
                Relation::Equal => {
                    let other_count = self.nodes.get(other).map(|n| n.token_count).unwrap_or(0);
                    if t_count > other_count {
                        out.equalsets.push(other.clone());
                    }
                }
                Relation::Disjoint | Relation::Partial => {}
            }
            out.relations.insert(format!("{t}_{other}"), cmp);
        }
        Ok(out)
    }

    /// Adjacency map of a sample's distinct tokens, superset to subset.
    pub fn sample_graph(&self, hash: &str) -> Result<HashMap<String, Vec<String>>, GraphError> {
        let detection = self
            .detections
            .get_by_hash(hash)?
            .ok_or_else(|| GraphError::HashNotFound(hash.to_string()))?;

        let verdict_strs: Vec<Option<&str>> = detection.verdicts.values().map(|v| v.as_deref()).collect();
        let mut tokens = detection
            .unique_tokens
            .clone()
            .unwrap_or_else(|| make_unique_tokens(&verdict_strs));
        tokens.sort();

        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for i in 0..tokens.len() {
            for j in 0..tokens.len() {
                if i == j {
                    continue;
                }
                let Some(cmp) = self.compare_tokens(&tokens[i], &tokens[j])? else {
                    continue;
                };
                match cmp.relation {
                    Relation::Superset => {
                        adjacency.entry(tokens[i].clone()).or_default().push(tokens[j].clone());
                    }
                    Relation::Equal => {
                        adjacency.entry(tokens[i].clone()).or_default().push(tokens[j].clone());
                        adjacency.entry(tokens[j].clone()).or_default().push(tokens[i].clone());
                    }
                    _ => {}
                }
            }
        }
        Ok(adjacency)
    }

    /// Lazily score a batch of `(hash, ground_truth)` rows.
    pub fn get_sumav_results(
        &self,
        rows: &[(String, Option<String>)],
        opts: &RepresentativeTokenOptions,
    ) -> Vec<SumavResult> {
        rows.iter()
            .map(|(hash, ground_truth)| {
                let tokens = self
                    .detections
                    .get_by_hash(hash)
                    .ok()
                    .flatten()
                    .and_then(|d| d.tokens)
                    .unwrap_or_default();
                let label = self.representative_token(&tokens, opts).map(|s| s.token);
                SumavResult {
                    hash: hash.clone(),
                    ground_truth: ground_truth.clone(),
                    sumav_label: label,
                }
            })
            .collect()
    }

    /// Bulk-persist `predicted_label` in commit batches.
    pub fn update_sumav_results(&self, results: &[SumavResult], commit_batch: usize) -> Result<(), GraphError> {
        let pairs: Vec<(String, String)> = results
            .iter()
            .filter_map(|r| r.sumav_label.clone().map(|label| (r.hash.clone(), label)))
            .collect();
        for chunk in pairs.chunks(commit_batch.max(1)) {
            self.detections.update_predicted_labels(chunk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representative_token_ignores_out_of_graph_candidates() {
        let mut nodes = HashMap::new();
        nodes.insert(
            "virlock".to_string(),
            TokenNode {
                id: 0,
                token: "virlock".to_string(),
                alias: None,
                parents: vec![],
                token_count: 100,
                row_count: 50,
                token_ratio: 0.5,
                num_subsets: 0,
            },
        );
        let searcher = Searcher {
            detections: &NoopDetections,
            graph: &NoopGraph,
            alias: nodes.keys().map(|k| (k.clone(), k.clone())).collect(),
            nodes,
            intersection_ratio: 0.9,
        };

        let opts = RepresentativeTokenOptions::default();
        let result = searcher.representative_token(
            &["not_in_graph".to_string(), "virlock".to_string()],
            &opts,
        );
        assert_eq!(result.unwrap().token, "virlock");
    }

    #[test]
    fn representative_token_is_permutation_invariant() {
        let mut nodes = HashMap::new();
        for (tok, count, rows) in [("win32", 200, 180), ("ransom", 50, 45), ("virlock", 120, 60)] {
            nodes.insert(
                tok.to_string(),
                TokenNode {
                    id: 0,
                    token: tok.to_string(),
                    alias: None,
                    parents: vec![],
                    token_count: count,
                    row_count: rows,
                    token_ratio: 0.0,
                    num_subsets: 0,
                },
            );
        }
        let searcher = Searcher {
            detections: &NoopDetections,
            graph: &NoopGraph,
            alias: nodes.keys().map(|k| (k.clone(), k.clone())).collect(),
            nodes,
            intersection_ratio: 0.9,
        };

        let opts = RepresentativeTokenOptions::default();
        let a = vec!["win32".to_string(), "ransom".to_string(), "virlock".to_string()];
        let mut b = a.clone();
        b.reverse();

        assert_eq!(
            searcher.representative_token(&a, &opts),
            searcher.representative_token(&b, &opts)
        );
    }

    struct NoopDetections;
    impl DetectionStore for NoopDetections {
        fn count(&self) -> Result<u64, GraphError> {
            Ok(0)
        }
        fn iter_batch(&self, _after: sumav_core::DetectionId, _limit: u64) -> Result<Vec<sumav_core::Detection>, GraphError> {
            Ok(vec![])
        }
        fn get_by_hash(&self, _hash: &str) -> Result<Option<sumav_core::Detection>, GraphError> {
            Ok(None)
        }
        fn update_predicted_labels(&self, _rows: &[(String, String)]) -> Result<(), GraphError> {
            Ok(())
        }
    }

    struct NoopGraph;
    impl GraphStore for NoopGraph {
        fn truncate(&self) -> Result<(), GraphError> {
            Ok(())
        }
        fn put_nodes(&self, _nodes: &[TokenNode]) -> Result<(), GraphError> {
            Ok(())
        }
        fn put_edges(&self, _edges: &[sumav_core::TokenEdge]) -> Result<(), GraphError> {
            Ok(())
        }
        fn load_all_nodes(&self) -> Result<Vec<TokenNode>, GraphError> {
            Ok(vec![])
        }
        fn get_edge(&self, _a: &str, _b: &str) -> Result<Option<sumav_core::TokenEdge>, GraphError> {
            Ok(None)
        }
        fn edges_touching(&self, _t: &str) -> Result<Vec<sumav_core::TokenEdge>, GraphError> {
            Ok(vec![])
        }
    }
}
