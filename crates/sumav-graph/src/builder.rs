//! Four-stage token graph construction.
//!
//! Builds the persisted `token_node`/`token_edge` tables from the corpus of
//! [`Detection`] rows in a [`DetectionStore`]. Intermediate state lives
//! entirely in two in-memory maps, kept as `BTreeMap`s so folding order
//! (alias overwrites, surrogate id assignment) is reproducible across runs
//! of the same corpus; only the final stage touches the [`GraphStore`].

use std::collections::BTreeMap;
use std::time::Instant;

use sumav_core::{Detection, DetectionId, TokenEdge, TokenNode};

use crate::error::GraphError;
use crate::relation::{sequence_ratio, AliasGraph};
use crate::store::{DetectionStore, GraphStore};

const DETECTION_BATCH: u64 = 100_000;
const INSERT_BATCH: usize = 1_000;
/// Nodes whose `token_count` is below this fraction of the distinct node
/// count are pruned, alongside nodes appearing exactly once per row.
const RARITY_THRESHOLD: f64 = 1e-7;
/// `sequence_ratio` below this folds the pair into an alias rather than a
/// parent/child relation.
const ALIAS_SIMILARITY_THRESHOLD: f64 = 0.65;

#[derive(Debug, Clone)]
struct NodeAccum {
    id: u64,
    token_count: u64,
    row_count: u64,
    alias: Option<String>,
    parents: Vec<String>,
    token_ratio: f64,
    num_subsets: u64,
}

impl NodeAccum {
    fn new(id: u64) -> Self {
        Self {
            id,
            token_count: 0,
            row_count: 0,
            alias: None,
            parents: Vec::new(),
            token_ratio: 0.0,
            num_subsets: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct EdgeAccum {
    id: u64,
    intersection_row_count: u64,
    p_b_given_a: f64,
    p_a_given_b: f64,
}

/// Builds the token graph over a [`DetectionStore`]/[`GraphStore`] pair.
pub struct Builder<'a> {
    detections: &'a dyn DetectionStore,
    graph: &'a dyn GraphStore,
    intersection_ratio: f64,
}

/// Summary counters returned by a successful build, mirroring the source's
/// end-of-build log line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BuildReport {
    pub detections_scanned: u64,
    pub nodes_written: usize,
    pub edges_written: usize,
    pub nodes_pruned: usize,
}

impl<'a> Builder<'a> {
    pub fn new(detections: &'a dyn DetectionStore, graph: &'a dyn GraphStore, intersection_ratio: f64) -> Self {
        Self {
            detections,
            graph,
            intersection_ratio,
        }
    }

    /// Run all four stages. Returns successfully with a zeroed report if the
    /// detection store is empty.
    pub fn build_graph(&self) -> Result<BuildReport, GraphError> {
        let started = Instant::now();

        if self.detections.count()? == 0 {
            tracing::info!("no detections; build is a no-op");
            return Ok(BuildReport::default());
        }

        let mut nodes: BTreeMap<String, NodeAccum> = BTreeMap::new();
        let (scanned, max_id) = self.stage1_nodes(&mut nodes)?;
        let pruned = prune_nodes(&mut nodes);
        tracing::info!(
            elapsed = ?started.elapsed(),
            nodes = nodes.len(),
            pruned,
            "stage 1 (token node construction) complete"
        );

        let stage1b_start = Instant::now();
        let mut edges: BTreeMap<(String, String), EdgeAccum> = BTreeMap::new();
        self.stage1_edges(&nodes, max_id, &mut edges)?;
        tracing::info!(elapsed = ?stage1b_start.elapsed(), edges = edges.len(), "stage 1 (edge construction) complete");

        let stage2_start = Instant::now();
        self.stage2_probabilities(&nodes, &mut edges);
        tracing::info!(elapsed = ?stage2_start.elapsed(), "stage 2 (conditional probabilities) complete");

        let stage3_start = Instant::now();
        self.stage3_relations(&mut nodes, &edges);
        tracing::info!(elapsed = ?stage3_start.elapsed(), "stage 3 (relation extraction) complete");

        let stage4_start = Instant::now();
        let (nodes_written, edges_written) = self.stage4_persist(nodes, edges)?;
        tracing::info!(elapsed = ?stage4_start.elapsed(), nodes_written, edges_written, "stage 4 (persistence) complete");

        Ok(BuildReport {
            detections_scanned: scanned,
            nodes_written,
            edges_written,
            nodes_pruned: pruned,
        })
    }

    fn stage1_nodes(&self, nodes: &mut BTreeMap<String, NodeAccum>) -> Result<(u64, DetectionId), GraphError> {
        let mut after = DetectionId(0);
        let mut scanned = 0u64;
        let mut max_id = DetectionId(0);
        let mut next_id = 0u64;

        loop {
            let batch = self.detections.iter_batch(after, DETECTION_BATCH)?;
            if batch.is_empty() {
                break;
            }
            for det in &batch {
                scanned += 1;
                max_id = max_id.max(det.id);
                after = det.id;

                let Some(tokens) = det.tokens.as_ref() else {
                    continue;
                };
                let mut per_row_counts: BTreeMap<&str, u64> = BTreeMap::new();
                for t in tokens.iter().filter(|t| t.len() >= 4) {
                    *per_row_counts.entry(t.as_str()).or_insert(0) += 1;
                }
                for (token, count) in per_row_counts {
                    let entry = nodes
                        .entry(token.to_string())
                        .or_insert_with(|| {
                            let id = next_id;
                            next_id += 1;
                            NodeAccum::new(id)
                        });
                    entry.token_count += count;
                    entry.row_count += 1;
                }
            }
            if (batch.len() as u64) < DETECTION_BATCH {
                break;
            }
        }
        Ok((scanned, max_id))
    }

    fn stage1_edges(
        &self,
        nodes: &BTreeMap<String, NodeAccum>,
        max_id: DetectionId,
        edges: &mut BTreeMap<(String, String), EdgeAccum>,
    ) -> Result<(), GraphError> {
        let mut after = DetectionId(0);
        let mut next_edge_id = 0u64;

        loop {
            let batch = self.detections.iter_batch(after, DETECTION_BATCH)?;
            if batch.is_empty() {
                break;
            }
            for det in &batch {
                if det.id > max_id {
                    return Ok(());
                }
                after = det.id;

                let Some(unique_tokens) = det.unique_tokens.as_ref() else {
                    continue;
                };
                let surviving: Vec<&str> = unique_tokens
                    .iter()
                    .map(String::as_str)
                    .filter(|t| nodes.contains_key(*t))
                    .collect();

                for i in 0..surviving.len() {
                    for j in (i + 1)..surviving.len() {
                        let (a, b) = TokenEdge::canonical_pair(surviving[i], surviving[j]);
                        let key = (a.to_string(), b.to_string());
                        let entry = edges.entry(key).or_insert_with(|| {
                            let id = next_edge_id;
                            next_edge_id += 1;
                            EdgeAccum {
                                id,
                                intersection_row_count: 0,
                                p_b_given_a: 0.0,
                                p_a_given_b: 0.0,
                            }
                        });
                        entry.intersection_row_count += 1;
                    }
                }
            }
            if det_batch_exhausted(&batch, max_id) {
                break;
            }
        }
        Ok(())
    }

    fn stage2_probabilities(
        &self,
        nodes: &BTreeMap<String, NodeAccum>,
        edges: &mut BTreeMap<(String, String), EdgeAccum>,
    ) {
        edges.retain(|(a, b), edge| {
            let (Some(row_a), Some(row_b)) = (
                nodes.get(a).map(|n| n.row_count),
                nodes.get(b).map(|n| n.row_count),
            ) else {
                tracing::warn!(a, b, "edge references a pruned node; skipping");
                return false;
            };
            if row_a == 0 || row_b == 0 {
                tracing::warn!(a, b, "edge endpoint has zero row count; skipping");
                return false;
            }
            edge.p_b_given_a = edge.intersection_row_count as f64 / row_a as f64;
            edge.p_a_given_b = edge.intersection_row_count as f64 / row_b as f64;
            true
        });
    }

    fn stage3_relations(&self, nodes: &mut BTreeMap<String, NodeAccum>, edges: &BTreeMap<(String, String), EdgeAccum>) {
        let total_tokens: u64 = nodes.values().map(|n| n.token_count).sum();
        for node in nodes.values_mut() {
            node.token_ratio = if total_tokens > 0 {
                node.token_count as f64 / total_tokens as f64
            } else {
                0.0
            };
        }

        let mut alias_graph = AliasGraph::new(nodes.keys().cloned());
        let tau = self.intersection_ratio;

        for (a, b) in edges.keys() {
            let edge = &edges[&(a.clone(), b.clone())];
            let pb_given_a = edge.p_b_given_a;
            let pa_given_b = edge.p_a_given_b;

            if pb_given_a >= tau && pa_given_b >= tau {
                let token_count = |t: &str| nodes.get(t).map(|n| n.token_count).unwrap_or(0);
                alias_graph.union_by_count(a, b, token_count);
                continue;
            }

            if pa_given_b >= tau {
                bump_subset(nodes, a, b, ALIAS_SIMILARITY_THRESHOLD);
                continue;
            }

            if pb_given_a >= tau {
                bump_subset(nodes, b, a, ALIAS_SIMILARITY_THRESHOLD);
            }
        }

        for token in nodes.keys().cloned().collect::<Vec<_>>() {
            let root = alias_graph.find(&token);
            if root != token {
                nodes.get_mut(&token).unwrap().alias = Some(root);
            }
        }

        for node in nodes.values_mut() {
            node.parents.sort();
            node.parents.dedup();
        }
    }

    fn stage4_persist(
        &self,
        nodes: BTreeMap<String, NodeAccum>,
        edges: BTreeMap<(String, String), EdgeAccum>,
    ) -> Result<(usize, usize), GraphError> {
        self.graph.truncate()?;

        let node_records: Vec<TokenNode> = nodes
            .into_iter()
            .map(|(token, n)| TokenNode {
                id: n.id,
                token,
                alias: n.alias,
                parents: n.parents,
                token_count: n.token_count,
                row_count: n.row_count,
                token_ratio: n.token_ratio,
                num_subsets: n.num_subsets,
            })
            .collect();
        let nodes_written = node_records.len();
        for chunk in node_records.chunks(INSERT_BATCH) {
            self.graph.put_nodes(chunk)?;
        }

        let edge_records: Vec<TokenEdge> = edges
            .into_iter()
            .map(|((a, b), e)| TokenEdge {
                id: e.id,
                token_a: a,
                token_b: b,
                p_b_given_a: e.p_b_given_a,
                p_a_given_b: e.p_a_given_b,
                intersection_row_count: e.intersection_row_count,
            })
            .collect();
        let edges_written = edge_records.len();
        for chunk in edge_records.chunks(INSERT_BATCH) {
            self.graph.put_edges(chunk)?;
        }

        Ok((nodes_written, edges_written))
    }
}

fn det_batch_exhausted(batch: &[Detection], max_id: DetectionId) -> bool {
    batch.last().map(|d| d.id >= max_id).unwrap_or(true) || (batch.len() as u64) < DETECTION_BATCH
}

fn prune_nodes(nodes: &mut BTreeMap<String, NodeAccum>) -> usize {
    let total_nodes = nodes.len() as u64;
    if total_nodes == 0 {
        return 0;
    }
    let before = nodes.len();
    nodes.retain(|_, n| {
        let ratio = n.token_count as f64 / total_nodes as f64;
        ratio >= RARITY_THRESHOLD && n.token_count != n.row_count
    });
    before - nodes.len()
}

/// `superset` gains a subset; `subset` gets `superset` recorded as a parent
/// unless the two strings are similar enough to be treated as aliases.
fn bump_subset(nodes: &mut BTreeMap<String, NodeAccum>, superset: &str, subset: &str, threshold: f64) {
    if let Some(n) = nodes.get_mut(superset) {
        n.num_subsets += 1;
    }
    let ratio = sequence_ratio(superset, subset);
    if ratio < threshold {
        if let Some(n) = nodes.get_mut(subset) {
            n.parents.push(superset.to_string());
        }
    } else if let Some(n) = nodes.get_mut(subset) {
        if n.alias.as_deref() != Some(subset) {
            n.alias = Some(superset.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CozoStore;
    use sumav_core::{Md5Hash, Sha256Hash};

    fn detection(id: u64, tokens: &[&str]) -> Detection {
        let unique: Vec<String> = {
            let mut v: Vec<String> = tokens.iter().map(|s| s.to_string()).collect();
            v.sort();
            v.dedup();
            v
        };
        Detection {
            id: DetectionId(id),
            md5: Md5Hash([id as u8; 16]),
            sha256: Sha256Hash([id as u8; 32]),
            submission_date: chrono::Utc::now(),
            verdicts: Default::default(),
            tokens: Some(tokens.iter().map(|s| s.to_string()).collect()),
            unique_tokens: Some(unique),
            ground_truth: None,
            predicted_label: None,
        }
    }

    struct FixedDetections(Vec<Detection>);

    impl DetectionStore for FixedDetections {
        fn count(&self) -> Result<u64, GraphError> {
            Ok(self.0.len() as u64)
        }
        fn iter_batch(&self, after: DetectionId, limit: u64) -> Result<Vec<Detection>, GraphError> {
            Ok(self
                .0
                .iter()
                .filter(|d| d.id > after)
                .take(limit as usize)
                .cloned()
                .collect())
        }
        fn get_by_hash(&self, hash: &str) -> Result<Option<Detection>, GraphError> {
            Ok(self
                .0
                .iter()
                .find(|d| d.md5.to_string() == hash || d.sha256.to_string() == hash)
                .cloned())
        }
        fn update_predicted_labels(&self, _rows: &[(String, String)]) -> Result<(), GraphError> {
            Ok(())
        }
    }

    #[test]
    fn empty_corpus_build_is_a_noop() {
        let dets = FixedDetections(vec![]);
        let graph = CozoStore::open_in_memory().unwrap();
        let builder = Builder::new(&dets, &graph, 0.9);
        let report = builder.build_graph().unwrap();
        assert_eq!(report, BuildReport::default());
    }

    #[test]
    fn single_detection_builds_expected_nodes_and_edge() {
        let dets = FixedDetections(vec![detection(
            1,
            &["win32", "virlock", "win32", "virus"],
        )]);
        let graph = CozoStore::open_in_memory().unwrap();
        let builder = Builder::new(&dets, &graph, 0.9);
        let report = builder.build_graph().unwrap();

        assert!(report.detections_scanned >= 1);
        let nodes = graph.load_all_nodes().unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.token.as_str()).collect();
        assert!(names.contains(&"virlock") || names.contains(&"virus"));
    }

    #[test]
    fn alias_fold_produces_a_forest() {
        let mut nodes: BTreeMap<String, NodeAccum> = BTreeMap::new();
        nodes.insert("win32".into(), NodeAccum::new(0));
        nodes.insert("virlock".into(), {
            let mut n = NodeAccum::new(1);
            n.token_count = 10;
            n
        });
        nodes.get_mut("win32").unwrap().token_count = 5;

        let mut alias_graph = AliasGraph::new(nodes.keys().cloned());
        alias_graph.union_by_count("win32", "virlock", |t| nodes[t].token_count);

        for token in nodes.keys().cloned().collect::<Vec<_>>() {
            let root = alias_graph.find(&token);
            if root != token {
                nodes.get_mut(&token).unwrap().alias = Some(root);
            }
        }

        for (token, n) in &nodes {
            if let Some(alias) = &n.alias {
                let alias_node = &nodes[alias];
                assert!(alias_node.alias.is_none(), "alias {alias} of {token} must be a root");
            }
        }
    }
}
