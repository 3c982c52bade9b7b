//! Detection Store and Graph Store collaborators, backed by an
//! in-process `cozo::Db<cozo::MemStorage>` instance.
//!
//! The Builder and Searcher depend only on the [`DetectionStore`] and
//! [`GraphStore`] traits, never on CozoScript directly; [`CozoStore`] is the
//! one concrete implementation wired up by the CLI.

use std::collections::BTreeMap;

use cozo::{DataValue, MemStorage, Num, ScriptMutability};
use sumav_core::{Detection, DetectionId, TokenEdge, TokenNode};

use crate::error::GraphError;

/// Iteration over per-sample detection rows, plus the narrow write
/// operations the Searcher needs for bulk scoring.
pub trait DetectionStore {
    /// Total number of rows currently in the store.
    fn count(&self) -> Result<u64, GraphError>;

    /// Iterate detections in ascending id order, starting strictly after
    /// `after`, up to `limit` rows. Callers page through the whole table by
    /// repeatedly advancing `after` to the last id seen.
    fn iter_batch(&self, after: DetectionId, limit: u64) -> Result<Vec<Detection>, GraphError>;

    /// Resolve a single detection by md5 or sha256 hex string.
    fn get_by_hash(&self, hash: &str) -> Result<Option<Detection>, GraphError>;

    /// Bulk-update `predicted_label` for the given `(md5_hex, label)` pairs.
    fn update_predicted_labels(&self, rows: &[(String, String)]) -> Result<(), GraphError>;
}

/// Truncate/bulk-insert/load access to the persisted token graph.
pub trait GraphStore {
    fn truncate(&self) -> Result<(), GraphError>;

    fn put_nodes(&self, nodes: &[TokenNode]) -> Result<(), GraphError>;

    fn put_edges(&self, edges: &[TokenEdge]) -> Result<(), GraphError>;

    fn load_all_nodes(&self) -> Result<Vec<TokenNode>, GraphError>;

    fn get_edge(&self, token_a: &str, token_b: &str) -> Result<Option<TokenEdge>, GraphError>;

    fn edges_touching(&self, token: &str) -> Result<Vec<TokenEdge>, GraphError>;
}

/// Cozo-backed implementation of both stores, holding a single long-lived
/// in-memory engine connection.
pub struct CozoStore {
    db: cozo::Db<MemStorage>,
}

impl std::fmt::Debug for CozoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CozoStore").finish_non_exhaustive()
    }
}

impl CozoStore {
    /// Open a fresh in-memory store and create its schema if not present.
    pub fn open_in_memory() -> Result<Self, GraphError> {
        let db = cozo::Db::new(MemStorage::default()).map_err(|e| GraphError::Cozo(e.to_string()))?;
        db.initialize().map_err(|e| GraphError::Cozo(e.to_string()))?;
        let store = Self { db };
        store.ensure_schema()?;
        Ok(store)
    }

    fn run(&self, script: &str, params: BTreeMap<String, DataValue>) -> Result<cozo::NamedRows, GraphError> {
        self.db
            .run_script(script, params, ScriptMutability::Mutable)
            .map_err(|e| e.into())
    }

    fn run_ro(
        &self,
        script: &str,
        params: BTreeMap<String, DataValue>,
    ) -> Result<cozo::NamedRows, GraphError> {
        self.db
            .run_script(script, params, ScriptMutability::Immutable)
            .map_err(|e| e.into())
    }

    /// Insert or overwrite a single detection row. Ingestion itself (fetching
    /// verdicts from a source) is out of this crate's scope, but the store
    /// still needs a write path for whatever already-tokenized rows land
    /// here; also used directly by tests to seed a store.
    pub fn put_detection(&self, d: &Detection) -> Result<(), GraphError> {
        let mut params = BTreeMap::new();
        params.insert("id".into(), DataValue::from(d.id.0 as i64));
        params.insert("md5".into(), DataValue::from(d.md5.to_string().as_str()));
        params.insert("sha256".into(), DataValue::from(d.sha256.to_string().as_str()));
        params.insert(
            "submission_date".into(),
            DataValue::from(d.submission_date.to_rfc3339().as_str()),
        );
        params.insert(
            "verdicts_json".into(),
            DataValue::from(serde_json::to_string(&d.verdicts).unwrap_or_default().as_str()),
        );
        params.insert(
            "tokens".into(),
            d.tokens
                .as_ref()
                .map(|ts| DataValue::List(ts.iter().map(|t| DataValue::from(t.as_str())).collect()))
                .unwrap_or(DataValue::Null),
        );
        params.insert(
            "unique_tokens".into(),
            d.unique_tokens
                .as_ref()
                .map(|ts| DataValue::List(ts.iter().map(|t| DataValue::from(t.as_str())).collect()))
                .unwrap_or(DataValue::Null),
        );
        params.insert(
            "ground_truth".into(),
            d.ground_truth.as_deref().map(DataValue::from).unwrap_or(DataValue::Null),
        );
        params.insert(
            "predicted_label".into(),
            d.predicted_label.as_deref().map(DataValue::from).unwrap_or(DataValue::Null),
        );

        let script = "?[id, md5, sha256, submission_date, verdicts_json, tokens, unique_tokens, \
             ground_truth, predicted_label] := \
             id = $id, md5 = $md5, sha256 = $sha256, submission_date = $submission_date, \
             verdicts_json = $verdicts_json, tokens = $tokens, unique_tokens = $unique_tokens, \
             ground_truth = $ground_truth, predicted_label = $predicted_label \
             :put detection {id, md5, sha256, submission_date, verdicts_json, tokens, \
             unique_tokens, ground_truth, predicted_label}";
        self.run(script, params)?;
        Ok(())
    }

    fn ensure_schema(&self) -> Result<(), GraphError> {
        let relations = [
            "token_node {token: String => id: Int, alias: String?, parents: [String], \
             token_count: Int, row_count: Int, token_ratio: Float, num_subsets: Int}",
            "token_edge {token_a: String, token_b: String => id: Int, \
             p_b_given_a: Float, p_a_given_b: Float, intersection_row_count: Int}",
            "detection {id: Int => md5: String, sha256: String, submission_date: String, \
             verdicts_json: String, tokens: [String]?, unique_tokens: [String]?, \
             ground_truth: String?, predicted_label: String?}",
        ];

        for rel in relations {
            let script = format!(":create {rel}");
            match self.run(&script, BTreeMap::new()) {
                Ok(_) => {}
                Err(GraphError::Cozo(msg)) if msg.contains("already exists") => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn node_to_params(node: &TokenNode) -> BTreeMap<String, DataValue> {
    let mut params = BTreeMap::new();
    params.insert("token".into(), DataValue::from(node.token.as_str()));
    params.insert("id".into(), DataValue::from(node.id as i64));
    params.insert(
        "alias".into(),
        node.alias
            .as_deref()
            .map(DataValue::from)
            .unwrap_or(DataValue::Null),
    );
    params.insert(
        "parents".into(),
        DataValue::List(node.parents.iter().map(|p| DataValue::from(p.as_str())).collect()),
    );
    params.insert("token_count".into(), DataValue::from(node.token_count as i64));
    params.insert("row_count".into(), DataValue::from(node.row_count as i64));
    params.insert("token_ratio".into(), DataValue::from(node.token_ratio));
    params.insert("num_subsets".into(), DataValue::from(node.num_subsets as i64));
    params
}

fn row_to_node(row: &[DataValue]) -> Option<TokenNode> {
    Some(TokenNode {
        token: row.first()?.get_str()?.to_string(),
        id: as_i64(row.get(1)?)? as u64,
        alias: row.get(2).and_then(|v| v.get_str()).map(|s| s.to_string()),
        parents: row
            .get(3)
            .and_then(|v| v.get_slice())
            .map(|xs| xs.iter().filter_map(|x| x.get_str()).map(str::to_string).collect())
            .unwrap_or_default(),
        token_count: as_i64(row.get(4)?)? as u64,
        row_count: as_i64(row.get(5)?)? as u64,
        token_ratio: as_f64(row.get(6)?)?,
        num_subsets: as_i64(row.get(7)?)? as u64,
    })
}

fn as_i64(v: &DataValue) -> Option<i64> {
    match v {
        DataValue::Num(Num::Int(i)) => Some(*i),
        DataValue::Num(Num::Float(f)) => Some(*f as i64),
        _ => None,
    }
}

fn as_f64(v: &DataValue) -> Option<f64> {
    match v {
        DataValue::Num(Num::Float(f)) => Some(*f),
        DataValue::Num(Num::Int(i)) => Some(*i as f64),
        _ => None,
    }
}

impl GraphStore for CozoStore {
    fn truncate(&self) -> Result<(), GraphError> {
        self.run("::remove token_node", BTreeMap::new())?;
        self.run("::remove token_edge", BTreeMap::new())?;
        self.ensure_schema()
    }

    fn put_nodes(&self, nodes: &[TokenNode]) -> Result<(), GraphError> {
        for node in nodes {
            let script = "?[token, id, alias, parents, token_count, row_count, token_ratio, num_subsets] \
                <- [[$token, $id, $alias, $parents, $token_count, $row_count, $token_ratio, $num_subsets]] \
                :put token_node {token, id, alias, parents, token_count, row_count, token_ratio, num_subsets}";
            self.run(script, node_to_params(node))?;
        }
        Ok(())
    }

    fn put_edges(&self, edges: &[TokenEdge]) -> Result<(), GraphError> {
        for edge in edges {
            let mut params = BTreeMap::new();
            params.insert("token_a".into(), DataValue::from(edge.token_a.as_str()));
            params.insert("token_b".into(), DataValue::from(edge.token_b.as_str()));
            params.insert("id".into(), DataValue::from(edge.id as i64));
            params.insert("p_b_given_a".into(), DataValue::from(edge.p_b_given_a));
            params.insert("p_a_given_b".into(), DataValue::from(edge.p_a_given_b));
            params.insert(
                "intersection_row_count".into(),
                DataValue::from(edge.intersection_row_count as i64),
            );

            let script = "?[token_a, token_b, id, p_b_given_a, p_a_given_b, intersection_row_count] \
                <- [[$token_a, $token_b, $id, $p_b_given_a, $p_a_given_b, $intersection_row_count]] \
                :put token_edge {token_a, token_b, id, p_b_given_a, p_a_given_b, intersection_row_count}";
            self.run(script, params)?;
        }
        Ok(())
    }

    fn load_all_nodes(&self) -> Result<Vec<TokenNode>, GraphError> {
        let rows = self.run_ro(
            "?[token, id, alias, parents, token_count, row_count, token_ratio, num_subsets] := \
             *token_node{token, id, alias, parents, token_count, row_count, token_ratio, num_subsets}",
            BTreeMap::new(),
        )?;
        Ok(rows.rows.iter().filter_map(|r| row_to_node(r)).collect())
    }

    fn get_edge(&self, token_a: &str, token_b: &str) -> Result<Option<TokenEdge>, GraphError> {
        let (lo, hi) = TokenEdge::canonical_pair(token_a, token_b);
        let mut params = BTreeMap::new();
        params.insert("a".into(), DataValue::from(lo));
        params.insert("b".into(), DataValue::from(hi));

        let rows = self.run_ro(
            "?[id, p_b_given_a, p_a_given_b, intersection_row_count] := \
             *token_edge{token_a: $a, token_b: $b, id, p_b_given_a, p_a_given_b, intersection_row_count}",
            params,
        )?;

        Ok(rows.rows.first().and_then(|row| {
            Some(TokenEdge {
                id: as_i64(row.first()?)? as u64,
                token_a: lo.to_string(),
                token_b: hi.to_string(),
                p_b_given_a: as_f64(row.get(1)?)?,
                p_a_given_b: as_f64(row.get(2)?)?,
                intersection_row_count: as_i64(row.get(3)?)? as u64,
            })
        }))
    }

    fn edges_touching(&self, token: &str) -> Result<Vec<TokenEdge>, GraphError> {
        let mut params = BTreeMap::new();
        params.insert("t".into(), DataValue::from(token));

        let rows = self.run_ro(
            "?[token_a, token_b, id, p_b_given_a, p_a_given_b, intersection_row_count] := \
             *token_edge{token_a, token_b, id, p_b_given_a, p_a_given_b, intersection_row_count}, \
             (token_a = $t or token_b = $t)",
            params,
        )?;

        Ok(rows
            .rows
            .iter()
            .filter_map(|row| {
                Some(TokenEdge {
                    token_a: row.first()?.get_str()?.to_string(),
                    token_b: row.get(1)?.get_str()?.to_string(),
                    id: as_i64(row.get(2)?)? as u64,
                    p_b_given_a: as_f64(row.get(3)?)?,
                    p_a_given_b: as_f64(row.get(4)?)?,
                    intersection_row_count: as_i64(row.get(5)?)? as u64,
                })
            })
            .collect())
    }
}

impl DetectionStore for CozoStore {
    fn count(&self) -> Result<u64, GraphError> {
        let rows = self.run_ro("?[count(id)] := *detection{id}", BTreeMap::new())?;
        Ok(rows
            .rows
            .first()
            .and_then(|r| r.first())
            .and_then(as_i64)
            .unwrap_or(0) as u64)
    }

    fn iter_batch(&self, after: DetectionId, limit: u64) -> Result<Vec<Detection>, GraphError> {
        let mut params = BTreeMap::new();
        params.insert("after".into(), DataValue::from(after.0 as i64));
        params.insert("lim".into(), DataValue::from(limit as i64));

        let script = "?[id, md5, sha256, submission_date, verdicts_json, tokens, unique_tokens, \
             ground_truth, predicted_label] := \
             *detection{id, md5, sha256, submission_date, verdicts_json, tokens, unique_tokens, \
             ground_truth, predicted_label}, id > $after \
             :order id \
             :limit $lim";
        let rows = self.run_ro(script, params)?;
        Ok(rows.rows.iter().filter_map(|r| row_to_detection(r)).collect())
    }

    fn get_by_hash(&self, hash: &str) -> Result<Option<Detection>, GraphError> {
        let mut params = BTreeMap::new();
        params.insert("h".into(), DataValue::from(hash));

        let script = "?[id, md5, sha256, submission_date, verdicts_json, tokens, unique_tokens, \
             ground_truth, predicted_label] := \
             *detection{id, md5, sha256, submission_date, verdicts_json, tokens, unique_tokens, \
             ground_truth, predicted_label}, (md5 = $h or sha256 = $h)";
        let rows = self.run_ro(script, params)?;
        Ok(rows.rows.first().and_then(|r| row_to_detection(r)))
    }

    fn update_predicted_labels(&self, rows: &[(String, String)]) -> Result<(), GraphError> {
        for (md5, label) in rows {
            let mut params = BTreeMap::new();
            params.insert("md5".into(), DataValue::from(md5.as_str()));
            params.insert("label".into(), DataValue::from(label.as_str()));

            let script = "?[id, md5, sha256, submission_date, verdicts_json, tokens, unique_tokens, \
                 ground_truth, predicted_label] := \
                 *detection{id, md5: $md5, sha256, submission_date, verdicts_json, tokens, \
                 unique_tokens, ground_truth, predicted_label: _}, predicted_label = $label \
                 :put detection {id, md5, sha256, submission_date, verdicts_json, tokens, \
                 unique_tokens, ground_truth, predicted_label}";
            self.run(script, params)?;
        }
        Ok(())
    }
}

fn row_to_detection(row: &[DataValue]) -> Option<Detection> {
    use sumav_core::{Md5Hash, Sha256Hash};

    let verdicts_json = row.get(4)?.get_str()?;
    let verdicts = serde_json::from_str(verdicts_json).unwrap_or_default();

    Some(Detection {
        id: DetectionId(as_i64(row.first()?)? as u64),
        md5: Md5Hash::from_hex(row.get(1)?.get_str()?).ok()?,
        sha256: Sha256Hash::from_hex(row.get(2)?.get_str()?).ok()?,
        submission_date: row
            .get(3)?
            .get_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(chrono::Utc::now),
        verdicts,
        tokens: row
            .get(5)
            .and_then(|v| v.get_slice())
            .map(|xs| xs.iter().filter_map(|x| x.get_str()).map(str::to_string).collect()),
        unique_tokens: row
            .get(6)
            .and_then(|v| v.get_slice())
            .map(|xs| xs.iter().filter_map(|x| x.get_str()).map(str::to_string).collect()),
        ground_truth: row.get(7).and_then(|v| v.get_str()).map(str::to_string),
        predicted_label: row.get(8).and_then(|v| v.get_str()).map(str::to_string),
    })
}
