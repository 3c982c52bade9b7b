//! Precision/recall/F-measure evaluation of predicted labels against a
//! ground-truth clustering.

use std::collections::HashMap;
use std::hash::Hash;

/// Result of [`evaluate`], all three values expressed as percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub skipped: usize,
}

/// Counts for a single element against its ground-truth and predicted
/// clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
}

/// `tp = |G ∩ P|`, `fp = |P \ G|`, `fn = |G \ P|` for one element's clusters.
pub fn tp_fp_fn<T: Eq + Hash>(ground_truth_cluster: &[T], predicted_cluster: &[T]) -> Confusion {
    let g: std::collections::HashSet<&T> = ground_truth_cluster.iter().collect();
    let p: std::collections::HashSet<&T> = predicted_cluster.iter().collect();

    Confusion {
        tp: g.intersection(&p).count(),
        fp: p.difference(&g).count(),
        fn_: g.difference(&p).count(),
    }
}

/// Evaluate a predicted clustering against ground truth over the same
/// element set. Predicted entries with no mapping are skipped and
/// counted in [`Metrics::skipped`].
pub fn evaluate<E, C>(ground_truth: &HashMap<E, C>, predicted: &HashMap<E, C>) -> Metrics
where
    E: Eq + Hash + Clone,
    C: Eq + Hash + Clone,
{
    let gt_clusters = invert(ground_truth);
    let pred_clusters = invert(predicted);

    let mut precision_acc = 0.0;
    let mut recall_acc = 0.0;
    let mut skipped = 0usize;

    for (element, pred_cluster_id) in predicted {
        let Some(gt_cluster_id) = ground_truth.get(element) else {
            skipped += 1;
            continue;
        };

        let empty = Vec::new();
        let g = gt_clusters.get(gt_cluster_id).unwrap_or(&empty);
        let p = pred_clusters.get(pred_cluster_id).unwrap_or(&empty);
        let confusion = tp_fp_fn(g, p);

        if confusion.tp + confusion.fp > 0 {
            precision_acc += confusion.tp as f64 / (confusion.tp + confusion.fp) as f64;
        }
        if confusion.tp + confusion.fn_ > 0 {
            recall_acc += confusion.tp as f64 / (confusion.tp + confusion.fn_) as f64;
        }
    }

    let denom = predicted.len().max(1) as f64;
    let precision = 100.0 * precision_acc / denom;
    let recall = 100.0 * recall_acc / denom;
    let f_measure = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Metrics {
        precision,
        recall,
        f_measure,
        skipped,
    }
}

fn invert<E: Eq + Hash + Clone, C: Eq + Hash + Clone>(map: &HashMap<E, C>) -> HashMap<C, Vec<E>> {
    let mut out: HashMap<C, Vec<E>> = HashMap::new();
    for (element, cluster) in map {
        out.entry(cluster.clone()).or_default().push(element.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_documented_scenario() {
        let gt: HashMap<&str, i32> = [("a", 1), ("b", 1), ("c", 2)].into_iter().collect();
        let pred: HashMap<&str, i32> = [("a", 1), ("b", 1), ("c", 1)].into_iter().collect();

        let metrics = evaluate(&gt, &pred);
        assert!((metrics.precision - 66.666_666_666).abs() < 1e-6);
        assert!((metrics.recall - 100.0).abs() < 1e-9);
        assert!((metrics.f_measure - 80.0).abs() < 1e-6);
        assert_eq!(metrics.skipped, 0);
    }

    #[test]
    fn skips_predicted_entries_with_no_ground_truth() {
        let gt: HashMap<&str, i32> = [("a", 1)].into_iter().collect();
        let pred: HashMap<&str, i32> = [("a", 1), ("b", 1)].into_iter().collect();

        let metrics = evaluate(&gt, &pred);
        assert_eq!(metrics.skipped, 1);
    }

    #[test]
    fn tp_fp_fn_counts_set_differences() {
        let g = vec!["a", "b", "c"];
        let p = vec!["b", "c", "d"];
        let confusion = tp_fp_fn(&g, &p);
        assert_eq!(confusion, Confusion { tp: 2, fp: 1, fn_: 1 });
    }

    #[test]
    fn perfect_prediction_yields_full_scores() {
        let gt: HashMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
        let pred = gt.clone();
        let metrics = evaluate(&gt, &pred);
        assert!((metrics.precision - 100.0).abs() < 1e-9);
        assert!((metrics.recall - 100.0).abs() < 1e-9);
        assert!((metrics.f_measure - 100.0).abs() < 1e-9);
    }
}
