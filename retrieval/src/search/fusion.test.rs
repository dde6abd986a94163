use super::*;
use pretty_assertions::assert_eq;

fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn test_rrf_score_decreases_with_rank() {
    assert!((rrf_score(1, 60.0) - 1.0 / 61.0).abs() < 1e-6);
    assert!(rrf_score(1, 60.0) > rrf_score(2, 60.0));
}

#[test]
fn test_items_in_both_lists_rank_first() {
    let fused = fuse_ranked(&[ids(&["a", "b", "c"]), ids(&["c", "d"])], 60.0);
    assert_eq!(fused[0].0, "c");
    assert!((fused[0].1 - (1.0 / 63.0 + 1.0 / 61.0)).abs() < 1e-6);
    assert_eq!(fused.len(), 4);
}

#[test]
fn test_ties_break_by_id() {
    let fused = fuse_ranked(&[ids(&["b"]), ids(&["a"])], 60.0);
    let order: Vec<&str> = fused.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["a", "b"]);
}

#[test]
fn test_empty_lists() {
    assert!(fuse_ranked(&[], 60.0).is_empty());
    assert!(fuse_ranked(&[Vec::new()], 60.0).is_empty());
}
