use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_unique_ids_pass_through() {
    let mut ids = IdAllocator::new();
    assert_eq!(ids.assign("a".to_string()), "a");
    assert_eq!(ids.assign("b".to_string()), "b");
    assert_eq!(ids.len(), 2);
}

#[test]
fn test_collisions_get_incrementing_suffix() {
    let mut ids = IdAllocator::new();
    assert_eq!(ids.assign("device_summary_X".to_string()), "device_summary_X");
    assert_eq!(ids.assign("device_summary_X".to_string()), "device_summary_X_1");
    assert_eq!(ids.assign("device_summary_X".to_string()), "device_summary_X_2");
}

#[test]
fn test_suffix_skips_ids_already_taken() {
    let mut ids = IdAllocator::new();
    ids.assign("a_1".to_string());
    ids.assign("a".to_string());
    assert_eq!(ids.assign("a".to_string()), "a_2");
}

#[test]
fn test_deterministic_across_runs() {
    let input = ["x", "y", "x", "x", "y"];
    let run = || {
        let mut ids = IdAllocator::new();
        input
            .iter()
            .map(|s| ids.assign((*s).to_string()))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
    assert_eq!(run(), vec!["x", "y", "x_1", "x_2", "y_1"]);
}
