//! Custom assertions for testing
//!
//! Checks on model outputs and FASTA content.

use candle_core::Tensor;
use mycotax_bio::TaxonHierarchy;

/// Assert that every row of a `[n, c]` tensor is a probability distribution
pub fn assert_probability_rows(scores: &Tensor, tolerance: f32) {
    let rows: Vec<Vec<f32>> = scores
        .to_vec2()
        .expect("probability tensor must be 2-d f32");
    for (i, row) in rows.iter().enumerate() {
        assert!(
            row.iter().all(|&p| (-tolerance..=1.0 + tolerance).contains(&p)),
            "Row {} has entries outside [0, 1]: {:?}",
            i,
            row
        );
        let sum: f32 = row.iter().sum();
        assert!(
            (sum - 1.0).abs() <= tolerance,
            "Row {} sums to {} instead of 1",
            i,
            sum
        );
    }
}

/// Assert elementwise closeness of two tensors of equal shape
pub fn assert_tensors_close(a: &Tensor, b: &Tensor, tolerance: f32) {
    assert_eq!(a.dims(), b.dims(), "Tensor shapes differ");
    let a: Vec<f32> = a.flatten_all().and_then(|t| t.to_vec1()).expect("f32 tensor");
    let b: Vec<f32> = b.flatten_all().and_then(|t| t.to_vec1()).expect("f32 tensor");
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!(
            (x - y).abs() <= tolerance,
            "Element {} differs: {} vs {}",
            i,
            x,
            y
        );
    }
}

/// Assert that every predicted row respects the parent links of `hierarchy`
pub fn assert_hierarchy_consistent(hierarchy: &TaxonHierarchy, rows: &[[u32; 6]]) {
    let violations = hierarchy.count_violations(rows);
    assert_eq!(
        violations, 0,
        "Found {} parent/child violations in {} predictions",
        violations,
        rows.len()
    );
}

/// Assert that a FASTA content is valid
pub fn assert_valid_fasta(content: &str) {
    let lines: Vec<&str> = content.lines().collect();
    assert!(!lines.is_empty(), "FASTA content is empty");

    let mut has_header = false;
    let mut has_sequence = false;

    for line in lines {
        if let Some(header) = line.strip_prefix('>') {
            assert!(!header.trim().is_empty(), "Empty FASTA header found");
            has_header = true;
        } else if !line.is_empty() {
            assert!(
                line.chars()
                    .all(|c| "ATGCUNRYKMSWBDHV-".contains(c.to_ascii_uppercase())),
                "Invalid sequence character found: {}",
                line
            );
            has_sequence = true;
        }
    }

    assert!(has_header, "No FASTA headers found");
    assert!(has_sequence, "No sequences found");
}
