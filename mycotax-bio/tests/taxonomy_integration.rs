/// Property tests for the rank hierarchy and its on-disk form
use candle_core::Device;
use mycotax_bio::TaxonHierarchy;
use mycotax_core::{MycotaxError, Rank};
use proptest::prelude::*;

const COUNTS: [usize; 6] = [2, 3, 4, 5, 6, 8];

fn parent_tables() -> impl Strategy<Value = Vec<Vec<u32>>> {
    (1..6)
        .map(|r| prop::collection::vec(0..COUNTS[r - 1] as u32, COUNTS[r]))
        .collect::<Vec<_>>()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_descendant_matrix_rows_are_one_hot(parents in parent_tables()) {
        let hierarchy = TaxonHierarchy::new(COUNTS, parents).unwrap();
        let matrix = hierarchy
            .descendant_matrix(Rank::Species, Rank::Phylum, &Device::Cpu)
            .unwrap();
        let rows: Vec<Vec<f32>> = matrix.to_vec2().unwrap();
        prop_assert_eq!(rows.len(), COUNTS[5]);
        for (c, row) in rows.iter().enumerate() {
            prop_assert_eq!(row.iter().sum::<f32>(), 1.0);
            let ancestor = hierarchy.ancestor(Rank::Species, c as u32, Rank::Phylum).unwrap();
            prop_assert_eq!(row[ancestor as usize], 1.0);
        }
    }

    #[test]
    fn prop_json_round_trip(parents in parent_tables()) {
        let hierarchy = TaxonHierarchy::new(COUNTS, parents).unwrap();
        let json = serde_json::to_string(&hierarchy).unwrap();
        let restored: TaxonHierarchy = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored, hierarchy);
    }

    #[test]
    fn prop_out_of_range_parent_is_rejected(
        mut parents in parent_tables(),
        table in 0usize..5,
        excess in 0u32..10,
    ) {
        parents[table][0] = COUNTS[table] as u32 + excess;
        let result = TaxonHierarchy::new(COUNTS, parents.clone());
        prop_assert!(matches!(result, Err(MycotaxError::Configuration(_))));

        let json = serde_json::json!({ "class_counts": COUNTS, "parents": parents });
        prop_assert!(serde_json::from_value::<TaxonHierarchy>(json).is_err());
    }
}
