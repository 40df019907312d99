use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use steer_core::sequence::{blocks, generate};
use steer_core::{Condition, TunnelGeometry};

prop_compose! {
    fn table_strategy()(
        sizes in prop::collection::vec((100.0f64..500.0, 10.0f64..150.0), 1..8),
    ) -> Vec<TunnelGeometry> {
        sizes.into_iter().map(|(r, w)| TunnelGeometry::new(r, w.min(r))).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn plan_is_four_full_contiguous_blocks(
        levels in table_strategy(),
        reps in 1u32..5,
        seed in any::<u64>(),
    ) {
        let plan = generate(&levels, reps, &mut StdRng::seed_from_u64(seed)).unwrap();
        let per_block = levels.len() * reps as usize;
        prop_assert_eq!(plan.len(), 4 * per_block);

        let runs = blocks(&plan);
        prop_assert_eq!(runs.len(), 4);
        let conditions: HashSet<Condition> = runs.iter().map(|(c, _)| *c).collect();
        prop_assert_eq!(conditions.len(), 4);
        prop_assert!(runs.iter().all(|(_, n)| *n == per_block));

        for chunk in plan.chunks(per_block) {
            let orders: Vec<u32> = chunk.iter().map(|s| s.order_in_block).collect();
            let expected: Vec<u32> = (1..=per_block as u32).collect();
            prop_assert_eq!(orders, expected);

            // every (level, repetition) cell exactly once
            let mut cells: HashMap<(u32, u32), usize> = HashMap::new();
            for s in chunk {
                *cells.entry((s.level, s.repetition)).or_default() += 1;
                let g = levels[s.level as usize - 1];
                prop_assert_eq!(s.geometry, g);
            }
            prop_assert_eq!(cells.len(), per_block);
            prop_assert!(cells.values().all(|n| *n == 1));
        }
    }
}
