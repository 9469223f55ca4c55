use carve_chunk::DensityCache;
use proptest::prelude::*;

proptest! {
    // The linear index is a bijection over the sample cube.
    #[test]
    fn idx_bijective(dim in 2usize..8) {
        let cache = DensityCache::new(dim);
        let mut seen = vec![false; dim * dim * dim];
        for z in 0..dim {
            for y in 0..dim {
                for x in 0..dim {
                    let i = cache.idx(x, y, z);
                    prop_assert!(!seen[i]);
                    seen[i] = true;
                }
            }
        }
        prop_assert!(seen.into_iter().all(|s| s));
    }

    // from_values + values() round-trips the linear layout.
    #[test]
    fn from_values_round_trip(dim in 2usize..6, seed in any::<u32>()) {
        let n = dim * dim * dim;
        let vals: Vec<f32> = (0..n)
            .map(|i| ((i as u32).wrapping_mul(seed | 1) % 1000) as f32 / 17.0)
            .collect();
        let cache = DensityCache::from_values(dim, vals.clone()).unwrap();
        prop_assert!(cache.is_fully_populated());
        prop_assert_eq!(cache.values(), &vals[..]);
    }
}

#[test]
fn from_values_rejects_wrong_length() {
    assert!(DensityCache::from_values(3, vec![0.0; 26]).is_none());
    assert!(DensityCache::from_values(3, vec![0.0; 27]).is_some());
}
