//! Cross-cutting scenario and property tests over a small grocery dataset:
//! 9 baskets over 16 items, chosen so that the frequent/closed/maximal
//! families at thresholds 2 and 3 are known exactly.

use std::collections::BTreeSet;

use crate::matrix::{IncidenceMatrix, MinSupport};
use crate::mine::{
    build_tree, mine, mine_closed, mine_frequent, mine_from_tree, mine_maximal, Engine,
    ItemsetTable, MineMode, MineOptions,
};

const ITEMS: [&str; 16] = [
    "milk", "eggs", "bread", "butter", "sugar", "flour", "bacon", "beer", "ham", "turkey",
    "cheese", "ketchup", "mustard", "hot dogs", "buns", "hamburger",
];

fn groceries() -> IncidenceMatrix {
    let rows = vec![
        vec![0, 1, 4, 5],               // milk eggs sugar flour
        vec![0, 1, 3, 4, 8],            // milk eggs butter sugar ham
        vec![0, 1, 2],                  // milk eggs bread
        vec![0, 1, 7],                  // milk eggs beer
        vec![0, 8, 10],                 // milk ham cheese
        vec![1, 6],                     // eggs bacon
        vec![2, 9, 10],                 // bread turkey cheese
        vec![2, 7, 11, 12, 13, 14, 15], // bread beer ketchup mustard hot dogs buns hamburger
        vec![7, 8, 9, 10],              // beer ham turkey cheese
    ];
    IncidenceMatrix::from_rows(rows, ITEMS.iter().map(|s| s.to_string()).collect(), None)
        .unwrap()
}

type Key = (BTreeSet<String>, u64);

fn as_set(table: &ItemsetTable) -> BTreeSet<Key> {
    table
        .rows
        .iter()
        .map(|r| (r.items.iter().cloned().collect(), r.count))
        .collect()
}

fn key(items: &[&str], count: u64) -> Key {
    (items.iter().map(|s| s.to_string()).collect(), count)
}

fn with_engine(engine: Engine) -> MineOptions {
    MineOptions { max_len: None, engine }
}

#[test]
fn frequent_at_three_matches_known_family() {
    let m = groceries();
    let table = mine_frequent(&m, MinSupport::Count(3)).unwrap();
    let expected: BTreeSet<Key> = [
        key(&["beer"], 3),
        key(&["bread"], 3),
        key(&["cheese"], 3),
        key(&["eggs"], 5),
        key(&["ham"], 3),
        key(&["milk"], 5),
        key(&["eggs", "milk"], 4),
    ]
    .into_iter()
    .collect();
    assert_eq!(as_set(&table), expected);

    let milk = table.rows.iter().find(|r| r.items == vec!["milk"]).unwrap();
    assert_eq!(milk.count, 5);
    assert_eq!(milk.len, 1);
    assert!((milk.support - 5.0 / 9.0).abs() < 1e-12);
}

#[test]
fn fraction_threshold_converts_by_ceiling() {
    let m = groceries();
    let by_count = mine_frequent(&m, MinSupport::Count(3)).unwrap();
    // ceil(0.3 * 9) = 3
    let by_fraction = mine_frequent(&m, MinSupport::Fraction(0.3)).unwrap();
    assert_eq!(as_set(&by_count), as_set(&by_fraction));
}

#[test]
fn closed_at_two_keeps_singleton_closures() {
    let m = groceries();
    for engine in [Engine::FpTree, Engine::Tidset] {
        let table = mine(&m, MineMode::Closed, MinSupport::Count(2), with_engine(engine)).unwrap();
        let set = as_set(&table);
        assert!(set.contains(&key(&["eggs", "milk", "sugar"], 2)), "{engine:?}");
        assert!(set.contains(&key(&["eggs", "milk"], 4)), "{engine:?}");
        // milk occurs in 5 rows that share nothing else, so its closure is
        // itself and the singleton survives closed mining.
        assert!(set.contains(&key(&["milk"], 5)), "{engine:?}");

        // Dominance: never two results where one contains the other at equal
        // support.
        let rows: Vec<&Key> = set.iter().collect();
        for a in &rows {
            for b in &rows {
                if a.0 != b.0 && a.1 == b.1 {
                    assert!(!a.0.is_subset(&b.0), "{:?} ⊂ {:?} at equal support", a, b);
                }
            }
        }
    }
}

#[test]
fn maximal_at_three_is_the_expected_antichain() {
    let m = groceries();
    for engine in [Engine::FpTree, Engine::Tidset] {
        let table = mine(&m, MineMode::Maximal, MinSupport::Count(3), with_engine(engine)).unwrap();
        let set = as_set(&table);
        let expected: BTreeSet<Key> = [
            key(&["beer"], 3),
            key(&["bread"], 3),
            key(&["cheese"], 3),
            key(&["ham"], 3),
            key(&["eggs", "milk"], 4),
        ]
        .into_iter()
        .collect();
        assert_eq!(set, expected, "{engine:?}");

        // Antichain: no result is a proper subset of another.
        for a in &set {
            for b in &set {
                if a.0 != b.0 {
                    assert!(!a.0.is_subset(&b.0));
                }
            }
        }
    }
}

#[test]
fn downward_closure_holds() {
    let m = groceries();
    let table = mine_frequent(&m, MinSupport::Count(2)).unwrap();
    let by_items: std::collections::BTreeMap<BTreeSet<String>, u64> = table
        .rows
        .iter()
        .map(|r| (r.items.iter().cloned().collect(), r.count))
        .collect();
    for (items, &count) in &by_items {
        for drop in items {
            let mut sub = items.clone();
            sub.remove(drop);
            if sub.is_empty() {
                continue;
            }
            let sub_count = by_items
                .get(&sub)
                .unwrap_or_else(|| panic!("subset {sub:?} of {items:?} missing"));
            assert!(*sub_count >= count);
        }
    }
}

#[test]
fn closure_operator_properties() {
    let m = groceries();
    // sugar only ever occurs with milk and eggs
    let c = m.closure(&[4]);
    assert_eq!(c, vec![0, 1, 4]);
    assert_eq!(m.closure(&c), c);
    // eggs stands alone in one basket, so it is its own closure
    assert_eq!(m.closure(&[1]), vec![1]);
    // the input is always contained in its closure
    for item in 0..16u32 {
        assert!(m.closure(&[item]).contains(&item));
    }
}

#[test]
fn closed_results_recover_the_frequent_family() {
    let m = groceries();
    let frequent = mine_frequent(&m, MinSupport::Count(2)).unwrap();
    let closed = mine_closed(&m, MinSupport::Count(2)).unwrap();
    let closed_set = as_set(&closed);
    let frequent_set = as_set(&frequent);

    // Every closed itemset is frequent with the same support.
    for c in &closed_set {
        assert!(frequent_set.contains(c));
    }
    // Every frequent itemset's support is the best support among closed
    // supersets (its smallest containing closed itemset).
    for (items, count) in &frequent_set {
        let recovered = closed_set
            .iter()
            .filter(|(c_items, _)| items.is_subset(c_items))
            .map(|&(_, c)| c)
            .max();
        assert_eq!(recovered, Some(*count), "failed to recover {items:?}");
    }
}

#[test]
fn tree_and_set_miners_agree() {
    let m = groceries();
    for mode in [MineMode::Frequent, MineMode::Closed, MineMode::Maximal] {
        for min_count in [2u64, 3] {
            let tree = mine(&m, mode, MinSupport::Count(min_count), with_engine(Engine::FpTree))
                .unwrap();
            let set = mine(&m, mode, MinSupport::Count(min_count), with_engine(Engine::Tidset))
                .unwrap();
            assert_eq!(as_set(&tree), as_set(&set), "{mode:?} @ {min_count}");
        }
    }
}

#[test]
fn transposed_closed_path_agrees_with_tree_miner() {
    // More items than transactions forces the direct-closure path on the
    // tidset side.
    let rows = vec![
        vec![0, 1, 2, 5, 7, 9],
        vec![0, 1, 2, 6, 8],
        vec![0, 3, 5, 7, 9],
        vec![1, 2, 4, 6, 8, 9],
    ];
    let names = (0..10).map(|c| format!("i{c}")).collect();
    let m = IncidenceMatrix::from_rows(rows, names, None).unwrap();
    assert!(m.n_items() > m.n_transactions());
    for min_count in [1u64, 2] {
        let tree =
            mine(&m, MineMode::Closed, MinSupport::Count(min_count), with_engine(Engine::FpTree))
                .unwrap();
        let set =
            mine(&m, MineMode::Closed, MinSupport::Count(min_count), with_engine(Engine::Tidset))
                .unwrap();
        assert_eq!(as_set(&tree), as_set(&set), "@ {min_count}");
    }
}

#[test]
fn results_are_identical_across_worker_counts() {
    let m = groceries();
    for mode in [MineMode::Frequent, MineMode::Closed, MineMode::Maximal] {
        let mut outcomes: Vec<BTreeSet<Key>> = Vec::new();
        for threads in [1usize, 2, 8] {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            let table =
                pool.install(|| mine(&m, mode, MinSupport::Count(2), MineOptions::default()))
                    .unwrap();
            outcomes.push(as_set(&table));
        }
        assert_eq!(outcomes[0], outcomes[1], "{mode:?}");
        assert_eq!(outcomes[1], outcomes[2], "{mode:?}");
    }
}

#[test]
fn max_len_caps_itemset_length() {
    let m = groceries();
    let capped = mine(
        &m,
        MineMode::Frequent,
        MinSupport::Count(2),
        MineOptions { max_len: Some(1), engine: Engine::Auto },
    )
    .unwrap();
    assert!(capped.rows.iter().all(|r| r.len == 1));
    // Exactly the frequent items at threshold 2.
    let n_frequent_items =
        m.item_supports().iter().filter(|&&c| c >= 2).count();
    assert_eq!(capped.rows.len(), n_frequent_items);

    let capped2 = mine(
        &m,
        MineMode::Frequent,
        MinSupport::Count(2),
        MineOptions { max_len: Some(2), engine: Engine::Auto },
    )
    .unwrap();
    assert!(capped2.rows.iter().all(|r| r.len <= 2));
    let full = mine_frequent(&m, MinSupport::Count(2)).unwrap();
    let full_capped: BTreeSet<Key> = full
        .rows
        .iter()
        .filter(|r| r.len <= 2)
        .map(|r| (r.items.iter().cloned().collect(), r.count))
        .collect();
    assert_eq!(as_set(&capped2), full_capped);
}

#[test]
fn prebuilt_tree_serves_looser_or_equal_thresholds() {
    let m = groceries();
    let tree = build_tree(&m, MinSupport::Count(2)).unwrap();

    let direct = mine_frequent(&m, MinSupport::Count(3)).unwrap();
    let via_tree =
        mine_from_tree(&tree, MineMode::Frequent, MinSupport::Count(3), None).unwrap();
    assert_eq!(as_set(&direct), as_set(&via_tree));

    let same =
        mine_from_tree(&tree, MineMode::Frequent, MinSupport::Count(2), None).unwrap();
    assert_eq!(as_set(&same), as_set(&mine_frequent(&m, MinSupport::Count(2)).unwrap()));

    let strict_tree = build_tree(&m, MinSupport::Count(3)).unwrap();
    let err = mine_from_tree(&strict_tree, MineMode::Frequent, MinSupport::Count(2), None)
        .unwrap_err();
    assert!(matches!(err, crate::MineError::TreeThreshold { tree: 3, requested: 2 }));
}

#[test]
fn maximal_mode_via_prebuilt_tree() {
    let m = groceries();
    let tree = build_tree(&m, MinSupport::Count(3)).unwrap();
    let table = mine_from_tree(&tree, MineMode::Maximal, MinSupport::Count(3), None).unwrap();
    assert_eq!(as_set(&table), as_set(&mine_maximal(&m, MinSupport::Count(3)).unwrap()));
}

#[test]
fn nothing_frequent_yields_empty_table() {
    let m = groceries();
    let table = mine_frequent(&m, MinSupport::Count(9)).unwrap();
    assert!(table.rows.is_empty());
}
