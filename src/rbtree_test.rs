use arbitrary::{self, unstructured::Unstructured, Arbitrary};
use rand::{prelude::random, rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

use super::*;

use std::collections::BTreeMap;

fn load(keys: &[u32]) -> RbTree<u32> {
    let mut index = RbTree::new();
    for key in keys.iter() {
        index.insert(*key).unwrap();
    }
    index
}

fn key_of(index: &RbTree<u32>, node: Option<NodeRef>) -> Option<u32> {
    node.and_then(|node| index.key(node).copied())
}

#[test]
fn test_rbtree_empty() {
    let mut index: RbTree<u32> = RbTree::new();

    assert_eq!(index.len(), 0);
    assert!(index.is_empty());
    assert_eq!(index.root(), None);
    assert_eq!(index.min(), None);
    assert_eq!(index.max(), None);
    assert_eq!(index.find(&10), None);
    assert_eq!(index.to_vec(10), Vec::<u32>::new());

    let mut keys = [0_u32; 4];
    assert_eq!(index.export(&mut keys), 0);
    assert_eq!(keys, [0; 4]);

    let stats = index.validate().unwrap();
    assert_eq!(stats, Stats::default());

    index.clear();
    index.clear();
    assert!(index.is_empty());
    index.validate().unwrap();
}

#[test]
fn test_rbtree_insert_rotate() {
    let mut index: RbTree<u32> = RbTree::new();

    let root = index.insert(10).unwrap();
    assert_eq!(index.key(root), Some(&10));
    assert_eq!(index.color(root), Some(Color::Black));

    let root = index.insert(20).unwrap();
    assert_eq!(index.key(root), Some(&10));
    let root = index.insert(30).unwrap();
    assert_eq!(index.key(root), Some(&20));
    assert_eq!(index.root(), Some(root));

    assert_eq!(index.color(root), Some(Color::Black));
    assert_eq!(index.parent(root), None);

    let left = index.left(root).unwrap();
    assert_eq!(index.key(left), Some(&10));
    assert_eq!(index.color(left), Some(Color::Red));
    assert_eq!(index.parent(left), Some(root));

    let right = index.right(root).unwrap();
    assert_eq!(index.key(right), Some(&30));
    assert_eq!(index.color(right), Some(Color::Red));
    assert_eq!(index.parent(right), Some(root));

    assert_eq!(index.left(left), None);
    assert_eq!(index.right(right), None);

    assert_eq!(index.to_vec(3), vec![10, 20, 30]);
    let stats = index.validate().unwrap();
    assert_eq!(stats.n_count, 3);
    assert_eq!(stats.blacks, 1);
    assert_eq!(stats.depth, 2);
}

#[test]
fn test_rbtree_erase_successor() {
    let mut index = load(&[5, 3, 8, 1, 4, 7, 9]);
    index.validate().unwrap();

    let node = index.find(&3).unwrap();
    assert!(index.left(node).is_some());
    assert!(index.right(node).is_some());
    let four = index.find(&4).unwrap();

    assert_eq!(index.erase(node).unwrap(), 3);
    assert_eq!(index.len(), 6);
    assert_eq!(index.to_vec(10), vec![1, 4, 5, 7, 8, 9]);
    index.validate().unwrap();

    // successor moved into the erased position, its handle survives.
    assert_eq!(index.key(four), Some(&4));
    assert_eq!(key_of(&index, index.left(four)), Some(1));
    assert_eq!(key_of(&index, index.parent(four)), Some(5));
    assert_eq!(index.find(&4), Some(four));

    assert_eq!(index.key(node), None);
    assert_eq!(index.find(&3), None);
}

#[test]
fn test_rbtree_min_max() {
    let mut index = load(&[50, 20, 80, 10, 30, 70, 90, 60]);

    assert_eq!(key_of(&index, index.min()), Some(10));
    assert_eq!(key_of(&index, index.max()), Some(90));

    let node = index.min().unwrap();
    index.erase(node).unwrap();
    let node = index.max().unwrap();
    index.erase(node).unwrap();

    assert_eq!(key_of(&index, index.min()), Some(20));
    assert_eq!(key_of(&index, index.max()), Some(80));
    index.validate().unwrap();
}

#[test]
fn test_rbtree_find() {
    let keys: Vec<u32> = (0..1000).map(|i| i * 2).collect();
    let index = load(&keys);

    for key in keys.iter() {
        let node = index.find(key).unwrap();
        assert_eq!(index.key(node), Some(key));
    }
    for key in keys.iter() {
        assert_eq!(index.find(&(key + 1)), None, "odd key {}", key + 1);
    }
}

#[test]
fn test_rbtree_duplicates() {
    let mut index = load(&[5, 5, 3, 5, 8, 5, 5, 1, 5]);
    assert_eq!(index.len(), 9);
    assert_eq!(index.to_vec(100), vec![1, 3, 5, 5, 5, 5, 5, 5, 8]);
    index.validate().unwrap();

    let mut n = 0;
    while let Some(node) = index.find(&5) {
        assert_eq!(index.erase(node).unwrap(), 5);
        index.validate().unwrap();
        n += 1;
    }
    assert_eq!(n, 6);
    assert_eq!(index.to_vec(100), vec![1, 3, 8]);
}

#[test]
fn test_rbtree_export_truncate() {
    let index = load(&[9, 2, 7, 4, 5, 6, 3, 8, 1]);

    let mut keys = [0_u32; 4];
    assert_eq!(index.export(&mut keys), 4);
    assert_eq!(keys, [1, 2, 3, 4]);

    let mut keys = [0_u32; 12];
    assert_eq!(index.export(&mut keys), 9);
    assert_eq!(&keys[..9], &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(&keys[9..], &[0, 0, 0]);

    assert_eq!(index.export(&mut []), 0);
    assert_eq!(index.to_vec(0), Vec::<u32>::new());
    assert_eq!(index.to_vec(2), vec![1, 2]);
    assert_eq!(index.len(), 9);
}

#[test]
fn test_rbtree_invalid_handle() {
    let mut index = load(&[1, 2, 3, 4, 5]);
    let mut other = load(&[1, 2, 3, 4, 5]);

    let node = index.find(&3).unwrap();
    let foreign = other.find(&3).unwrap();
    assert!(!index.contains(foreign));
    assert_eq!(index.key(foreign), None);
    match index.erase(foreign) {
        Err(Error::InvalidHandle(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
    assert_eq!(index.len(), 5);
    assert_eq!(other.erase(foreign).unwrap(), 3);

    index.erase(node).unwrap();
    match index.erase(node) {
        Err(Error::InvalidHandle(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
    assert_eq!(index.to_vec(10), vec![1, 2, 4, 5]);

    // slot is reused, old handle must stay stale.
    let root = index.insert(3).unwrap();
    let fresh = index.find(&3).unwrap();
    assert_ne!(fresh, node);
    assert!(!index.contains(node));
    assert!(index.contains(root));

    let handles: Vec<NodeRef> = [1, 2, 3, 4, 5].iter().filter_map(|k| index.find(k)).collect();
    index.clear();
    assert!(index.is_empty());
    for node in handles.into_iter() {
        assert!(index.erase(node).is_err());
        assert_eq!(index.color(node), None);
    }
    index.validate().unwrap();

    index.insert(10).unwrap();
    assert_eq!(index.to_vec(10), vec![10]);
}

#[test]
fn test_rbtree_with_capacity() {
    let mut index: RbTree<u64> = RbTree::with_capacity(1024).unwrap();
    for key in 0..1024 {
        index.insert(key).unwrap();
    }
    assert_eq!(index.len(), 1024);
    index.validate().unwrap();

    match RbTree::<u64>::with_capacity(usize::MAX) {
        Err(Error::AllocFailed(_, _)) => (),
        Err(err) => panic!("unexpected {}", err),
        Ok(_) => panic!("reserved usize::MAX entries"),
    }
}

#[test]
fn test_rbtree_insert_alloc_failed() {
    let mut index = load(&[50, 20, 80, 10, 30]);
    let root = index.root();
    let stats = index.validate().unwrap();
    index.arena.set_limit(5);

    match index.insert(40) {
        Err(Error::AllocFailed(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
    assert_eq!(index.len(), 5);
    assert_eq!(index.root(), root);
    assert_eq!(index.find(&40), None);
    assert_eq!(index.to_vec(10), vec![10, 20, 30, 50, 80]);
    assert_eq!(index.validate().unwrap(), stats);

    // erase frees a slot, insert goes through again.
    let node = index.find(&10).unwrap();
    index.erase(node).unwrap();
    index.insert(40).unwrap();
    assert_eq!(index.to_vec(10), vec![20, 30, 40, 50, 80]);
    index.validate().unwrap();
}

#[test]
fn test_rbtree_rotate() {
    // 2(B), 1(R), 3(R)
    let mut index = load(&[2, 1, 3]);
    let (one, two, three) = (
        index.find(&1).unwrap().slot,
        index.find(&2).unwrap().slot,
        index.find(&3).unwrap().slot,
    );
    assert_eq!(index.root, two);

    index.rotate_left(two);
    assert_eq!(index.root, three);
    assert_eq!(index.arena[three].parent, NIL);
    assert_eq!(index.arena[three].left, two);
    assert_eq!(index.arena[two].parent, three);
    assert_eq!(index.arena[two].left, one);
    assert_eq!(index.arena[two].right, NIL);
    // colors are untouched.
    assert!(index.arena[two].is_black());
    assert!(!index.arena[three].is_black());
    assert_eq!(index.to_vec(3), vec![1, 2, 3]);

    index.rotate_right(three);
    assert_eq!(index.root, two);
    assert_eq!(index.arena[two].left, one);
    assert_eq!(index.arena[two].right, three);
    assert_eq!(index.arena[three].parent, two);
    assert_eq!(index.arena[three].left, NIL);
    index.validate().unwrap();
}

#[test]
#[should_panic]
fn test_rbtree_rotate_leaf() {
    let mut index = load(&[1]);
    let root = index.root;
    index.rotate_left(root);
}

#[test]
fn test_rbtree_height() {
    let seed: u64 = random();
    println!("test_rbtree_height {}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    for n in [1_usize, 2, 3, 10, 100, 1000, 10_000, 100_000].iter() {
        let mut keys: Vec<usize> = (1..=*n).collect();
        keys.shuffle(&mut rng);

        let mut index = RbTree::new();
        keys.iter().for_each(|key| {
            index.insert(*key).unwrap();
        });
        let stats = index.validate().unwrap();
        assert_eq!(stats.n_count, *n);

        let limit = 2.0 * ((*n + 1) as f64).log2();
        assert!((stats.depth as f64) <= limit, "n:{} {:?}", n, stats);

        // sorted loads are the worst case for a plain bst.
        let index: RbTree<usize> = {
            let mut index = RbTree::new();
            (1..=*n).for_each(|key| {
                index.insert(key).unwrap();
            });
            index
        };
        let stats = index.validate().unwrap();
        assert!((stats.depth as f64) <= limit, "n:{} {:?}", n, stats);
    }
}

#[test]
fn test_rbtree_erase_all() {
    let seed: u64 = random();
    println!("test_rbtree_erase_all {}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let n = 2000_u32;
    let keys: Vec<u32> = (0..n).collect();

    let mut orders = vec![keys.clone(), keys.iter().rev().copied().collect()];
    let mut shuffled = keys.clone();
    shuffled.shuffle(&mut rng);
    orders.push(shuffled);

    for order in orders.into_iter() {
        let mut index = load(&keys);
        for (i, key) in order.iter().enumerate() {
            let node = index.find(key).unwrap();
            assert_eq!(index.erase(node).unwrap(), *key);
            assert_eq!(index.len(), (n as usize) - i - 1);
            if i % 97 == 0 {
                index.validate().unwrap();
            }
        }
        assert!(index.is_empty());
        assert_eq!(index.root(), None);
        index.validate().unwrap();
    }
}

#[test]
fn test_rbtree() {
    let seed: u64 = random();
    // let seed: u64 = 4686247290498523381;
    println!("test_rbtree {}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut index: RbTree<u8> = RbTree::new();
    let mut model: BTreeMap<u8, usize> = BTreeMap::new();
    let mut stale: Option<NodeRef> = None;

    let mut counts = [0_usize; 10];

    for _i in 0..200_000 {
        let bytes = rng.gen::<[u8; 32]>();
        let mut uns = Unstructured::new(&bytes);

        let op: Op = uns.arbitrary().unwrap();
        // println!("op -- {:?}", op);
        match op {
            Op::Len => {
                counts[0] += 1;
                assert_eq!(index.len(), model.values().sum::<usize>());
            }
            Op::IsEmpty => {
                counts[1] += 1;
                assert_eq!(index.is_empty(), model.is_empty());
            }
            Op::Insert(key) => {
                counts[2] += 1;
                let root = index.insert(key).unwrap();
                assert_eq!(index.root(), Some(root));
                assert_eq!(index.color(root), Some(Color::Black));
                *model.entry(key).or_insert(0) += 1;
            }
            Op::Erase(key) => {
                counts[3] += 1;
                match (index.find(&key), model.get_mut(&key)) {
                    (None, None) => (),
                    (Some(node), Some(n)) => {
                        assert_eq!(index.erase(node).unwrap(), key);
                        *n -= 1;
                        if *n == 0 {
                            model.remove(&key);
                        }
                        stale = Some(node);
                    }
                    (None, Some(_)) => panic!("erase no key {} in rbtree", key),
                    (Some(_), None) => panic!("erase no key {} in model", key),
                }
            }
            Op::EraseStale => {
                counts[4] += 1;
                if let Some(node) = stale {
                    let n = index.len();
                    assert!(index.erase(node).is_err());
                    assert_eq!(index.len(), n);
                }
            }
            Op::Find(key) => {
                counts[5] += 1;
                match (index.find(&key), model.get(&key)) {
                    (None, None) => (),
                    (Some(node), Some(_)) => assert_eq!(index.key(node), Some(&key)),
                    (None, Some(_)) => panic!("find no key {} in rbtree", key),
                    (Some(_), None) => panic!("find no key {} in model", key),
                }
            }
            Op::Min => {
                counts[6] += 1;
                let a = index.min().and_then(|node| index.key(node).copied());
                assert_eq!(a, model.keys().next().copied());
            }
            Op::Max => {
                counts[7] += 1;
                let a = index.max().and_then(|node| index.key(node).copied());
                assert_eq!(a, model.keys().next_back().copied());
            }
            Op::Export(n) => {
                counts[8] += 1;
                let a = index.to_vec(n as usize);
                let b: Vec<u8> = expand(&model).into_iter().take(n as usize).collect();
                assert_eq!(a, b);
            }
            Op::Validate => {
                counts[9] += 1;
                let stats = index.validate().unwrap();
                assert_eq!(stats.n_count, index.len());
            }
        }
    }

    let a = index.to_vec(index.len());
    assert_eq!(a, expand(&model));
    index.validate().unwrap();

    println!("counts {:?} len:{}", counts, index.len());
}

#[derive(Debug, Arbitrary)]
enum Op {
    Len,
    IsEmpty,
    Insert(u8),
    Erase(u8),
    EraseStale,
    Find(u8),
    Min,
    Max,
    Export(u8),
    Validate,
}

fn expand(model: &BTreeMap<u8, usize>) -> Vec<u8> {
    model
        .iter()
        .flat_map(|(key, n)| std::iter::repeat(*key).take(*n))
        .collect()
}
