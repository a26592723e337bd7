//! Property-based tests for the bounded ring-buffer queue: FIFO order is
//! preserved under any interleaving of enqueue/dequeue, and `len` never
//! exceeds `capacity`.

use proptest::prelude::*;
use rosexec::arena::Arena;
use rosexec::queue::ArenaQueue;

fn fresh_arena(size: usize) -> Arena {
    let buf = Box::leak(vec![0u8; size].into_boxed_slice());
    Arena::install(buf).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Enqueue(u32),
    Dequeue,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u32>().prop_map(Op::Enqueue), Just(Op::Dequeue)]
}

proptest! {
    /// For any sequence of enqueue/dequeue calls against a fixed-capacity
    /// queue, the values that come out, in order, are exactly the prefix
    /// of values that went in, in order — i.e. FIFO holds regardless of
    /// how enqueues and dequeues are interleaved.
    #[test]
    fn dequeue_order_matches_enqueue_order(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut arena = fresh_arena(1 << 16);
        let queue = ArenaQueue::<u32>::make(8, &mut arena).unwrap();

        let mut model: std::collections::VecDeque<u32> = std::collections::VecDeque::new();
        for op in ops {
            match op {
                Op::Enqueue(v) => {
                    if queue.enqueue(v, &arena).is_ok() {
                        model.push_back(v);
                    }
                }
                Op::Dequeue => {
                    let got = queue.dequeue(&arena);
                    let want = model.pop_front();
                    match want {
                        Some(expected) => prop_assert_eq!(got.ok(), Some(expected)),
                        None => prop_assert!(got.is_err()),
                    }
                }
            }
            prop_assert_eq!(queue.len(&arena), model.len());
            prop_assert!(queue.len(&arena) <= queue.capacity(&arena));
        }
    }

    /// A queue never accepts more than `capacity` outstanding elements,
    /// however many enqueues are attempted.
    #[test]
    fn enqueue_past_capacity_is_rejected(n in 0usize..40) {
        let mut arena = fresh_arena(1 << 16);
        let queue = ArenaQueue::<u32>::make(5, &mut arena).unwrap();

        let mut accepted = 0;
        for i in 0..n {
            if queue.enqueue(i as u32, &arena).is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(accepted, n.min(5));
        prop_assert_eq!(queue.len(&arena), n.min(5));
    }
}
