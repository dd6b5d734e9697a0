//! Property-based checks of the two invariants a pool must hold between
//! any pair of public calls: every live cell address falls within the
//! backing buffer, and `alloc`/`mark` never panic regardless of how a
//! caller mixes allocation, marking, and forced collection.

use std::cell::RefCell;
use std::rc::Rc;

use cellpool::{generic_memory_callback, Pool};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Alloc,
    MarkLast,
    ForceGc,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Alloc),
        2 => Just(Op::MarkLast),
        1 => Just(Op::ForceGc),
    ]
}

proptest! {
    /// Any interleaving of alloc/mark/force_gc keeps every live cell's
    /// pointer inside the current backing region, and never panics.
    #[test]
    fn pool_survives_arbitrary_op_sequences(ops in proptest::collection::vec(op_strategy(), 0..200)) {
        let roots: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        let mark_cb: cellpool::MarkCallback<u32> = {
            let roots = Rc::clone(&roots);
            Box::new(move |pool| {
                for &id in roots.borrow().iter() {
                    pool.mark(id);
                }
                Ok(())
            })
        };

        let mut pool = Pool::new_growable(16, 2, generic_memory_callback(), mark_cb, None)
            .expect("growable pool constructs");

        for op in ops {
            match op {
                Op::Alloc => {
                    if let Some(id) = pool.alloc() {
                        let ptr = pool.get(id).expect("just-allocated id resolves");
                        let cell_end = ptr.as_ptr() as usize + pool.cell_size();
                        let region_end = pool.get(0).unwrap().as_ptr() as usize
                            + pool.cell_size() * pool.count();
                        prop_assert!(cell_end <= region_end);
                        roots.borrow_mut().push(id);
                    }
                }
                Op::MarkLast => {
                    if let Some(&last) = roots.borrow().last() {
                        pool.mark(last);
                    }
                }
                Op::ForceGc => {
                    prop_assert!(pool.force_gc().is_ok());
                }
            }
        }
    }
}
