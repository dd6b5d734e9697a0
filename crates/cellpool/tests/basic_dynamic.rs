//! A growable pool whose mark callback walks a linked chain of roots.

use std::cell::RefCell;
use std::rc::Rc;

use cellpool::{generic_memory_callback, Pool};

const NONE: u32 = u32::MAX;

unsafe fn set_next(ptr: std::ptr::NonNull<u8>, next: u32) {
    ptr.as_ptr().cast::<u32>().write_unaligned(next);
}

unsafe fn get_next(ptr: std::ptr::NonNull<u8>) -> u32 {
    ptr.as_ptr().cast::<u32>().read_unaligned()
}

fn chain_mark_cb(root: Rc<RefCell<u32>>) -> cellpool::MarkCallback<u32> {
    Box::new(move |pool| {
        let mut id = *root.borrow();
        while id != NONE {
            pool.mark(id);
            let ptr = pool.get(id).expect("reachable cell resolves");
            id = unsafe { get_next(ptr) };
        }
        Ok(())
    })
}

#[test]
fn unreferenced_tail_is_reclaimed_by_force_gc() {
    let freed = Rc::new(RefCell::new(Vec::new()));
    let root = Rc::new(RefCell::new(NONE));

    let free_cb: cellpool::FreeCallback<u32> = {
        let freed = Rc::clone(&freed);
        Box::new(move |_pool, id| freed.borrow_mut().push(id))
    };

    let mut pool = Pool::new_growable(
        16,
        4,
        generic_memory_callback(),
        chain_mark_cb(Rc::clone(&root)),
        Some(free_cb),
    )
    .expect("growable pool constructs");

    // Build a 3-cell chain: head -> mid -> tail -> NONE.
    let tail = pool.alloc().expect("alloc tail");
    unsafe { set_next(pool.get(tail).unwrap(), NONE) };
    let mid = pool.alloc().expect("alloc mid");
    unsafe { set_next(pool.get(mid).unwrap(), tail) };
    let head = pool.alloc().expect("alloc head");
    unsafe { set_next(pool.get(head).unwrap(), mid) };

    // An unreferenced cell, never linked into the chain.
    let orphan = pool.alloc().expect("alloc orphan");

    *root.borrow_mut() = head;

    pool.force_gc().expect("force_gc succeeds");

    assert_eq!(&*freed.borrow(), &[orphan]);
    assert_eq!(pool.metrics().last_collection_reclaimed, 1);

    // The chain survived: walking it from root still reaches tail.
    let mut id = *root.borrow();
    let mut visited = Vec::new();
    while id != NONE {
        visited.push(id);
        id = unsafe { get_next(pool.get(id).unwrap()) };
    }
    assert_eq!(visited, vec![head, mid, tail]);
}

#[test]
fn dropping_the_pool_finalizes_every_remaining_cell() {
    let freed = Rc::new(RefCell::new(Vec::new()));
    let root = Rc::new(RefCell::new(NONE));

    let free_cb: cellpool::FreeCallback<u32> = {
        let freed = Rc::clone(&freed);
        Box::new(move |_pool, id| freed.borrow_mut().push(id))
    };

    let mut pool = Pool::new_growable(
        16,
        2,
        generic_memory_callback(),
        chain_mark_cb(root),
        Some(free_cb),
    )
    .expect("growable pool constructs");

    let a = pool.alloc().expect("alloc a");
    let b = pool.alloc().expect("alloc b");
    let count = pool.count();
    drop(pool);

    let mut got = freed.borrow().clone();
    got.sort_unstable();
    let mut want: Vec<u32> = (0..count as u32).collect();
    want.sort_unstable();
    assert_eq!(got, want);
    assert!(got.contains(&a));
    assert!(got.contains(&b));
}
