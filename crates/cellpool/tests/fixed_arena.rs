//! A fixed arena never allocates and reuses cells once they are swept.

use cellpool::Pool;

fn no_roots_mark_cb() -> cellpool::MarkCallback<u32> {
    Box::new(|_pool| Ok(()))
}

fn cell_is_zero(pool: &Pool<'_, u32>, id: u32) -> bool {
    let ptr = pool.get(id).expect("id resolves");
    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), pool.cell_size()) };
    bytes.iter().all(|&b| b == 0)
}

#[test]
fn exhausts_then_reuses_cells_with_no_roots() {
    let mut buf = vec![0u8; 128];
    let mut pool: Pool<'_, u32> =
        Pool::new_fixed(16, &mut buf, no_roots_mark_cb(), None).expect("fixed pool fits");

    let count = pool.count();
    assert!(count >= 4, "buffer should fit at least 4 cells, got {count}");

    let mut first_round = Vec::new();
    for _ in 0..count {
        first_round.push(pool.alloc().expect("cell available"));
    }

    // Nothing was ever marked, so the next alloc's mark phase finds
    // everything unreachable and the sweep restarts from cell 0.
    let reused = pool.alloc().expect("pool reclaims unmarked cells");
    assert_eq!(reused, first_round[0]);
    assert_eq!(pool.metrics().collections, 1);
    assert!(
        cell_is_zero(&pool, reused),
        "a cell reclaimed by the sweep must read back all-zero"
    );
}

#[test]
fn get_returns_a_pointer_into_the_requested_cell() {
    let mut buf = vec![0u8; 96];
    let mut pool: Pool<'_, u32> =
        Pool::new_fixed(16, &mut buf, no_roots_mark_cb(), None).expect("fixed pool fits");

    let id = pool.alloc().expect("first alloc always succeeds");
    assert!(
        cell_is_zero(&pool, id),
        "a freshly allocated cell must read back all-zero"
    );

    let ptr = pool.get(id).expect("allocated cell resolves");
    unsafe {
        ptr.as_ptr().cast::<u32>().write_unaligned(0xDEAD_BEEF);
    }
    let ptr_again = pool.get(id).expect("same cell resolves again");
    let value = unsafe { ptr_again.as_ptr().cast::<u32>().read_unaligned() };
    assert_eq!(value, 0xDEAD_BEEF);

    assert!(pool.get(1_000_000).is_none());
}

#[test]
fn buffer_too_small_is_rejected() {
    let mut buf = vec![0u8; 4];
    let err: cellpool::PoolError = Pool::new_fixed(16, &mut buf, no_roots_mark_cb(), None)
        .expect_err("4 bytes cannot hold even one 16-byte cell plus markbits");
    assert!(matches!(err, cellpool::PoolError::BufferTooSmall { .. }));
}
