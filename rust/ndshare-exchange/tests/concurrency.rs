use std::{sync::Arc, thread};

use ndshare_exchange::{DType, Exchange, ExchangeOptions, MemoryOrder};
use ndshare_testkit::{CountingAllocator, ReleaseCounter};

#[test]
fn test_concurrent_readers_share_a_descriptor() {
    let counter = ReleaseCounter::new();
    let values = (0..64).map(|v| v as f32).collect::<Vec<_>>();
    let (desc, token) = counter.wrap(values, &[8, 8]).unwrap();
    let desc = desc.into_readonly();

    thread::scope(|s| {
        for t in 0..4 {
            let desc = &desc;
            s.spawn(move || {
                let m = desc.matrix_view::<f32>(MemoryOrder::RowMajor).unwrap();
                for r in 0..8 {
                    assert_eq!(m.at(r, t), (r * 8 + t) as f32);
                }
                let sum: f32 = desc.any_layout_view::<f32>(2).unwrap().iter().sum();
                assert_eq!(sum, (0..64).sum::<i32>() as f32);
            });
        }
    });

    drop(desc);
    drop(token);
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_last_drop_on_another_thread_releases_once() {
    let allocator = CountingAllocator::new();
    let stats = allocator.stats();
    let exchange = Exchange::with_allocator(ExchangeOptions::default(), Arc::new(allocator)).unwrap();

    for round in 0..16 {
        let token = exchange.allocate_region(256).unwrap();
        let handles = (0..8)
            .map(|i| {
                let view = token.carve(DType::UInt32, i * 32, &[8]).unwrap();
                let extra = token.retain();
                thread::spawn(move || {
                    let mut view = view;
                    view.vector_view_mut::<u32>()
                        .unwrap()
                        .fill_with(|j| (i * 8 + j) as u32);
                    drop(extra);
                    drop(view);
                })
            })
            .collect::<Vec<_>>();
        drop(token);
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.releases(), round + 1);
    }
    assert_eq!(stats.allocations(), 16);
    assert_eq!(stats.outstanding(), 0);
}
