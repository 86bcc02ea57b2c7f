#![no_main]

//! Fuzz target for concurrent container operations
//!
//! Several threads share one container and race registrations against
//! resolutions.

use arbitrary::Arbitrary;
use di_container::{Container, Factory, TypeDescriptor, TypeRegistry};
use libfuzzer_sys::fuzz_target;
use std::thread;

#[derive(Default)]
struct Shared;

/// Thread operation
#[derive(Debug, Clone, Arbitrary)]
enum ThreadOp {
    Get(u8),
    Make,
    Has(u8),
    SetValue(u8, i64),
    SetFactory(u8),
    ResetShared,
}

/// Concurrent test scenario
#[derive(Debug, Arbitrary)]
struct ConcurrentScenario {
    // Initial literal ids to register
    initial: Vec<(u8, i64)>,
    // Number of threads (clamped to 1-8)
    thread_count: u8,
    // Operations per thread (clamped)
    ops_per_thread: Vec<ThreadOp>,
}

fn id(n: u8) -> String {
    format!("service.{}", n % 16)
}

fuzz_target!(|scenario: ConcurrentScenario| {
    let types = TypeRegistry::new();
    types.register(TypeDescriptor::builder::<Shared>("Shared").default_constructor().build());

    let container = Container::with_types(types);
    container.set_type("Shared").unwrap();

    for (n, value) in scenario.initial.into_iter().take(10) {
        container.set(&id(n), value).unwrap();
    }

    let thread_count = (scenario.thread_count % 8).max(1) as usize;
    let ops = scenario.ops_per_thread;

    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let container = container.clone();
            let ops = ops.clone();
            thread::spawn(move || {
                for op in ops.into_iter().take(50) {
                    match op {
                        ThreadOp::Get(n) => {
                            let _ = container.get(&id(n));
                            let _ = container.get("Shared");
                        }
                        ThreadOp::Make => {
                            let _ = container.make("Shared");
                        }
                        ThreadOp::Has(n) => {
                            let _ = container.has(&id(n));
                        }
                        ThreadOp::SetValue(n, value) => {
                            let _ = container.set(&id(n), value);
                        }
                        ThreadOp::SetFactory(n) => {
                            let _ = container.set(&id(n), Factory::with_container(|c| c.get("Shared")));
                        }
                        ThreadOp::ResetShared => {
                            let _ = container.set_type("Shared");
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // every clone saw the same cache
    let a = container.get("Shared").unwrap();
    let b = container.get("Shared").unwrap();
    assert_eq!(a, b);
});
