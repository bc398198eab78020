use regex::Regex;
use seshat::{share, Instrumented, Shape, SharedBuffer, Tracer};
use serde_json::json;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const CALLS_PER_THREAD: i64 = 40;

fn add(a: i64, b: i64) -> i64 {
    a + b
}

#[test]
fn test_recorded_blocks_never_interleave() {
    let buffer = SharedBuffer::new();
    let tracer = Tracer::with_writer(buffer.clone());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as i64)
        .map(|worker| {
            let add = tracer.record_in(module_path!(), format!("add_{}", worker), add);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for call in 0..CALLS_PER_THREAD {
                    assert_eq!(add.call((worker, call)), worker + call);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let func = Regex::new(r"^\S+ \S+ \[FUNC\] \[test_concurrency\] << line \d+ >> \[ line \d+ >> add_(\d+)\(\) \]$").unwrap();
    let operand = Regex::new(r"^\t    (-?\d+),$").unwrap();
    let result = Regex::new(r"^\t(-?\d+)$").unwrap();

    // header, args:, (, a, b, ), return:, sum
    let lines = buffer.lines();
    assert_eq!(lines.len(), THREADS * CALLS_PER_THREAD as usize * 8);
    let mut per_worker = vec![0; THREADS];
    for block in lines.chunks(8) {
        let header = func
            .captures(&block[0])
            .unwrap_or_else(|| panic!("unexpected header {:?}", block[0]));
        let worker: i64 = header[1].parse().unwrap();
        assert_eq!(block[1], "args:");
        assert_eq!(block[2], "\t(");
        let a: i64 = operand.captures(&block[3]).unwrap()[1].parse().unwrap();
        let b: i64 = operand.captures(&block[4]).unwrap()[1].parse().unwrap();
        assert_eq!(block[5], "\t)");
        assert_eq!(block[6], "return:");
        let sum: i64 = result.captures(&block[7]).unwrap()[1].parse().unwrap();
        assert_eq!(a, worker, "block of add_{} carries another thread's arguments", worker);
        assert_eq!(sum, a + b);
        per_worker[worker as usize] += 1;
    }
    assert!(per_worker.iter().all(|&count| count == CALLS_PER_THREAD));
}

struct Counter {
    hits: u64,
}

impl Instrumented for Counter {
    fn describe(shape: &mut Shape<Self>) {
        shape
            .field("hits", |c| &c.hits, |c, v| c.hits = v)
            .method_mut("hit", |c, _| {
                c.hits += 1;
                Ok(c.hits)
            });
    }
}

#[test]
fn test_concurrent_wrap_and_access() {
    let buffer = SharedBuffer::new();
    let tracer = Tracer::with_writer(buffer.clone());
    let target = share(Counter { hits: 0 });
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let tracer = Arc::clone(&tracer);
            let target = Arc::clone(&target);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let counter = tracer.wrap(&target);
                for _ in 0..CALLS_PER_THREAD {
                    counter.call("hit", &[]).unwrap();
                }
                counter
            })
        })
        .collect();
    let proxies: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(tracer.proxy_count(), 1);
    assert!(proxies
        .windows(2)
        .all(|pair| seshat::Proxy::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(target.read().unwrap().hits, THREADS as u64 * CALLS_PER_THREAD as u64);

    let access = Regex::new(r"^\S+ \S+ \[CALL\] \[tests::integration::test_concurrency\] << line \d+ >> Proxy<Counter>\.hit\(\)$").unwrap();
    let lines = buffer.lines();
    assert_eq!(lines.len(), THREADS * CALLS_PER_THREAD as usize);
    assert!(lines.iter().all(|line| access.is_match(line)));
}

struct Account {
    balance: i64,
    audit: Arc<Tracer>,
}

impl Instrumented for Account {
    fn describe(shape: &mut Shape<Self>) {
        shape
            .field("balance", |a| &a.balance, |a, v| a.balance = v)
            .method_mut("deposit", |a, args| {
                let amount: i64 = args.get(0)?;
                thread::sleep(Duration::from_millis(200));
                a.balance += amount;
                a.audit.info(format!("deposited {}", amount));
                Ok(a.balance)
            });
    }
}

#[test]
fn test_method_logging_and_recorded_proxy_read_do_not_deadlock() {
    let buffer = SharedBuffer::new();
    let tracer = Tracer::with_writer(buffer.clone());
    let account = tracer.wrap(&share(Account {
        balance: 10,
        audit: Arc::clone(&tracer),
    }));
    let (done, finished) = mpsc::channel();

    let depositor = {
        let account = account.clone();
        let done = done.clone();
        thread::spawn(move || {
            let balance = account.call("deposit", &[json!(5)]).unwrap();
            done.send(("deposit", balance)).unwrap();
        })
    };
    let auditor = {
        let account = account.clone();
        let check = tracer.record("check", move || account.read("balance").unwrap());
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            done.send(("check", check.call(()))).unwrap();
        })
    };

    let mut results: Vec<_> = (0..2)
        .map(|_| {
            finished
                .recv_timeout(Duration::from_secs(5))
                .expect("threads deadlocked")
        })
        .collect();
    depositor.join().unwrap();
    auditor.join().unwrap();
    results.sort_by_key(|(name, _)| *name);

    assert_eq!(results[1], ("deposit", json!(15)));
    // Whichever thread takes the write lock first runs to completion.
    assert_eq!(results[0].0, "check");
    assert!(results[0].1 == json!(15) || results[0].1 == json!(10));
    let lines = buffer.lines();
    assert!(lines.iter().any(|line| line.ends_with(": deposited 5")));
    assert!(lines.iter().any(|line| line.ends_with("Proxy<Account>.balance")));
}
