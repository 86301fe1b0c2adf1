//! Multi-threaded producer/consumer runs against a real buffer.

use bb_buffer::{
    BoundedBuffer, InputStream, LockSet, OutputLog, StrategyRegistry, WorkerContext,
    WorkerReport, WorkerStrategy,
};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

struct RunResult {
    producers: Vec<WorkerReport>,
    consumers: Vec<WorkerReport>,
}

fn run(
    strategy: &dyn WorkerStrategy,
    producers: u32,
    consumers: u32,
    slots: usize,
    items: u32,
    log_path: &Path,
) -> RunResult {
    let buffer = BoundedBuffer::new(slots).unwrap();
    let output = OutputLog::new(BufWriter::new(File::create(log_path).unwrap()));
    let locks = LockSet::new(InputStream::sequence(items), output);
    let ctx = WorkerContext::new(&buffer, &locks);

    let result = thread::scope(|scope| {
        let consumer_handles: Vec<_> = (1..=consumers)
            .map(|id| scope.spawn(move || strategy.consume(id, &ctx)))
            .collect();
        let producer_handles: Vec<_> = (1..=producers)
            .map(|id| scope.spawn(move || strategy.produce(id, &ctx)))
            .collect();

        let producers: Vec<_> = producer_handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        buffer.flags().set_producers_done();
        let consumers: Vec<_> = consumer_handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        buffer.flags().set_consumers_done();
        RunResult {
            producers,
            consumers,
        }
    });

    locks.output.lock().close().unwrap();
    let (cursor_in, cursor_out) = buffer.cursors();
    assert!(cursor_in < slots && cursor_out < slots);
    assert!(buffer.is_empty());
    result
}

fn logged_items(path: &Path) -> BTreeMap<u32, u32> {
    let mut seen = BTreeMap::new();
    for line in fs::read_to_string(path).unwrap().lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 3, "bad record '{line}'");
        *seen.entry(fields[0].parse::<u32>().unwrap()).or_insert(0) += 1;
    }
    seen
}

#[test]
fn every_item_logged_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::with_builtin();

    for name in registry.names() {
        let strategy = registry.create(name).unwrap();
        let path = dir.path().join(format!("{name}.txt"));
        let result = run(strategy.as_ref(), 3, 2, 10, 500, &path);

        let seen = logged_items(&path);
        assert_eq!(seen.len(), 500, "strategy {name}");
        assert!(seen.iter().all(|(item, count)| (1..=500).contains(item) && *count == 1));

        let produced: u64 = result.producers.iter().map(|r| r.items).sum();
        let consumed: u64 = result.consumers.iter().map(|r| r.items).sum();
        assert_eq!(produced, 500);
        assert_eq!(consumed, 500);
    }
}

#[test]
fn two_slots_still_make_progress() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two.txt");
    let strategy = StrategyRegistry::with_builtin().create("yield").unwrap();

    let started = Instant::now();
    run(strategy.as_ref(), 2, 2, 2, 200, &path);
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(logged_items(&path).len(), 200);
}

#[test]
fn kill_unblocks_workers_on_one_slot_buffer() {
    let buffer = BoundedBuffer::new(1).unwrap();
    let locks = LockSet::new(InputStream::sequence(10), OutputLog::new(std::io::sink()));
    let ctx = WorkerContext::new(&buffer, &locks);
    let strategy = StrategyRegistry::with_builtin().create("spin").unwrap();
    let strategy = strategy.as_ref();

    thread::scope(|scope| {
        let producer = scope.spawn(move || strategy.produce(1, &ctx));
        let consumer = scope.spawn(move || strategy.consume(1, &ctx));

        thread::sleep(Duration::from_millis(50));
        assert!(buffer.flags().request_kill());

        let produced = producer.join().unwrap().unwrap();
        let consumed = consumer.join().unwrap().unwrap();
        assert_eq!(produced.items, 0);
        assert_eq!(consumed.items, 0);
    });
}

#[test]
fn cursors_stay_in_range_while_workers_run() {
    let registry = StrategyRegistry::with_builtin();

    for name in registry.names() {
        let strategy = registry.create(name).unwrap();
        let strategy = strategy.as_ref();
        for slots in [2usize, 3] {
            let buffer = BoundedBuffer::new(slots).unwrap();
            let locks = LockSet::new(InputStream::sequence(2_000), OutputLog::new(std::io::sink()));
            let ctx = WorkerContext::new(&buffer, &locks);

            let samples = thread::scope(|scope| {
                let observer = scope.spawn(|| {
                    let mut samples = 0u64;
                    loop {
                        let done = buffer.flags().consumers_done();
                        let (cursor_in, cursor_out) = buffer.cursors();
                        let len = buffer.len();
                        assert!(
                            cursor_in < slots && cursor_out < slots && len <= slots - 1,
                            "{name}/{slots}: in={cursor_in} out={cursor_out} len={len}"
                        );
                        samples += 1;
                        if done {
                            return samples;
                        }
                        thread::yield_now();
                    }
                });

                let consumers: Vec<_> = (1..=3)
                    .map(|id| scope.spawn(move || strategy.consume(id, &ctx)))
                    .collect();
                let producers: Vec<_> = (1..=3)
                    .map(|id| scope.spawn(move || strategy.produce(id, &ctx)))
                    .collect();

                let produced: u64 = producers
                    .into_iter()
                    .map(|h| h.join().unwrap().unwrap().items)
                    .sum();
                buffer.flags().set_producers_done();
                let consumed: u64 = consumers
                    .into_iter()
                    .map(|h| h.join().unwrap().unwrap().items)
                    .sum();
                buffer.flags().set_consumers_done();
                assert_eq!(produced, 2_000);
                assert_eq!(consumed, 2_000);
                observer.join().unwrap()
            });
            assert!(samples > 0);
            assert!(buffer.is_empty());
        }
    }
}
