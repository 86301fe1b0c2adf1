//! Polling producer/consumer strategy.
//!
//! Full and empty buffers are waited out by polling, re-checking `KILL` on
//! every iteration. The two built-in variants differ only in what one
//! iteration of waiting does.

use crate::buffer::Entry;
use crate::error::WorkerError;
use crate::worker::{Role, WorkerContext, WorkerReport, WorkerStrategy};
use tracing::{debug, trace};

/// Strategy that polls the buffer state between waits.
#[derive(Debug, Clone, Copy)]
pub struct PollingStrategy {
    name: &'static str,
    description: &'static str,
    wait: fn(),
}

impl PollingStrategy {
    /// Busy-wait with a CPU spin hint.
    pub fn spin() -> Self {
        Self {
            name: "spin",
            description: "busy-wait on full/empty with a spin-loop hint",
            wait: std::hint::spin_loop,
        }
    }

    /// Give up the time slice while waiting.
    pub fn yielding() -> Self {
        Self {
            name: "yield",
            description: "yield the thread on full/empty",
            wait: std::thread::yield_now,
        }
    }
}

impl WorkerStrategy for PollingStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn produce(&self, id: u32, ctx: &WorkerContext<'_>) -> Result<WorkerReport, WorkerError> {
        let flags = ctx.buffer.flags();
        let mut items = 0u64;
        debug!("Producer {} started ({})", id, self.name);

        'work: while !flags.is_killed() {
            let next = ctx
                .locks
                .input
                .lock()
                .next_item()
                .map_err(|source| WorkerError::InputIo { id, source })?;
            let Some(item) = next else {
                break;
            };

            let _region = ctx.locks.insert.lock();
            while ctx.buffer.is_full() {
                if flags.is_killed() {
                    trace!("Producer {} dropped item {} on kill", id, item);
                    break 'work;
                }
                (self.wait)();
            }
            ctx.buffer.put(Entry::new(item, id));
            items += 1;
        }

        debug!("Producer {} finished after {} items", id, items);
        Ok(WorkerReport {
            role: Role::Producer,
            id,
            items,
        })
    }

    fn consume(&self, id: u32, ctx: &WorkerContext<'_>) -> Result<WorkerReport, WorkerError> {
        let flags = ctx.buffer.flags();
        let mut items = 0u64;
        debug!("Consumer {} started ({})", id, self.name);

        while !flags.is_killed() {
            let taken = {
                let _region = ctx.locks.remove.lock();
                loop {
                    if !ctx.buffer.is_empty() {
                        break Some(ctx.buffer.take());
                    }
                    if flags.is_killed() {
                        break None;
                    }
                    // A producer may have inserted between the emptiness
                    // check and reading the flag.
                    if flags.producers_done() && ctx.buffer.is_empty() {
                        break None;
                    }
                    (self.wait)();
                }
            };
            let Some(entry) = taken else {
                break;
            };

            ctx.locks
                .output
                .lock()
                .append(entry.item, entry.producer, id)
                .map_err(|source| WorkerError::OutputIo { id, source })?;
            items += 1;
        }

        debug!("Consumer {} finished after {} items", id, items);
        Ok(WorkerReport {
            role: Role::Consumer,
            id,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BoundedBuffer;
    use crate::locks::{InputStream, LockSet, OutputLog};
    use std::io;

    #[test]
    fn producer_stops_at_end_of_input() {
        let buffer = BoundedBuffer::new(8).unwrap();
        let locks = LockSet::new(InputStream::sequence(5), OutputLog::new(io::sink()));
        let ctx = WorkerContext::new(&buffer, &locks);

        let report = PollingStrategy::spin().produce(2, &ctx).unwrap();
        assert_eq!(report.items, 5);
        assert_eq!(report.role, Role::Producer);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.take(), Entry::new(1, 2));
    }

    #[test]
    fn consumer_drains_after_producers_done() {
        let buffer = BoundedBuffer::new(8).unwrap();
        let locks = LockSet::new(InputStream::sequence(3), OutputLog::new(io::sink()));
        let ctx = WorkerContext::new(&buffer, &locks);

        PollingStrategy::yielding().produce(1, &ctx).unwrap();
        buffer.flags().set_producers_done();
        let report = PollingStrategy::yielding().consume(4, &ctx).unwrap();
        assert_eq!(report.items, 3);
        assert!(buffer.is_empty());
        assert_eq!(locks.output.lock().records(), 3);
    }

    #[test]
    fn full_buffer_producer_exits_on_kill() {
        let buffer = BoundedBuffer::new(1).unwrap();
        buffer.flags().request_kill();
        let locks = LockSet::new(InputStream::sequence(3), OutputLog::new(io::sink()));
        let ctx = WorkerContext::new(&buffer, &locks);

        let report = PollingStrategy::spin().produce(1, &ctx).unwrap();
        assert_eq!(report.items, 0);
    }

    #[test]
    fn closed_output_is_a_worker_fault() {
        let buffer = BoundedBuffer::new(4).unwrap();
        let mut log = OutputLog::new(io::sink());
        log.close().unwrap();
        let locks = LockSet::new(InputStream::sequence(1), log);
        let ctx = WorkerContext::new(&buffer, &locks);

        PollingStrategy::spin().produce(1, &ctx).unwrap();
        buffer.flags().set_producers_done();
        let err = PollingStrategy::spin().consume(1, &ctx).unwrap_err();
        assert!(matches!(err, WorkerError::OutputIo { id: 1, .. }));
    }
}
