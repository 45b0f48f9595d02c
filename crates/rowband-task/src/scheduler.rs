//! Dataflow execution of a [`TaskGraph`].
//!
//! [`Scheduler::Serial`] runs tasks in program order on the calling
//! thread. [`Scheduler::Threaded`] runs them on a scoped worker pool:
//! the calling thread acts as coordinator, tracking in-degrees and
//! sending tasks to workers over a channel as soon as every predecessor
//! has completed.

use std::fmt;
use std::time::Instant;

use crossbeam_channel::{unbounded, Sender};

use crate::graph::{TaskGraph, TaskNode};

/// How a [`TaskGraph`] is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduler {
    /// Program order on the calling thread.
    Serial,
    /// Dataflow order on a scoped pool of `workers` threads.
    Threaded {
        /// Worker thread count (at least 1).
        workers: usize,
    },
}

/// Per-task timings of one graph execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Wall-clock time of each task in microseconds, by task index.
    pub task_us: Vec<u64>,
    /// Number of tasks that ran.
    pub tasks_run: usize,
}

/// The first task that failed, with its error.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskFailure<E> {
    /// Index of the failing task in the graph.
    pub task: usize,
    /// The task's error.
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for TaskFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {} failed: {}", self.task, self.error)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TaskFailure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Scheduler {
    /// Number of threads that execute tasks.
    pub fn worker_count(&self) -> usize {
        match *self {
            Scheduler::Serial => 1,
            Scheduler::Threaded { workers } => workers.max(1),
        }
    }

    /// Run every task of `graph`, honouring its edges.
    ///
    /// After the first failure no further task is dispatched; tasks
    /// already running are allowed to finish and the first error is
    /// returned.
    pub fn run<E, F>(&self, graph: &TaskGraph, task: F) -> Result<ExecutionReport, TaskFailure<E>>
    where
        E: Send,
        F: Fn(usize, &TaskNode) -> Result<(), E> + Sync,
    {
        match *self {
            Scheduler::Serial => run_serial(graph, &task),
            Scheduler::Threaded { workers } => {
                let workers = workers.max(1).min(graph.len().max(1));
                if workers == 1 {
                    run_serial(graph, &task)
                } else {
                    run_threaded(graph, workers, &task)
                }
            }
        }
    }
}

fn run_serial<E, F>(graph: &TaskGraph, task: &F) -> Result<ExecutionReport, TaskFailure<E>>
where
    F: Fn(usize, &TaskNode) -> Result<(), E>,
{
    let mut report = ExecutionReport {
        task_us: vec![0; graph.len()],
        tasks_run: 0,
    };
    for (idx, node) in graph.nodes().iter().enumerate() {
        let start = Instant::now();
        task(idx, node).map_err(|error| TaskFailure { task: idx, error })?;
        report.task_us[idx] = start.elapsed().as_micros() as u64;
        report.tasks_run += 1;
        tracing::trace!(
            task = idx,
            stage = node.stage.label(),
            region = %node.region,
            "task done"
        );
    }
    Ok(report)
}

enum Completion<E> {
    Finished { task: usize, result: Result<u64, E> },
    Panicked,
}

/// Reports a worker panic to the coordinator so it stops waiting.
struct PanicSignal<'a, E> {
    done: &'a Sender<Completion<E>>,
}

impl<E> Drop for PanicSignal<'_, E> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let _ = self.done.send(Completion::Panicked);
        }
    }
}

fn run_threaded<E, F>(
    graph: &TaskGraph,
    workers: usize,
    task: &F,
) -> Result<ExecutionReport, TaskFailure<E>>
where
    E: Send,
    F: Fn(usize, &TaskNode) -> Result<(), E> + Sync,
{
    let mut report = ExecutionReport {
        task_us: vec![0; graph.len()],
        tasks_run: 0,
    };
    if graph.is_empty() {
        return Ok(report);
    }

    let (ready_tx, ready_rx) = unbounded::<usize>();
    let (done_tx, done_rx) = unbounded::<Completion<E>>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let ready_rx = ready_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                let _signal = PanicSignal { done: &done_tx };
                for idx in ready_rx.iter() {
                    let node = graph.node(idx);
                    let start = Instant::now();
                    let result = task(idx, node).map(|()| start.elapsed().as_micros() as u64);
                    tracing::trace!(
                        task = idx,
                        stage = node.stage.label(),
                        region = %node.region,
                        ok = result.is_ok(),
                        "task done"
                    );
                    if done_tx
                        .send(Completion::Finished { task: idx, result })
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        let mut in_degree = graph.in_degrees();
        let mut in_flight = 0usize;
        let mut completed = 0usize;
        let mut failure: Option<TaskFailure<E>> = None;

        for (idx, _) in in_degree.iter().enumerate().filter(|(_, d)| **d == 0) {
            if ready_tx.send(idx).is_ok() {
                in_flight += 1;
            }
        }

        while in_flight > 0 {
            let Ok(msg) = done_rx.recv() else { break };
            match msg {
                Completion::Finished { task: idx, result } => {
                    in_flight -= 1;
                    match result {
                        Ok(us) => {
                            report.task_us[idx] = us;
                            report.tasks_run += 1;
                            completed += 1;
                            if failure.is_some() {
                                continue;
                            }
                            for &succ in graph.successors(idx) {
                                in_degree[succ] -= 1;
                                if in_degree[succ] == 0 && ready_tx.send(succ).is_ok() {
                                    in_flight += 1;
                                }
                            }
                        }
                        Err(error) => {
                            if failure.is_none() {
                                failure = Some(TaskFailure { task: idx, error });
                            }
                        }
                    }
                }
                Completion::Panicked => break,
            }
            if completed == graph.len() {
                break;
            }
        }

        // Closing the ready queue lets idle workers exit.
        drop(ready_tx);

        match failure {
            Some(f) => Err(f),
            None => Ok(report),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::{Access, BufferKind, BufferRef, Footprint};
    use crate::stage::Stage;
    use rowband_core::RegionId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn chain_and_fan(regions: u32) -> TaskGraph {
        // One writer per region, then one reader per region of its own
        // buffer: readers depend on exactly their writer.
        let mut nodes = Vec::new();
        for stage in [Stage::SpecAdvance, Stage::SpecUpdate] {
            for r in 0..regions {
                let access = if stage == Stage::SpecAdvance {
                    Access::Write
                } else {
                    Access::Read
                };
                nodes.push(TaskNode {
                    stage,
                    region: RegionId(r),
                    footprint: Footprint::new()
                        .with_whole(BufferRef::new(RegionId(r), BufferKind::Current), access),
                });
            }
        }
        TaskGraph::build(nodes)
    }

    fn assert_respects_edges(graph: &TaskGraph, order: &[usize]) {
        let mut pos = vec![usize::MAX; graph.len()];
        for (p, &t) in order.iter().enumerate() {
            pos[t] = p;
        }
        for j in 0..graph.len() {
            for &i in graph.predecessors(j) {
                assert!(pos[i] < pos[j], "task {j} ran before its predecessor {i}");
            }
        }
    }

    #[test]
    fn serial_runs_in_program_order() {
        let g = chain_and_fan(3);
        let order = Mutex::new(Vec::new());
        let report = Scheduler::Serial
            .run(&g, |idx, _| -> Result<(), ()> {
                order.lock().unwrap().push(idx);
                Ok(())
            })
            .unwrap();
        assert_eq!(report.tasks_run, 6);
        assert_eq!(order.into_inner().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn threaded_respects_dependencies() {
        let g = chain_and_fan(8);
        for _ in 0..20 {
            let order = Mutex::new(Vec::new());
            let report = Scheduler::Threaded { workers: 4 }
                .run(&g, |idx, _| -> Result<(), ()> {
                    order.lock().unwrap().push(idx);
                    Ok(())
                })
                .unwrap();
            assert_eq!(report.tasks_run, g.len());
            let order = order.into_inner().unwrap();
            assert_eq!(order.len(), g.len());
            assert_respects_edges(&g, &order);
        }
    }

    #[test]
    fn serial_stops_at_first_failure() {
        let g = chain_and_fan(3);
        let ran = AtomicUsize::new(0);
        let err = Scheduler::Serial
            .run(&g, |idx, _| {
                ran.fetch_add(1, Ordering::SeqCst);
                if idx == 1 {
                    Err("boom")
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert_eq!(err.task, 1);
        assert_eq!(err.error, "boom");
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn threaded_failure_blocks_dependents() {
        let g = chain_and_fan(4);
        let ran = Mutex::new(Vec::new());
        let err = Scheduler::Threaded { workers: 3 }
            .run(&g, |idx, _| {
                ran.lock().unwrap().push(idx);
                if idx == 2 {
                    Err("fail")
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert_eq!(err.task, 2);
        // The reader of region 2 (task 6) never runs.
        assert!(!ran.into_inner().unwrap().contains(&6));
    }

    #[test]
    fn threaded_handles_empty_graph() {
        let g = TaskGraph::build(Vec::new());
        let report = Scheduler::Threaded { workers: 4 }
            .run(&g, |_, _| -> Result<(), ()> { Ok(()) })
            .unwrap();
        assert_eq!(report.tasks_run, 0);
    }

    #[test]
    fn worker_count_is_at_least_one() {
        assert_eq!(Scheduler::Serial.worker_count(), 1);
        assert_eq!(Scheduler::Threaded { workers: 0 }.worker_count(), 1);
        assert_eq!(Scheduler::Threaded { workers: 6 }.worker_count(), 6);
    }
}
