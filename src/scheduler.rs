//! Cooperative single-threaded task queue with a virtual clock.
//!
//! Every deferred piece of work in the engine (debounced writes, tag
//! definitions, connection callbacks, the end of a channel suppression
//! window) is a task here. Tasks are ordered by `(due time, sequence)`; a
//! *turn* runs the tasks that were due when the turn started, and anything
//! scheduled during a turn waits for a later one.
//!
//! The clock only moves when the owner asks: [`advance`] and
//! [`run_until_idle`] jump it forward deterministically, while [`run`]
//! follows tokio's clock and sleeps between due tasks.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle of a scheduled task, used for cancellation.
    pub struct TaskId;
}

type TaskFn<C> = Box<dyn FnOnce(&mut C)>;

struct Task<C> {
    key: (Duration, u64),
    label: &'static str,
    run: TaskFn<C>,
}

/// Deferred-task queue for a context `C` (usually the [`Host`](crate::host::Host)).
pub struct Scheduler<C> {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), TaskId>,
    tasks: SlotMap<TaskId, Task<C>>,
}

impl<C> Scheduler<C> {
    /// Create an empty scheduler at time zero.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BTreeMap::new(),
            tasks: SlotMap::with_key(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run `f` once `delay` has elapsed, after all tasks already due by then.
    pub fn schedule(
        &mut self,
        delay: Duration,
        label: &'static str,
        f: impl FnOnce(&mut C) + 'static,
    ) -> TaskId {
        let key = (self.now + delay, self.next_seq);
        self.next_seq += 1;
        let id = self.tasks.insert(Task {
            key,
            label,
            run: Box::new(f),
        });
        self.queue.insert(key, id);
        id
    }

    /// Run `f` on the next turn.
    pub fn defer(&mut self, label: &'static str, f: impl FnOnce(&mut C) + 'static) -> TaskId {
        self.schedule(Duration::ZERO, label, f)
    }

    /// Cancel a pending task. Returns `false` if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.tasks.remove(id) {
            Some(task) => {
                self.queue.remove(&task.key);
                tracing::trace!(label = task.label, "task cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether `id` is still waiting to run.
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Number of pending tasks.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is pending.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Due time of the earliest pending task.
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Whether some task is due now.
    pub fn has_ready(&self) -> bool {
        self.next_due().is_some_and(|due| due <= self.now)
    }

    /// Move the clock forward to `time` (never backwards).
    pub fn advance_to(&mut self, time: Duration) {
        self.now = self.now.max(time);
    }

    /// Tasks due now, in queue order.
    fn ready_batch(&self) -> Vec<TaskId> {
        self.queue
            .range(..=(self.now, u64::MAX))
            .map(|(_, id)| *id)
            .collect()
    }

    /// Remove a task so it can be run outside the scheduler borrow.
    fn take(&mut self, id: TaskId) -> Option<(&'static str, TaskFn<C>)> {
        let task = self.tasks.remove(id)?;
        self.queue.remove(&task.key);
        Some((task.label, task.run))
    }
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("pending", &self.tasks.len())
            .finish()
    }
}

/// A context that owns its own scheduler.
pub trait HasScheduler: Sized {
    /// The scheduler whose tasks run against `self`.
    fn scheduler(&mut self) -> &mut Scheduler<Self>;
}

/// Summary of a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Drain {
    /// Tasks executed.
    pub tasks_run: usize,
    /// Turns executed.
    pub turns: usize,
    /// Whether the task budget ran out with work still pending.
    pub exhausted: bool,
}

/// Run one turn: every task due at the start of the turn, in order.
///
/// Tasks cancelled by an earlier task of the same turn are skipped.
/// Returns the number of tasks run.
pub fn turn<C: HasScheduler>(ctx: &mut C) -> usize {
    let batch = ctx.scheduler().ready_batch();
    let mut ran = 0;
    for id in batch {
        if let Some((label, task)) = ctx.scheduler().take(id) {
            tracing::trace!(label, "running task");
            task(ctx);
            ran += 1;
        }
    }
    ran
}

/// Move the clock forward by `by`, running every task that falls due.
pub fn advance<C: HasScheduler>(ctx: &mut C, by: Duration) -> Drain {
    let target = ctx.scheduler().now() + by;
    let mut drain = Drain::default();
    loop {
        while ctx.scheduler().has_ready() {
            drain.tasks_run += turn(ctx);
            drain.turns += 1;
        }
        match ctx.scheduler().next_due() {
            Some(due) if due <= target => ctx.scheduler().advance_to(due),
            _ => break,
        }
    }
    ctx.scheduler().advance_to(target);
    drain
}

/// Run until no task is pending, jumping the clock to each due time.
///
/// Stops early once `max_tasks` tasks have run, reporting `exhausted`, so a
/// task that keeps rescheduling itself cannot hang the caller.
pub fn run_until_idle<C: HasScheduler>(ctx: &mut C, max_tasks: usize) -> Drain {
    let mut drain = Drain::default();
    while let Some(due) = ctx.scheduler().next_due() {
        if drain.tasks_run >= max_tasks {
            drain.exhausted = true;
            tracing::warn!(max_tasks, "task budget exhausted with work still pending");
            break;
        }
        ctx.scheduler().advance_to(due);
        drain.tasks_run += turn(ctx);
        drain.turns += 1;
    }
    drain
}

/// Drive the scheduler on tokio's clock until it is idle.
///
/// Virtual time is anchored to the tokio instant at which this is called;
/// between due tasks the future sleeps.
pub async fn run<C: HasScheduler>(ctx: &mut C) -> Drain {
    let started = tokio::time::Instant::now();
    let origin = started.checked_sub(ctx.scheduler().now()).unwrap_or(started);
    let mut drain = Drain::default();
    while let Some(due) = ctx.scheduler().next_due() {
        if due > ctx.scheduler().now() {
            tokio::time::sleep_until(origin + due).await;
            ctx.scheduler().advance_to(due);
        }
        drain.tasks_run += turn(ctx);
        drain.turns += 1;
    }
    drain
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Ctx {
        scheduler: Scheduler<Ctx>,
        log: Vec<String>,
        victim: Option<TaskId>,
    }

    impl HasScheduler for Ctx {
        fn scheduler(&mut self) -> &mut Scheduler<Self> {
            &mut self.scheduler
        }
    }

    fn push(label: &'static str) -> impl FnOnce(&mut Ctx) {
        move |ctx: &mut Ctx| ctx.log.push(label.to_owned())
    }

    // ── Ordering ─────────────────────────────────────────────────────

    #[test]
    fn defer_runs_in_queue_order() {
        let mut ctx = Ctx::default();
        ctx.scheduler.defer("a", push("a"));
        ctx.scheduler.defer("b", push("b"));
        assert_eq!(turn(&mut ctx), 2);
        assert_eq!(ctx.log, vec!["a", "b"]);
    }

    #[test]
    fn nothing_runs_synchronously() {
        let mut ctx = Ctx::default();
        ctx.scheduler.defer("a", push("a"));
        assert!(ctx.log.is_empty());
        assert_eq!(ctx.scheduler.pending(), 1);
    }

    #[test]
    fn tasks_scheduled_during_a_turn_wait() {
        let mut ctx = Ctx::default();
        ctx.scheduler.defer("outer", |ctx: &mut Ctx| {
            ctx.log.push("outer".into());
            ctx.scheduler.defer("inner", push("inner"));
        });
        turn(&mut ctx);
        assert_eq!(ctx.log, vec!["outer"]);
        turn(&mut ctx);
        assert_eq!(ctx.log, vec!["outer", "inner"]);
    }

    #[test]
    fn delayed_tasks_wait_for_clock() {
        let mut ctx = Ctx::default();
        ctx.scheduler.schedule(Duration::from_millis(10), "late", push("late"));
        ctx.scheduler.defer("now", push("now"));
        assert_eq!(turn(&mut ctx), 1);
        assert_eq!(ctx.log, vec!["now"]);
        advance(&mut ctx, Duration::from_millis(9));
        assert_eq!(ctx.log.len(), 1);
        advance(&mut ctx, Duration::from_millis(1));
        assert_eq!(ctx.log, vec!["now", "late"]);
        assert_eq!(ctx.scheduler.now(), Duration::from_millis(10));
    }

    // ── Cancellation ─────────────────────────────────────────────────

    #[test]
    fn cancel_pending_task() {
        let mut ctx = Ctx::default();
        let id = ctx.scheduler.defer("a", push("a"));
        assert!(ctx.scheduler.is_pending(id));
        assert!(ctx.scheduler.cancel(id));
        assert!(!ctx.scheduler.cancel(id));
        assert_eq!(turn(&mut ctx), 0);
        assert!(ctx.log.is_empty());
    }

    #[test]
    fn cancel_within_same_turn() {
        let mut ctx = Ctx::default();
        ctx.scheduler.defer("canceller", |ctx: &mut Ctx| {
            ctx.log.push("canceller".into());
            if let Some(victim) = ctx.victim.take() {
                ctx.scheduler.cancel(victim);
            }
        });
        ctx.victim = Some(ctx.scheduler.defer("victim", push("victim")));
        assert_eq!(turn(&mut ctx), 1);
        assert_eq!(ctx.log, vec!["canceller"]);
        assert!(ctx.scheduler.is_idle());
    }

    // ── Drains ───────────────────────────────────────────────────────

    #[test]
    fn run_until_idle_jumps_clock() {
        let mut ctx = Ctx::default();
        ctx.scheduler.schedule(Duration::from_secs(5), "b", push("b"));
        ctx.scheduler.schedule(Duration::from_secs(1), "a", push("a"));
        let drain = run_until_idle(&mut ctx, 100);
        assert_eq!(ctx.log, vec!["a", "b"]);
        assert_eq!(drain.tasks_run, 2);
        assert!(!drain.exhausted);
        assert!(ctx.scheduler.is_idle());
        assert_eq!(ctx.scheduler.now(), Duration::from_secs(5));
    }

    #[test]
    fn run_until_idle_is_bounded() {
        fn forever(ctx: &mut Ctx) {
            ctx.log.push("tick".into());
            ctx.scheduler.defer("forever", forever);
        }
        let mut ctx = Ctx::default();
        ctx.scheduler.defer("forever", forever);
        let drain = run_until_idle(&mut ctx, 50);
        assert!(drain.exhausted);
        assert_eq!(drain.tasks_run, 50);
        assert_eq!(ctx.log.len(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn run_follows_tokio_clock() {
        let mut ctx = Ctx::default();
        ctx.scheduler.schedule(Duration::from_millis(30), "b", push("b"));
        ctx.scheduler.defer("a", push("a"));
        let started = tokio::time::Instant::now();
        let drain = run(&mut ctx).await;
        assert_eq!(ctx.log, vec!["a", "b"]);
        assert_eq!(drain.tasks_run, 2);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
