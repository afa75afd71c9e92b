//! # Scheduler
//!
//! Core scheduling state and policy: a fixed task table, a FIFO ready
//! queue threaded through the control blocks, and the current/pending
//! pointers the context-switch handlers operate on.
//!
//! The policy is plain round-robin over an explicit queue: whoever was
//! scheduled first runs next. Tasks only leave the CPU at a yield, so the
//! queue stays short and an O(queue length) append is fine.
//!
//! Everything here is plain data manipulation with no hardware access,
//! which is what lets the whole state machine run under host tests. The
//! callers in `kernel` and `arch` are responsible for masking interrupts
//! around these methods; see the concurrency notes on each.

use crate::config::TASK_COUNT;
use crate::frame::build_initial_frame;
use crate::task::{check_id, TaskControlBlock, TaskState};

/// The central scheduler state: task table, ready queue and the two
/// process-wide task pointers (as indices, not addresses).
///
/// One instance lives as a global in `kernel.rs`; the methods take
/// `&mut self` so the state machine can also be driven by a host test
/// owning a local instance.
pub struct Scheduler {
    /// Fixed task table, indexed by caller-assigned identifier.
    tasks: [TaskControlBlock; TASK_COUNT],

    /// Identifier of the task whose code is executing (or, between a yield
    /// decision and the switch completing, the one being switched away
    /// from).
    current: usize,

    /// The pending-switch slot. Non-empty only between a yield deciding a
    /// switch is needed and the switch handler finishing the transfer;
    /// the handler clearing it is the completion signal.
    pending: Option<usize>,

    /// Head of the ready queue; the links live in each TCB's `next` field.
    ready_head: Option<usize>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            tasks: [TaskControlBlock::EMPTY; TASK_COUNT],
            current: crate::config::MAIN_TASK_ID,
            pending: None,
            ready_head: None,
        }
    }

    /// Build the initial frame for `entry` on `stack` and park the task at
    /// `id` as `Stopped`. Does not schedule it.
    ///
    /// The slot must not belong to a live task: re-creating a `Running` or
    /// `Scheduled` task is a caller bug (it would corrupt the queue or the
    /// saved context of the code currently executing).
    pub fn create(&mut self, id: usize, entry: extern "C" fn(), stack: &mut [u8]) {
        check_id(id);
        debug_assert!(
            self.tasks[id].state == TaskState::Stopped,
            "task id already in use"
        );

        self.tasks[id].stack_pointer = build_initial_frame(entry, stack);
        #[cfg(feature = "fpu")]
        {
            self.tasks[id].exc_return = crate::arch::cortex_m4::EXC_RETURN_THREAD_PSP;
        }
        self.tasks[id].state = TaskState::Stopped;
        self.tasks[id].next = None;
    }

    /// Append the task at `id` to the tail of the ready queue.
    ///
    /// Scheduling a task that is already queued is a caller bug; the append
    /// would loop the intrusive list. The running task may schedule itself
    /// ahead of a yield, which is how it asks for another turn.
    pub fn schedule(&mut self, id: usize) {
        check_id(id);
        debug_assert!(
            self.tasks[id].state != TaskState::Scheduled,
            "task already scheduled"
        );

        self.tasks[id].state = TaskState::Scheduled;
        self.tasks[id].next = None;

        match self.ready_head {
            None => self.ready_head = Some(id),
            Some(head) => {
                let mut tail = head;
                while let Some(next) = self.tasks[tail].next {
                    tail = next;
                }
                self.tasks[tail].next = Some(id);
            }
        }
    }

    /// Pop the head of the ready queue, clearing its link.
    fn dequeue(&mut self) -> Option<usize> {
        let head = self.ready_head?;
        self.ready_head = self.tasks[head].next.take();
        Some(head)
    }

    /// The yield decision: if anything is ready, promote the queue head to
    /// `Running`, demote the current task, and arm the pending-switch slot.
    /// Returns `false` when the queue is empty and the caller should idle.
    ///
    /// Must run with interrupts masked: it reads and writes the queue that
    /// interrupt handlers may append to via `schedule`.
    ///
    /// The current task keeps its state if it re-scheduled itself (it is
    /// then `Scheduled`, sitting in the queue); otherwise it becomes
    /// `Stopped` and will not run again until something schedules it.
    pub fn try_switch(&mut self) -> bool {
        debug_assert!(self.pending.is_none(), "switch already pending");

        let Some(next) = self.dequeue() else {
            return false;
        };

        if self.tasks[self.current].state == TaskState::Running {
            self.tasks[self.current].state = TaskState::Stopped;
        }
        self.tasks[next].state = TaskState::Running;
        self.pending = Some(next);
        true
    }

    /// Complete a pending switch: record the outgoing stack pointer,
    /// publish the incoming task as current, and clear the pending slot.
    /// Returns the stack pointer to resume from.
    ///
    /// Called from the switch handler with interrupts masked. When the
    /// pending task is the current one (or nothing is pending at all) the
    /// transfer is a no-op and the caller's own stack pointer comes back.
    #[cfg(not(feature = "fpu"))]
    pub fn switch_to_pending(&mut self, psp: *mut u32) -> *mut u32 {
        match self.pending.take() {
            Some(next) if next != self.current => {
                self.tasks[self.current].stack_pointer = psp;
                self.current = next;
                self.tasks[next].stack_pointer
            }
            _ => psp,
        }
    }

    /// Complete a pending switch, additionally exchanging the EXC_RETURN
    /// codes so a save that stacked the FPU bank gets a matching restore.
    /// Returns the stack pointer and EXC_RETURN to resume with.
    #[cfg(feature = "fpu")]
    pub fn switch_to_pending(&mut self, psp: *mut u32, exc_return: u32) -> (*mut u32, u32) {
        match self.pending.take() {
            Some(next) if next != self.current => {
                self.tasks[self.current].stack_pointer = psp;
                self.tasks[self.current].exc_return = exc_return;
                self.current = next;
                (self.tasks[next].stack_pointer, self.tasks[next].exc_return)
            }
            _ => (psp, exc_return),
        }
    }

    /// Install `id` as the running task without a context transfer. Used
    /// once at startup for the main task, whose first "restore" is done by
    /// the first-dispatch handler.
    pub fn adopt_running(&mut self, id: usize) {
        check_id(id);
        self.tasks[id].state = TaskState::Running;
        self.current = id;
        self.pending = None;
    }

    /// Saved stack pointer of the current task, for the first dispatch.
    pub fn current_stack_pointer(&self) -> *mut u32 {
        self.tasks[self.current].stack_pointer
    }

    /// Saved EXC_RETURN of the current task, for the first dispatch.
    #[cfg(feature = "fpu")]
    pub fn current_exc_return(&self) -> u32 {
        self.tasks[self.current].exc_return
    }

    /// Stored status of the task at `id`. Pure read.
    pub fn state(&self, id: usize) -> TaskState {
        check_id(id);
        self.tasks[id].state
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAIN_TASK_ID;

    extern "C" fn body() {}

    /// Build a scheduler with a synthetic running task 0, the way `start`
    /// leaves the real one.
    fn booted(stacks: &mut [[u8; 256]]) -> Scheduler {
        let mut s = Scheduler::new();
        s.create(MAIN_TASK_ID, body, &mut stacks[0]);
        s.adopt_running(MAIN_TASK_ID);
        s
    }

    /// Drive one full yield-plus-switch cycle and return the task that
    /// became current.
    fn yield_once(s: &mut Scheduler) -> usize {
        assert!(s.try_switch());
        let mut fake_psp = [0u32; 4];
        #[cfg(not(feature = "fpu"))]
        s.switch_to_pending(fake_psp.as_mut_ptr());
        #[cfg(feature = "fpu")]
        s.switch_to_pending(
            fake_psp.as_mut_ptr(),
            crate::arch::cortex_m4::EXC_RETURN_THREAD_PSP,
        );
        s.current
    }

    fn running_count(s: &Scheduler) -> usize {
        (0..TASK_COUNT)
            .filter(|&id| s.state(id) == TaskState::Running)
            .count()
    }

    #[test]
    fn tasks_run_in_the_order_they_were_scheduled() {
        let mut stacks = [[0u8; 256]; 4];
        let (head, rest) = stacks.split_at_mut(1);
        let mut s = booted(head);

        for (i, stack) in rest.iter_mut().enumerate() {
            s.create(i + 1, body, stack);
        }
        s.schedule(2);
        s.schedule(1);
        s.schedule(3);

        assert_eq!(yield_once(&mut s), 2);
        assert_eq!(yield_once(&mut s), 1);
        assert_eq!(yield_once(&mut s), 3);
    }

    #[test]
    fn exactly_one_task_runs_at_every_step() {
        let mut stacks = [[0u8; 256]; 3];
        let (head, rest) = stacks.split_at_mut(1);
        let mut s = booted(head);

        for (i, stack) in rest.iter_mut().enumerate() {
            s.create(i + 1, body, stack);
            s.schedule(i + 1);
        }
        assert_eq!(running_count(&s), 1);

        while s.try_switch() {
            assert_eq!(running_count(&s), 1);
            let mut fake_psp = [0u32; 4];
            #[cfg(not(feature = "fpu"))]
            s.switch_to_pending(fake_psp.as_mut_ptr());
            #[cfg(feature = "fpu")]
            s.switch_to_pending(
                fake_psp.as_mut_ptr(),
                crate::arch::cortex_m4::EXC_RETURN_THREAD_PSP,
            );
            assert_eq!(running_count(&s), 1);
        }
    }

    #[test]
    fn yielding_without_rescheduling_stops_the_task_for_good() {
        let mut stacks = [[0u8; 256]; 2];
        let (head, rest) = stacks.split_at_mut(1);
        let mut s = booted(head);
        s.create(1, body, &mut rest[0]);
        s.schedule(1);

        assert_eq!(yield_once(&mut s), 1);
        assert_eq!(s.state(MAIN_TASK_ID), TaskState::Stopped);

        // Nothing re-enqueued the old task, so the queue is now empty.
        assert!(!s.try_switch());
        assert_eq!(s.state(1), TaskState::Running);
    }

    #[test]
    fn a_task_that_reschedules_itself_keeps_its_turn_coming() {
        let mut stacks = [[0u8; 256]; 2];
        let (head, rest) = stacks.split_at_mut(1);
        let mut s = booted(head);
        s.create(1, body, &mut rest[0]);

        // Current task asks for another turn before yielding.
        s.schedule(1);
        s.schedule(MAIN_TASK_ID);
        assert_eq!(s.state(MAIN_TASK_ID), TaskState::Scheduled);

        assert_eq!(yield_once(&mut s), 1);
        // The old current is still queued, not stopped.
        assert_eq!(s.state(MAIN_TASK_ID), TaskState::Scheduled);
        assert_eq!(yield_once(&mut s), MAIN_TASK_ID);
        assert_eq!(s.state(MAIN_TASK_ID), TaskState::Running);
    }

    #[test]
    fn switching_to_the_current_task_is_a_no_op_transfer() {
        let mut stacks = [[0u8; 256]; 1];
        let mut s = booted(&mut stacks);

        // Only the current task is ready: yield picks it right back.
        s.schedule(MAIN_TASK_ID);
        assert!(s.try_switch());

        let before = s.current_stack_pointer();
        let mut fake_psp = [0u32; 4];
        #[cfg(not(feature = "fpu"))]
        let resumed = s.switch_to_pending(fake_psp.as_mut_ptr());
        #[cfg(feature = "fpu")]
        let (resumed, _) = s.switch_to_pending(
            fake_psp.as_mut_ptr(),
            crate::arch::cortex_m4::EXC_RETURN_THREAD_PSP,
        );

        // The live stack pointer comes straight back and the saved one is
        // untouched: nothing was transferred.
        assert_eq!(resumed, fake_psp.as_mut_ptr());
        assert_eq!(s.current_stack_pointer(), before);
        assert_eq!(s.state(MAIN_TASK_ID), TaskState::Running);
    }

    #[test]
    fn spurious_switch_with_nothing_pending_changes_nothing() {
        let mut stacks = [[0u8; 256]; 1];
        let mut s = booted(&mut stacks);

        let mut fake_psp = [0u32; 4];
        #[cfg(not(feature = "fpu"))]
        let resumed = s.switch_to_pending(fake_psp.as_mut_ptr());
        #[cfg(feature = "fpu")]
        let (resumed, _) = s.switch_to_pending(
            fake_psp.as_mut_ptr(),
            crate::arch::cortex_m4::EXC_RETURN_THREAD_PSP,
        );
        assert_eq!(resumed, fake_psp.as_mut_ptr());
        assert_eq!(s.current, MAIN_TASK_ID);
    }

    #[test]
    fn stopped_task_can_be_recreated_for_a_fresh_start() {
        let mut stacks = [[0u8; 256]; 2];
        let (head, rest) = stacks.split_at_mut(1);
        let mut s = booted(head);

        s.create(1, body, &mut rest[0]);
        let first_sp = {
            s.schedule(1);
            yield_once(&mut s);
            s.current_stack_pointer()
        };

        // Simulate the task finishing: switch back to a re-scheduled main.
        s.schedule(MAIN_TASK_ID);
        yield_once(&mut s);
        assert_eq!(s.state(1), TaskState::Stopped);

        // Re-creating rebuilds the initial frame at the top of the stack.
        s.create(1, body, &mut rest[0]);
        assert_eq!(s.tasks[1].stack_pointer, first_sp);
        assert_eq!(s.state(1), TaskState::Stopped);
    }

    #[test]
    fn two_task_handoff_scenario() {
        // Main creates A (1) and B (2), schedules A then B, and yields.
        // A runs, yields without rescheduling itself; B runs and finishes;
        // the system idles with B still the current task.
        let mut stacks = [[0u8; 256]; 3];
        let (head, rest) = stacks.split_at_mut(1);
        let mut s = booted(head);
        s.create(1, body, &mut rest[0]);
        s.create(2, body, &mut rest[1]);
        s.schedule(1);
        s.schedule(2);

        assert_eq!(yield_once(&mut s), 1); // A runs first
        assert_eq!(yield_once(&mut s), 2); // A yields, B runs
        assert!(!s.try_switch()); // B's finalizer finds nothing ready
        assert_eq!(s.state(1), TaskState::Stopped);
        assert_eq!(s.state(2), TaskState::Running);
        assert_eq!(s.state(MAIN_TASK_ID), TaskState::Stopped);
    }

    #[test]
    #[should_panic(expected = "task already scheduled")]
    fn double_scheduling_is_caught_in_debug() {
        let mut stacks = [[0u8; 256]; 2];
        let (head, rest) = stacks.split_at_mut(1);
        let mut s = booted(head);
        s.create(1, body, &mut rest[0]);
        s.schedule(1);
        s.schedule(1);
    }

    #[test]
    #[should_panic(expected = "task id already in use")]
    fn recreating_a_live_task_is_caught_in_debug() {
        let mut stacks = [[0u8; 256]; 2];
        let (head, rest) = stacks.split_at_mut(1);
        let mut s = booted(head);
        s.create(MAIN_TASK_ID, body, &mut rest[0]);
    }
}
