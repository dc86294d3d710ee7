// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred per-frame work.
//!
//! Scene mutations never repaint or re-index synchronously. They schedule a
//! task kind instead; scheduling the same kind again before the frame runs is
//! free. [`Scene::run_pending_tasks`](crate::Scene::run_pending_tasks) runs
//! one frame: every scheduled kind once, in declaration order.

bitflags::bitflags! {
    /// Coalesced task kinds, in the order a frame runs them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TaskQueue: u8 {
        /// Deliver polish events to newly added items.
        const POLISH = 1 << 0;
        /// Feed pending bounds changes to the spatial index.
        const UPDATE_INDEX = 1 << 1;
        /// Recompute transforms and bounds of dirty items and route repaints to views.
        const PROCESS_DIRTY = 1 << 2;
        /// Hand accumulated updates to views and observers.
        const EMIT_CHANGED = 1 << 3;
        /// Recompute the growing scene rect.
        const UPDATE_SCENE_RECT = 1 << 4;
    }
}

impl TaskQueue {
    /// Take the tasks due this frame, leaving the queue empty.
    pub(crate) fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

/// Counters of how often each task kind has run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames run by [`Scene::run_pending_tasks`](crate::Scene::run_pending_tasks) that had work.
    pub frames: u64,
    /// Polish passes.
    pub polish_runs: u64,
    /// Index update passes.
    pub index_runs: u64,
    /// Dirty processing passes.
    pub dirty_runs: u64,
    /// Changed-region emissions.
    pub emit_runs: u64,
    /// Scene rect recomputations.
    pub scene_rect_runs: u64,
}

impl FrameStats {
    pub(crate) fn record(&mut self, task: TaskQueue) {
        if task.contains(TaskQueue::POLISH) {
            self.polish_runs += 1;
        }
        if task.contains(TaskQueue::UPDATE_INDEX) {
            self.index_runs += 1;
        }
        if task.contains(TaskQueue::PROCESS_DIRTY) {
            self.dirty_runs += 1;
        }
        if task.contains(TaskQueue::EMIT_CHANGED) {
            self.emit_runs += 1;
        }
        if task.contains(TaskQueue::UPDATE_SCENE_RECT) {
            self.scene_rect_runs += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_coalesces() {
        let mut q = TaskQueue::empty();
        q |= TaskQueue::PROCESS_DIRTY;
        q |= TaskQueue::PROCESS_DIRTY;
        q |= TaskQueue::POLISH;
        let due = q.take();
        assert!(q.is_empty(), "taking drains the queue");
        assert_eq!(
            due.iter().count(),
            2,
            "each kind is scheduled at most once"
        );
    }

    #[test]
    fn stats_count_each_kind() {
        let mut s = FrameStats::default();
        s.record(TaskQueue::PROCESS_DIRTY | TaskQueue::EMIT_CHANGED);
        s.record(TaskQueue::PROCESS_DIRTY);
        assert_eq!(s.dirty_runs, 2, "two dirty passes");
        assert_eq!(s.emit_runs, 1, "one emission");
        assert_eq!(s.polish_runs, 0, "no polish");
    }
}
