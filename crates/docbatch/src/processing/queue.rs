//! FIFO queue of pending file tasks
//!
//! Not synchronized on its own: the pool keeps it inside its state mutex so
//! picking, feeding and clearing are atomic with the run-state flags.

use std::collections::VecDeque;

use crate::types::FileTask;

#[derive(Debug, Default)]
pub struct WorkQueue {
    tasks: VecDeque<FileTask>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append tasks at the tail
    pub fn feed<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = FileTask>,
    {
        self.tasks.extend(tasks);
    }

    /// Pop the head
    pub fn pick(&mut self) -> Option<FileTask> {
        self.tasks.pop_front()
    }

    /// Drop every pending task, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.tasks.len();
        self.tasks.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn tasks(count: usize) -> Vec<FileTask> {
        (0..count)
            .map(|i| FileTask::new(format!("/in/{}.pdf", i), format!("{}.pdf", i)))
            .collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = WorkQueue::new();
        queue.feed(tasks(3));
        let order: Vec<_> = std::iter::from_fn(|| queue.pick())
            .map(|t| t.relative_path().to_string_lossy().into_owned())
            .collect();
        assert_eq!(order, vec!["0.pdf", "1.pdf", "2.pdf"]);
        assert!(queue.pick().is_none());
    }

    #[test]
    fn test_clear_reports_dropped() {
        let mut queue = WorkQueue::new();
        queue.feed(tasks(5));
        assert_eq!(queue.clear(), 5);
        assert!(queue.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn concurrent_picks_deliver_each_task_once(count in 0usize..200, pickers in 1usize..8) {
            let queue = Arc::new(Mutex::new(WorkQueue::new()));
            queue.lock().feed(tasks(count));

            let handles: Vec<_> = (0..pickers)
                .map(|_| {
                    let queue = Arc::clone(&queue);
                    std::thread::spawn(move || {
                        let mut picked = Vec::new();
                        while let Some(task) = queue.lock().pick() {
                            picked.push(task.source().to_path_buf());
                        }
                        picked
                    })
                })
                .collect();

            let all: Vec<_> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
            let unique: HashSet<_> = all.iter().cloned().collect();
            prop_assert_eq!(all.len(), count);
            prop_assert_eq!(unique.len(), count);
        }
    }
}
