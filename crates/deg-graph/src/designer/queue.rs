//! Insert and remove queues of the designer.
//!
//! Every request gets a strictly increasing manipulation index when it is
//! queued. The build loop always applies the queue head with the lower index,
//! so inserts and removes interleave in submission order.

use crate::graph::Label;
use deg_feature::FeatureVector;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub(crate) struct AddTask {
    pub label: Label,
    pub manipulation: u64,
    pub feature: FeatureVector,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RemoveTask {
    pub label: Label,
    pub manipulation: u64,
}

#[derive(Debug, Clone)]
pub(crate) enum Task {
    Add(AddTask),
    Remove(RemoveTask),
}

impl Task {
    pub fn label(&self) -> Label {
        match self {
            Task::Add(t) => t.label,
            Task::Remove(t) => t.label,
        }
    }

    pub fn manipulation(&self) -> u64 {
        match self {
            Task::Add(t) => t.manipulation,
            Task::Remove(t) => t.manipulation,
        }
    }
}

/// Two FIFO queues plus the labels touched by not yet applied requests.
#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    adds: VecDeque<AddTask>,
    removes: VecDeque<RemoveTask>,
    next_manipulation: u64,
    /// label -> (manipulation index, label exists afterwards) of the last queued request
    pending: HashMap<Label, (u64, bool)>,
}

impl TaskQueue {
    pub fn push_add(&mut self, label: Label, feature: FeatureVector) -> u64 {
        let manipulation = self.next_index();
        self.pending.insert(label, (manipulation, true));
        self.adds.push_back(AddTask {
            label,
            manipulation,
            feature,
        });
        manipulation
    }

    pub fn push_remove(&mut self, label: Label) -> u64 {
        let manipulation = self.next_index();
        self.pending.insert(label, (manipulation, false));
        self.removes.push_back(RemoveTask {
            label,
            manipulation,
        });
        manipulation
    }

    fn next_index(&mut self) -> u64 {
        let index = self.next_manipulation;
        self.next_manipulation += 1;
        index
    }

    /// Take the oldest request of both queues.
    pub fn pop_oldest(&mut self) -> Option<Task> {
        let add = self.adds.front().map(|t| t.manipulation).unwrap_or(u64::MAX);
        let remove = self
            .removes
            .front()
            .map(|t| t.manipulation)
            .unwrap_or(u64::MAX);

        if add == u64::MAX && remove == u64::MAX {
            return None;
        }
        if add < remove {
            self.adds.pop_front().map(Task::Add)
        } else {
            self.removes.pop_front().map(Task::Remove)
        }
    }

    /// Whether `label` exists once all queued requests are applied, `None`
    /// if no queued request touches it.
    pub fn pending_state(&self, label: Label) -> Option<bool> {
        self.pending.get(&label).map(|(_, exists)| *exists)
    }

    /// Forget the pending state of an applied request, unless a newer request
    /// for the same label is queued.
    pub fn complete(&mut self, label: Label, manipulation: u64) {
        if let Some((latest, _)) = self.pending.get(&label) {
            if *latest == manipulation {
                self.pending.remove(&label);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.adds.len() + self.removes.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }
}
