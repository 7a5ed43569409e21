//! Tabular Q-table, mutex-guarded with short-held critical sections.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct QTable {
    values: Mutex<HashMap<(u64, usize), f64>>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, state: u64, action: usize) -> f64 {
        self.values.lock().expect("q-table mutex poisoned").get(&(state, action)).copied().unwrap_or(0.0)
    }

    pub fn max_value(&self, state: u64, num_actions: usize) -> f64 {
        let table = self.values.lock().expect("q-table mutex poisoned");
        (0..num_actions).map(|a| table.get(&(state, a)).copied().unwrap_or(0.0)).fold(f64::NEG_INFINITY, f64::max).max(0.0)
    }

    /// Q(s,a) <- Q(s,a) + alpha * (r + gamma * max_a' Q(s',a') - Q(s,a)).
    pub fn update(&self, state: u64, action: usize, reward: f64, next_state: u64, next_num_actions: usize, alpha: f64, gamma: f64) {
        let next_max = self.max_value(next_state, next_num_actions);
        let mut table = self.values.lock().expect("q-table mutex poisoned");
        let current = table.get(&(state, action)).copied().unwrap_or(0.0);
        let updated = current + alpha * (reward + gamma * next_max - current);
        table.insert((state, action), updated);
    }

    pub fn len(&self) -> usize {
        self.values.lock().expect("q-table mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_moves_the_value_towards_the_bellman_target() {
        let table = QTable::new();
        table.update(1, 0, 10.0, 2, 3, 0.5, 0.9);
        let v = table.value(1, 0);
        assert!(v > 0.0 && v < 10.0);
    }
}
