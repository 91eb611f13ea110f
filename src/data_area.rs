use std::collections::VecDeque;

use montylib::{Fault, Value};


/// Selects which end of the data area `push` and `pop` work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// LIFO: push and pop at the front.
    #[default]
    Stack,
    /// Push at the back so the front reads oldest first. `pop` also works at the back,
    /// so it removes the newest value.
    Queue,
}


/// The cells manipulated by a running program. The front is the top of the stack.
#[derive(Debug, Default)]
pub struct DataArea {
    cells: VecDeque<Value>,
}

impl DataArea {

    pub fn new() -> Self {
        Self {
            cells: VecDeque::new()
        }
    }


    pub fn len(&self) -> usize {
        self.cells.len()
    }


    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }


    /// Make room for one more cell without aborting the process when memory runs out.
    fn reserve_cell(&mut self) -> Result<(), Fault> {
        self.cells.try_reserve(1)
            .map_err(|_| Fault::AllocationFailure)
    }


    pub fn insert_front(&mut self, value: Value) -> Result<(), Fault> {
        self.reserve_cell()?;
        self.cells.push_front(value);
        Ok(())
    }


    pub fn insert_back(&mut self, value: Value) -> Result<(), Fault> {
        self.reserve_cell()?;
        self.cells.push_back(value);
        Ok(())
    }


    /// Insert at the end `mode` pushes to.
    pub fn insert(&mut self, mode: Mode, value: Value) -> Result<(), Fault> {
        match mode {
            Mode::Stack => self.insert_front(value),
            Mode::Queue => self.insert_back(value),
        }
    }


    pub fn remove_front(&mut self) -> Option<Value> {
        self.cells.pop_front()
    }


    pub fn remove_back(&mut self) -> Option<Value> {
        self.cells.pop_back()
    }


    /// Remove from the end `mode` pops from.
    pub fn remove_matching_end(&mut self, mode: Mode) -> Option<Value> {
        match mode {
            Mode::Stack => self.remove_front(),
            Mode::Queue => self.remove_back(),
        }
    }


    pub fn peek_front(&self) -> Option<Value> {
        self.cells.front().copied()
    }


    /// Value at `index` cells from the front.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.cells.get(index).copied()
    }


    /// Values from front to back. Each call starts a fresh traversal.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.cells.iter().copied()
    }


    /// Exchange the two front-most values. Areas shorter than two are left untouched.
    pub fn swap_front(&mut self) {
        if self.cells.len() > 1 {
            self.cells.swap(0, 1);
        }
    }


    /// Move the front value to the back.
    pub fn rotate_left(&mut self) {
        if self.cells.len() > 1 {
            self.cells.rotate_left(1);
        }
    }


    /// Move the back value to the front.
    pub fn rotate_right(&mut self) {
        if self.cells.len() > 1 {
            self.cells.rotate_right(1);
        }
    }


    /// Free every remaining cell and return how many there were.
    /// Calling it again on a released area frees nothing.
    pub fn release_all(&mut self) -> usize {
        let released = self.cells.len();
        self.cells.clear();
        self.cells.shrink_to_fit();
        released
    }

}
