use std::collections::TryReserveError;

/// Sparse row storage.
///
/// Allocated rows live back to back in one arena; `slots[i]` holds the
/// arena position of row `i`, or `None` when the row was never loaded.
#[derive(Debug, Clone)]
pub struct RowStore<T> {
    width: usize,
    slots: Vec<Option<usize>>,
    arena: Vec<T>,
}

impl<T: Copy> RowStore<T> {
    pub fn new(num_rows: usize, width: usize) -> Self {
        Self {
            width,
            slots: vec![None; num_rows],
            arena: Vec::new(),
        }
    }

    /// Like [`RowStore::new`], but reports a slot table that cannot be
    /// allocated instead of aborting.
    pub fn try_new(num_rows: usize, width: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(num_rows)?;
        slots.resize(num_rows, None);
        Ok(Self {
            width,
            slots,
            arena: Vec::new(),
        })
    }

    /// Unloads every row. The arena keeps its capacity.
    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.arena.clear();
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_allocated(&self, row: usize) -> bool {
        matches!(self.slots.get(row), Some(Some(_)))
    }

    pub fn allocated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Indices of the loaded rows, north to south.
    pub fn allocated(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|_| i))
    }

    /// Reserves arena space for `extra` more rows without aborting on
    /// exhaustion.
    pub fn try_reserve_rows(&mut self, extra: usize) -> Result<(), TryReserveError> {
        let cells = extra.saturating_mul(self.width);
        self.arena.try_reserve_exact(cells)
    }

    /// Allocates `row` filled with `fill`. No-op when already present.
    pub fn allocate(&mut self, row: usize, fill: T) {
        if row >= self.slots.len() || self.slots[row].is_some() {
            return;
        }
        let pos = self.arena.len() / self.width.max(1);
        self.arena.resize(self.arena.len() + self.width, fill);
        self.slots[row] = Some(pos);
    }

    pub fn get(&self, row: usize) -> Option<&[T]> {
        let pos = (*self.slots.get(row)?)?;
        let start = pos * self.width;
        Some(&self.arena[start..start + self.width])
    }

    pub fn get_mut(&mut self, row: usize) -> Option<&mut [T]> {
        let pos = (*self.slots.get(row)?)?;
        let start = pos * self.width;
        Some(&mut self.arena[start..start + self.width])
    }
}
