use parking_lot::RwLock;
use ren_abi::RenSeriesHandle;
use ren_values::Series;

/// Series storage behind an engine's cells.
///
/// Released slots go on a free list and are handed out again by `alloc`.
pub(crate) struct SeriesHeap {
    slots: RwLock<Slots>,
}

struct Slots {
    series: Vec<Option<Series>>,
    free: Vec<u32>,
}

impl SeriesHeap {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        SeriesHeap {
            slots: RwLock::new(Slots {
                series: Vec::with_capacity(capacity),
                free: Vec::new(),
            }),
        }
    }

    pub(crate) fn alloc(&self, series: Series) -> RenSeriesHandle {
        let mut slots = self.slots.write();
        match slots.free.pop() {
            Some(index) => {
                slots.series[index as usize] = Some(series);
                RenSeriesHandle(index)
            }
            None => {
                slots.series.push(Some(series));
                RenSeriesHandle((slots.series.len() - 1) as u32)
            }
        }
    }

    pub(crate) fn get(&self, handle: RenSeriesHandle) -> Option<Series> {
        self.slots
            .read()
            .series
            .get(handle.0 as usize)
            .and_then(|slot| slot.clone())
    }

    /// Free `handle`. Releasing an empty or unknown slot does nothing.
    pub(crate) fn release(&self, handle: RenSeriesHandle) {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.series.get_mut(handle.0 as usize) {
            if slot.take().is_some() {
                slots.free.push(handle.0);
            }
        }
    }

    /// Live series.
    pub(crate) fn len(&self) -> usize {
        let slots = self.slots.read();
        slots.series.len() - slots.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn text(s: &str) -> Series {
        Series::Text(Arc::from(s))
    }

    #[test]
    fn released_slots_are_reused() {
        let heap = SeriesHeap::with_capacity(4);
        let a = heap.alloc(text("a"));
        let b = heap.alloc(text("b"));
        assert_eq!(heap.len(), 2);

        heap.release(a);
        heap.release(a);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.get(a), None);
        assert_eq!(heap.get(b), Some(text("b")));

        let c = heap.alloc(text("c"));
        assert_eq!(c, a);
        assert_eq!(heap.get(c), Some(text("c")));
        heap.release(RenSeriesHandle(99));
        assert_eq!(heap.len(), 2);
    }
}
