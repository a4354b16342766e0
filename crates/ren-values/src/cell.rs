//! Codecs between runtime cells and host values.
//!
//! Immediate datatypes are packed into the cell payload. Strings, word
//! spellings and blocks are stored in the owning engine's heap and the cell
//! carries a [`RenSeriesHandle`]. Decoding checks the tag before touching the
//! payload, so a mismatched cell is reported rather than reinterpreted.

use std::convert::TryFrom;
use std::sync::Arc;

use ren_abi::{RenCell, RenEngineHandle, RenKind, RenSeriesHandle};

use crate::{Function, Kind, Unset, Value, ValueError, Word, WordKind};

/// Out-of-line payload of a series cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    Text(Arc<str>),
    Block(Arc<[Value]>),
}

/// Storage for series referenced by cells. Implemented by the engine.
pub trait CellHeap {
    fn engine(&self) -> RenEngineHandle;
    fn alloc(&self, series: Series) -> RenSeriesHandle;
    fn get(&self, handle: RenSeriesHandle) -> Option<Series>;
}

/// Host types that can be read out of an argument cell.
pub trait FromCell: Sized {
    /// Datatypes this type accepts; `None` means any value.
    fn accepted_kinds() -> Option<Vec<Kind>>;

    fn from_cell(cell: &RenCell, heap: &dyn CellHeap) -> Result<Self, ValueError>;
}

/// Host types that can be written into a return cell.
pub trait IntoCell {
    /// Datatypes this type may produce; `None` means any value.
    fn produced_kinds() -> Option<Vec<Kind>>;

    fn into_cell(self, heap: &dyn CellHeap) -> RenCell;
}

fn cell_kind(cell: &RenCell) -> Result<Kind, ValueError> {
    cell.kind()
        .map(Kind::from_raw)
        .ok_or(ValueError::CorruptTag(cell.kind))
}

fn series_handle(cell: &RenCell) -> RenSeriesHandle {
    RenSeriesHandle(cell.payload as u32)
}

/// The heap series a cell refers to, if its kind is stored out of line.
pub fn cell_series(cell: &RenCell) -> Option<RenSeriesHandle> {
    match cell.kind()? {
        RenKind::String
        | RenKind::Block
        | RenKind::Word
        | RenKind::SetWord
        | RenKind::GetWord
        | RenKind::LitWord
        | RenKind::Refinement => Some(series_handle(cell)),
        _ => None,
    }
}

fn text(cell: &RenCell, heap: &dyn CellHeap) -> Result<Arc<str>, ValueError> {
    let handle = series_handle(cell);
    match heap.get(handle) {
        Some(Series::Text(t)) => Ok(t),
        _ => Err(ValueError::DanglingSeries(handle.0)),
    }
}

fn block(cell: &RenCell, heap: &dyn CellHeap) -> Result<Arc<[Value]>, ValueError> {
    let handle = series_handle(cell);
    match heap.get(handle) {
        Some(Series::Block(b)) => Ok(b),
        _ => Err(ValueError::DanglingSeries(handle.0)),
    }
}

fn pack_function(f: Function) -> u64 {
    ((f.engine.0 as u64) << 32) | f.index as u64
}

fn unpack_function(payload: u64) -> Function {
    Function {
        engine: RenEngineHandle((payload >> 32) as u32),
        index: payload as u32,
    }
}

fn word_kind(kind: Kind) -> Option<WordKind> {
    Some(match kind {
        Kind::Word => WordKind::Word,
        Kind::SetWord => WordKind::Set,
        Kind::GetWord => WordKind::Get,
        Kind::LitWord => WordKind::Lit,
        Kind::Refinement => WordKind::Refinement,
        _ => return None,
    })
}

impl Value {
    /// Decode any cell.
    pub fn from_cell(cell: &RenCell, heap: &dyn CellHeap) -> Result<Value, ValueError> {
        let kind = cell_kind(cell)?;
        Ok(match kind {
            Kind::Unset => Value::Unset,
            Kind::None => Value::None,
            Kind::Logic => Value::Logic(cell.payload != 0),
            Kind::Integer => Value::Integer(cell.payload as i64),
            Kind::Decimal => Value::Decimal(f64::from_bits(cell.payload)),
            Kind::Char => {
                let raw = cell.payload as u32;
                Value::Char(char::from_u32(raw).ok_or(ValueError::InvalidChar(raw))?)
            }
            Kind::String => Value::String(text(cell, heap)?.to_string()),
            Kind::Block => Value::Block(block(cell, heap)?.to_vec()),
            Kind::Datatype => {
                let raw = cell.payload as u32;
                let tag = RenKind::from_raw(raw).ok_or(ValueError::CorruptTag(raw))?;
                Value::Datatype(Kind::from_raw(tag))
            }
            Kind::Function => Value::Function(unpack_function(cell.payload)),
            word => {
                let flavor = word_kind(word).ok_or(ValueError::CorruptTag(cell.kind))?;
                Value::Word(Word::with_kind(text(cell, heap)?.to_string(), flavor))
            }
        })
    }

    /// Encode into a cell, allocating series in `heap` as needed.
    pub fn to_cell(&self, heap: &dyn CellHeap) -> RenCell {
        let raw = self.kind().to_raw();
        match self {
            Value::Unset => RenCell::UNSET,
            Value::None => RenCell::new(raw, 0),
            Value::Logic(b) => RenCell::new(raw, *b as u64),
            Value::Integer(i) => RenCell::new(raw, *i as u64),
            Value::Decimal(n) => RenCell::new(raw, n.to_bits()),
            Value::Char(c) => RenCell::new(raw, *c as u32 as u64),
            Value::String(s) => {
                let handle = heap.alloc(Series::Text(Arc::from(s.as_str())));
                RenCell::new(raw, handle.0 as u64)
            }
            Value::Word(w) => {
                let handle = heap.alloc(Series::Text(Arc::from(w.name.as_str())));
                RenCell::new(raw, handle.0 as u64)
            }
            Value::Block(items) => {
                let handle = heap.alloc(Series::Block(Arc::from(items.as_slice())));
                RenCell::new(raw, handle.0 as u64)
            }
            Value::Datatype(k) => RenCell::new(raw, k.to_raw() as u32 as u64),
            Value::Function(f) => RenCell::new(raw, pack_function(*f)),
        }
    }
}

/// Expected-kind text for mismatch reports, e.g. `decimal! or integer!`.
fn describe(kinds: &[Kind]) -> String {
    kinds
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(" or ")
}

fn check_kind(cell: &RenCell, accepted: &[Kind]) -> Result<(), ValueError> {
    let found = cell_kind(cell)?;
    if accepted.contains(&found) {
        Ok(())
    } else {
        Err(ValueError::mismatch(describe(accepted), found))
    }
}

macro_rules! cell_codec {
    ($ty:ty => [$($kind:ident),+]) => {
        impl FromCell for $ty {
            fn accepted_kinds() -> Option<Vec<Kind>> {
                Some(vec![$(Kind::$kind),+])
            }

            fn from_cell(cell: &RenCell, heap: &dyn CellHeap) -> Result<Self, ValueError> {
                check_kind(cell, &[$(Kind::$kind),+])?;
                <$ty>::try_from(&Value::from_cell(cell, heap)?)
            }
        }

        impl IntoCell for $ty {
            fn produced_kinds() -> Option<Vec<Kind>> {
                Some(vec![$(Kind::$kind),+])
            }

            fn into_cell(self, heap: &dyn CellHeap) -> RenCell {
                Value::from(self).to_cell(heap)
            }
        }
    };
}

cell_codec!(i64 => [Integer]);
cell_codec!(i32 => [Integer]);
cell_codec!(bool => [Logic]);
cell_codec!(char => [Char]);
cell_codec!(String => [String]);
cell_codec!(Word => [Word, SetWord, GetWord, LitWord, Refinement]);
cell_codec!(Vec<Value> => [Block]);
cell_codec!(Kind => [Datatype]);
cell_codec!(Function => [Function]);
cell_codec!(Unset => [Unset]);

// Integers widen to decimal on the way in; results are always decimal!.
impl FromCell for f64 {
    fn accepted_kinds() -> Option<Vec<Kind>> {
        Some(vec![Kind::Decimal, Kind::Integer])
    }

    fn from_cell(cell: &RenCell, heap: &dyn CellHeap) -> Result<Self, ValueError> {
        check_kind(cell, &[Kind::Decimal, Kind::Integer])?;
        f64::try_from(&Value::from_cell(cell, heap)?)
    }
}

impl IntoCell for f64 {
    fn produced_kinds() -> Option<Vec<Kind>> {
        Some(vec![Kind::Decimal])
    }

    fn into_cell(self, heap: &dyn CellHeap) -> RenCell {
        Value::Decimal(self).to_cell(heap)
    }
}

impl IntoCell for &str {
    fn produced_kinds() -> Option<Vec<Kind>> {
        Some(vec![Kind::String])
    }

    fn into_cell(self, heap: &dyn CellHeap) -> RenCell {
        Value::from(self).to_cell(heap)
    }
}

impl IntoCell for () {
    fn produced_kinds() -> Option<Vec<Kind>> {
        Some(vec![Kind::Unset])
    }

    fn into_cell(self, _heap: &dyn CellHeap) -> RenCell {
        RenCell::UNSET
    }
}

impl FromCell for Value {
    fn accepted_kinds() -> Option<Vec<Kind>> {
        None
    }

    fn from_cell(cell: &RenCell, heap: &dyn CellHeap) -> Result<Self, ValueError> {
        Value::from_cell(cell, heap)
    }
}

impl IntoCell for Value {
    fn produced_kinds() -> Option<Vec<Kind>> {
        None
    }

    fn into_cell(self, heap: &dyn CellHeap) -> RenCell {
        self.to_cell(heap)
    }
}

/// `none` maps to `None`; anything else must decode as `T`.
impl<T: FromCell> FromCell for Option<T> {
    fn accepted_kinds() -> Option<Vec<Kind>> {
        T::accepted_kinds().map(|mut kinds| {
            kinds.push(Kind::None);
            kinds
        })
    }

    fn from_cell(cell: &RenCell, heap: &dyn CellHeap) -> Result<Self, ValueError> {
        if cell.kind == RenKind::None as u32 {
            return Ok(None);
        }
        T::from_cell(cell, heap).map(Some).map_err(|err| match (err, Self::accepted_kinds()) {
            (ValueError::TypeMismatch { found, .. }, Some(kinds)) => {
                ValueError::mismatch(describe(&kinds), found)
            }
            (err, _) => err,
        })
    }
}

impl<T: IntoCell> IntoCell for Option<T> {
    fn produced_kinds() -> Option<Vec<Kind>> {
        T::produced_kinds().map(|mut kinds| {
            kinds.push(Kind::None);
            kinds
        })
    }

    fn into_cell(self, heap: &dyn CellHeap) -> RenCell {
        match self {
            Some(v) => v.into_cell(heap),
            None => RenCell::new(RenKind::None, 0),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Vec-backed heap for codec tests.
    #[derive(Default)]
    pub(crate) struct TestHeap {
        series: Mutex<Vec<Series>>,
    }

    impl CellHeap for TestHeap {
        fn engine(&self) -> RenEngineHandle {
            RenEngineHandle(7)
        }

        fn alloc(&self, series: Series) -> RenSeriesHandle {
            let mut all = self.series.lock();
            all.push(series);
            RenSeriesHandle(all.len() as u32 - 1)
        }

        fn get(&self, handle: RenSeriesHandle) -> Option<Series> {
            self.series.lock().get(handle.0 as usize).cloned()
        }
    }

    #[test]
    fn immediates_decode() {
        let heap = TestHeap::default();
        assert_eq!(i64::from_cell(&7i64.into_cell(&heap), &heap), Ok(7));
        assert_eq!(i64::from_cell(&(-3i64).into_cell(&heap), &heap), Ok(-3));
        assert_eq!(bool::from_cell(&true.into_cell(&heap), &heap), Ok(true));
        assert_eq!(char::from_cell(&'é'.into_cell(&heap), &heap), Ok('é'));
        assert_eq!(f64::from_cell(&1.25f64.into_cell(&heap), &heap), Ok(1.25));
    }

    #[test]
    fn series_go_through_heap() {
        let heap = TestHeap::default();
        let cell = "hello".into_cell(&heap);
        assert_eq!(cell.kind(), Some(RenKind::String));
        assert_eq!(String::from_cell(&cell, &heap).as_deref(), Ok("hello"));

        let block = vec![Value::Integer(1), Value::word("x")];
        let cell = block.clone().into_cell(&heap);
        assert_eq!(Vec::<Value>::from_cell(&cell, &heap), Ok(block));
    }

    #[test]
    fn mismatch_is_reported_without_reading_payload() {
        let heap = TestHeap::default();
        let cell = "x".into_cell(&heap);
        assert_eq!(
            i64::from_cell(&cell, &heap),
            Err(ValueError::mismatch("integer!", Kind::String))
        );
        let cell = 3i64.into_cell(&heap);
        // A handle-sized payload must never be treated as a series
        assert!(matches!(
            String::from_cell(&cell, &heap),
            Err(ValueError::TypeMismatch { found: Kind::Integer, .. })
        ));
    }

    #[test]
    fn decimal_accepts_integer_cells() {
        let heap = TestHeap::default();
        assert_eq!(f64::from_cell(&4i64.into_cell(&heap), &heap), Ok(4.0));
        assert_eq!(
            f64::from_cell(&true.into_cell(&heap), &heap),
            Err(ValueError::mismatch("decimal! or integer!", Kind::Logic))
        );
    }

    #[test]
    fn optional_arguments() {
        let heap = TestHeap::default();
        assert_eq!(
            Option::<i64>::from_cell(&RenCell::new(RenKind::None, 0), &heap),
            Ok(None)
        );
        assert_eq!(Option::<i64>::from_cell(&5i64.into_cell(&heap), &heap), Ok(Some(5)));
        assert_eq!(
            Option::<i64>::accepted_kinds(),
            Some(vec![Kind::Integer, Kind::None])
        );
        assert_eq!(
            Option::<i64>::from_cell(&"x".into_cell(&heap), &heap),
            Err(ValueError::mismatch("integer! or none!", Kind::String))
        );
        // Range errors from the inner type pass through unchanged
        assert!(matches!(
            Option::<i32>::from_cell(&(1i64 << 40).into_cell(&heap), &heap),
            Err(ValueError::OutOfRange { .. })
        ));
    }

    #[test]
    fn series_cells_name_their_handle() {
        let heap = TestHeap::default();
        heap.alloc(Series::Text(Arc::from("pad")));
        assert_eq!(cell_series(&"x".into_cell(&heap)), Some(RenSeriesHandle(1)));
        assert_eq!(cell_series(&Word::new("w").into_cell(&heap)), Some(RenSeriesHandle(2)));
        assert_eq!(cell_series(&7i64.into_cell(&heap)), None);
        assert_eq!(cell_series(&RenCell::UNSET), None);
    }

    #[test]
    fn function_cells_keep_engine() {
        let heap = TestHeap::default();
        let f = Function { engine: RenEngineHandle(3), index: 11 };
        assert_eq!(Function::from_cell(&f.into_cell(&heap), &heap), Ok(f));
    }

    #[test]
    fn corrupt_cells() {
        let heap = TestHeap::default();
        let bad = RenCell { kind: 99, flags: 0, payload: 0 };
        assert_eq!(Value::from_cell(&bad, &heap), Err(ValueError::CorruptTag(99)));
        let dangling = RenCell::new(RenKind::String, 40);
        assert_eq!(
            Value::from_cell(&dangling, &heap),
            Err(ValueError::DanglingSeries(40))
        );
    }

    #[test]
    fn words_keep_flavor() {
        let heap = TestHeap::default();
        let w = Word::with_kind("x", WordKind::Lit);
        let cell = w.clone().into_cell(&heap);
        assert_eq!(cell.kind(), Some(RenKind::LitWord));
        assert_eq!(Word::from_cell(&cell, &heap), Ok(w));
    }
}
