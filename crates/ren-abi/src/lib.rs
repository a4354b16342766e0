//! C ABI types shared between the Ren runtime and host extension code.
//!
//! This crate defines the stable surface the runtime and the binding agree on:
//! the value cell layout, the result codes natives return, the opaque engine and
//! context handles, and the argument stack convention. Nothing here allocates;
//! the stack passed to a native belongs to the runtime and is only valid for
//! the duration of one call.

/// Result codes returned by native function shims.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenResult {
    /// The call completed and the return slot holds the result.
    Success = 0,
    /// Answer to the identity-capture call made with a null stack.
    ShimInitialized = 1,
    /// The shim already captured an identity; a second capture was refused.
    ShimAlreadyBound = 2,
    /// The call failed. The return slot is untouched and the failure detail
    /// is available through the runtime's native-failure channel.
    Failure = 3,
}

/// Opaque engine handle.
///
/// A process may host several engines; every registration and every cell
/// heap belongs to exactly one of them.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenEngineHandle(pub u32);

impl RenEngineHandle {
    pub const INVALID: RenEngineHandle = RenEngineHandle(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Opaque context handle, scoped to the engine that created it.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenContextHandle(pub u32);

impl RenContextHandle {
    pub const INVALID: RenContextHandle = RenContextHandle(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Index of a series (text, word spelling or block) in an engine's cell heap.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenSeriesHandle(pub u32);

/// Datatype tags stored in [`RenCell::kind`].
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RenKind {
    Unset = 0,
    None = 1,
    Logic = 2,
    Integer = 3,
    Decimal = 4,
    Char = 5,
    String = 6,
    Word = 7,
    SetWord = 8,
    GetWord = 9,
    LitWord = 10,
    Refinement = 11,
    Block = 12,
    Datatype = 13,
    Function = 14,
}

impl RenKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => RenKind::Unset,
            1 => RenKind::None,
            2 => RenKind::Logic,
            3 => RenKind::Integer,
            4 => RenKind::Decimal,
            5 => RenKind::Char,
            6 => RenKind::String,
            7 => RenKind::Word,
            8 => RenKind::SetWord,
            9 => RenKind::GetWord,
            10 => RenKind::LitWord,
            11 => RenKind::Refinement,
            12 => RenKind::Block,
            13 => RenKind::Datatype,
            14 => RenKind::Function,
            _ => return None,
        })
    }
}

/// One runtime value cell.
///
/// Immediate kinds keep their bits in `payload` (integers as two's complement,
/// decimals as IEEE bits, chars as code points). Series kinds store a
/// [`RenSeriesHandle`] into the owning engine's heap; functions store the
/// native record index.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenCell {
    pub kind: u32,
    pub flags: u32,
    pub payload: u64,
}

const _: () = assert!(std::mem::size_of::<RenCell>() == 16);
const _: () = assert!(std::mem::offset_of!(RenCell, kind) == 0);
const _: () = assert!(std::mem::offset_of!(RenCell, flags) == 4);
const _: () = assert!(std::mem::offset_of!(RenCell, payload) == 8);

impl RenCell {
    pub const UNSET: RenCell = RenCell {
        kind: RenKind::Unset as u32,
        flags: 0,
        payload: 0,
    };

    pub fn new(kind: RenKind, payload: u64) -> Self {
        RenCell {
            kind: kind as u32,
            flags: 0,
            payload,
        }
    }

    /// Tag of this cell, or `None` for a corrupt tag.
    pub fn kind(&self) -> Option<RenKind> {
        RenKind::from_raw(self.kind)
    }
}

impl Default for RenCell {
    fn default() -> Self {
        RenCell::UNSET
    }
}

/// Native function shim: the only thing the runtime knows how to call.
///
/// A null `stack` is the identity-capture request; see `RenResult::ShimInitialized`.
pub type RenShimPointer = extern "C" fn(stack: *mut RenCell) -> RenResult;

// ---------------------------------------------------------------------------
// Stack convention
// ---------------------------------------------------------------------------

/// Offset of the return slot in a native call stack.
pub const REN_STACK_RETURN: usize = 0;
/// Offset of the cell holding the function being applied.
pub const REN_STACK_FUNCTION: usize = 1;
/// Offset of the first argument.
pub const REN_STACK_ARGS: usize = 2;

/// Number of cells a stack needs for `arity` arguments.
pub const fn stack_len(arity: usize) -> usize {
    REN_STACK_ARGS + arity
}

/// Address of argument `index` in `stack`.
///
/// # Safety
/// `stack` must point to a live stack of at least `stack_len(index + 1)` cells.
#[inline]
pub unsafe fn stack_argument(stack: *mut RenCell, index: usize) -> *mut RenCell {
    stack.add(REN_STACK_ARGS + index)
}

/// Address of the return slot in `stack`.
///
/// # Safety
/// `stack` must point to a live stack.
#[inline]
pub unsafe fn stack_return(stack: *mut RenCell) -> *mut RenCell {
    stack.add(REN_STACK_RETURN)
}

/// Address of the function cell in `stack`.
///
/// # Safety
/// `stack` must point to a live stack.
#[inline]
pub unsafe fn stack_function(stack: *mut RenCell) -> *mut RenCell {
    stack.add(REN_STACK_FUNCTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip() {
        for raw in 0..=14 {
            let kind = RenKind::from_raw(raw).expect("known tag");
            assert_eq!(kind as u32, raw);
        }
        assert!(RenKind::from_raw(99).is_none());
    }

    #[test]
    fn stack_slots_follow_convention() {
        let mut cells = vec![RenCell::UNSET; stack_len(2)];
        let base = cells.as_mut_ptr();
        unsafe {
            *stack_argument(base, 1) = RenCell::new(RenKind::Integer, 9);
            *stack_return(base) = RenCell::new(RenKind::Logic, 1);
        }
        assert_eq!(cells[3].payload, 9);
        assert_eq!(cells[0].kind(), Some(RenKind::Logic));
    }

    #[test]
    fn invalid_handles() {
        assert!(!RenEngineHandle::INVALID.is_valid());
        assert!(RenEngineHandle(0).is_valid());
        assert!(!RenContextHandle::INVALID.is_valid());
    }
}
