//! Register definitions for the sandvm machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of general-purpose registers
pub const NUM_REGISTERS: usize = 4;

/// Machine register (r1-r4)
///
/// R1 is the working register: immediate and memory loads target it, and
/// arithmetic and bitwise operations leave their result in it. R2 is the
/// right-hand operand of binary operations. R3 is the comparison register
/// for conditional jumps. R4 is the status register; the interpreter is the
/// only writer (there is no move into R4), and it holds 1 exactly when the
/// previous instruction was a division or modulo by zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Register {
    R1 = 0,
    R2 = 1,
    R3 = 2,
    R4 = 3,
}

impl Register {
    /// Try to convert from a 0-based register index
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Register::R1),
            1 => Some(Register::R2),
            2 => Some(Register::R3),
            3 => Some(Register::R4),
            _ => None,
        }
    }

    /// 0-based index into the register file
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Check whether this register is the interpreter-owned status register
    #[inline]
    pub const fn is_status(self) -> bool {
        matches!(self, Register::R4)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Register::R1 => "r1",
            Register::R2 => "r2",
            Register::R3 => "r3",
            Register::R4 => "r4",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for index in 0..NUM_REGISTERS {
            let reg = Register::from_index(index).expect("valid index");
            assert_eq!(reg.index(), index);
        }
        assert_eq!(Register::from_index(NUM_REGISTERS), None);
    }

    #[test]
    fn test_status_register() {
        assert!(Register::R4.is_status());
        assert!(!Register::R1.is_status());
    }

    #[test]
    fn test_display() {
        assert_eq!(Register::R1.to_string(), "r1");
        assert_eq!(Register::R4.to_string(), "r4");
    }
}
