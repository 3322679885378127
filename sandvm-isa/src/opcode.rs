//! # sandvm opcode definitions
//!
//! Every instruction is encoded as one opcode byte followed by its operand
//! bytes. Opcode values are assigned consecutively starting at 1; value 0 is
//! reserved and always decodes as an unknown instruction.
//!
//! ## Opcode map
//!
//! - 1-4:   Immediate loads into R1 (operand width 1/2/4/8)
//! - 5-8:   Memory loads into R1 (8-byte absolute address)
//! - 9-17:  Register moves (no operands; R4 has no move *into* it)
//! - 18-21: Memory stores from R1 (8-byte absolute address)
//! - 22-29: Arithmetic on R1/R2 (no operands)
//! - 30-34: Bitwise on R1/R2 (no operands)
//! - 35-41: Jumps (8-byte absolute bytecode offset)
//! - 42:    Syscall (8-byte syscall id)

use serde::{Deserialize, Serialize};

/// Instruction opcode (one byte, values 1-42)
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // ========== Immediate loads (1-4) ==========
    /// R1 = zero_extend(imm8)
    LoadU8 = 1,
    /// R1 = zero_extend(imm16)
    LoadU16 = 2,
    /// R1 = zero_extend(imm32)
    LoadU32 = 3,
    /// R1 = imm64
    LoadU64 = 4,

    // ========== Memory loads (5-8) ==========
    /// R1 = zero_extend(mem[addr])
    MemLoadU8 = 5,
    /// R1 = zero_extend(mem[addr..addr+2])
    MemLoadU16 = 6,
    /// R1 = zero_extend(mem[addr..addr+4])
    MemLoadU32 = 7,
    /// R1 = mem[addr..addr+8]
    MemLoadU64 = 8,

    // ========== Register moves (9-17) ==========
    /// R2 = R1
    MoveR1R2 = 9,
    /// R3 = R1
    MoveR1R3 = 10,
    /// R1 = R2
    MoveR2R1 = 11,
    /// R3 = R2
    MoveR2R3 = 12,
    /// R1 = R3
    MoveR3R1 = 13,
    /// R2 = R3
    MoveR3R2 = 14,
    /// R1 = R4
    MoveR4R1 = 15,
    /// R2 = R4
    MoveR4R2 = 16,
    /// R3 = R4
    MoveR4R3 = 17,

    // ========== Memory stores (18-21) ==========
    /// mem[addr] = R1[7:0]
    DumpU8 = 18,
    /// mem[addr..addr+2] = R1[15:0]
    DumpU16 = 19,
    /// mem[addr..addr+4] = R1[31:0]
    DumpU32 = 20,
    /// mem[addr..addr+8] = R1
    DumpU64 = 21,

    // ========== Arithmetic (22-29) ==========
    /// R1 = R1 + R2 (wrapping, unsigned)
    UnsignedAdd = 22,
    /// R1 = R1 + R2 (wrapping, two's-complement)
    SignedAdd = 23,
    /// R1 = R1 - R2 (wrapping, unsigned)
    UnsignedSub = 24,
    /// R1 = R1 - R2 (wrapping, two's-complement)
    SignedSub = 25,
    /// R1 = R1 / R2 unsigned; R2 == 0 leaves R1 and sets R4 = 1
    UnsignedDiv = 26,
    /// R1 = R1 / R2 signed, truncating; R2 == 0 leaves R1 and sets R4 = 1
    SignedDiv = 27,
    /// R1 = R1 % R2 unsigned; R2 == 0 leaves R1 and sets R4 = 1
    UnsignedMod = 28,
    /// R1 = R1 % R2 signed; R2 == 0 leaves R1 and sets R4 = 1
    SignedMod = 29,

    // ========== Bitwise (30-34) ==========
    /// R1 = R1 & R2
    And = 30,
    /// R1 = R1 | R2
    Or = 31,
    /// R1 = R1 ^ R2
    Xor = 32,
    /// R1 = R1 << (R2 & 63)
    LeftShift = 33,
    /// R1 = R1 >> (R2 & 63) (logical)
    RightShift = 34,

    // ========== Jumps (35-41) ==========
    /// ip = target
    Jmp = 35,
    /// if R1 == R3, ip = target
    JmpIfEq = 36,
    /// if R1 != R3, ip = target
    JmpIfNe = 37,
    /// if R1 > R3 (unsigned), ip = target
    JmpIfGt = 38,
    /// if R1 < R3 (unsigned), ip = target
    JmpIfLt = 39,
    /// if R1 >= R3 (unsigned), ip = target
    JmpIfGe = 40,
    /// if R1 <= R3 (unsigned), ip = target
    JmpIfLe = 41,

    // ========== System (42) ==========
    /// Invoke the host callback registered under the 8-byte id
    Syscall = 42,
}

impl Opcode {
    /// Number of defined opcodes
    pub const COUNT: usize = 42;

    /// Try to convert from the raw opcode byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            // Immediate loads
            1 => Some(Opcode::LoadU8),
            2 => Some(Opcode::LoadU16),
            3 => Some(Opcode::LoadU32),
            4 => Some(Opcode::LoadU64),

            // Memory loads
            5 => Some(Opcode::MemLoadU8),
            6 => Some(Opcode::MemLoadU16),
            7 => Some(Opcode::MemLoadU32),
            8 => Some(Opcode::MemLoadU64),

            // Moves
            9 => Some(Opcode::MoveR1R2),
            10 => Some(Opcode::MoveR1R3),
            11 => Some(Opcode::MoveR2R1),
            12 => Some(Opcode::MoveR2R3),
            13 => Some(Opcode::MoveR3R1),
            14 => Some(Opcode::MoveR3R2),
            15 => Some(Opcode::MoveR4R1),
            16 => Some(Opcode::MoveR4R2),
            17 => Some(Opcode::MoveR4R3),

            // Memory stores
            18 => Some(Opcode::DumpU8),
            19 => Some(Opcode::DumpU16),
            20 => Some(Opcode::DumpU32),
            21 => Some(Opcode::DumpU64),

            // Arithmetic
            22 => Some(Opcode::UnsignedAdd),
            23 => Some(Opcode::SignedAdd),
            24 => Some(Opcode::UnsignedSub),
            25 => Some(Opcode::SignedSub),
            26 => Some(Opcode::UnsignedDiv),
            27 => Some(Opcode::SignedDiv),
            28 => Some(Opcode::UnsignedMod),
            29 => Some(Opcode::SignedMod),

            // Bitwise
            30 => Some(Opcode::And),
            31 => Some(Opcode::Or),
            32 => Some(Opcode::Xor),
            33 => Some(Opcode::LeftShift),
            34 => Some(Opcode::RightShift),

            // Jumps
            35 => Some(Opcode::Jmp),
            36 => Some(Opcode::JmpIfEq),
            37 => Some(Opcode::JmpIfNe),
            38 => Some(Opcode::JmpIfGt),
            39 => Some(Opcode::JmpIfLt),
            40 => Some(Opcode::JmpIfGe),
            41 => Some(Opcode::JmpIfLe),

            // System
            42 => Some(Opcode::Syscall),

            _ => None,
        }
    }

    /// Convert to the raw opcode byte
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes that follow the opcode byte
    #[inline]
    pub const fn operand_len(self) -> usize {
        match self {
            Opcode::LoadU8 => 1,
            Opcode::LoadU16 => 2,
            Opcode::LoadU32 => 4,
            Opcode::LoadU64 => 8,

            Opcode::MemLoadU8
            | Opcode::MemLoadU16
            | Opcode::MemLoadU32
            | Opcode::MemLoadU64
            | Opcode::DumpU8
            | Opcode::DumpU16
            | Opcode::DumpU32
            | Opcode::DumpU64
            | Opcode::Jmp
            | Opcode::JmpIfEq
            | Opcode::JmpIfNe
            | Opcode::JmpIfGt
            | Opcode::JmpIfLt
            | Opcode::JmpIfGe
            | Opcode::JmpIfLe
            | Opcode::Syscall => 8,

            _ => 0,
        }
    }

    /// Total encoded length of the instruction, opcode byte included
    #[inline]
    pub const fn encoded_len(self) -> usize {
        1 + self.operand_len()
    }

    /// Check if this is an immediate load opcode
    #[inline]
    pub const fn is_immediate_load(self) -> bool {
        matches!(
            self,
            Opcode::LoadU8 | Opcode::LoadU16 | Opcode::LoadU32 | Opcode::LoadU64
        )
    }

    /// Check if this is a memory load opcode
    #[inline]
    pub const fn is_memory_load(self) -> bool {
        matches!(
            self,
            Opcode::MemLoadU8 | Opcode::MemLoadU16 | Opcode::MemLoadU32 | Opcode::MemLoadU64
        )
    }

    /// Check if this is a register move opcode
    #[inline]
    pub const fn is_move(self) -> bool {
        matches!(
            self,
            Opcode::MoveR1R2
                | Opcode::MoveR1R3
                | Opcode::MoveR2R1
                | Opcode::MoveR2R3
                | Opcode::MoveR3R1
                | Opcode::MoveR3R2
                | Opcode::MoveR4R1
                | Opcode::MoveR4R2
                | Opcode::MoveR4R3
        )
    }

    /// Check if this is a memory store opcode
    #[inline]
    pub const fn is_memory_store(self) -> bool {
        matches!(
            self,
            Opcode::DumpU8 | Opcode::DumpU16 | Opcode::DumpU32 | Opcode::DumpU64
        )
    }

    /// Check if this is an arithmetic opcode
    #[inline]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Opcode::UnsignedAdd
                | Opcode::SignedAdd
                | Opcode::UnsignedSub
                | Opcode::SignedSub
                | Opcode::UnsignedDiv
                | Opcode::SignedDiv
                | Opcode::UnsignedMod
                | Opcode::SignedMod
        )
    }

    /// Check if this is a division or modulo opcode (the only ones that set R4)
    #[inline]
    pub const fn is_div_mod(self) -> bool {
        matches!(
            self,
            Opcode::UnsignedDiv | Opcode::SignedDiv | Opcode::UnsignedMod | Opcode::SignedMod
        )
    }

    /// Check if this is a bitwise opcode
    #[inline]
    pub const fn is_bitwise(self) -> bool {
        matches!(
            self,
            Opcode::And | Opcode::Or | Opcode::Xor | Opcode::LeftShift | Opcode::RightShift
        )
    }

    /// Check if this is a jump opcode
    #[inline]
    pub const fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jmp
                | Opcode::JmpIfEq
                | Opcode::JmpIfNe
                | Opcode::JmpIfGt
                | Opcode::JmpIfLt
                | Opcode::JmpIfGe
                | Opcode::JmpIfLe
        )
    }

    /// Check if this is a conditional jump opcode
    #[inline]
    pub const fn is_conditional_jump(self) -> bool {
        self.is_jump() && !matches!(self, Opcode::Jmp)
    }

    /// Get the instruction family
    #[inline]
    pub const fn family(self) -> OpcodeFamily {
        if self.is_immediate_load() {
            OpcodeFamily::ImmediateLoad
        } else if self.is_memory_load() {
            OpcodeFamily::MemoryLoad
        } else if self.is_move() {
            OpcodeFamily::Move
        } else if self.is_memory_store() {
            OpcodeFamily::MemoryStore
        } else if self.is_arithmetic() {
            OpcodeFamily::Arithmetic
        } else if self.is_bitwise() {
            OpcodeFamily::Bitwise
        } else if self.is_jump() {
            OpcodeFamily::Jump
        } else {
            OpcodeFamily::System
        }
    }

    /// Assembly-style mnemonic
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LoadU8 => "load.u8",
            Opcode::LoadU16 => "load.u16",
            Opcode::LoadU32 => "load.u32",
            Opcode::LoadU64 => "load.u64",
            Opcode::MemLoadU8 => "mload.u8",
            Opcode::MemLoadU16 => "mload.u16",
            Opcode::MemLoadU32 => "mload.u32",
            Opcode::MemLoadU64 => "mload.u64",
            Opcode::MoveR1R2 => "mov r2, r1",
            Opcode::MoveR1R3 => "mov r3, r1",
            Opcode::MoveR2R1 => "mov r1, r2",
            Opcode::MoveR2R3 => "mov r3, r2",
            Opcode::MoveR3R1 => "mov r1, r3",
            Opcode::MoveR3R2 => "mov r2, r3",
            Opcode::MoveR4R1 => "mov r1, r4",
            Opcode::MoveR4R2 => "mov r2, r4",
            Opcode::MoveR4R3 => "mov r3, r4",
            Opcode::DumpU8 => "dump.u8",
            Opcode::DumpU16 => "dump.u16",
            Opcode::DumpU32 => "dump.u32",
            Opcode::DumpU64 => "dump.u64",
            Opcode::UnsignedAdd => "uadd",
            Opcode::SignedAdd => "sadd",
            Opcode::UnsignedSub => "usub",
            Opcode::SignedSub => "ssub",
            Opcode::UnsignedDiv => "udiv",
            Opcode::SignedDiv => "sdiv",
            Opcode::UnsignedMod => "umod",
            Opcode::SignedMod => "smod",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::LeftShift => "shl",
            Opcode::RightShift => "shr",
            Opcode::Jmp => "jmp",
            Opcode::JmpIfEq => "jeq",
            Opcode::JmpIfNe => "jne",
            Opcode::JmpIfGt => "jgt",
            Opcode::JmpIfLt => "jlt",
            Opcode::JmpIfGe => "jge",
            Opcode::JmpIfLe => "jle",
            Opcode::Syscall => "syscall",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Instruction family
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpcodeFamily {
    /// LoadU8, LoadU16, LoadU32, LoadU64
    ImmediateLoad = 0,
    /// MemLoadU8, MemLoadU16, MemLoadU32, MemLoadU64
    MemoryLoad = 1,
    /// The nine register-to-register moves
    Move = 2,
    /// DumpU8, DumpU16, DumpU32, DumpU64
    MemoryStore = 3,
    /// Add, Sub, Div, Mod in signed and unsigned flavors
    Arithmetic = 4,
    /// And, Or, Xor, LeftShift, RightShift
    Bitwise = 5,
    /// Jmp and the six conditional jumps
    Jump = 6,
    /// Syscall
    System = 7,
}

impl OpcodeFamily {
    /// Total number of instruction families
    pub const COUNT: usize = 8;
}

impl std::fmt::Display for OpcodeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OpcodeFamily::ImmediateLoad => "immediate-load",
            OpcodeFamily::MemoryLoad => "memory-load",
            OpcodeFamily::Move => "move",
            OpcodeFamily::MemoryStore => "memory-store",
            OpcodeFamily::Arithmetic => "arithmetic",
            OpcodeFamily::Bitwise => "bitwise",
            OpcodeFamily::Jump => "jump",
            OpcodeFamily::System => "system",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values_are_consecutive_from_one() {
        for value in 1..=Opcode::COUNT as u8 {
            let op = Opcode::from_u8(value).expect("defined opcode");
            assert_eq!(op.to_u8(), value);
        }
    }

    #[test]
    fn test_zero_and_out_of_range_are_undefined() {
        assert_eq!(Opcode::from_u8(0), None);
        assert_eq!(Opcode::from_u8(Opcode::COUNT as u8 + 1), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_opcode_values() {
        assert_eq!(Opcode::LoadU8.to_u8(), 1);
        assert_eq!(Opcode::MemLoadU8.to_u8(), 5);
        assert_eq!(Opcode::MoveR1R2.to_u8(), 9);
        assert_eq!(Opcode::DumpU8.to_u8(), 18);
        assert_eq!(Opcode::UnsignedAdd.to_u8(), 22);
        assert_eq!(Opcode::And.to_u8(), 30);
        assert_eq!(Opcode::Jmp.to_u8(), 35);
        assert_eq!(Opcode::Syscall.to_u8(), 42);
    }

    #[test]
    fn test_operand_len() {
        assert_eq!(Opcode::LoadU8.operand_len(), 1);
        assert_eq!(Opcode::LoadU16.operand_len(), 2);
        assert_eq!(Opcode::LoadU32.operand_len(), 4);
        assert_eq!(Opcode::LoadU64.operand_len(), 8);
        assert_eq!(Opcode::MemLoadU16.operand_len(), 8);
        assert_eq!(Opcode::MoveR2R3.operand_len(), 0);
        assert_eq!(Opcode::DumpU64.operand_len(), 8);
        assert_eq!(Opcode::SignedMod.operand_len(), 0);
        assert_eq!(Opcode::Xor.operand_len(), 0);
        assert_eq!(Opcode::JmpIfLe.operand_len(), 8);
        assert_eq!(Opcode::Syscall.operand_len(), 8);
    }

    #[test]
    fn test_encoded_len() {
        assert_eq!(Opcode::LoadU32.encoded_len(), 5);
        assert_eq!(Opcode::MoveR1R2.encoded_len(), 1);
        assert_eq!(Opcode::Jmp.encoded_len(), 9);
    }

    #[test]
    fn test_opcode_family() {
        assert_eq!(Opcode::LoadU64.family(), OpcodeFamily::ImmediateLoad);
        assert_eq!(Opcode::MemLoadU32.family(), OpcodeFamily::MemoryLoad);
        assert_eq!(Opcode::MoveR4R3.family(), OpcodeFamily::Move);
        assert_eq!(Opcode::DumpU16.family(), OpcodeFamily::MemoryStore);
        assert_eq!(Opcode::SignedDiv.family(), OpcodeFamily::Arithmetic);
        assert_eq!(Opcode::RightShift.family(), OpcodeFamily::Bitwise);
        assert_eq!(Opcode::JmpIfGe.family(), OpcodeFamily::Jump);
        assert_eq!(Opcode::Syscall.family(), OpcodeFamily::System);
    }

    #[test]
    fn test_is_div_mod() {
        assert!(Opcode::UnsignedDiv.is_div_mod());
        assert!(Opcode::SignedMod.is_div_mod());
        assert!(!Opcode::UnsignedAdd.is_div_mod());
        assert!(!Opcode::Syscall.is_div_mod());
    }

    #[test]
    fn test_conditional_jumps() {
        assert!(!Opcode::Jmp.is_conditional_jump());
        assert!(Opcode::JmpIfEq.is_conditional_jump());
        assert!(Opcode::JmpIfLe.is_conditional_jump());
        assert!(!Opcode::Syscall.is_conditional_jump());
    }

    #[test]
    fn test_display() {
        assert_eq!(Opcode::LoadU8.to_string(), "load.u8");
        assert_eq!(Opcode::MoveR1R2.to_string(), "mov r2, r1");
        assert_eq!(Opcode::UnsignedDiv.to_string(), "udiv");
        assert_eq!(Opcode::JmpIfNe.to_string(), "jne");
        assert_eq!(OpcodeFamily::Bitwise.to_string(), "bitwise");
    }
}
