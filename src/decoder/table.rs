use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use super::{
    Instruction, InstructionKind, decode_arithmetic, decode_branch, decode_compare, decode_dbcc,
    decode_exg, decode_ext, decode_immediate, decode_jump, decode_lea, decode_link,
    decode_logical, decode_move, decode_moveq, decode_nop, decode_pea, decode_quick, decode_rts,
    decode_scc, decode_swap, decode_unary, decode_unlk,
};

/// One slot per 16-bit opcode.
pub const TABLE_SIZE: usize = 0x1_0000;

type DecodeFn = fn(u16) -> Option<InstructionKind>;

/// A family registration: every opcode whose bits under `mask` equal
/// `value` is offered to `decode`.
#[derive(Clone, Copy)]
pub(crate) struct Pass {
    pub(crate) name: &'static str,
    pub(crate) mask: u16,
    pub(crate) value: u16,
    pub(crate) decode: DecodeFn,
}

impl Pass {
    const fn new(name: &'static str, mask: u16, value: u16, decode: DecodeFn) -> Self {
        Self {
            name,
            mask,
            value,
            decode,
        }
    }

    /// Every opcode matching the pattern, in ascending order.
    fn opcodes(&self) -> impl Iterator<Item = u16> {
        let free = !self.mask;
        let value = self.value & self.mask;
        let mut next = Some(0u16);
        std::iter::from_fn(move || {
            let sub = next?;
            next = if sub == free {
                None
            } else {
                Some(sub.wrapping_sub(free) & free)
            };
            Some(value | sub)
        })
    }
}

pub(crate) const PASSES: &[Pass] = &[
    Pass::new("immediate", 0xF100, 0x0000, decode_immediate),
    Pass::new("move.b", 0xF000, 0x1000, decode_move),
    Pass::new("move.l", 0xF000, 0x2000, decode_move),
    Pass::new("move.w", 0xF000, 0x3000, decode_move),
    Pass::new("negx", 0xFF00, 0x4000, decode_unary),
    Pass::new("clr", 0xFF00, 0x4200, decode_unary),
    Pass::new("neg", 0xFF00, 0x4400, decode_unary),
    Pass::new("not", 0xFF00, 0x4600, decode_unary),
    Pass::new("tst", 0xFF00, 0x4A00, decode_unary),
    Pass::new("ext", 0xFFB8, 0x4880, decode_ext),
    Pass::new("swap", 0xFFF8, 0x4840, decode_swap),
    Pass::new("pea", 0xFFC0, 0x4840, decode_pea),
    Pass::new("lea", 0xF1C0, 0x41C0, decode_lea),
    Pass::new("link", 0xFFF8, 0x4E50, decode_link),
    Pass::new("unlk", 0xFFF8, 0x4E58, decode_unlk),
    Pass::new("nop", 0xFFFF, 0x4E71, decode_nop),
    Pass::new("rts", 0xFFFF, 0x4E75, decode_rts),
    Pass::new("jsr", 0xFFC0, 0x4E80, decode_jump),
    Pass::new("jmp", 0xFFC0, 0x4EC0, decode_jump),
    Pass::new("addq/subq", 0xF000, 0x5000, decode_quick),
    Pass::new("scc", 0xF0C0, 0x50C0, decode_scc),
    Pass::new("dbcc", 0xF0F8, 0x50C8, decode_dbcc),
    Pass::new("branch", 0xF000, 0x6000, decode_branch),
    Pass::new("moveq", 0xF100, 0x7000, decode_moveq),
    Pass::new("or", 0xF000, 0x8000, decode_logical),
    Pass::new("sub", 0xF000, 0x9000, decode_arithmetic),
    Pass::new("cmp/eor", 0xF000, 0xB000, decode_compare),
    Pass::new("and", 0xF000, 0xC000, decode_logical),
    Pass::new("exg", 0xF100, 0xC100, decode_exg),
    Pass::new("add", 0xF000, 0xD000, decode_arithmetic),
];

/// Two families claimed the same opcode; the later pass won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub opcode: u16,
    pub first: &'static str,
    pub second: &'static str,
}

/// Prebuilt opcode-to-instruction map covering all 65536 opcodes.
///
/// Slots not claimed by any family hold [`InstructionKind::Illegal`].
/// The table is immutable once built and can be shared between CPUs.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    slots: Vec<Instruction>,
    collisions: Vec<Collision>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::from_passes(PASSES)
    }

    /// Process-wide table, built on first use.
    pub fn shared() -> Arc<Self> {
        static TABLE: OnceLock<Arc<DispatchTable>> = OnceLock::new();
        TABLE.get_or_init(|| Arc::new(DispatchTable::new())).clone()
    }

    pub(crate) fn from_passes(passes: &[Pass]) -> Self {
        let mut slots: Vec<Instruction> = (0..TABLE_SIZE)
            .map(|opcode| Instruction::illegal(opcode as u16))
            .collect();
        let mut owners: Vec<Option<&'static str>> = vec![None; TABLE_SIZE];
        let mut collisions = Vec::new();

        for pass in passes {
            let mut claimed = 0usize;
            for opcode in pass.opcodes() {
                let Some(kind) = (pass.decode)(opcode) else {
                    continue;
                };
                let slot = opcode as usize;
                if let Some(first) = owners[slot] {
                    warn!(
                        "opcode {opcode:#06x} claimed by both {first} and {}",
                        pass.name
                    );
                    collisions.push(Collision {
                        opcode,
                        first,
                        second: pass.name,
                    });
                }
                owners[slot] = Some(pass.name);
                slots[slot] = Instruction { opcode, kind };
                claimed += 1;
            }
            debug!("{}: {claimed} opcodes", pass.name);
        }

        let table = Self { slots, collisions };
        debug!(
            "dispatch table built: {} legal opcodes, {} collisions",
            table.legal_count(),
            table.collisions.len()
        );
        table
    }

    pub fn decode(&self, opcode: u16) -> &Instruction {
        &self.slots[opcode as usize]
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    pub fn legal_count(&self) -> usize {
        self.slots.iter().filter(|inst| !inst.is_illegal()).count()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}
