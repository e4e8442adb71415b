//! Bundle padding for generated Maxwell code.
//!
//! Code is a sequence of 64-bit words grouped in bundles of four: word
//! `4k` is a scheduling-control word holding three 21-bit fields, one for
//! each of the instructions at `4k+1..=4k+3`. The instruction fetcher reads
//! eight words at a time, so finished code is padded to a multiple of 8
//! words. The first padding instruction is a branch-to-self so execution
//! never runs past the end of the program; the rest are NOPs.

/// Words per scheduling bundle.
pub const BUNDLE_WORDS: usize = 4;
/// Fetch granularity in words.
pub const GROUP_WORDS: usize = 8;

/// `NOP`.
pub const NOP: u64 = 0x50b0_0000_0007_0f00;
/// `BRA $` in the first instruction slot of a bundle.
pub const BRA_SELF_FIRST: u64 = 0xe240_0fff_ff07_000f;
/// `BRA $` in the second or third instruction slot of a bundle.
pub const BRA_SELF: u64 = 0xe240_0fff_ff87_000f;
/// Scheduling value for the padding branch.
pub const SCHED_BRA: u32 = 0x7ff;
/// Scheduling value for a padding NOP.
pub const SCHED_NOP: u32 = 0x7e0;

const SCHED_FIELD_BITS: u32 = 21;
const SCHED_FIELD_MASK: u64 = (1 << SCHED_FIELD_BITS) - 1;

/// Replace the scheduling field for instruction slot `pos` (1..=3) of a
/// bundle's control word with `value`. Bit 63 and the other two fields are
/// preserved.
pub fn patch_sched_field(sched: u64, pos: usize, value: u32) -> u64 {
    debug_assert!((1..BUNDLE_WORDS).contains(&pos));
    let shift = SCHED_FIELD_BITS * (pos as u32 - 1);
    (sched & !(SCHED_FIELD_MASK << shift)) | ((value as u64 & SCHED_FIELD_MASK) << shift)
}

/// Read back the scheduling field for instruction slot `pos` (1..=3).
pub fn sched_field(sched: u64, pos: usize) -> u32 {
    let shift = SCHED_FIELD_BITS * (pos as u32 - 1);
    ((sched >> shift) & SCHED_FIELD_MASK) as u32
}

/// Number of words `len` words are padded to.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(GROUP_WORDS) * GROUP_WORDS
}

/// Pad `code` to a whole number of fetch groups.
///
/// Returns the code unchanged when it is already aligned. Otherwise every
/// new bundle starts with a zeroed control word, the first new instruction
/// slot receives the branch-to-self and every later one a NOP, and each
/// owning control word gets the matching scheduling field.
pub fn finish(mut code: Vec<u64>) -> Vec<u64> {
    let len = code.len();
    let total = padded_len(len);
    if total == len {
        return code;
    }
    code.resize(total, 0);

    let mut emitted_branch = false;
    for i in len..total {
        let pos = i % BUNDLE_WORDS;
        if pos == 0 {
            code[i] = 0;
            continue;
        }

        let (insn, sched) = if emitted_branch {
            (NOP, SCHED_NOP)
        } else {
            emitted_branch = true;
            let bra = if pos == 1 { BRA_SELF_FIRST } else { BRA_SELF };
            (bra, SCHED_BRA)
        };

        code[i] = insn;
        let owner = i & !(BUNDLE_WORDS - 1);
        code[owner] = patch_sched_field(code[owner], pos, sched);
    }
    code
}

/// Split little-endian code bytes into instruction words. Trailing bytes
/// that do not fill a word are dropped.
pub fn words_from_bytes(bytes: &[u8]) -> Vec<u64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            u64::from_le_bytes(word)
        })
        .collect()
}

/// Serialize instruction words as little-endian bytes.
pub fn words_to_bytes(words: &[u64]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
