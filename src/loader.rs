use std::ops::Range;

use anyhow::{Result, anyhow, bail};
use goblin::elf::{Elf, header, program_header, section_header};
use log::debug;

use crate::{cpu::CpuState, decoder::Size, memory::AddressSpace};

/// Copy every loadable segment of `elf` into memory, zero-filling the part
/// of each segment past its file contents. On success USP points at the top
/// of memory and PC at the entry point, which is returned.
pub fn load_elf<M: AddressSpace>(
    elf: &Elf,
    file_bytes: &[u8],
    state: &mut CpuState<M>,
) -> Result<u32> {
    if elf.is_64 {
        bail!("Expected a 32-bit ELF image");
    }
    if elf.little_endian {
        bail!("Expected a big-endian ELF image");
    }
    if elf.header.e_machine != header::EM_68K {
        bail!(
            "Expected an m68k ELF image, found machine type {}",
            elf.header.e_machine
        );
    }
    if elf.header.e_type != header::ET_EXEC {
        bail!(
            "Expected an executable ELF image, found type {}",
            elf.header.e_type
        );
    }

    let memory_len = state.memory.len() as u64;
    for ph in &elf.program_headers {
        if ph.p_type != program_header::PT_LOAD || ph.p_memsz == 0 {
            continue;
        }

        if ph.p_memsz < ph.p_filesz {
            bail!(
                "Segment memsz ({}) smaller than filesz ({}) at vaddr {:#x}",
                ph.p_memsz,
                ph.p_filesz,
                ph.p_vaddr
            );
        }

        let offset = ph.p_offset as usize;
        let file_size = ph.p_filesz as usize;

        if offset
            .checked_add(file_size)
            .is_none_or(|end| end > file_bytes.len())
        {
            bail!(
                "Segment at offset {:#x} with size {:#x} exceeds file ({} bytes)",
                ph.p_offset,
                ph.p_filesz,
                file_bytes.len()
            );
        }

        if ph.p_vaddr + ph.p_memsz > memory_len {
            bail!(
                "Segment {:#x}..{:#x} does not fit in {:#x} bytes of memory",
                ph.p_vaddr,
                ph.p_vaddr + ph.p_memsz,
                memory_len
            );
        }

        let contents = &file_bytes[offset..offset + file_size];
        let vaddr = ph.p_vaddr as u32;
        for i in 0..ph.p_memsz as u32 {
            let byte = contents.get(i as usize).copied().unwrap_or(0);
            let addr = vaddr.wrapping_add(i);
            state
                .memory
                .set(addr, Size::Byte, byte as u32)
                .map_err(|err| anyhow!("Loading segment at {vaddr:#x}: {err}"))?;
        }
        debug!(
            "loaded segment {:#010x}..{:#010x} ({} bytes from file)",
            ph.p_vaddr,
            ph.p_vaddr + ph.p_memsz,
            ph.p_filesz
        );
    }

    let entry = elf.entry as u32;
    state.registers.set_usp(memory_len as u32);
    state.registers.set_pc(entry);
    debug!("entry point {entry:#010x}, stack pointer {memory_len:#010x}");
    Ok(entry)
}

/// Address ranges holding code: executable sections, or executable
/// loadable segments when the image carries no section headers.
pub fn code_ranges(elf: &Elf) -> Vec<Range<u32>> {
    let sections: Vec<Range<u32>> = elf
        .section_headers
        .iter()
        .filter(|sh| sh.sh_flags & section_header::SHF_EXECINSTR as u64 != 0)
        .map(|sh| sh.sh_addr as u32..(sh.sh_addr + sh.sh_size) as u32)
        .collect();
    if !sections.is_empty() {
        return sections;
    }

    elf.program_headers
        .iter()
        .filter(|ph| ph.p_type == program_header::PT_LOAD && ph.p_flags & program_header::PF_X != 0)
        .map(|ph| ph.p_vaddr as u32..(ph.p_vaddr + ph.p_filesz) as u32)
        .collect()
}
