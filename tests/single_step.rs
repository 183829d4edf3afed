use datatest_stable as datatest;
use serde::Deserialize;
use std::{fs, path::Path};

use m68k_interp::{AddressSpace, Cpu, Memory, Register, Size};

// SR bits the core models: T, S, interrupt mask, X, N, Z, V, C.
const SR_MASK: u16 = 0b1111_0111_0001_1111;

#[derive(Debug, Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
}

#[derive(Debug, Deserialize)]
struct CpuState {
    d0: u32,
    d1: u32,
    d2: u32,
    d3: u32,
    d4: u32,
    d5: u32,
    d6: u32,
    d7: u32,
    a0: u32,
    a1: u32,
    a2: u32,
    a3: u32,
    a4: u32,
    a5: u32,
    a6: u32,
    usp: u32,
    ssp: u32,
    sr: u16,
    pc: u32,
    #[serde(default)]
    prefetch: Vec<u16>,
    #[serde(default)]
    ram: Vec<(u32, u8)>,
}

impl CpuState {
    fn data(&self) -> [u32; 8] {
        [
            self.d0, self.d1, self.d2, self.d3, self.d4, self.d5, self.d6, self.d7,
        ]
    }

    fn addr(&self) -> [u32; 7] {
        [
            self.a0, self.a1, self.a2, self.a3, self.a4, self.a5, self.a6,
        ]
    }
}

fn setup(cpu: &mut Cpu, state: &CpuState) {
    for &(addr, value) in &state.ram {
        cpu.state
            .memory
            .set(addr, Size::Byte, value as u32)
            .expect("ram entry outside memory");
    }
    for (i, word) in state.prefetch.iter().enumerate() {
        cpu.state
            .memory
            .set(state.pc + 2 * i as u32, Size::Word, *word as u32)
            .expect("prefetch outside memory");
    }

    let regs = &mut cpu.state.registers;
    for (n, value) in state.data().into_iter().enumerate() {
        regs.set(Register::data(n as u8), Size::Long, value);
    }
    for (n, value) in state.addr().into_iter().enumerate() {
        regs.set(Register::addr(n as u8), Size::Long, value);
    }
    regs.set_usp(state.usp);
    regs.set_ssp(state.ssp);
    regs.set_sr(state.sr);
    regs.set_pc(state.pc);
}

fn compare(cpu: &Cpu, expected: &CpuState) -> Vec<String> {
    let mut errors = Vec::new();
    let regs = &cpu.state.registers;

    for (n, want) in expected.data().into_iter().enumerate() {
        let got = regs.get(Register::data(n as u8), Size::Long);
        if got != want {
            errors.push(format!("D{n} mismatch: got {got:#010x}, expected {want:#010x}"));
        }
    }
    for (n, want) in expected.addr().into_iter().enumerate() {
        let got = regs.get(Register::addr(n as u8), Size::Long);
        if got != want {
            errors.push(format!("A{n} mismatch: got {got:#010x}, expected {want:#010x}"));
        }
    }
    if regs.usp() != expected.usp {
        errors.push(format!(
            "USP mismatch: got {:#010x}, expected {:#010x}",
            regs.usp(),
            expected.usp
        ));
    }
    if regs.ssp() != expected.ssp {
        errors.push(format!(
            "SSP mismatch: got {:#010x}, expected {:#010x}",
            regs.ssp(),
            expected.ssp
        ));
    }
    if regs.pc() != expected.pc {
        errors.push(format!(
            "PC mismatch: got {:#010x}, expected {:#010x}",
            regs.pc(),
            expected.pc
        ));
    }
    if regs.sr() & SR_MASK != expected.sr & SR_MASK {
        errors.push(format!(
            "SR mismatch: got {:#06x}, expected {:#06x}",
            regs.sr(),
            expected.sr
        ));
    }
    for &(addr, want) in &expected.ram {
        match cpu.state.memory.get(addr, Size::Byte) {
            Ok(got) if got == want as u32 => {}
            Ok(got) => errors.push(format!(
                "RAM[{addr:#08x}] mismatch: got {got:#04x}, expected {want:#04x}"
            )),
            Err(err) => errors.push(format!("RAM[{addr:#08x}]: {err}")),
        }
    }
    errors
}

fn run_case(path: &Path) -> datatest::Result<()> {
    let cases: Vec<TestCase> = serde_json::from_str(&fs::read_to_string(path)?)?;
    let mut failures = Vec::new();

    for case in &cases {
        let mut cpu = Cpu::with_memory(Memory::default());
        setup(&mut cpu, &case.initial);
        if let Err(err) = cpu.step() {
            failures.push(format!("{}: {err}", case.name));
            continue;
        }
        for error in compare(&cpu, &case.final_state) {
            failures.push(format!("{}: {error}", case.name));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} of {} cases in {} failed:\n{}",
            failures.len(),
            cases.len(),
            path.display(),
            failures.join("\n")
        );
    }
    Ok(())
}

datatest::harness! {
    { test = run_case, root = "./tests/single-step", pattern = r#"^.*\.json$"# },
}
