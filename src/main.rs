use std::{
    env,
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use goblin::{Object, elf::Elf};

use m68k_interp::{
    Cpu, StopReason,
    loader::{code_ranges, load_elf},
};

const USAGE: &str = "usage: m68k-interp run <binary> [--max-steps N] [--until ADDR]\n       m68k-interp disasm <binary>";

// Bound for `run` when neither --max-steps nor --until is given.
const DEFAULT_MAX_STEPS: u64 = 100_000_000;

enum Command {
    Run {
        path: PathBuf,
        max_steps: Option<u64>,
        until: Option<u32>,
    },
    Disasm {
        path: PathBuf,
    },
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    match parse_args(env::args().skip(1))? {
        Command::Run {
            path,
            max_steps,
            until,
        } => run_binary(&path, max_steps, until),
        Command::Disasm { path } => disassemble(&path),
    }
}

fn parse_elf(data: &[u8]) -> Result<Elf<'_>, Box<dyn Error>> {
    match Object::parse(data)? {
        Object::Elf(elf) => Ok(elf),
        other => Err(format!("Unsupported object format: {other:?}").into()),
    }
}

fn run_binary(
    path: &Path,
    max_steps: Option<u64>,
    until: Option<u32>,
) -> Result<(), Box<dyn Error>> {
    let data = fs::read(path)?;
    let elf = parse_elf(&data)?;

    let mut cpu = Cpu::new();
    load_elf(&elf, &data, &mut cpu.state)?;

    let max_steps = match (max_steps, until) {
        (None, None) => Some(DEFAULT_MAX_STEPS),
        (max_steps, _) => max_steps,
    };
    let result = cpu.run_until(until, max_steps);
    print!("{}", cpu.state.registers);
    match result? {
        StopReason::Reached { pc, steps } => println!("stopped at {pc:#010x} after {steps} steps"),
        StopReason::StepLimit { steps } => println!("step limit reached after {steps} steps"),
    }
    Ok(())
}

fn disassemble(path: &Path) -> Result<(), Box<dyn Error>> {
    let data = fs::read(path)?;
    let elf = parse_elf(&data)?;

    let mut cpu = Cpu::new();
    load_elf(&elf, &data, &mut cpu.state)?;

    for range in code_ranges(&elf) {
        let mut pc = range.start;
        while pc < range.end {
            let text = cpu.disassemble_at(pc)?;
            println!("{pc:#010x}: {text}");
            pc = cpu.state.registers.pc();
        }
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command, Box<dyn Error>> {
    let subcommand = args.next().ok_or(USAGE)?;
    let path = PathBuf::from(args.next().ok_or(USAGE)?);

    match subcommand.as_str() {
        "run" => {
            let mut max_steps = None;
            let mut until = None;
            while let Some(flag) = args.next() {
                let value = args
                    .next()
                    .ok_or_else(|| format!("missing value for {flag}"))?;
                match flag.as_str() {
                    "--max-steps" => max_steps = Some(parse_number(&value)?),
                    "--until" => until = Some(u32::try_from(parse_number(&value)?)?),
                    _ => return Err(format!("unknown option {flag}\n{USAGE}").into()),
                }
            }
            Ok(Command::Run {
                path,
                max_steps,
                until,
            })
        }
        "disasm" => Ok(Command::Disasm { path }),
        _ => Err(format!("unknown command {subcommand}\n{USAGE}").into()),
    }
}

// Decimal, or hex with a 0x prefix.
fn parse_number(text: &str) -> Result<u64, Box<dyn Error>> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16)?,
        None => text.parse()?,
    };
    Ok(value)
}
