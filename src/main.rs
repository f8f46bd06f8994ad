use blaze::bits::{hex, Address};
use blaze::cartridge::MapType;
use blaze::debug_flags;
use blaze::session::{Session, StopReason};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

fn resolve_rom_path(arg: &str) -> Result<PathBuf, String> {
    let direct = PathBuf::from(arg);
    if direct.exists() {
        return Ok(direct);
    }

    // "game" -> "game.sfc" / "game.smc", also under roms/
    let exts = ["sfc", "smc"];
    let candidates = [direct.clone(), Path::new("roms").join(arg)];
    for base in &candidates {
        if base.exists() {
            return Ok(base.clone());
        }
        if base.extension().is_some() {
            continue;
        }
        for ext in exts {
            let p = base.with_extension(ext);
            if p.exists() {
                return Ok(p);
            }
        }
    }

    Err(format!(
        "ROM '{}' not found. Provide a path to a .sfc or .smc file.",
        arg
    ))
}

/// Accepts `$008000`, `0x008000` or bare hex.
fn parse_address(s: &str) -> Option<Address> {
    let digits = s
        .strip_prefix('$')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    Address::from_str_radix(digits, 16)
        .ok()
        .filter(|a| *a <= 0xFF_FFFF)
}

fn option_value<'a>(args: &'a [String], i: usize, name: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            eprintln!("{} requires a value", name);
            process::exit(2);
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    // CLI flags:
    //   --steps <N>        => HEADLESS_STEPS=N
    //   --break <ADDR>     => stop when PBR:PC reaches ADDR
    //   --disasm <N>       => instructions listed at the final PC
    //   --save-state <F>   => write a save state after the run
    if args.len() < 2 || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!(
            "Usage: {} [--steps N] [--break ADDR] [--disasm N] [--save-state FILE] <rom>",
            args[0]
        );
        eprintln!("Supported formats: .sfc, .smc");
        return;
    }

    let mut rom_arg_opt: Option<String> = None;
    let mut breakpoint: Option<Address> = None;
    let mut disasm_lines = blaze::session::DISASSEMBLY_LINES;
    let mut save_path: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--steps" => {
                env::set_var("HEADLESS_STEPS", option_value(&args, i, "--steps"));
                i += 2;
            }
            "--break" => {
                let value = option_value(&args, i, "--break");
                match parse_address(value) {
                    Some(a) => breakpoint = Some(a),
                    None => {
                        eprintln!("--break: invalid address '{}'", value);
                        process::exit(2);
                    }
                }
                i += 2;
            }
            "--disasm" => {
                let value = option_value(&args, i, "--disasm");
                match value.parse() {
                    Ok(n) => disasm_lines = n,
                    Err(_) => {
                        eprintln!("--disasm: invalid count '{}'", value);
                        process::exit(2);
                    }
                }
                i += 2;
            }
            "--save-state" => {
                save_path = Some(PathBuf::from(option_value(&args, i, "--save-state")));
                i += 2;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown option: {}", s);
                process::exit(2);
            }
            s => {
                rom_arg_opt = Some(s.to_string());
                i += 1;
            }
        }
    }
    let rom_arg = match rom_arg_opt {
        Some(s) => s,
        None => {
            eprintln!("ROM argument missing");
            process::exit(2);
        }
    };

    let rom_path = match resolve_rom_path(&rom_arg) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    };

    let quiet = debug_flags::quiet();
    let mut session = Session::new();

    if !quiet {
        println!("Loading ROM: {}", rom_path.display());
    }
    match session.load_rom(&rom_path) {
        Ok(MapType::Invalid) => {
            eprintln!("Unrecognised ROM image: {}", rom_path.display());
            process::exit(1);
        }
        Ok(map_type) => {
            if !quiet {
                let rom = session.bus().memory.rom();
                println!("Title: {}", rom.name());
                println!("Mapper: {:?}", map_type);
                println!("ROM Size: {} KB", rom.size() / 1024);
                println!("RAM Size: {} KB", rom.sram_size() / 1024);
            }
        }
        Err(e) => {
            eprintln!("Failed to load ROM: {}", e);
            process::exit(1);
        }
    }

    session.set_breakpoint(breakpoint);
    let budget = debug_flags::headless_steps();
    let reason = session.run(budget);

    if !quiet {
        match reason {
            StopReason::Budget => println!("\nStopped after {} instructions", budget),
            StopReason::Breakpoint(at) => println!("\nBreakpoint hit at {}", hex(at, 6)),
            StopReason::Stopped => println!("\nCPU stopped (STP)"),
            StopReason::Paused | StopReason::NoRom => {}
        }
        println!("Executed {} instructions", session.instructions());

        let output = session.take_output();
        if !output.is_empty() {
            println!("\nOutput:\n{}", output);
        }

        println!("\n{}", session.register_summary());

        println!("\n   ADDR  | CODE\n ------- | ----");
        for line in session.disassembly(disasm_lines) {
            println!(" {}", line);
        }
    }

    if let Some(path) = save_path {
        match session.save_state().save_to_file(&path) {
            Ok(()) => {
                if !quiet {
                    println!("\nSave state written to {}", path.display());
                }
            }
            Err(e) => {
                eprintln!("Failed to write save state: {}", e);
                process::exit(1);
            }
        }
    }
}
