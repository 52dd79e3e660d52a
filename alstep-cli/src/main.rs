//! alstep CLI - コマンドラインインターフェース
//!
//! 停止中のトレース対象に対してレジスタ操作とシングルステップを試すREPL

use alstep_core::parse::{parse_address, parse_register};
use alstep_core::{Command, Debugger, Instruction, StopKind};
use alstep_target::{AddressSpace, CpuModel, ProcessMemory, SparseMemory, StepState, Task};
use anyhow::Result;
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// alstep - Alpha single-step inspector
#[derive(Parser)]
#[command(name = "alstep")]
#[command(version = "0.1.0")]
#[command(about = "Register access and breakpoint-based single-stepping for Alpha tracees", long_about = None)]
struct Cli {
    /// CPU implementation version (ev4, ev5, ev6)
    #[arg(long, global = true, default_value = "ev6")]
    cpu: CpuModel,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: TargetCommand,
}

#[derive(Subcommand)]
enum TargetCommand {
    /// Load a raw little-endian code image into an in-process address space
    Image {
        /// Path to the raw image
        path: String,

        /// Load address of the image
        #[arg(short, long, value_parser = parse_address, default_value = "0x120000000")]
        base: u64,

        /// Initial program counter (defaults to the load address)
        #[arg(long, value_parser = parse_address)]
        pc: Option<u64>,

        /// Map the image read-only
        #[arg(long)]
        readonly: bool,
    },

    /// Use the memory of a live process
    Attach {
        /// Process ID whose memory is used
        #[arg(short, long)]
        pid: i32,

        /// Initial program counter
        #[arg(long, value_parser = parse_address)]
        pc: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    println!("alstep - Alpha single-step inspector");
    println!("Version 0.1.0");
    println!();

    match cli.command {
        TargetCommand::Image {
            path,
            base,
            pc,
            readonly,
        } => {
            let mut memory = SparseMemory::new();
            let size = memory.load_file(base, &path, !readonly)?;
            info!("loaded {} bytes from {} at {:#x}", size, path, base);

            let mut task = Task::new(1, memory).with_cpu(cli.cpu);
            task.set_pc(pc.unwrap_or(base));
            run_repl(&mut Debugger::new(task))
        }
        TargetCommand::Attach { pid, pc } => {
            let memory = ProcessMemory::new(pid);
            if !memory.is_mapped(pc)? {
                anyhow::bail!("PC {:#x} is not mapped in process {}", pc, pid);
            }
            info!("using memory of process {}", memory.pid());

            let mut task = Task::new(pid, memory).with_cpu(cli.cpu);
            task.set_pc(pc);
            run_repl(&mut Debugger::new(task))
        }
    }
}

/// ログ出力を初期化する
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// REPLループを実行する
fn run_repl<M: AddressSpace>(debugger: &mut Debugger<M>) -> Result<()> {
    println!("Stopped at {:#x}", debugger.pc());
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("(alstep) ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                match Command::parse(line) {
                    Some(Command::Quit) => break,
                    Some(command) => {
                        if let Err(e) = handle_command(debugger, command) {
                            eprintln!("Error: {}", e);
                        }
                    }
                    None => {
                        println!("Unknown command: {}", line);
                        println!("Type 'help' for available commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    // 書き換えた命令を残さない
    if debugger.cancel() == StopKind::Step {
        println!("Removed pending single-step breakpoints");
    }
    println!("Goodbye!");
    Ok(())
}

fn handle_command<M: AddressSpace>(debugger: &mut Debugger<M>, command: Command) -> Result<()> {
    match command {
        Command::Regs => print_registers(debugger),
        Command::Reg(reg) => {
            let regno = parse_register(&reg)?;
            println!("${} = {:#018x}", regno, debugger.read_register(regno));
        }
        Command::Set(reg, value) => {
            let regno = parse_register(&reg)?;
            debugger.write_register(regno, parse_address(&value)?)?;
            println!("${} = {:#018x}", regno, debugger.read_register(regno));
        }
        Command::Examine(addr) => {
            let addr = parse_address(&addr)?;
            let word = debugger.examine(addr)?;
            println!("{:#x}: {:#010x}  {}", addr, word, Instruction(word));
        }
        Command::Poke(addr, value) => {
            let addr = parse_address(&addr)?;
            let value = u32::try_from(parse_address(&value)?)?;
            debugger.poke(addr, value)?;
        }
        Command::Step => {
            let count = debugger.step()?;
            println!("Single-step armed at {:#x}: {} breakpoint(s)", debugger.pc(), count);
            print_pending(debugger);
        }
        Command::Arm => {
            let count = debugger.arm()?;
            println!("{} breakpoint(s) installed", count);
            print_pending(debugger);
        }
        Command::Cancel => match debugger.cancel() {
            StopKind::Step => println!("Breakpoints removed (step-induced stop)"),
            StopKind::Other => println!("No single-step was pending"),
        },
        Command::State => {
            match debugger.step_state() {
                StepState::Idle => println!("Idle"),
                StepState::SingleStepArmed => println!("Single-step requested, not installed"),
                StepState::Pending(_) => println!("Breakpoints pending"),
            }
            print_pending(debugger);
        }
        Command::Help => print_help(),
        Command::Quit => {}
    }

    Ok(())
}

/// 全レジスタを表示する
fn print_registers<M: AddressSpace>(debugger: &Debugger<M>) {
    for row in debugger.registers().chunks(3) {
        let line: Vec<String> = row
            .iter()
            .map(|(reg, value)| format!("{:>6} {:#018x}", reg.name(), value))
            .collect();
        println!("  {}", line.join("  "));
    }
}

/// 設置済みのブレークポイントを表示する
fn print_pending<M: AddressSpace>(debugger: &Debugger<M>) {
    for bp in debugger.pending_breakpoints() {
        println!("  {:#x} (saved {:#010x})", bp.address(), bp.original_insn());
    }
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  help           - Show this help message");
    println!("  quit/exit/q    - Exit (pending breakpoints are removed)");
    println!();
    println!("Register commands:");
    println!("  regs           - Show all registers");
    println!("  reg <r>        - Show one register (r5, f3, gp, sp, pc, fpcr, unique, or number)");
    println!("  set <r> <v>    - Write a register");
    println!();
    println!("Memory commands:");
    println!("  x <addr>       - Show the instruction word at addr");
    println!("  poke <addr> <v> - Write an instruction word");
    println!();
    println!("Single-step commands:");
    println!("  step (s)       - Request a single step and install breakpoints");
    println!("  arm            - Install breakpoints for the current PC");
    println!("  cancel         - Remove breakpoints and report whether the stop was a step");
    println!("  state          - Show the single-step state");
}
