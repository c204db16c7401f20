use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

/// Compile and run a BT source file.
#[derive(Parser)]
#[command(name = "bt", author, version, about, long_about = None)]
struct Cli {
  /// Path to the .bt source file
  file: PathBuf,
  /// Print the compiled bytecode instead of executing it
  #[arg(long, visible_alias = "dis")]
  disassemble: bool,
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let args = Cli::parse();
  let source =
    std::fs::read_to_string(&args.file).with_context(|| format!("failed to read {}", args.file.display()))?;

  let mut ctx = vm::Context::new();
  let program = match ctx.compile(&source) {
    Ok(f) => f,
    Err(e) => anyhow::bail!("{}", e.report(source.as_str())),
  };

  if args.disassemble {
    let instructions: Vec<op::Instruction> = program
      .borrow()
      .program
      .iter()
      .map(|&bits| op::Instruction::from_bits(bits))
      .collect();
    println!("{}", op::disassemble(&instructions));
    return Ok(());
  }

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  if let Err(e) = ctx.call(&program, &mut out) {
    anyhow::bail!("{}", e.report(source.as_str()));
  }
  Ok(())
}
