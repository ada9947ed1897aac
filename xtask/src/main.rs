//! # xtask - build automation for the workspace
//!
//! See [`HELP_TEXT`] for the available commands.

use anyhow::{Result, bail};
use xshell::{Shell, cmd};

/// Help shown by `cargo run -p xtask -- help`.
pub const HELP_TEXT: &str = r#"xtask

Usage:
  cargo run -p xtask -- <command>

Commands:
  help         Show this message
  fmt          Run rustfmt
  fmt-check    Check formatting (CI)
  clippy       Run clippy on the workspace
  test         Run the tests with nextest, then the doctests
  e2e          Build the binaries and run the file2ofx end-to-end tests
  ci           fmt-check + clippy + build + test (CI profile)

Note:
  cargo-nextest is installed on first use
"#;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "help".to_string());

    let sh = Shell::new()?;

    match cmd.as_str() {
        "help" | "-h" | "--help" => {
            println!("{HELP_TEXT}");
            Ok(())
        }
        "fmt" => Ok(cmd!(sh, "cargo +nightly fmt --all").run()?),
        "fmt-check" => Ok(cmd!(sh, "cargo +nightly fmt --all -- --check").run()?),
        "clippy" => Ok(cmd!(sh, "cargo +nightly clippy --workspace -- -D warnings").run()?),
        "test" => {
            ensure_nextest(&sh)?;
            cmd!(sh, "cargo nextest run --workspace").run()?;
            // nextest does not run doctests
            cmd!(sh, "cargo +nightly test --workspace --doc").run()?;
            Ok(())
        }
        "e2e" => {
            ensure_nextest(&sh)?;
            // the e2e crate drives the built file2ofx binary
            cmd!(sh, "cargo build -p file2ofx").run()?;
            cmd!(sh, "cargo nextest run -p e2e-tests").run()?;
            Ok(())
        }
        "ci" => {
            ensure_nextest(&sh)?;
            cmd!(sh, "cargo +nightly fmt --all -- --check").run()?;
            cmd!(sh, "cargo +nightly clippy --workspace -- -D warnings").run()?;
            cmd!(sh, "cargo build --workspace").run()?;
            cmd!(sh, "cargo nextest run --workspace --profile ci").run()?;
            cmd!(sh, "cargo +nightly test --workspace --doc").run()?;
            Ok(())
        }
        other => bail!("Unknown command: {other}\n\nRun: cargo run -p xtask -- help"),
    }
}

/// Installs cargo-nextest when it is missing.
fn ensure_nextest(sh: &Shell) -> Result<()> {
    if cmd!(sh, "cargo nextest --version").quiet().run().is_ok() {
        return Ok(());
    }

    eprintln!("cargo-nextest not found, installing...");
    cmd!(sh, "cargo install cargo-nextest --locked").run()?;
    eprintln!("cargo-nextest installed");
    Ok(())
}
