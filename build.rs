//! Build script rendering man pages from the CLI definition.
//!
//! Writes `combat-dissector.1` plus one page per subcommand.

use std::{fs, path::Path};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn render(cmd: clap::Command, out_dir: &Path, name: &str) -> std::io::Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    Man::new(cmd).render(&mut buf)?;
    fs::write(out_dir.join(format!("{name}.1")), buf)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let out_dir = Path::new("target/generated-man");
    fs::create_dir_all(out_dir)?;

    let cmd = cli::Cli::command();
    for sub in cmd.get_subcommands() {
        let name = format!("combat-dissector-{}", sub.get_name());
        render(sub.clone(), out_dir, &name)?;
    }
    render(cmd, out_dir, "combat-dissector")?;

    Ok(())
}
