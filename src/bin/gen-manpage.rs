//! Writes picokit man pages
//!
//! One page for `picokit` and one `picokit-<command>.1` per subcommand, so
//! `man picokit-write` documents the HEX programming flags.
//!
//! Usage: gen-manpage [output-dir]   (default: target/man)

use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "../cli.rs"]
mod cli;

fn render(man: Man, path: &Path) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(path, buffer)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("target/man"));
    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let mut written = vec![output_dir.join("picokit.1")];
    render(Man::new(cmd.clone()), &written[0])?;

    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let title = format!("picokit-{}", sub.get_name());
        let path = output_dir.join(format!("{}.1", title));
        render(Man::new(sub.clone()).title(title), &path)?;
        written.push(path);
    }

    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}
