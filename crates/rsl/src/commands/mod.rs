use miette::{miette, Result};
use owo_colors::{OwoColorize, Stream};
use tracing::info;

pub mod extract;
pub mod repack;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Extract containers into editable directories
    Extract(extract::ExtractArgs),
    /// Repack extracted directories into containers
    Repack(repack::RepackArgs),
}

impl Commands {
    pub fn handle(&self) -> Result<()> {
        match self {
            Commands::Extract(extract) => extract.handle(),
            Commands::Repack(repack) => repack.handle(),
        }
    }
}

/// Log the outcome of a batch, failing when any input failed.
fn summarize(action: &str, done: usize, failed: usize) -> Result<()> {
    info!(
        "{} file(s) {action}, {} failed",
        done.if_supports_color(Stream::Stdout, |n| n.green()),
        failed.if_supports_color(Stream::Stdout, |n| n.red()),
    );

    if failed > 0 {
        return Err(miette!("{failed} of {} input(s) failed", done + failed));
    }
    Ok(())
}
