use std::path::PathBuf;

use clap::Args;
use miette::Result;
use rsl_rmhg::{layout, FormatRevision};
use tracing::{error, info};

#[derive(Args)]
pub struct RepackArgs {
    /// Extracted directories, or the container files they were extracted from
    #[arg(value_name = "PATH", required = true)]
    inputs: Vec<PathBuf>,

    /// Extension of the repacked file when it cannot be taken from the input
    #[arg(short, long, default_value = layout::DEFAULT_EXTENSION)]
    extension: String,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Encode little endian containers with the legacy format revision instead of the revision
    /// recorded at extraction
    #[arg(long, default_value_t = false)]
    legacy: bool,
}

impl RepackArgs {
    pub fn handle(&self) -> Result<()> {
        let revision = self.legacy.then_some(FormatRevision::Legacy);

        let mut repacked = 0;
        let mut failed = 0;
        for input in &self.inputs {
            let (dir, output) = if input.is_dir() {
                (input.clone(), layout::repack_path(input, &self.extension))
            } else {
                (layout::extraction_dir(input), input.clone())
            };
            info!("repacking {} into {}", dir.display(), output.display());

            match layout::repack(&dir, &output, revision, self.overwrite) {
                Ok(()) => repacked += 1,
                Err(e) => {
                    error!("{}: {e}", dir.display());
                    failed += 1;
                }
            }
        }

        super::summarize("repacked", repacked, failed)
    }
}
