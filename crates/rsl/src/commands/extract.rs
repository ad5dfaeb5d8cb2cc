use std::path::PathBuf;

use clap::Args;
use miette::Result;
use rsl_rmhg::{layout, FormatRevision, ReadOptions};
use tracing::{error, info, warn};

#[derive(Args)]
pub struct ExtractArgs {
    /// Input container files
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Also decode file entries named with the input's extension as nested containers
    #[arg(short, long, default_value_t = false)]
    recursive: bool,

    /// Decode little endian containers with the legacy format revision
    #[arg(long, default_value_t = false)]
    legacy: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let options = ReadOptions::builder()
            .revision(if self.legacy {
                FormatRevision::Legacy
            } else {
                FormatRevision::Current
            })
            .recursive(self.recursive)
            .build();

        let mut unpacked = 0;
        let mut failed = 0;
        for input in &self.inputs {
            info!("unpacking {}", input.display());

            match layout::unpack(input, options.clone()) {
                Ok((_, report)) => {
                    if report.failed > 0 {
                        warn!(
                            "{}: {} payload file(s) could not be written",
                            input.display(),
                            report.failed
                        );
                    }
                    unpacked += 1;
                }
                Err(e) => {
                    error!("{}: {e}", input.display());
                    failed += 1;
                }
            }
        }

        super::summarize("unpacked", unpacked, failed)
    }
}
