use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use flate2::read::MultiGzDecoder;

/// Open the variant stream named on the command line: `-` reads stdin,
/// anything else is a file with any GZIP/BGZF layers peeled off.
pub fn open_variant_input(arg: &str) -> anyhow::Result<Box<dyn BufRead + Send>> {
    if arg == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    open_input(Path::new(arg))
}

/// Opens a file and transparently peels off GZIP and BGZF layers to
/// expose the underlying text stream. Detection is by magic bytes, not
/// file name, and supports nested members (e.g. `.vcf.gz` re-gzipped).
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open variant stream at {}", path.display()))?;
    let mut reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(file));

    // Limit recursion depth to avoid infinite loops on malformed inputs
    let mut depth = 0;
    const MAX_DEPTH: usize = 10;

    while depth < MAX_DEPTH {
        let is_gzip = {
            let buf = reader.fill_buf()?;
            // GZIP magic: 1f 8b
            buf.len() >= 2 && buf[0] == 0x1f && buf[1] == 0x8b
        };
        if !is_gzip {
            break;
        }
        tracing::debug!("Detected GZIP/BGZF layer");
        // MultiGzDecoder supports BGZF and concatenated GZIP members
        reader = Box::new(BufReader::new(MultiGzDecoder::new(reader)));
        depth += 1;
    }

    Ok(reader)
}
