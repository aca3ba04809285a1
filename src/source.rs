use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Opens `path` as a byte source, decompressing gzip (and BGZF) input.
pub fn open_source<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    debug!("opening {}", path.display());
    sniff_source(File::open(path)?)
}

/// Wraps `reader` in a gzip decoder when its first bytes are the gzip magic.
pub fn sniff_source<R: Read + Send + 'static>(reader: R) -> io::Result<Box<dyn Read + Send>> {
    let mut reader = BufReader::new(reader);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        debug!("gzip input detected");
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}
