//! Plain-text PPM (P3) export.

use glint_renderer::Snapshot;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the snapshot as P3: a header, then one `r g b` line per pixel.
pub fn write_ppm<W: Write>(writer: &mut W, image: &Snapshot) -> std::io::Result<()> {
    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for rgb in image.pixels.chunks_exact(3) {
        writeln!(writer, "{} {} {}", rgb[0], rgb[1], rgb[2])?;
    }

    Ok(())
}

pub fn save_ppm(image: &Snapshot, path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_ppm(&mut writer, image)?;
    writer.flush()
}
