//! Zero-copy PDB path extraction from PE32, PE32+ and TE images.
//!
//! The lookup walks the image's debug data directory, picks the first
//! CodeView entry and returns a [`PdbPath`] that borrows the NUL-terminated
//! path straight out of the caller's buffer. Every offset and size read from
//! the image is checked before it is used.
//!
//! ```no_run
//! use pecoff_pdb::{pdb_path, ParseOptions};
//!
//! let data = std::fs::read("app.efi").unwrap();
//! match pdb_path(&data, &ParseOptions::default()) {
//!     Ok(path) => println!("{}", path),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

pub mod config;
pub mod error;
pub mod formats;
pub mod logging;

pub use config::ParseOptions;
pub use error::{Error, ImageError, MalformedReason, NotFoundReason, PdbError, Result};
pub use formats::pe::{
    find_pdb_path, CodeViewSignature, DebugDirectory, DebugEntry, ImageDescriptor, ImageFormat,
    PdbPath,
};

/// Parse `data` as an image and borrow its PDB path.
///
/// With debug support disabled this reports absence without looking at the
/// buffer at all.
pub fn pdb_path<'data>(data: &'data [u8], options: &ParseOptions) -> Result<PdbPath<'data>> {
    let span = tracing::debug_span!("pdb_path", file_size = data.len());
    let _guard = span.enter();

    if !options.debug_support {
        return Err(PdbError::not_found(NotFoundReason::DebugSupportDisabled).into());
    }

    let image = ImageDescriptor::parse(data, options)?;
    Ok(find_pdb_path(&image, options)?)
}
