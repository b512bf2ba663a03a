//! Reading and writing of configuration and result files.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{self, format_err, Context};
use bincode;
use serde::{de::DeserializeOwned, Serialize};
use serde_yaml;

pub(crate) mod format;


/// An enumerated type for `symbasis` binary file types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymBasisFileType {
    /// Variant for binary files containing enumerated bases.
    Bas,

    /// Variant for binary files containing operator matrix elements.
    Ops,
}

impl SymBasisFileType {
    /// Returns the extension of the file type.
    pub fn ext(&self) -> &'static str {
        match self {
            SymBasisFileType::Bas => "symbasis.bas",
            SymBasisFileType::Ops => "symbasis.ops",
        }
    }

    fn path<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        let mut path = name.as_ref().to_path_buf();
        path.set_extension(self.ext());
        path
    }
}

/// Reads a `symbasis` binary file and deserialises it.
///
/// # Arguments
///
/// * `name` - The name of the file to be read in, without its `symbasis`-specific extension.
/// * `file_type` - The type of the file.
pub fn read_symbasis_binary<T, P: AsRef<Path>>(
    name: P,
    file_type: SymBasisFileType,
) -> Result<T, anyhow::Error>
where
    T: DeserializeOwned,
{
    let path = file_type.path(name);
    let mut reader = BufReader::new(
        File::open(&path).with_context(|| format!("Unable to open `{}`", path.display()))?,
    );
    bincode::deserialize_from(&mut reader).map_err(|err| format_err!(err))
}

/// Serialises a structure into a `symbasis` binary file.
///
/// # Arguments
///
/// * `name` - The name of the file to be written, without its `symbasis`-specific extension.
/// * `file_type` - The type of the file.
/// * `value` - The structure to be written.
pub fn write_symbasis_binary<T, P: AsRef<Path>>(
    name: P,
    file_type: SymBasisFileType,
    value: &T,
) -> Result<(), anyhow::Error>
where
    T: Serialize,
{
    let path = file_type.path(name);
    let mut writer = BufWriter::new(
        File::create(&path).with_context(|| format!("Unable to create `{}`", path.display()))?,
    );
    bincode::serialize_into(&mut writer, value).map_err(|err| format_err!(err))
}

/// Reads a YAML configuration file and deserialises it.
///
/// # Arguments
///
/// * `name` - The name of the file to be read in, with its `.yml` or `.yaml` extension.
pub fn read_symbasis_yaml<T, P: AsRef<Path>>(name: P) -> Result<T, anyhow::Error>
where
    T: DeserializeOwned,
{
    let mut reader = BufReader::new(File::open(name).map_err(|err| format_err!(err))?);
    serde_yaml::from_reader(&mut reader).map_err(|err| format_err!(err))
}

/// Serialises a structure into a YAML file.
///
/// # Arguments
///
/// * `name` - The name of the file to be written, without extensions. The file will have the
/// `.yml` extension.
pub fn write_symbasis_yaml<T, P: AsRef<Path>>(name: P, value: &T) -> Result<(), anyhow::Error>
where
    T: Serialize,
{
    let mut path = name.as_ref().to_path_buf();
    path.set_extension("yml");
    let mut writer = BufWriter::new(File::create(path)?);
    serde_yaml::to_writer(&mut writer, value).map_err(|err| format_err!(err))
}
