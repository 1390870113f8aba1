use std::{
    fs::File,
    io::{prelude::*, Cursor},
    path::Path,
};

use zip::read::ZipArchive;

use crate::{
    definitions::{cpu, memory},
    LoadError,
};

/// The amount of bytes a program image can occupy, everything from the
/// program start up to the end of memory.
pub const MAX_ROM_SIZE: usize = memory::SIZE - cpu::PROGRAM_COUNTER as usize;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Represents a single rom with it's information
pub struct Rom {
    /// The rom name
    name: String,
    /// The program image stored as a u8 slice on the heap
    data: Box<[u8]>,
}

impl Rom {
    /// Will generate a new rom based of the given data, an empty image or
    /// an image that doesn't fit into memory is rejected.
    pub fn new(name: &str, data: impl Into<Box<[u8]>>) -> Result<Self, LoadError> {
        let data = data.into();
        if data.is_empty() {
            return Err(LoadError::Empty(name.to_string()));
        }
        if data.len() > MAX_ROM_SIZE {
            return Err(LoadError::TooLarge {
                size: data.len(),
                max: MAX_ROM_SIZE,
            });
        }
        Ok(Rom {
            name: name.to_string(),
            data,
        })
    }

    /// Reads the rom from the file system, the file name is used as the rom name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(&name, data)
    }

    /// Will return a slice internal values of the given data
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    /// Will return the name of the rom.
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

/// Represents an archive of roms, packed into a ZIP archive.
pub struct RomArchives<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl RomArchives<File> {
    /// Opens the archive stored at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

impl<'a> RomArchives<Cursor<&'a [u8]>> {
    /// Reads the archive from memory.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, LoadError> {
        Self::new(Cursor::new(data))
    }
}

impl<R: Read + Seek> RomArchives<R> {
    /// Will generate a new rom archive object based of the given reader
    pub fn new(reader: R) -> Result<Self, LoadError> {
        Ok(RomArchives {
            archive: ZipArchive::new(reader)?,
        })
    }

    /// Will return all the rom names available to be chosen
    pub fn file_names(&self) -> Vec<&'_ str> {
        self.archive.file_names().collect()
    }

    /// Will decompress the information from the zip archive
    pub fn get_file_data(&mut self, name: &str) -> Result<Rom, LoadError> {
        let mut file = self.archive.by_name(name)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Rom::new(name, data)
    }
}
