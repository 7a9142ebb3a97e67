//! 目录项的磁盘格式。
//!
//! 目录的簇链表里依次存放32字节的目录项，
//! 名称首字节为0的目录项表示列表结束，其后的内容都是空闲的。

use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};
use enumflags2::{bitflags, BitFlags};

use crate::{ClusterId, Error, Result};

#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirRecord {
    /// Zero padded, case preserved
    name: [u8; 11],

    attr: u8,

    /// Reserved, must be 0
    _reserved1: [u8; 4],

    /// First data cluster, 0 if nothing was ever allocated
    fst_clus: u32,

    /// Quantity containing size in bytes of the file described by this entry
    file_size: u32,

    /// Reserved, must be 0
    _reserved2: [u8; 8],
}

impl DirRecord {
    pub const SIZE: usize = 32;

    pub fn new(name: &str, attr: BitFlags<AttrFlag>, id: Option<ClusterId>, size: usize) -> Self {
        let mut record = Self::default();
        record
            .name
            .iter_mut()
            .zip(name.as_bytes())
            .for_each(|(b1, b2)| *b1 = *b2);
        record.attr = attr.bits();
        record.fst_clus = id.map_or(0, u32::from);
        record.file_size = size as u32;
        record
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut Cursor::new(bytes))
            .map_err(|e| Error::InvalidVolume(format!("bad directory record: {e}")))
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        self.write(&mut Cursor::new(buf))
            .map_err(|e| Error::InvalidVolume(format!("cannot encode directory record: {e}")))
    }

    #[inline]
    pub fn is_tail(&self) -> bool {
        self.name[0] == 0
    }

    pub fn name(&self) -> Result<&str> {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len])
            .map_err(|_| Error::InvalidVolume(format!("undecodable name {:?}", self.name)))
    }

    pub fn attr(&self) -> BitFlags<AttrFlag> {
        BitFlags::from_bits_truncate(self.attr)
    }

    pub fn cluster_id(&self) -> Option<ClusterId> {
        (self.fst_clus != 0).then(|| ClusterId::new(self.fst_clus))
    }

    pub const fn size(&self) -> usize {
        self.file_size as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[bitflags]
#[repr(u8)]
pub enum AttrFlag {
    ReadOnly = 0b0000_0001,
    Hidden = 0b0000_0010,
    /// The corresponding file is tagged as a component of the operating system
    System = 0b0000_0100,
    /// The corresponding entry contains the volume label
    VolumeID = 0b0000_1000,
    Directory = 0b0001_0000,
    /// Indicates that properties of the associated file have been modified
    Archive = 0b0010_0000,
}
