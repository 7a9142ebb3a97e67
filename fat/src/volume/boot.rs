//! 控制区：磁盘的第0个簇，记录卷的几何参数。

use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};

use crate::{ClusterId, Error, FsConfig, Result};

#[binrw]
#[brw(little, magic = b"MINIFAT\0")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSector {
    /// Bytes per cluster
    cluster_size: u32,
    /// Clusters on the whole disk, reserved ones included
    cluster_count: u32,
    /// First cluster of the allocation table
    fat_start: u32,
    /// Clusters occupied by the allocation table
    fat_clusters: u32,
    /// First cluster of the root directory
    root_cluster: u32,
}

impl BootSector {
    /// 编码后占据的字节数（含魔数）
    pub const SIZE: usize = 8 + 5 * 4;

    pub fn new(config: &FsConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            cluster_size: config.cluster_size as u32,
            cluster_count: config.cluster_count as u32,
            fat_start: 1,
            fat_clusters: config.fat_clusters() as u32,
            root_cluster: config.root_cluster() as u32,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let boot = Self::read(&mut Cursor::new(bytes))
            .map_err(|e| Error::InvalidVolume(format!("bad control region: {e}")))?;

        let expected = Self::new(&boot.config())?;
        if boot != expected {
            return Err(Error::InvalidVolume(format!(
                "inconsistent control region {boot:?}"
            )));
        }
        Ok(boot)
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        self.write(&mut Cursor::new(buf))
            .map_err(|e| Error::InvalidVolume(format!("cannot encode control region: {e}")))
    }

    pub fn config(&self) -> FsConfig {
        FsConfig::new(self.cluster_size as usize, self.cluster_count as usize)
    }

    #[inline]
    pub const fn cluster_size(&self) -> usize {
        self.cluster_size as usize
    }

    #[inline]
    pub const fn cluster_count(&self) -> usize {
        self.cluster_count as usize
    }

    #[inline]
    pub const fn fat_start(&self) -> usize {
        self.fat_start as usize
    }

    #[inline]
    pub const fn fat_clusters(&self) -> usize {
        self.fat_clusters as usize
    }

    #[inline]
    pub const fn root_cluster(&self) -> ClusterId {
        ClusterId::new(self.root_cluster)
    }
}
