//! 卷的布局
//!
//! 控制区(1簇) | FAT区 | 数据区（根目录位于数据区第一个簇）
//!
//! [`Volume`]把块存储与分配表绑在一起，是目录与文件内容操作所需的能力对象。

pub mod boot;
pub mod dir_entry;
pub mod fat;

use std::sync::Arc;

use block_dev::BlockDevice;

use self::{boot::BootSector, fat::FatArea};
use crate::disk::Disk;
use crate::{ClusterId, Error, FsConfig, Result};

/// 卷的空间统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Space {
    pub total_clusters: usize,
    pub free_clusters: usize,
    pub cluster_size: usize,
}

impl Space {
    pub fn free_bytes(&self) -> u64 {
        (self.free_clusters * self.cluster_size) as u64
    }

    pub fn total_bytes(&self) -> u64 {
        (self.total_clusters * self.cluster_size) as u64
    }
}

#[derive(Debug)]
pub struct Volume {
    boot: BootSector,
    fat: FatArea,
    disk: Disk,
}

impl Volume {
    /// 在设备上建立新卷：写控制区、分配表，并清空根目录。
    pub fn format(dev: Arc<dyn BlockDevice>, config: &FsConfig) -> Result<Self> {
        let boot = BootSector::new(config)?;
        let disk = Self::disk(dev, config)?;

        let mut buf = vec![0; boot.cluster_size()];
        boot.encode(&mut buf)?;
        disk.write_cluster(0, &buf)?;

        let fat = FatArea::format(&boot, &disk)?;
        disk.get(boot.root_cluster().into())?.lock().zeroize();
        disk.sync_all()?;
        log::debug!("formatted volume {config:?}");

        Ok(Self { boot, fat, disk })
    }

    /// 打开已有的卷，控制区记录的几何参数必须与`config`一致。
    pub fn open(dev: Arc<dyn BlockDevice>, config: &FsConfig) -> Result<Self> {
        let disk = Self::disk(dev, config)?;

        let boot = BootSector::decode(&disk.read_cluster(0)?)?;
        if boot.config() != *config {
            return Err(Error::InvalidVolume(format!(
                "volume is {:?}, expected {config:?}",
                boot.config()
            )));
        }
        let fat = FatArea::load(&boot, &disk)?;

        Ok(Self { boot, fat, disk })
    }

    #[inline]
    pub fn fat(&self) -> &FatArea {
        &self.fat
    }

    #[inline]
    pub fn cluster_size(&self) -> usize {
        self.disk.cluster_size()
    }

    #[inline]
    pub fn root_cluster(&self) -> ClusterId {
        self.boot.root_cluster()
    }

    pub fn space(&self) -> Space {
        Space {
            total_clusters: self.fat.total_clusters(),
            free_clusters: self.fat.free_clusters(),
            cluster_size: self.cluster_size(),
        }
    }

    /// 容纳`len`字节所需的簇数
    pub fn clusters_for(&self, len: usize) -> usize {
        len.div_ceil(self.cluster_size())
    }

    pub fn alloc_chain(&mut self, len: usize) -> Result<ClusterId> {
        self.fat.alloc_chain(len, &self.disk)
    }

    pub fn extend_chain(&mut self, head: ClusterId, extra: usize) -> Result<()> {
        self.fat.extend(head, extra, &self.disk)
    }

    pub fn truncate_chain(&mut self, head: ClusterId, keep: usize) -> Result<()> {
        self.fat.truncate(head, keep, &self.disk)
    }

    pub fn release_chain(&mut self, head: ClusterId) -> Result<usize> {
        self.fat.dealloc(head, &self.disk)
    }

    /// 读取整条链表的内容，截断到`len`字节
    pub fn read_chain(&self, head: ClusterId, len: usize) -> Result<Vec<u8>> {
        let chain = self.fat.chain(head)?;
        let mut buf = Vec::with_capacity(chain.len() * self.cluster_size());
        for id in chain {
            if buf.len() >= len {
                break;
            }
            self.disk
                .get(id.into())?
                .lock()
                .map_slice(|data| buf.extend_from_slice(data));
        }
        buf.truncate(len);

        Ok(buf)
    }

    /// 把`data`依次写入链表的各个簇，最后一个簇的剩余部分清零。
    ///
    /// 链表必须足够长。
    pub fn write_chain(&mut self, head: ClusterId, data: &[u8]) -> Result<()> {
        let chain = self.fat.chain(head)?;
        if chain.len() < self.clusters_for(data.len()) {
            return Err(Error::NoSpace);
        }

        let mut chunks = data.chunks(self.cluster_size());
        for id in chain {
            self.disk
                .write_cluster(id.into(), chunks.next().unwrap_or_default())?;
        }

        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.disk.sync_all()
    }
}

impl Volume {
    fn disk(dev: Arc<dyn BlockDevice>, config: &FsConfig) -> Result<Disk> {
        let disk = Disk::new(dev, config.cluster_size)?;
        if disk.capacity() != config.cluster_count {
            return Err(Error::InvalidVolume(format!(
                "device holds {} clusters, expected {}",
                disk.capacity(),
                config.cluster_count
            )));
        }
        Ok(disk)
    }
}
