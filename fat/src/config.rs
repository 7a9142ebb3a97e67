use crate::{Error, Result};

/// 原始磁盘的簇大小
pub const DEFAULT_CLUSTER_SIZE: usize = 1024;
/// 原始磁盘的簇个数
pub const DEFAULT_CLUSTER_COUNT: usize = 1024;

pub const MIN_CLUSTER_SIZE: usize = 512;
pub const MAX_CLUSTER_SIZE: usize = 64 * 1024;

/// 虚拟磁盘的几何参数，格式化时写入控制区，打开时与之比对。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    pub cluster_size: usize,
    pub cluster_count: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CLUSTER_SIZE, DEFAULT_CLUSTER_COUNT)
    }
}

impl FsConfig {
    pub const fn new(cluster_size: usize, cluster_count: usize) -> Self {
        Self {
            cluster_size,
            cluster_count,
        }
    }

    /// FAT区占据的簇数，每个簇一条`u32`
    pub fn fat_clusters(&self) -> usize {
        (self.cluster_count * 4).div_ceil(self.cluster_size)
    }

    /// 根目录的起始簇：紧随控制区(1簇)与FAT区
    pub fn root_cluster(&self) -> usize {
        1 + self.fat_clusters()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cluster_size.is_power_of_two()
            || !(MIN_CLUSTER_SIZE..=MAX_CLUSTER_SIZE).contains(&self.cluster_size)
        {
            return Err(Error::InvalidVolume(format!(
                "cluster size {} must be a power of two in {MIN_CLUSTER_SIZE}..={MAX_CLUSTER_SIZE}",
                self.cluster_size
            )));
        }
        if self.cluster_count >= 0x0FFF_FFF0 {
            return Err(Error::InvalidVolume(format!(
                "{} clusters exceed the addressable range",
                self.cluster_count
            )));
        }
        // 根目录之后至少还要留一个可分配的簇
        if self.cluster_count < self.root_cluster() + 2 {
            return Err(Error::InvalidVolume(format!(
                "{} clusters leave no room for data",
                self.cluster_count
            )));
        }
        Ok(())
    }
}
