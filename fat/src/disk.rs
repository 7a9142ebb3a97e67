//! 块存储层：以**簇**为单位读写虚拟磁盘。
//!
//! 最近使用的簇缓存在内存中，写操作先落在缓存上，
//! 由[`Disk::sync_all`]统一写回块设备。缓存属于打开的卷，而不是全局变量。

use std::sync::Arc;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::{Error, Result};

/// 虚拟磁盘
#[derive(Debug)]
pub struct Disk {
    /// 底层块设备的引用
    dev: Arc<dyn BlockDevice>,
    cluster_size: usize,
    /// 一个簇跨越多少个设备块
    cluster_blocks: usize,
    /// 磁盘总簇数
    capacity: usize,
    queue: Mutex<Vec<(usize, Arc<Mutex<Cluster>>)>>,
}

/// 内存中的簇
#[derive(Debug)]
pub struct Cluster {
    /// 缓存的数据
    data: Box<[u8]>,
    /// 对应的簇号
    index: usize,
    /// 是否为脏块
    modified: bool,
}

impl Cluster {
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.modified = true;
        &mut self.data
    }

    #[inline]
    pub fn map_slice<V>(&self, f: impl FnOnce(&[u8]) -> V) -> V {
        f(self.as_slice())
    }

    #[inline]
    pub fn map_mut_slice<V>(&mut self, f: impl FnOnce(&mut [u8]) -> V) -> V {
        f(self.as_mut_slice())
    }

    #[inline]
    pub fn zeroize(&mut self) {
        self.data.fill(0);
        self.modified = true;
    }
}

impl Disk {
    /// 块缓存个数的上限
    const CAPACITY: usize = 16;

    pub fn new(dev: Arc<dyn BlockDevice>, cluster_size: usize) -> Result<Self> {
        let block_size = dev.block_size();
        if block_size == 0 || cluster_size % block_size != 0 {
            return Err(Error::InvalidVolume(format!(
                "cluster size {cluster_size} is not a multiple of the device block size {block_size}"
            )));
        }
        let cluster_blocks = cluster_size / block_size;

        Ok(Self {
            capacity: dev.num_blocks() / cluster_blocks,
            dev,
            cluster_size,
            cluster_blocks,
            queue: Mutex::default(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn cluster_size(&self) -> usize {
        self.cluster_size
    }

    // 块缓存调度策略：踢走闲置块
    pub fn get(&self, index: usize) -> Result<Arc<Mutex<Cluster>>> {
        if index >= self.capacity {
            return Err(Error::OutOfRange {
                index,
                capacity: self.capacity,
            });
        }

        let mut queue = self.queue.lock();

        // 尝试从缓冲区中读取块
        if let Some(cache) = queue
            .iter()
            .find_map(|(id, cache)| (index == *id).then_some(cache))
        {
            return Ok(Arc::clone(cache));
        }

        // 触及上限，写回一个没有其它引用的块；都在使用中就暂时超出上限
        if queue.len() >= Self::CAPACITY {
            if let Some(pos) = queue
                .iter()
                .position(|(_, cache)| Arc::strong_count(cache) == 1)
            {
                let (victim_index, victim) = queue.remove(pos);
                let flushed = self.flush(&mut victim.lock());
                if let Err(e) = flushed {
                    log::warn!("failed to write back cluster {victim_index}: {e}");
                    queue.push((victim_index, victim));
                    return Err(e);
                }
            }
        }

        // 缓存新块
        let cluster = Arc::new(Mutex::new(self.load(index)?));
        queue.push((index, cluster.clone()));

        Ok(cluster)
    }

    pub fn read_cluster(&self, index: usize) -> Result<Vec<u8>> {
        Ok(self.get(index)?.lock().as_slice().to_vec())
    }

    /// 覆盖整个簇，`data`不足一簇时以0补齐。
    pub fn write_cluster(&self, index: usize, data: &[u8]) -> Result<()> {
        debug_assert!(data.len() <= self.cluster_size);
        self.get(index)?.lock().map_mut_slice(|buf| {
            buf[..data.len()].copy_from_slice(data);
            buf[data.len()..].fill(0);
        });
        Ok(())
    }

    pub fn sync_all(&self) -> Result<()> {
        for (_, cache) in self.queue.lock().iter() {
            self.flush(&mut cache.lock())?;
        }
        self.dev.flush()?;
        Ok(())
    }
}

impl Disk {
    fn load(&self, index: usize) -> Result<Cluster> {
        let mut data = vec![0; self.cluster_size].into_boxed_slice();
        let block_size = self.dev.block_size();
        for (i, buf) in data.chunks_exact_mut(block_size).enumerate() {
            self.dev.read_block(index * self.cluster_blocks + i, buf)?;
        }

        Ok(Cluster {
            data,
            index,
            modified: false,
        })
    }

    fn flush(&self, cluster: &mut Cluster) -> Result<()> {
        if cluster.modified {
            let block_size = self.dev.block_size();
            for (i, buf) in cluster.data.chunks_exact(block_size).enumerate() {
                self.dev
                    .write_block(cluster.index * self.cluster_blocks + i, buf)?;
            }
            cluster.modified = false;
        }
        Ok(())
    }
}

impl Drop for Disk {
    fn drop(&mut self) {
        if let Err(e) = self.sync_all() {
            log::warn!("failed to flush virtual disk on close: {e}");
        }
    }
}
