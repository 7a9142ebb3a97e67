//! 分配表：每个簇一条`u32`，记录簇的空闲/占用状态以及链表中的下一个簇。
//!
//! 内存中保留整张表的镜像，所有修改先写穿到缓存的FAT簇再更新镜像，
//! 因此修改失败时镜像保持原状。

use core::mem;

use crate::disk::Disk;
use crate::volume::boot::BootSector;
use crate::{ClusterError, ClusterId, Error, Result};

#[derive(Debug)]
pub struct FatArea {
    /// FAT区的起始簇
    start: usize,
    /// 第一个数据簇，即根目录
    data_start: ClusterId,
    /// FAT镜像
    table: Vec<ClusterId>,
    /// 空闲簇计数
    free: usize,
}

impl FatArea {
    const ENTRY_SIZE: usize = mem::size_of::<u32>();

    /// 建立全新的分配表并写入磁盘。
    ///
    /// 控制区和FAT区标记为保留，根目录占据一个簇。
    pub fn format(boot: &BootSector, disk: &Disk) -> Result<Self> {
        let root = boot.root_cluster();
        let table: Vec<_> = (0..boot.cluster_count())
            .map(ClusterId::from_index)
            .map(|id| match id {
                id if id < root => ClusterId::RESERVED,
                id if id == root => ClusterId::EOF,
                _ => ClusterId::FREE,
            })
            .collect();

        let fat = Self {
            start: boot.fat_start(),
            data_start: root,
            free: table.len() - usize::from(root) - 1,
            table,
        };
        for nth in 0..boot.fat_clusters() {
            fat.store(nth, disk)?;
        }

        Ok(fat)
    }

    /// 从磁盘读出分配表。
    pub fn load(boot: &BootSector, disk: &Disk) -> Result<Self> {
        let count = boot.cluster_count();
        let mut table = Vec::with_capacity(count);
        for nth in 0..boot.fat_clusters() {
            disk.get(boot.fat_start() + nth)?
                .lock()
                .map_slice(|data| {
                    table.extend(data.chunks_exact(Self::ENTRY_SIZE).map(|raw| {
                        ClusterId::new(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
                    }))
                });
        }
        table.truncate(count);

        let root = boot.root_cluster();
        if let Some(pos) = table[..usize::from(root)]
            .iter()
            .position(|&id| id != ClusterId::RESERVED)
        {
            return Err(Error::InvalidVolume(format!(
                "reserved cluster {pos} is marked as {}",
                table[pos]
            )));
        }
        if matches!(
            table[usize::from(root)].validate(),
            Err(ClusterError::Free | ClusterError::Reserved)
        ) {
            return Err(Error::InvalidVolume("root directory is not allocated".into()));
        }

        let free = table[usize::from(root)..]
            .iter()
            .filter(|&&id| id == ClusterId::FREE)
            .count();
        log::debug!("allocation table loaded: {free}/{} free", count - usize::from(root));

        Ok(Self {
            start: boot.fat_start(),
            data_start: root,
            table,
            free,
        })
    }

    #[inline]
    pub fn free_clusters(&self) -> usize {
        self.free
    }

    /// 数据区（含根目录）的簇数
    #[inline]
    pub fn total_clusters(&self) -> usize {
        self.table.len() - usize::from(self.data_start)
    }

    /// `id`是否落在数据区
    pub fn contains(&self, id: ClusterId) -> bool {
        id >= self.data_start && usize::from(id) < self.table.len()
    }

    /// 簇是否已被占用
    pub fn is_used(&self, id: ClusterId) -> bool {
        self.contains(id) && self.table[usize::from(id)] != ClusterId::FREE
    }

    /// 获取下一个簇编号。
    /// 若`id`指向未分配簇，则报错。
    /// `Ok(None)`表示`id`为链表上最后一个簇。
    pub fn next(&self, id: ClusterId) -> core::result::Result<Option<ClusterId>, ClusterError> {
        if !self.contains(id) {
            return Err(ClusterError::Reserved);
        }
        match self.table[usize::from(id)].validate() {
            Ok(next) => Ok(Some(next)),
            Err(ClusterError::Eof) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 沿链表走到底，返回途经的全部簇。
    ///
    /// 链表中出现空闲簇、保留簇、越界编号或环时报[`Error::CorruptChain`]。
    pub fn chain(&self, head: ClusterId) -> Result<Vec<ClusterId>> {
        if !self.is_used(head) {
            return Err(Error::CorruptChain(head));
        }

        let limit = self.total_clusters();
        let mut chain = Vec::new();
        let mut id = head;
        loop {
            // 比数据区还长的链表必然有环
            if chain.len() == limit {
                return Err(Error::CorruptChain(id));
            }
            chain.push(id);

            match self.next(id) {
                Ok(Some(next)) if self.contains(next) => id = next,
                Ok(None) => break,
                _ => return Err(Error::CorruptChain(id)),
            }
        }

        log::trace!("chain from {head}: {} cluster(s)", chain.len());
        Ok(chain)
    }

    /// 寻找编号最小的未分配簇，并标记为链表结尾。
    pub fn alloc(&mut self, disk: &Disk) -> Result<ClusterId> {
        let id = self
            .table
            .iter()
            .skip(usize::from(self.data_start))
            .position(|&id| id == ClusterId::FREE)
            .map(|pos| ClusterId::from_index(pos + usize::from(self.data_start)))
            .ok_or(Error::NoSpace)?;

        self.set(id, ClusterId::EOF, disk)?;
        self.free -= 1;
        log::trace!("alloc cluster {id}");

        Ok(id)
    }

    /// 把`next`接到链表尾`tail`之后。
    ///
    /// `tail`与`next`都必须是已分配的链表结尾。
    pub fn couple(&mut self, tail: ClusterId, next: ClusterId, disk: &Disk) -> Result<()> {
        for id in [tail, next] {
            if !self.contains(id) || self.table[usize::from(id)] != ClusterId::EOF {
                return Err(Error::CorruptChain(id));
            }
        }
        if tail == next {
            return Err(Error::CorruptChain(tail));
        }

        self.set(tail, next, disk)
    }

    /// 分配一条长为`len`的链表，返回链表头。
    ///
    /// 空闲簇不足时不做任何修改。
    pub fn alloc_chain(&mut self, len: usize, disk: &Disk) -> Result<ClusterId> {
        debug_assert!(len > 0);
        if self.free < len {
            return Err(Error::NoSpace);
        }

        let head = self.alloc(disk)?;
        let mut tail = head;
        for _ in 1..len {
            let next = self.alloc(disk)?;
            self.couple(tail, next, disk)?;
            tail = next;
        }

        Ok(head)
    }

    /// 在链表末尾追加`extra`个簇。
    pub fn extend(&mut self, head: ClusterId, extra: usize, disk: &Disk) -> Result<()> {
        if self.free < extra {
            return Err(Error::NoSpace);
        }

        let chain = self.chain(head)?;
        let mut tail = chain[chain.len() - 1];
        for _ in 0..extra {
            let next = self.alloc(disk)?;
            self.couple(tail, next, disk)?;
            tail = next;
        }

        Ok(())
    }

    /// 只保留链表的前`keep`个簇，其余释放。
    pub fn truncate(&mut self, head: ClusterId, keep: usize, disk: &Disk) -> Result<()> {
        debug_assert!(keep > 0);
        let chain = self.chain(head)?;
        if keep >= chain.len() {
            return Ok(());
        }

        self.set(chain[keep - 1], ClusterId::EOF, disk)?;
        for &id in &chain[keep..] {
            self.set(id, ClusterId::FREE, disk)?;
            self.free += 1;
        }
        log::trace!("truncate chain {head}: {} -> {keep}", chain.len());

        Ok(())
    }

    /// 释放整个簇链表，返回释放的簇数。
    ///
    /// 先完整地走一遍链表，损坏的链表不会被部分释放。
    pub fn dealloc(&mut self, head: ClusterId, disk: &Disk) -> Result<usize> {
        let chain = self.chain(head)?;
        for &id in &chain {
            self.set(id, ClusterId::FREE, disk)?;
            self.free += 1;
        }
        log::trace!("dealloc chain {head}: {} cluster(s)", chain.len());

        Ok(chain.len())
    }
}

impl FatArea {
    /// 写穿单条FAT条目
    pub(super) fn set(&mut self, id: ClusterId, value: ClusterId, disk: &Disk) -> Result<()> {
        let offset = usize::from(id) * Self::ENTRY_SIZE;
        let cluster_size = disk.cluster_size();
        disk.get(self.start + offset / cluster_size)?
            .lock()
            .map_mut_slice(|data| {
                let at = offset % cluster_size;
                data[at..at + Self::ENTRY_SIZE].copy_from_slice(&u32::from(value).to_le_bytes());
            });
        self.table[usize::from(id)] = value;

        Ok(())
    }

    /// 把镜像中第`nth`个FAT簇对应的条目整体写入磁盘
    fn store(&self, nth: usize, disk: &Disk) -> Result<()> {
        let per_cluster = disk.cluster_size() / Self::ENTRY_SIZE;
        let mut data = vec![0u8; disk.cluster_size()];
        for (raw, id) in data
            .chunks_exact_mut(Self::ENTRY_SIZE)
            .zip(self.table.iter().skip(nth * per_cluster))
        {
            raw.copy_from_slice(&u32::from(*id).to_le_bytes());
        }
        disk.write_cluster(self.start + nth, &data)
    }
}
