//! 目录树
//!
//! 目录节点存放在一个arena里，以[`DirId`]索引；
//! 父节点的引用只是一个索引，从不用来释放节点。
//! 根目录永远位于[`DirId::ROOT`]，其它目录在第一次进入时才从磁盘展开。

use crate::dir_entry::{DirEntry, EntryKind};
use crate::name;
use crate::volume::dir_entry::DirRecord;
use crate::volume::Volume;
use crate::{ClusterId, Error, Result};

/// 根目录的名称，也是盘符
pub const ROOT_NAME: &str = "C:";

pub const SEPARATOR: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId(usize);

impl DirId {
    pub const ROOT: Self = Self(0);
}

/// 内存中的目录节点
#[derive(Debug)]
pub struct Directory {
    name: String,
    first_cluster: ClusterId,
    parent: Option<DirId>,
    entries: Vec<DirEntry>,
    /// 目录链表当前的簇数
    clusters: usize,
    /// 内存中的目录项是否领先于磁盘
    dirty: bool,
}

impl Directory {
    pub fn new(name: &str, first_cluster: ClusterId, parent: Option<DirId>) -> Self {
        Self {
            name: name.to_owned(),
            first_cluster,
            parent,
            entries: Vec::new(),
            clusters: 1,
            dirty: false,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn first_cluster(&self) -> ClusterId {
        self.first_cluster
    }

    #[inline]
    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    #[inline]
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 大小写无关地查找目录项
    pub fn search(&self, name: &str) -> Option<usize> {
        let key = name::key(name);
        self.entries
            .iter()
            .position(|entry| name::key(entry.name()) == key)
    }

    pub fn entry(&self, index: usize) -> &DirEntry {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut DirEntry {
        self.dirty = true;
        &mut self.entries[index]
    }

    /// 再添加`extra`条目录项时，目录链表需要增长的簇数
    pub fn growth(&self, extra: usize, vol: &Volume) -> usize {
        Self::clusters_needed(self.entries.len() + extra, vol).saturating_sub(self.clusters)
    }

    /// 空间足够存放`entry`的内容（文件）或一个簇（子目录），
    /// 外加目录自身可能的增长，并且没有重名的兄弟。
    pub fn can_add(&self, entry: &DirEntry, vol: &Volume) -> bool {
        let content = match entry.kind() {
            EntryKind::File { size } => vol.clusters_for(size),
            EntryKind::Directory { .. } => 1,
        };
        self.search(entry.name()).is_none()
            && content + self.growth(1, vol) <= vol.fat().free_clusters()
    }

    /// 追加目录项，不会立即写盘。
    pub fn add_entry(&mut self, entry: DirEntry) -> Result<usize> {
        if self.search(entry.name()).is_some() {
            return Err(Error::NameCollision(entry.name().to_owned()));
        }
        self.entries.push(entry);
        self.dirty = true;
        Ok(self.entries.len() - 1)
    }

    /// 移除目录项；子目录须由调用者事先清空并释放。
    pub fn remove_entry(&mut self, index: usize) -> DirEntry {
        self.dirty = true;
        self.entries.remove(index)
    }

    /// 沿目录自身的链表读出全部目录项
    pub fn read(&mut self, vol: &Volume) -> Result<()> {
        let chain = vol.fat().chain(self.first_cluster)?;
        let data = vol.read_chain(self.first_cluster, chain.len() * vol.cluster_size())?;

        let mut entries = Vec::new();
        for raw in data.chunks_exact(DirRecord::SIZE) {
            let record = DirRecord::decode(raw)?;
            if record.is_tail() {
                break;
            }
            entries.push(DirEntry::from_record(&record)?);
        }
        log::debug!(
            "read directory {:?} at {}: {} entries",
            self.name,
            self.first_cluster,
            entries.len()
        );

        self.entries = entries;
        self.clusters = chain.len();
        self.dirty = false;
        Ok(())
    }

    /// 把目录项序列化到目录链表，按需增长或收缩链表。
    ///
    /// 这是目录元数据唯一的落盘点。空间不足时链表与磁盘内容都不会改变。
    pub fn write(&mut self, vol: &mut Volume) -> Result<()> {
        let needed = Self::clusters_needed(self.entries.len(), vol);
        let current = vol.fat().chain(self.first_cluster)?.len();
        if needed > current {
            vol.extend_chain(self.first_cluster, needed - current)?;
        } else if needed < current {
            vol.truncate_chain(self.first_cluster, needed)?;
        }

        let mut data = vec![0u8; needed * vol.cluster_size()];
        for (entry, buf) in self
            .entries
            .iter()
            .zip(data.chunks_exact_mut(DirRecord::SIZE))
        {
            entry.to_record().encode(buf)?;
        }
        vol.write_chain(self.first_cluster, &data)?;
        log::debug!(
            "wrote directory {:?} at {}: {} entries in {needed} cluster(s)",
            self.name,
            self.first_cluster,
            self.entries.len()
        );

        self.clusters = needed;
        self.dirty = false;
        Ok(())
    }
}

impl Directory {
    /// 目录至少占一个簇
    fn clusters_needed(count: usize, vol: &Volume) -> usize {
        vol.clusters_for(count * DirRecord::SIZE).max(1)
    }

    pub(crate) fn rename(&mut self, name: &str) {
        self.name = name.to_owned();
    }
}

/// 目录节点的arena
#[derive(Debug)]
pub struct DirTree {
    nodes: Vec<Option<Directory>>,
}

impl DirTree {
    pub fn new(root: Directory) -> Self {
        debug_assert!(root.parent.is_none());
        Self {
            nodes: vec![Some(root)],
        }
    }

    pub fn get(&self, id: DirId) -> Result<&Directory> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::PathNotFound(format!("<removed directory #{}>", id.0)))
    }

    pub fn get_mut(&mut self, id: DirId) -> Result<&mut Directory> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::PathNotFound(format!("<removed directory #{}>", id.0)))
    }

    /// 槽位不复用，被删除目录的旧句柄之后一律报错
    pub fn insert(&mut self, dir: Directory) -> DirId {
        self.nodes.push(Some(dir));
        DirId(self.nodes.len() - 1)
    }

    pub fn remove(&mut self, id: DirId) -> Option<Directory> {
        debug_assert_ne!(id, DirId::ROOT);
        self.nodes.get_mut(id.0).and_then(Option::take)
    }

    /// 展开`parent`的第`index`个目录项对应的子目录
    pub fn expand(&mut self, parent: DirId, index: usize, vol: &Volume) -> Result<DirId> {
        let entry = self.get(parent)?.entry(index);
        let (name, first_cluster) = match (entry.kind(), entry.first_cluster()) {
            (EntryKind::Directory { node: Some(id) }, _) if self.get(id).is_ok() => return Ok(id),
            (EntryKind::Directory { .. }, Some(first_cluster)) => {
                (entry.name().to_owned(), first_cluster)
            }
            (EntryKind::Directory { .. }, None) => {
                return Err(Error::InvalidVolume(format!(
                    "directory {:?} has no cluster",
                    entry.name()
                )))
            }
            (EntryKind::File { .. }, _) => return Err(Error::NotADirectory(entry.name().to_owned())),
        };

        let mut dir = Directory::new(&name, first_cluster, Some(parent));
        dir.read(vol)?;
        let id = self.insert(dir);
        self.get_mut(parent)?.entries[index].set_node(Some(id));

        Ok(id)
    }

    /// 从根开始的绝对路径，如`C:\A\B`
    pub fn full_path(&self, id: DirId) -> Result<String> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(id) = cursor {
            let dir = self.get(id)?;
            names.push(dir.name());
            cursor = dir.parent();
        }
        names.reverse();

        match names.as_slice() {
            [root] => Ok(format!("{root}{SEPARATOR}")),
            _ => Ok(names.join(&SEPARATOR.to_string())),
        }
    }
}
