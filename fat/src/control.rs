use std::path::Path;
use std::sync::Arc;

use block_dev::{BlockDevice, BlockFile};

use crate::dir_entry::{DirEntry, EntryKind};
use crate::directory::{DirId, DirTree, Directory, ROOT_NAME};
use crate::file;
use crate::name;
use crate::volume::{Space, Volume};
use crate::{Error, FsConfig, Result};

/// 一次打开的虚拟磁盘会话。
///
/// 持有块存储与分配表（[`Volume`]）以及目录树，所有操作都是同步的；
/// 需要跨线程共享时，把整个会话放进一把互斥锁里。
#[derive(Debug)]
pub struct FatFileSystem {
    volume: Volume,
    tree: DirTree,
}

impl FatFileSystem {
    pub fn format(dev: Arc<dyn BlockDevice>, config: &FsConfig) -> Result<Self> {
        Self::mount(Volume::format(dev, config)?)
    }

    pub fn open(dev: Arc<dyn BlockDevice>, config: &FsConfig) -> Result<Self> {
        Self::mount(Volume::open(dev, config)?)
    }

    /// 虚拟磁盘文件不存在时创建并格式化，否则打开并校验。
    pub fn open_or_format(path: impl AsRef<Path>, config: &FsConfig) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let dev = BlockFile::open(path, config.cluster_size, config.cluster_count)?;
            Self::open(Arc::new(dev), config)
        } else {
            config.validate()?;
            log::info!("creating virtual disk {}", path.display());
            let dev = BlockFile::create(path, config.cluster_size, config.cluster_count)?;
            Self::format(Arc::new(dev), config)
        }
    }

    #[inline]
    pub fn root(&self) -> DirId {
        DirId::ROOT
    }

    #[inline]
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn directory(&self, id: DirId) -> Result<&Directory> {
        self.tree.get(id)
    }

    pub fn entries(&self, id: DirId) -> Result<&[DirEntry]> {
        Ok(self.tree.get(id)?.entries())
    }

    pub fn parent(&self, id: DirId) -> Result<Option<DirId>> {
        Ok(self.tree.get(id)?.parent())
    }

    pub fn full_path(&self, id: DirId) -> Result<String> {
        self.tree.full_path(id)
    }

    pub fn space(&self) -> Space {
        self.volume.space()
    }

    pub fn sync(&mut self) -> Result<()> {
        self.volume.sync()
    }

    /// 进入`parent`下名为`name`的子目录
    pub fn subdirectory(&mut self, parent: DirId, name: &str) -> Result<DirId> {
        let index = self.find(parent, name)?;
        self.tree.expand(parent, index, &self.volume)
    }

    pub fn mkdir(&mut self, parent: DirId, name: &str) -> Result<DirId> {
        name::validate(name)?;
        let dir = self.tree.get_mut(parent)?;
        if dir.search(name).is_some() {
            return Err(Error::NameCollision(name.to_owned()));
        }
        if 1 + dir.growth(1, &self.volume) > self.volume.fat().free_clusters() {
            return Err(Error::NoSpace);
        }

        let first_cluster = self.volume.alloc_chain(1)?;
        let mut child = Directory::new(name, first_cluster, Some(parent));
        child.write(&mut self.volume)?;
        let child = self.tree.insert(child);

        let mut entry = DirEntry::directory(name, first_cluster)?;
        entry.set_node(Some(child));
        let dir = self.tree.get_mut(parent)?;
        dir.add_entry(entry)?;
        dir.write(&mut self.volume)?;
        self.volume.sync()?;

        Ok(child)
    }

    /// 删除空目录
    pub fn rmdir(&mut self, parent: DirId, name: &str) -> Result<()> {
        let index = self.find(parent, name)?;
        let child = self.tree.expand(parent, index, &self.volume)?;
        if !self.tree.get(child)?.is_empty() {
            return Err(Error::DirectoryNotEmpty(name.to_owned()));
        }

        self.volume
            .release_chain(self.tree.get(child)?.first_cluster())?;
        self.tree.remove(child);
        let dir = self.tree.get_mut(parent)?;
        dir.remove_entry(index);
        dir.write(&mut self.volume)?;
        self.volume.sync()
    }

    /// 创建空文件，首次写入时才分配簇
    pub fn create_file(&mut self, parent: DirId, name: &str) -> Result<()> {
        let entry = DirEntry::file(name)?;
        let dir = self.tree.get_mut(parent)?;
        if dir.search(name).is_some() {
            return Err(Error::NameCollision(name.to_owned()));
        }
        if !dir.can_add(&entry, &self.volume) {
            return Err(Error::NoSpace);
        }

        dir.add_entry(entry)?;
        dir.write(&mut self.volume)?;
        self.volume.sync()
    }

    pub fn write_file(&mut self, parent: DirId, name: &str, data: &[u8]) -> Result<()> {
        let index = self.find_file(parent, name)?;
        let dir = self.tree.get_mut(parent)?;
        let mut entry = dir.entry(index).clone();
        file::write(&mut entry, data, &mut self.volume)?;
        *dir.entry_mut(index) = entry;
        dir.write(&mut self.volume)?;
        self.volume.sync()
    }

    pub fn read_file(&self, parent: DirId, name: &str) -> Result<Vec<u8>> {
        let index = self.find_file(parent, name)?;
        file::read(self.tree.get(parent)?.entry(index), &self.volume)
    }

    pub fn delete_file(&mut self, parent: DirId, name: &str) -> Result<()> {
        let index = self.find_file(parent, name)?;
        let dir = self.tree.get_mut(parent)?;
        file::delete(dir.entry_mut(index), &mut self.volume)?;
        dir.remove_entry(index);
        dir.write(&mut self.volume)?;
        self.volume.sync()
    }

    /// 重命名文件或目录，新名称不得与其它兄弟重名（大小写无关）
    pub fn rename(&mut self, parent: DirId, old_name: &str, new_name: &str) -> Result<()> {
        let index = self.find(parent, old_name)?;
        name::validate(new_name)?;
        let dir = self.tree.get_mut(parent)?;
        if dir.search(new_name).is_some_and(|other| other != index) {
            return Err(Error::NameCollision(new_name.to_owned()));
        }

        let entry = dir.entry_mut(index);
        entry.rename(new_name)?;
        let node = entry.node();
        dir.write(&mut self.volume)?;
        if let Some(node) = node {
            if let Ok(child) = self.tree.get_mut(node) {
                child.rename(new_name);
            }
        }
        self.volume.sync()
    }

    /// 复制文件或目录中的文件，返回复制的文件数。
    ///
    /// - 源为文件：`dst_name`缺省时沿用源名称；目标名指向已有目录时复制到该目录下。
    /// - 源为目录：把其中的文件（不含子目录）复制到`dst`（或`dst`下名为`dst_name`的目录）。
    ///
    /// 目标已存在同名文件时由`confirm`决定是否覆盖，拒绝则该文件计0。
    /// 复制目录时，放不下的文件被跳过，不计入返回值。
    /// 复制总是分配新的簇链表，绝不与源共享。
    pub fn copy(
        &mut self,
        src: DirId,
        src_name: &str,
        dst: DirId,
        dst_name: Option<&str>,
        mut confirm: impl FnMut(&str) -> bool,
    ) -> Result<usize> {
        let index = self.find(src, src_name)?;
        let source = self.tree.get(src)?.entry(index).clone();

        match source.kind() {
            EntryKind::File { .. } => {
                let mut dst = dst;
                let mut dst_name = dst_name.unwrap_or(source.name()).to_owned();
                if let Some(i) = self.tree.get(dst)?.search(&dst_name) {
                    if self.tree.get(dst)?.entry(i).is_dir() {
                        dst = self.tree.expand(dst, i, &self.volume)?;
                        dst_name = source.name().to_owned();
                    }
                }
                if dst == src && name::same(&dst_name, source.name()) {
                    log::debug!("refusing to copy {:?} onto itself", source.name());
                    return Ok(0);
                }

                let copied = self.copy_file(&source, dst, &dst_name, &mut confirm)?;
                Ok(usize::from(copied))
            }
            EntryKind::Directory { .. } => {
                let from = self.tree.expand(src, index, &self.volume)?;
                let to = match dst_name {
                    Some(dst_name) => {
                        let i = self.find(dst, dst_name)?;
                        self.tree.expand(dst, i, &self.volume)?
                    }
                    None => dst,
                };
                if from == to {
                    return Ok(0);
                }

                let files: Vec<DirEntry> = self
                    .tree
                    .get(from)?
                    .entries()
                    .iter()
                    .filter(|entry| entry.is_file())
                    .cloned()
                    .collect();

                // 空间不足的文件跳过，其余照常复制
                let mut copied = 0;
                for source in &files {
                    match self.copy_file(source, to, source.name(), &mut confirm) {
                        Ok(true) => copied += 1,
                        Ok(false) => {}
                        Err(Error::NoSpace) => {
                            log::warn!("no space left for {:?}, skipped", source.name());
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(copied)
            }
        }
    }

    /// 删除目录中的文件（不含子目录），每个文件先经`confirm`确认，返回删除的个数
    pub fn purge(
        &mut self,
        parent: DirId,
        name: &str,
        mut confirm: impl FnMut(&str) -> bool,
    ) -> Result<usize> {
        let index = self.find(parent, name)?;
        let target = self.tree.expand(parent, index, &self.volume)?;

        let names: Vec<String> = self
            .tree
            .get(target)?
            .entries()
            .iter()
            .filter(|entry| entry.is_file())
            .map(|entry| entry.name().to_owned())
            .collect();

        let mut deleted = 0;
        for name in &names {
            if confirm(name.as_str()) {
                self.delete_file(target, name)?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

impl FatFileSystem {
    fn mount(volume: Volume) -> Result<Self> {
        let mut root = Directory::new(ROOT_NAME, volume.root_cluster(), None);
        root.read(&volume)?;

        Ok(Self {
            volume,
            tree: DirTree::new(root),
        })
    }

    fn find(&self, parent: DirId, name: &str) -> Result<usize> {
        self.tree
            .get(parent)?
            .search(name)
            .ok_or_else(|| Error::PathNotFound(name.to_owned()))
    }

    fn find_file(&self, parent: DirId, name: &str) -> Result<usize> {
        let index = self.find(parent, name)?;
        if self.tree.get(parent)?.entry(index).is_dir() {
            return Err(Error::NotAFile(name.to_owned()));
        }
        Ok(index)
    }

    /// 把`source`的内容复制为`dst`下的`dst_name`；返回是否真的复制了
    fn copy_file(
        &mut self,
        source: &DirEntry,
        dst: DirId,
        dst_name: &str,
        confirm: &mut impl FnMut(&str) -> bool,
    ) -> Result<bool> {
        let data = file::read(source, &self.volume)?;
        let allocated = source.first_cluster().is_some();

        let dir = self.tree.get(dst)?;
        if let Some(index) = dir.search(dst_name) {
            let existing = dir.entry(index);
            if existing.is_dir() {
                return Err(Error::NotAFile(existing.name().to_owned()));
            }
            if existing.first_cluster() == source.first_cluster() && allocated {
                return Ok(false);
            }
            if !confirm(existing.name()) {
                log::debug!("kept existing {:?}", existing.name());
                return Ok(false);
            }

            let mut entry = existing.clone();
            if allocated {
                file::write(&mut entry, &data, &mut self.volume)?;
            } else {
                file::delete(&mut entry, &mut self.volume)?;
            }
            let dir = self.tree.get_mut(dst)?;
            *dir.entry_mut(index) = entry;
            dir.write(&mut self.volume)?;
        } else {
            let mut entry = DirEntry::file(dst_name)?;
            let content = if allocated {
                file::clusters_for(data.len(), &self.volume)
            } else {
                0
            };
            if content + dir.growth(1, &self.volume) > self.volume.fat().free_clusters() {
                return Err(Error::NoSpace);
            }

            if allocated {
                file::write(&mut entry, &data, &mut self.volume)?;
            }
            let dir = self.tree.get_mut(dst)?;
            dir.add_entry(entry)?;
            dir.write(&mut self.volume)?;
        }

        self.volume.sync()?;
        Ok(true)
    }
}
