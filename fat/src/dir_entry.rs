use enumflags2::BitFlags;

use crate::directory::DirId;
use crate::name;
use crate::volume::dir_entry::{AttrFlag, DirRecord};
use crate::{ClusterId, Error, Result};

/// 目录项的种类。
///
/// 目录项只在内存中记住已展开的子目录节点，这个句柄不会写入磁盘。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File { size: usize },
    Directory { node: Option<DirId> },
}

/// 父目录中的一条记录：文件或子目录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    /// `None`表示尚未分配任何簇
    first_cluster: Option<ClusterId>,
    kind: EntryKind,
}

impl DirEntry {
    /// 新建的空文件不占用簇，首次写入时才分配。
    pub fn file(name: &str) -> Result<Self> {
        name::validate(name)?;
        Ok(Self {
            name: name.to_owned(),
            first_cluster: None,
            kind: EntryKind::File { size: 0 },
        })
    }

    pub fn directory(name: &str, first_cluster: ClusterId) -> Result<Self> {
        name::validate(name)?;
        Ok(Self {
            name: name.to_owned(),
            first_cluster: Some(first_cluster),
            kind: EntryKind::Directory { node: None },
        })
    }

    pub fn from_record(record: &DirRecord) -> Result<Self> {
        let name = record.name()?.to_owned();
        let kind = if record.attr().contains(AttrFlag::Directory) {
            if record.cluster_id().is_none() {
                return Err(Error::InvalidVolume(format!(
                    "directory {name:?} has no cluster"
                )));
            }
            EntryKind::Directory { node: None }
        } else {
            EntryKind::File {
                size: record.size(),
            }
        };

        Ok(Self {
            name,
            first_cluster: record.cluster_id(),
            kind,
        })
    }

    pub fn to_record(&self) -> DirRecord {
        let attr: BitFlags<AttrFlag> = match self.kind {
            EntryKind::File { .. } => AttrFlag::Archive.into(),
            EntryKind::Directory { .. } => AttrFlag::Directory.into(),
        };
        DirRecord::new(&self.name, attr, self.first_cluster, self.size())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    #[inline]
    pub fn first_cluster(&self) -> Option<ClusterId> {
        self.first_cluster
    }

    /// 文件大小，目录恒为0
    pub fn size(&self) -> usize {
        match self.kind {
            EntryKind::File { size } => size,
            EntryKind::Directory { .. } => 0,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory { .. })
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File { .. })
    }

    /// 只替换名称；兄弟间的重名由所在目录检查。
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        name::validate(new_name)?;
        self.name = new_name.to_owned();
        Ok(())
    }

    /// 已展开的子目录节点
    pub fn node(&self) -> Option<DirId> {
        match self.kind {
            EntryKind::Directory { node } => node,
            EntryKind::File { .. } => None,
        }
    }

    pub(crate) fn set_node(&mut self, id: Option<DirId>) {
        if let EntryKind::Directory { node } = &mut self.kind {
            *node = id;
        }
    }

    /// 文件内容落在以`head`开头的链表上，共`size`字节
    pub(crate) fn set_content(&mut self, head: Option<ClusterId>, len: usize) {
        debug_assert!(self.is_file());
        self.first_cluster = head;
        self.kind = EntryKind::File { size: len };
    }
}
