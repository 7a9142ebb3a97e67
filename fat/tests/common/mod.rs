#![allow(dead_code)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

use minifat::{ClusterId, DirId, EntryKind, FatFileSystem};

/// 临时的虚拟磁盘文件，离开作用域时删除
pub struct TempDisk(PathBuf);

impl TempDisk {
    pub fn new(tag: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let path = env::temp_dir().join(format!(
            "minifat-{tag}-{}-{}.bin",
            process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_file(&path);
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDisk {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

/// 从`dir`开始统计所有存活目录项占用的簇（含目录自身），并检查没有簇被重复使用
pub fn used_clusters(fs: &mut FatFileSystem, dir: DirId, seen: &mut Vec<ClusterId>) -> usize {
    let own = fs.directory(dir).unwrap().first_cluster();
    let mut total = walk(fs, own, seen);

    let entries = fs.entries(dir).unwrap().to_vec();
    for entry in entries {
        match entry.kind() {
            EntryKind::File { .. } => {
                if let Some(head) = entry.first_cluster() {
                    total += walk(fs, head, seen);
                }
            }
            EntryKind::Directory { .. } => {
                let child = fs.subdirectory(dir, entry.name()).unwrap();
                total += used_clusters(fs, child, seen);
            }
        }
    }
    total
}

fn walk(fs: &FatFileSystem, head: ClusterId, seen: &mut Vec<ClusterId>) -> usize {
    let chain = fs.volume().fat().chain(head).unwrap();
    for id in &chain {
        assert!(fs.volume().fat().is_used(*id));
        assert!(!seen.contains(id), "cluster {id} shared between chains");
        seen.push(*id);
    }
    chain.len()
}

/// 空闲簇 + 存活链表长度之和 == 数据区簇数
pub fn assert_conserved(fs: &mut FatFileSystem) {
    let root = fs.root();
    let used = used_clusters(fs, root, &mut Vec::new());
    let space = fs.space();
    assert_eq!(space.total_clusters, space.free_clusters + used);
}
