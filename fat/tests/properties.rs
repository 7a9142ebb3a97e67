mod common;

use std::sync::Arc;

use block_dev::RamDisk;
use minifat::{DirEntry, Error, FatFileSystem, FsConfig};

use self::common::assert_conserved;

fn ram_fs(cluster_size: usize, cluster_count: usize) -> FatFileSystem {
    let dev = RamDisk::new(cluster_size, cluster_count);
    FatFileSystem::format(Arc::new(dev), &FsConfig::new(cluster_size, cluster_count)).unwrap()
}

#[test]
fn navigation() {
    let mut fs = ram_fs(512, 32);
    let root = fs.root();
    let a = fs.mkdir(root, "A").unwrap();
    let b = fs.mkdir(a, "B").unwrap();
    fs.create_file(b, "F.TXT").unwrap();

    assert_eq!(b, fs.resolve(root, "a\\b").unwrap());
    assert_eq!(b, fs.resolve(root, "C:\\A\\B\\").unwrap());
    assert_eq!(b, fs.resolve(a, "/A/B").unwrap());
    assert_eq!(a, fs.resolve(b, "..").unwrap());
    assert_eq!(root, fs.resolve(b, "..\\..").unwrap());
    assert_eq!(b, fs.resolve(b, ".").unwrap());
    assert_eq!(root, fs.resolve(b, "c:").unwrap());
    assert_eq!("C:\\A\\B", fs.full_path(b).unwrap());
    assert_eq!("C:\\", fs.full_path(root).unwrap());

    assert!(matches!(fs.resolve(root, ".."), Err(Error::PathNotFound(_))));
    assert!(matches!(fs.resolve(root, "D:\\A"), Err(Error::PathNotFound(_))));
    assert!(matches!(fs.resolve(root, "A\\X"), Err(Error::PathNotFound(_))));
    assert!(matches!(
        fs.resolve(root, "A\\B\\F.TXT"),
        Err(Error::NotADirectory(_))
    ));

    let (dir, name) = fs.locate(root, "A\\B\\F.TXT").unwrap();
    assert_eq!((b, "F.TXT"), (dir, name.as_str()));
    let (dir, name) = fs.locate(b, "\\NEW").unwrap();
    assert_eq!((root, "NEW"), (dir, name.as_str()));
    let (dir, name) = fs.locate(b, "G.TXT").unwrap();
    assert_eq!((b, "G.TXT"), (dir, name.as_str()));
    assert!(fs.locate(root, "A\\").is_err());
}

#[test]
fn names_and_collisions() {
    let mut fs = ram_fs(512, 32);
    let root = fs.root();
    fs.create_file(root, "Notes.txt").unwrap();
    fs.mkdir(root, "Docs").unwrap();

    assert!(matches!(
        fs.create_file(root, "NOTES.TXT"),
        Err(Error::NameCollision(_))
    ));
    assert!(matches!(fs.mkdir(root, "docs"), Err(Error::NameCollision(_))));
    assert!(matches!(
        fs.create_file(root, "bad*.txt"),
        Err(Error::NameInvalid(_))
    ));
    assert!(matches!(
        fs.mkdir(root, "TOOLONGNAME12"),
        Err(Error::NameInvalid(_))
    ));

    assert!(matches!(
        fs.rename(root, "notes.txt", "DOCS"),
        Err(Error::NameCollision(_))
    ));
    fs.rename(root, "notes.txt", "NOTES.TXT").unwrap();
    fs.rename(root, "docs", "Papers").unwrap();
    let papers = fs.resolve(root, "PAPERS").unwrap();
    assert_eq!("C:\\Papers", fs.full_path(papers).unwrap());
    assert!(matches!(
        fs.rename(root, "MISSING", "X"),
        Err(Error::PathNotFound(_))
    ));

    let names: Vec<_> = fs
        .entries(root)
        .unwrap()
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect();
    assert_eq!(vec!["NOTES.TXT", "Papers"], names);
}

#[test]
fn kinds_are_checked() {
    let mut fs = ram_fs(512, 32);
    let root = fs.root();
    let dir = fs.mkdir(root, "DIR").unwrap();
    fs.create_file(dir, "F").unwrap();
    fs.create_file(root, "FILE").unwrap();

    assert!(matches!(fs.read_file(root, "DIR"), Err(Error::NotAFile(_))));
    assert!(matches!(
        fs.write_file(root, "DIR", b"x"),
        Err(Error::NotAFile(_))
    ));
    assert!(matches!(fs.delete_file(root, "DIR"), Err(Error::NotAFile(_))));
    assert!(matches!(fs.rmdir(root, "FILE"), Err(Error::NotADirectory(_))));
    assert!(matches!(
        fs.rmdir(root, "DIR"),
        Err(Error::DirectoryNotEmpty(_))
    ));
    assert!(matches!(fs.read_file(root, "NONE"), Err(Error::PathNotFound(_))));
    assert!(fs.read_file(root, "FILE").unwrap().is_empty());
}

#[test]
fn exhaustion_is_atomic() {
    // 数据区8簇：根目录1簇，余7簇
    let mut fs = ram_fs(512, 10);
    let root = fs.root();
    fs.create_file(root, "A").unwrap();
    fs.write_file(root, "A", &[1; 1024]).unwrap();
    fs.create_file(root, "B").unwrap();
    assert_eq!(5, fs.space().free_clusters);

    assert!(matches!(
        fs.write_file(root, "B", &[2; 512 * 6]),
        Err(Error::NoSpace)
    ));
    assert_eq!(5, fs.space().free_clusters);
    assert!(fs.read_file(root, "B").unwrap().is_empty());

    // 覆盖写可以复用自身原有的簇
    fs.write_file(root, "A", &[3; 512 * 7]).unwrap();
    assert_eq!(0, fs.space().free_clusters);
    assert!(matches!(fs.mkdir(root, "D"), Err(Error::NoSpace)));
    assert!(matches!(
        fs.write_file(root, "B", b"x"),
        Err(Error::NoSpace)
    ));
    assert_eq!(vec![3; 512 * 7], fs.read_file(root, "A").unwrap());
    assert_conserved(&mut fs);

    fs.delete_file(root, "A").unwrap();
    assert_eq!(7, fs.space().free_clusters);
    assert_conserved(&mut fs);
}

#[test]
fn full_root_refuses_new_entries() {
    // 数据区8簇：根目录1簇，余7簇；512字节的根目录簇恰好放16条目录项
    let mut fs = ram_fs(512, 10);
    let root = fs.root();
    for i in 0..15 {
        fs.create_file(root, &format!("F{i}")).unwrap();
    }
    fs.write_file(root, "F0", &[1; 512 * 7]).unwrap();
    assert_eq!(0, fs.space().free_clusters);

    // 不需要增长目录链表，空文件仍可创建
    let candidate = DirEntry::file("F15").unwrap();
    assert!(fs.directory(root).unwrap().can_add(&candidate, fs.volume()));
    fs.create_file(root, "F15").unwrap();
    assert_eq!(16, fs.entries(root).unwrap().len());

    let candidate = DirEntry::file("X").unwrap();
    assert!(!fs.directory(root).unwrap().can_add(&candidate, fs.volume()));
    assert!(matches!(fs.create_file(root, "X"), Err(Error::NoSpace)));
    assert!(matches!(fs.mkdir(root, "D"), Err(Error::NoSpace)));
    assert_eq!(16, fs.entries(root).unwrap().len());
    assert_eq!(0, fs.space().free_clusters);
    assert_conserved(&mut fs);
}

#[test]
fn directory_copy_skips_what_does_not_fit() {
    // 数据区14簇：根目录1簇，余13簇
    let mut fs = ram_fs(512, 16);
    let root = fs.root();
    let src = fs.mkdir(root, "SRC").unwrap();
    let dst = fs.mkdir(root, "DST").unwrap();
    fs.create_file(src, "BIG.BIN").unwrap();
    fs.write_file(src, "BIG.BIN", &[5; 512 * 6]).unwrap();
    fs.create_file(src, "SMALL.TXT").unwrap();
    fs.write_file(src, "SMALL.TXT", b"s").unwrap();
    assert_eq!(4, fs.space().free_clusters);

    let copied = fs.copy(root, "SRC", root, Some("DST"), |_| true).unwrap();
    assert_eq!(1, copied);

    let names: Vec<_> = fs
        .entries(dst)
        .unwrap()
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect();
    assert_eq!(vec!["SMALL.TXT"], names);
    assert_eq!(b"s", &fs.read_file(dst, "SMALL.TXT").unwrap()[..]);
    assert_eq!(3, fs.space().free_clusters);
    assert_conserved(&mut fs);
}

#[test]
fn copy_directory_files() {
    let mut fs = ram_fs(512, 64);
    let root = fs.root();
    let src = fs.mkdir(root, "SRC").unwrap();
    let dst = fs.mkdir(root, "DST").unwrap();
    fs.mkdir(src, "SUB").unwrap();
    for (name, data) in [("ONE.TXT", &b"one"[..]), ("TWO.TXT", &[7; 700][..])] {
        fs.create_file(src, name).unwrap();
        fs.write_file(src, name, data).unwrap();
    }
    fs.create_file(src, "EMPTY").unwrap();
    fs.create_file(dst, "ONE.TXT").unwrap();
    fs.write_file(dst, "ONE.TXT", b"old").unwrap();

    let mut asked = 0;
    let copied = fs
        .copy(root, "SRC", root, Some("DST"), |_| {
            asked += 1;
            false
        })
        .unwrap();
    assert_eq!(2, copied);
    assert_eq!(1, asked);
    assert_eq!(b"old", &fs.read_file(dst, "ONE.TXT").unwrap()[..]);
    assert_eq!(vec![7; 700], fs.read_file(dst, "TWO.TXT").unwrap());
    assert!(fs.read_file(dst, "EMPTY").unwrap().is_empty());
    assert!(matches!(fs.subdirectory(dst, "SUB"), Err(Error::PathNotFound(_))));

    // 副本与源互不影响
    fs.write_file(src, "TWO.TXT", b"changed").unwrap();
    assert_eq!(vec![7; 700], fs.read_file(dst, "TWO.TXT").unwrap());

    assert_eq!(0, fs.copy(src, "ONE.TXT", src, None, |_| true).unwrap());
    assert_eq!(
        1,
        fs.copy(src, "ONE.TXT", src, Some("THREE.TXT"), |_| true)
            .unwrap()
    );
    assert_eq!(b"one", &fs.read_file(src, "THREE.TXT").unwrap()[..]);
    assert_conserved(&mut fs);
}

#[test]
fn purge_files() {
    let mut fs = ram_fs(512, 64);
    let root = fs.root();
    let dir = fs.mkdir(root, "TRASH").unwrap();
    fs.mkdir(dir, "KEEP").unwrap();
    for name in ["A.TXT", "B.TXT", "C.TXT"] {
        fs.create_file(dir, name).unwrap();
        fs.write_file(dir, name, name.as_bytes()).unwrap();
    }
    let free = fs.space().free_clusters;

    let deleted = fs.purge(root, "TRASH", |name| name != "B.TXT").unwrap();
    assert_eq!(2, deleted);
    assert_eq!(free + 2, fs.space().free_clusters);

    let names: Vec<_> = fs
        .entries(dir)
        .unwrap()
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect();
    assert_eq!(vec!["KEEP", "B.TXT"], names);
    assert_conserved(&mut fs);
}

#[test]
fn deep_tree_conserves_clusters() {
    let mut fs = ram_fs(512, 128);
    let root = fs.root();
    let mut dir = root;
    for depth in 0..5 {
        dir = fs.mkdir(dir, &format!("LEVEL{depth}")).unwrap();
        for i in 0..20 {
            let name = format!("F{i}.DAT");
            fs.create_file(dir, &name).unwrap();
            if i % 3 == 0 {
                fs.write_file(dir, &name, &vec![i as u8; i * 97]).unwrap();
            }
        }
    }
    assert_conserved(&mut fs);

    let deepest = dir;
    for i in (0..20).step_by(2) {
        fs.delete_file(deepest, &format!("F{i}.DAT")).unwrap();
    }
    assert_conserved(&mut fs);

    fs.sync().unwrap();
    assert_eq!(
        "C:\\LEVEL0\\LEVEL1\\LEVEL2\\LEVEL3\\LEVEL4",
        fs.full_path(deepest).unwrap()
    );
    assert_eq!(10, fs.entries(deepest).unwrap().len());
}

#[test]
fn reopen_from_shared_ram() {
    let dev = RamDisk::new(1024, 64);
    let config = FsConfig::new(1024, 64);
    {
        let mut fs = FatFileSystem::format(Arc::new(dev.clone()), &config).unwrap();
        let root = fs.root();
        let a = fs.mkdir(root, "A").unwrap();
        fs.create_file(a, "DATA.BIN").unwrap();
        fs.write_file(a, "DATA.BIN", &[9; 3000]).unwrap();
    }

    let mut fs = FatFileSystem::open(Arc::new(dev), &config).unwrap();
    let a = fs.resolve(fs.root(), "A").unwrap();
    assert_eq!(vec![9; 3000], fs.read_file(a, "DATA.BIN").unwrap());
    assert_eq!(fs.space().total_clusters - 1 - 1 - 3, fs.space().free_clusters);
    assert_conserved(&mut fs);
}
