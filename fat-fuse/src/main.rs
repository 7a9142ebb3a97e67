mod cli;

use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use block_dev::BlockFile;
use clap::Parser;
use minifat::{DirEntry, DirId, FatFileSystem, FsConfig};
use typed_bytesize::ByteSizeIec;

use self::cli::{Cli, Command};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = FsConfig::new(cli.cluster_size, cli.clusters);

    let mut fs = match cli.command {
        Command::Format => {
            config.validate()?;
            if cli.disk.exists() {
                fs::remove_file(&cli.disk)?;
            }
            let dev = BlockFile::create(&cli.disk, config.cluster_size, config.cluster_count)?;
            FatFileSystem::format(Arc::new(dev), &config)?;
            println!("formatted {}", cli.disk.display());
            return Ok(());
        }
        _ => FatFileSystem::open_or_format(&cli.disk, &config)?,
    };
    let root = fs.root();
    log::debug!("opened {} as {config:?}", cli.disk.display());

    match cli.command {
        Command::Format => {}
        Command::Md { path } => {
            let (dir, name) = fs.locate(root, &path)?;
            fs.mkdir(dir, &name)?;
        }
        Command::Rd { path } => {
            let (dir, name) = fs.locate(root, &path)?;
            fs.rmdir(dir, &name)?;
        }
        Command::Dir { path } => {
            let dir = match path {
                Some(path) => fs.resolve(root, &path)?,
                None => root,
            };
            list(&fs, dir)?;
        }
        Command::Echo { path, text } => {
            let (dir, mut name) = fs.locate(root, &path)?;
            if !name.contains('.') {
                name.push_str(".txt");
            }
            put(&mut fs, dir, &name, text.as_bytes())?;
        }
        Command::Write { path, text } => {
            let (dir, name) = fs.locate(root, &path)?;
            fs.write_file(dir, &name, text.as_bytes())?;
        }
        Command::Type { path } => {
            let (dir, name) = fs.locate(root, &path)?;
            let data = fs.read_file(dir, &name)?;
            io::stdout().write_all(&data)?;
            println!();
        }
        Command::Del { path, yes } => {
            let (dir, name) = fs.locate(root, &path)?;
            if find(&fs, dir, &name)?.is_some_and(|entry| entry.is_dir()) {
                let deleted = fs.purge(dir, &name, |file| yes || ask(&format!("delete {file}?")))?;
                println!("{deleted} file(s) deleted");
            } else {
                fs.delete_file(dir, &name)?;
            }
        }
        Command::Rename { path, new_name } => {
            let (dir, name) = fs.locate(root, &path)?;
            fs.rename(dir, &name, &new_name)?;
        }
        Command::Copy {
            source,
            target,
            yes,
        } => {
            let (src, src_name) = fs.locate(root, &source)?;
            let (dst, dst_name) = match fs.resolve(root, &target) {
                Ok(dir) => (dir, None),
                Err(_) => {
                    let (dir, name) = fs.locate(root, &target)?;
                    (dir, Some(name))
                }
            };
            let copied = fs.copy(src, &src_name, dst, dst_name.as_deref(), |file| {
                yes || ask(&format!("overwrite {file}?"))
            })?;
            println!("{copied} file(s) copied");
        }
        Command::Import { host, path } => {
            let data = fs::read(&host)?;
            let (dir, name) = fs.locate(root, &path)?;
            put(&mut fs, dir, &name, &data)?;
            log::info!("imported {} bytes from {}", data.len(), host.display());
        }
        Command::Export { path, host } => {
            let (dir, name) = fs.locate(root, &path)?;
            let data = fs.read_file(dir, &name)?;
            fs::write(&host, &data)?;
            log::info!("exported {} bytes to {}", data.len(), host.display());
        }
        Command::Df => {
            let space = fs.space();
            println!(
                "{} free of {} ({} of {} clusters, {} bytes each)",
                ByteSizeIec(space.free_bytes()),
                ByteSizeIec(space.total_bytes()),
                space.free_clusters,
                space.total_clusters,
                space.cluster_size,
            );
        }
    }

    fs.sync()?;
    Ok(())
}

/// 写入文件，不存在时先创建；写入失败时不留下新建的空文件
fn put(fs: &mut FatFileSystem, dir: DirId, name: &str, data: &[u8]) -> minifat::Result<()> {
    let created = find(fs, dir, name)?.is_none();
    if created {
        fs.create_file(dir, name)?;
    }

    let written = fs.write_file(dir, name, data);
    if written.is_err() && created {
        if let Err(e) = fs.delete_file(dir, name) {
            log::warn!("failed to remove {name:?} after a failed write: {e}");
        }
    }
    written
}

/// 按名称（大小写无关）查找目录项
fn find<'a>(fs: &'a FatFileSystem, dir: DirId, name: &str) -> minifat::Result<Option<&'a DirEntry>> {
    Ok(fs
        .entries(dir)?
        .iter()
        .find(|entry| minifat::name::same(entry.name(), name)))
}

fn list(fs: &FatFileSystem, dir: DirId) -> Result<(), Box<dyn Error>> {
    println!(" Directory of {}\n", fs.full_path(dir)?);

    let (mut files, mut dirs, mut bytes) = (0, 0, 0);
    for entry in fs.entries(dir)? {
        if entry.is_dir() {
            dirs += 1;
            println!("{:<12} {:>12}", entry.name(), "<DIR>");
        } else {
            files += 1;
            bytes += entry.size() as u64;
            println!("{:<12} {:>12}", entry.name(), entry.size());
        }
    }

    println!("{files:>8} file(s) {:>14}", ByteSizeIec(bytes).to_string());
    println!(
        "{dirs:>8} dir(s)  {:>14} free",
        ByteSizeIec(fs.space().free_bytes()).to_string()
    );
    Ok(())
}

/// 在终端上询问，只有`y`/`yes`算同意
fn ask(question: &str) -> bool {
    print!("{question} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
