//! 路径解析
//!
//! 分隔符为`\`（`/`视同`\`）。以盘符`C:`或`\`开头的是绝对路径，
//! 其余相对于给定的当前目录；`.`表示当前目录，`..`表示父目录。

use crate::directory::{DirId, ROOT_NAME, SEPARATOR};
use crate::{Error, FatFileSystem, Result};

impl FatFileSystem {
    /// 把路径解析为目录句柄，途经的子目录会被展开。
    pub fn resolve(&mut self, cwd: DirId, path: &str) -> Result<DirId> {
        let path = path.replace('/', &SEPARATOR.to_string());
        if path.is_empty() {
            return Err(Error::PathNotFound(path));
        }

        let mut dir = cwd;
        let mut components = path.split(SEPARATOR).peekable();
        if path.starts_with(SEPARATOR) {
            dir = self.root();
        } else if components
            .peek()
            .is_some_and(|first| first.eq_ignore_ascii_case(ROOT_NAME))
        {
            components.next();
            dir = self.root();
        } else if components.peek().is_some_and(|first| first.ends_with(':')) {
            // 只有一个盘
            return Err(Error::PathNotFound(path.clone()));
        }

        for component in components.filter(|c| !c.is_empty()) {
            dir = match component {
                "." => dir,
                ".." => self
                    .parent(dir)?
                    .ok_or_else(|| Error::PathNotFound(component.to_owned()))?,
                name => self.subdirectory(dir, name)?,
            };
        }

        Ok(dir)
    }

    /// 拆出路径的最后一段，返回其所在目录与名称。
    ///
    /// `A\B\F.TXT` → (`A\B`, `F.TXT`)；不含分隔符时目录为`cwd`。
    pub fn locate(&mut self, cwd: DirId, path: &str) -> Result<(DirId, String)> {
        let path = path.replace('/', &SEPARATOR.to_string());
        match path.rsplit_once(SEPARATOR) {
            Some((_, "")) => Err(Error::PathNotFound(path.clone())),
            Some(("", name)) => Ok((self.root(), name.to_owned())),
            Some((parent, name)) => Ok((self.resolve(cwd, parent)?, name.to_owned())),
            None if path.is_empty() => Err(Error::PathNotFound(path)),
            None => Ok((cwd, path)),
        }
    }
}
