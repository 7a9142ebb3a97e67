//! 8.3 风格的名称规则与大小写无关的比较。

use crate::{Error, Result};

/// 名称最长的字节数
pub const NAME_CAP: usize = 11;
pub const BASE_CAP: usize = 8;
pub const EXT_CAP: usize = 3;

/// 路径分隔符与保留字符，`:`留给盘符
const RESERVED: &[char] = &['/', '\\', '*', '?', '"', '<', '>', '|', ':'];

/// 所有名称比较都经过这个函数，保证排序规则处处一致
pub fn key(name: &str) -> String {
    name.to_ascii_uppercase()
}

#[inline]
pub fn same(a: &str, b: &str) -> bool {
    key(a) == key(b)
}

/// 校验目录项名称：
///
/// - 非空，最多11个可见ASCII字符；
/// - 不含路径分隔符与保留字符，不以`.`开头；
/// - 带扩展名时，主名1~8个字符，扩展名1~3个字符。
pub fn validate(name: &str) -> Result<()> {
    let invalid = || Error::NameInvalid(name.to_owned());

    if name.is_empty() || name.len() > NAME_CAP || name.starts_with('.') {
        return Err(invalid());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_graphic() && !RESERVED.contains(&c))
    {
        return Err(invalid());
    }
    if let Some((base, ext)) = name.rsplit_once('.') {
        if base.is_empty() || base.len() > BASE_CAP || ext.is_empty() || ext.len() > EXT_CAP {
            return Err(invalid());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted() {
        for name in ["A", "F.TXT", "README", "LONGDIRNAME", "ABCDEFGH.TX", "a.b.c", "x-1.md"] {
            assert!(validate(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejected() {
        for name in [
            "",
            ".hidden",
            "TWELVECHARSX",
            "NINECHARS.T",
            "F.TEXT",
            "F.",
            "A/B",
            "A\\B",
            "WHAT?",
            "C:",
            "a b",
            "ÄÖ",
        ] {
            assert!(matches!(validate(name), Err(Error::NameInvalid(_))), "{name}");
        }
    }

    #[test]
    fn case_insensitive() {
        assert!(same("f.txt", "F.TXT"));
        assert!(!same("F.TXT", "F.TX"));
        assert_eq!("HELLO.MD", key("Hello.md"));
    }
}
