use std::path::PathBuf;

use clap::{Parser, Subcommand};
use minifat::{DEFAULT_CLUSTER_COUNT, DEFAULT_CLUSTER_SIZE};

#[derive(Parser)]
#[command(version, about = "Operate on a FAT-style virtual disk")]
pub struct Cli {
    /// Virtual disk file, created and formatted if missing
    #[arg(long, short, default_value = "virtual_disk.bin")]
    pub disk: PathBuf,

    /// Bytes per cluster
    #[arg(long, default_value_t = DEFAULT_CLUSTER_SIZE)]
    pub cluster_size: usize,

    /// Number of clusters on the disk
    #[arg(long, default_value_t = DEFAULT_CLUSTER_COUNT)]
    pub clusters: usize,

    #[command(subcommand)]
    pub command: Command,
}

/// 路径均可写成`C:\A\B`或相对根目录的`A\B`，`/`与`\`等价
#[derive(Subcommand)]
pub enum Command {
    /// Wipe the disk and lay down an empty volume
    Format,
    /// Create a directory
    Md { path: String },
    /// Remove an empty directory
    Rd { path: String },
    /// List a directory
    Dir { path: Option<String> },
    /// Create a file holding TEXT; `.txt` is appended when no extension is given
    Echo { path: String, text: String },
    /// Replace the content of an existing file
    Write { path: String, text: String },
    /// Print a file
    Type { path: String },
    /// Delete a file, or every file inside a directory
    Del {
        path: String,
        /// Don't ask before deleting each file of a directory
        #[arg(long, short)]
        yes: bool,
    },
    /// Rename a file or directory in place
    Rename { path: String, new_name: String },
    /// Copy a file, or the files of a directory
    Copy {
        source: String,
        target: String,
        /// Overwrite existing files without asking
        #[arg(long, short)]
        yes: bool,
    },
    /// Copy a host file into the disk
    Import { host: PathBuf, path: String },
    /// Copy a file out of the disk to the host
    Export { path: String, host: PathBuf },
    /// Show free and total space
    Df,
}
