// =============================================================================
// walker.rs — FINDING EVERY accounts.json IN THE TREE
// =============================================================================
//
// The data directory looks like this:
//
//   data/
//   ├── etherscan/            <- grandparent: which explorer (and so which chain)
//   │   ├── 0x-protocol/      <- parent: the label
//   │   │   └── accounts.json
//   │   └── aave/
//   │       └── accounts.json
//   └── basescan/
//       └── ...
//
// The directory names ARE the metadata. Instead of slicing strings at the
// point of use, every hit comes out of here as an `AccountsFile` that already
// knows its depth, parent name and grandparent name. The position math lives
// in `PathPosition::from_relative`, which never touches the disk.
//
// Walk order is whatever read_dir hands back, depth-first. Symlinks are
// neither followed nor processed.
// =============================================================================

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{CombineError, Result};

/// The one file name we care about.
pub const ACCOUNTS_FILE_NAME: &str = "accounts.json";

/// Where a file sits relative to the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPosition {
    /// Directories between the root and the file. 0 = directly in the root.
    pub depth: usize,
    /// Base name of the containing directory. The root's own name at depth 0.
    pub parent_name: String,
    /// Base name of the directory above the parent. At depth 1 that is the
    /// root itself; at depth 0 there is none.
    pub grandparent_name: Option<String>,
}

impl PathPosition {
    /// Derive the position of `relative` (a file path relative to the root)
    /// given the root's base name.
    pub fn from_relative(root_name: &str, relative: &Path) -> Self {
        let mut dirs: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        // last component is the file itself
        dirs.pop();

        let depth = dirs.len();
        let parent_name = dirs.last().cloned().unwrap_or_else(|| root_name.to_string());
        let grandparent_name = match depth {
            0 => None,
            1 => Some(root_name.to_string()),
            _ => Some(dirs[depth - 2].clone()),
        };

        Self {
            depth,
            parent_name,
            grandparent_name,
        }
    }
}

/// One discovered accounts.json with its path position resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountsFile {
    /// Absolute path to the file.
    pub path: PathBuf,
    pub position: PathPosition,
}

impl AccountsFile {
    pub fn depth(&self) -> usize {
        self.position.depth
    }

    pub fn parent_name(&self) -> &str {
        &self.position.parent_name
    }

    pub fn grandparent_name(&self) -> Option<&str> {
        self.position.grandparent_name.as_deref()
    }
}

/// Depth-first walker over a data root.
#[derive(Debug, Clone)]
pub struct AccountsWalker {
    root: PathBuf,
    root_name: String,
}

impl AccountsWalker {
    /// Open a walk at `root`. The root is canonicalized so it has a real
    /// base name; a missing or non-directory root is a `DirectoryRead` error.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let given = root.as_ref();
        let root = fs::canonicalize(given).map_err(|source| CombineError::DirectoryRead {
            path: given.to_path_buf(),
            source,
        })?;

        // Listing it once up front turns "not a directory" and "permission
        // denied" on the root into errors before anything else happens.
        fs::read_dir(&root).map_err(|source| CombineError::DirectoryRead {
            path: root.clone(),
            source,
        })?;

        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(root = %root.display(), "Data root opened");
        Ok(Self { root, root_name })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every accounts.json under the root, in walk order. Unreadable
    /// directories come out as `Err` items and the walk carries on past
    /// them; the caller decides whether that is fatal.
    pub fn walk(&self) -> impl Iterator<Item = Result<AccountsFile>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => return Some(Err(CombineError::from_walk(self.root.clone(), err))),
                };

                if !entry.file_type().is_file() || entry.file_name() != ACCOUNTS_FILE_NAME {
                    trace!(path = %entry.path().display(), "Skipping entry");
                    return None;
                }

                let path = entry.into_path();
                let relative = path.strip_prefix(&self.root).unwrap_or(path.as_path());
                let position = PathPosition::from_relative(&self.root_name, relative);
                Some(Ok(AccountsFile { path, position }))
            })
    }
}
