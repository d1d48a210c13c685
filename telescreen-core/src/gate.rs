//! Restricted-path access gate.
//!
//! The host refuses file access inside a set of protected directory
//! trees. Every stored member is canonical (absolute, symlink-free,
//! normalized), so containment is a component-wise prefix check via
//! [`Path::starts_with`]: `/home/alice` restricts `/home/alice/x` but
//! never the sibling `/home/alice2`.
//!
//! The set lives in memory only and is never persisted.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::{env, fs};

/// A set of canonicalized directory roots that must not be touched.
#[derive(Debug, Clone, Default)]
pub struct RestrictedPaths {
    paths: HashSet<PathBuf>,
}

impl RestrictedPaths {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The OS-specific default set: the user's home directory plus the
    /// system and program-install directories.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();

        if let Some(home) = dirs::home_dir() {
            set.add(&home);
        }

        #[cfg(windows)]
        for var in ["WINDIR", "ProgramFiles", "ProgramFiles(x86)"] {
            if let Ok(dir) = env::var(var) {
                set.add(Path::new(&dir));
            }
        }

        #[cfg(unix)]
        {
            set.add(Path::new("/etc"));
            set.add(Path::new("/usr"));
        }

        set
    }

    /// Add a root. The argument is canonicalized before insertion.
    pub fn add(&mut self, path: &Path) {
        self.paths.insert(canonicalize_lenient(path));
    }

    /// Remove a root. Returns `true` if it was present.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.paths.remove(&canonicalize_lenient(path))
    }

    /// Whether `path` equals, or lies under, any restricted root.
    pub fn is_restricted(&self, path: &Path) -> bool {
        let query = canonicalize_lenient(path);
        self.paths.iter().any(|root| query.starts_with(root))
    }

    /// The current members, sorted for stable display.
    pub fn members(&self) -> Vec<PathBuf> {
        let mut members: Vec<_> = self.paths.iter().cloned().collect();
        members.sort();
        members
    }

    /// Number of restricted roots.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

// ── Canonicalization ─────────────────────────────────────────────

/// Resolve a path to absolute, symlink-free, normalized form.
///
/// Unlike [`fs::canonicalize`], this also works for paths that do not
/// (yet) exist: the deepest existing ancestor is canonicalized and the
/// remaining components are appended after lexical `.`/`..` removal.
pub fn canonicalize_lenient(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().unwrap_or_default().join(path)
    };
    let normalized = normalize(&absolute);

    if let Ok(resolved) = fs::canonicalize(&normalized) {
        return resolved;
    }

    // Walk up until an existing ancestor canonicalizes, then re-append
    // the components that were stripped on the way.
    let mut base = normalized.clone();
    let mut tail: Vec<PathBuf> = Vec::new();
    while let Some(parent) = base.parent() {
        if let Some(name) = base.file_name() {
            tail.push(PathBuf::from(name));
        }
        base = parent.to_path_buf();
        if let Ok(resolved) = fs::canonicalize(&base) {
            let mut out = resolved;
            for component in tail.iter().rev() {
                out.push(component);
            }
            return out;
        }
    }

    normalized
}

/// Lexically remove `.` and resolve `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // No-op at a root or prefix: `pop` refuses to remove
                // them, so "/.." stays "/".
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gate_with(root: &Path) -> RestrictedPaths {
        let mut set = RestrictedPaths::new();
        set.add(root);
        set
    }

    #[test]
    fn restricts_root_itself() {
        let dir = TempDir::new().unwrap();
        let set = gate_with(dir.path());
        assert!(set.is_restricted(dir.path()));
    }

    #[test]
    fn restricts_descendants() {
        let dir = TempDir::new().unwrap();
        let set = gate_with(dir.path());
        assert!(set.is_restricted(&dir.path().join("secret.txt")));
        assert!(set.is_restricted(&dir.path().join("a/b/c/deep.txt")));
    }

    #[test]
    fn sibling_with_shared_prefix_not_restricted() {
        // Root ".../alice" must not match ".../alice2/file".
        let parent = TempDir::new().unwrap();
        let alice = parent.path().join("alice");
        let alice2 = parent.path().join("alice2");
        fs::create_dir(&alice).unwrap();
        fs::create_dir(&alice2).unwrap();

        let set = gate_with(&alice);
        assert!(set.is_restricted(&alice.join("file")));
        assert!(!set.is_restricted(&alice2.join("file")));
    }

    #[test]
    fn unrelated_path_allowed() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let set = gate_with(dir.path());
        assert!(!set.is_restricted(&other.path().join("scratch.txt")));
    }

    #[test]
    fn relative_segments_resolved() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let set = gate_with(dir.path());

        let sneaky = dir.path().join("sub").join("..").join("secret.txt");
        assert!(set.is_restricted(&sneaky));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_resolved() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("protected");
        fs::create_dir(&target).unwrap();
        let link = dir.path().join("alias");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let set = gate_with(&target);
        assert!(set.is_restricted(&link.join("file.txt")));
    }

    #[test]
    fn add_remove_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut set = RestrictedPaths::new();
        assert!(set.is_empty());

        set.add(dir.path());
        assert_eq!(set.len(), 1);
        assert!(set.is_restricted(dir.path()));

        assert!(set.remove(dir.path()));
        assert!(!set.is_restricted(dir.path()));
        assert!(!set.remove(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn parent_of_root_stays_at_root() {
        assert_eq!(canonicalize_lenient(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(
            canonicalize_lenient(Path::new("/../../etc")),
            PathBuf::from("/etc")
        );
    }

    #[cfg(unix)]
    #[test]
    fn leading_parent_segments_cannot_escape_the_gate() {
        let dir = TempDir::new().unwrap();
        let set = gate_with(dir.path());

        // "/..<root>/file" normalizes back inside the restricted root.
        let sneaky = PathBuf::from(format!("/..{}/file.txt", dir.path().display()));
        assert!(set.is_restricted(&sneaky));
    }

    #[test]
    fn nonexistent_paths_still_canonicalize() {
        let dir = TempDir::new().unwrap();
        let set = gate_with(dir.path());
        // Neither the file nor its parent exist yet.
        assert!(set.is_restricted(&dir.path().join("not/created/yet.txt")));
    }

    #[test]
    fn members_sorted() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let mut set = RestrictedPaths::new();
        set.add(a.path());
        set.add(b.path());

        let members = set.members();
        assert_eq!(members.len(), 2);
        assert!(members.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn defaults_seed_system_directories() {
        let set = RestrictedPaths::with_defaults();
        assert!(!set.is_empty());
        #[cfg(unix)]
        assert!(set.is_restricted(Path::new("/etc/passwd")));
    }
}
