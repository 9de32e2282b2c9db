use std::env;
use std::path::{Component, Path, PathBuf};

/// Expand `~` and environment variables in a path, then normalise it lexically
///
/// Both `$VAR` and `${VAR}` are recognised. Unset variables are left in place, the same way a
/// shell without `nounset` would leave them visible to the user.
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = expand_vars(path);
    let expanded = expand_home(&expanded);
    normalise(Path::new(&expanded))
}

/// Expand a path and turn it into an absolute, symlink-free path
///
/// Parts of the path that don't exist yet are appended unchanged to the canonical form of the
/// deepest ancestor that does.
pub fn fix_path(path: &str) -> PathBuf {
    let expanded = expand_path(path);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        match env::current_dir() {
            Ok(cwd) => normalise(&cwd.join(expanded)),
            Err(_) => expanded,
        }
    };
    canonicalise_existing(&absolute)
}

fn canonicalise_existing(path: &Path) -> PathBuf {
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
    let mut ancestor = path;
    loop {
        if let Ok(real) = ancestor.canonicalize() {
            return missing.iter().rev().fold(real, |acc, part| acc.join(part));
        }
        match (ancestor.file_name(), ancestor.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name);
                ancestor = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{}", home.display(), rest),
        None => path.to_string(),
    }
}

fn expand_vars(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let braced = matches!(chars.peek(), Some((_, '{')));
        let start = if braced {
            chars.next();
            i + 2
        } else {
            i + 1
        };

        let mut end = start;
        while let Some(&(j, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        let closed = braced && matches!(chars.peek(), Some((_, '}')));
        if braced && !closed {
            // unterminated ${..., keep it literally
            out.push_str(&path[i..end]);
            continue;
        }
        if closed {
            chars.next();
        }

        let name = &path[start..end];
        match env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => {
                let literal_end = if closed { end + 1 } else { end };
                out.push_str(&path[i..literal_end]);
            }
        }
    }

    out
}

/// Lexical normalisation: drops `.`, folds `..` and repeated separators
fn normalise(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = out.components().next_back();
                match last {
                    Some(Component::Normal(_)) => {
                        out.pop();
                    }
                    Some(Component::RootDir) => {}
                    _ => out.push(".."),
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
