//! Input file expansion.
//!
//! Arguments containing `*` are glob patterns: every path component with
//! a wildcard is matched against the entries of the directories reached
//! so far (`*` any run of characters, `?` one character, `[...]` a
//! character class, `[!...]` its negation; hidden entries only when the
//! component starts with a dot). Everything else is used verbatim,
//! existing or not, so a bad path shows up as a decode error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;

fn has_wildcard(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// Regex for one `[...]` class body, or `None` when the class is never closed.
fn class_regex(chars: &[char]) -> Option<(String, usize)> {
    let mut i = 0;
    let mut re = String::from("[");
    if chars.first() == Some(&'!') {
        re.push('^');
        i += 1;
    }
    // A `]` right after the opening bracket is a member, not the end
    let first = i;
    while i < chars.len() && (chars[i] != ']' || i == first) {
        match chars[i] {
            '-' => re.push('-'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
        i += 1;
    }
    if i == chars.len() {
        return None;
    }
    re.push(']');
    Some((re, i + 1))
}

fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut re = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => {
                if let Some((class, used)) = class_regex(&chars[i + 1..]) {
                    re.push_str(&class);
                    i += used;
                } else {
                    re.push_str(r"\[");
                }
            }
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
        i += 1;
    }
    re.push('$');
    Regex::new(&re).with_context(|| format!("Invalid pattern {:?}", pattern))
}

/// Entries of `base` whose names match `re`.
fn matching_entries(base: &Path, re: &Regex, show_hidden: bool) -> Vec<PathBuf> {
    let dir = if base.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut matches = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if file_name.starts_with('.') && !show_hidden {
            continue;
        }
        if re.is_match(file_name) {
            matches.push(base.join(file_name));
        }
    }
    matches
}

fn expand_wildcard(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut matches = vec![PathBuf::new()];

    for component in Path::new(pattern).components() {
        let part = component.as_os_str();
        match part.to_str().filter(|text| has_wildcard(text)) {
            Some(text) => {
                let re = wildcard_regex(text)?;
                matches = matches
                    .iter()
                    .flat_map(|base| matching_entries(base, &re, text.starts_with('.')))
                    .collect();
            }
            None => matches.iter_mut().for_each(|m| m.push(part)),
        }
        if matches.is_empty() {
            break;
        }
    }

    // Literal components after the last wildcard may name nothing
    matches.retain(|m| m.symlink_metadata().is_ok());
    Ok(matches)
}

/// Expand wildcard arguments and sort the result.
pub fn expand_inputs(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for arg in args {
        if arg.contains('*') {
            files.extend(expand_wildcard(arg)?);
        } else {
            files.push(PathBuf::from(arg));
        }
    }
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }

    #[test]
    fn expands_and_sorts_wildcards() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["0002.pgm", "0001.pgm", "0010.pgm", "notes.txt", ".hidden.pgm"]);

        let pattern = format!("{}/*.pgm", dir.path().display());
        let files = expand_inputs(&[pattern]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0001.pgm", "0002.pgm", "0010.pgm"]);
        assert!(files.iter().all(|p| p.starts_with(dir.path())));
    }

    #[test]
    fn question_mark_matches_one_character() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["f1.pgm", "f12.pgm"]);
        let pattern = format!("{}/f?.pgm*", dir.path().display());
        let files = expand_inputs(&[pattern]).unwrap();
        assert_eq!(files, vec![dir.path().join("f1.pgm")]);
    }

    #[test]
    fn literal_paths_pass_through() {
        let args = vec!["b.pgm".to_string(), "a.pgm".to_string()];
        assert_eq!(
            expand_inputs(&args).unwrap(),
            vec![PathBuf::from("a.pgm"), PathBuf::from("b.pgm")]
        );
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["a+b(1).pgm", "aab1.pgm"]);
        let pattern = format!("{}/a+b(*", dir.path().display());
        assert_eq!(
            expand_inputs(&[pattern]).unwrap(),
            vec![dir.path().join("a+b(1).pgm")]
        );
    }

    #[test]
    fn missing_directory_matches_nothing() {
        let files = expand_inputs(&["/definitely/not/here/*.pgm".to_string()]).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn wildcards_expand_in_directory_components() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["take1", "take2", "other"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
        }
        touch(&dir.path().join("take1"), &["0001.pgm"]);
        touch(&dir.path().join("take2"), &["0001.pgm", "0002.pgm"]);
        touch(&dir.path().join("other"), &["0001.pgm"]);

        let pattern = format!("{}/take*/0001.pgm", dir.path().display());
        assert_eq!(
            expand_inputs(&[pattern]).unwrap(),
            vec![
                dir.path().join("take1/0001.pgm"),
                dir.path().join("take2/0001.pgm"),
            ]
        );

        let pattern = format!("{}/take?/*.pgm", dir.path().display());
        assert_eq!(expand_inputs(&[pattern]).unwrap().len(), 3);
    }

    #[test]
    fn bracket_classes_match_character_sets() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["f1.pgm", "f2.pgm", "f3.pgm", "fx.pgm", "[z].pgm"]);

        let pattern = format!("{}/f[1-2]*", dir.path().display());
        assert_eq!(
            expand_inputs(&[pattern]).unwrap(),
            vec![dir.path().join("f1.pgm"), dir.path().join("f2.pgm")]
        );

        let pattern = format!("{}/f[!0-9]*", dir.path().display());
        assert_eq!(expand_inputs(&[pattern]).unwrap(), vec![dir.path().join("fx.pgm")]);

        // An unclosed bracket is a literal character
        let pattern = format!("{}/[z*", dir.path().display());
        assert_eq!(expand_inputs(&[pattern]).unwrap(), vec![dir.path().join("[z].pgm")]);
    }
}
