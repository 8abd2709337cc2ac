//! Expands `{constant}` placeholders in stored installer paths.
//!
//! Grounded in `setup::filename_map::convert` (`original_source/src/setup/filename_map.cpp`):
//! paths are split at backslashes, and within each segment, substrings delimited by `{` and `}`
//! are looked up (case-insensitively) in a name -> value table. An unknown key passes through
//! unchanged; an unterminated `{` is silently dropped, matching the original's behavior.

use std::collections::HashMap;

use camino::Utf8PathBuf;

/// A name -> value table used to expand `{app}`, `{win}`, and similar placeholders.
#[derive(Clone, Debug, Default)]
pub struct FilenameMap {
    values: HashMap<String, String>,
    lowercase: bool,
}

impl FilenameMap {
    #[must_use]
    pub fn new(lowercase: bool) -> Self {
        Self {
            values: HashMap::new(),
            lowercase,
        }
    }

    /// Associates a (lowercase) constant name with its expansion.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into().to_lowercase(), value.into());
    }

    fn lookup(&self, key: &str) -> &str {
        self.values.get(key).map_or(key, String::as_str)
    }

    /// Expands `name`, returning a platform-neutral path built segment by segment.
    ///
    /// `camino` is used because strings decoded out of a codepage via `encoding_rs` are
    /// guaranteed valid UTF-8, and extraction driver consumers want `Utf8Path` ergonomics.
    #[must_use]
    pub fn convert(&self, name: &str) -> Utf8PathBuf {
        let mut result = Utf8PathBuf::new();
        let mut buffer = String::new();
        let mut rest = name;

        loop {
            let Some(pos) = rest.find(['{', '\\']) else {
                self.push_segment(&mut result, &mut buffer, rest);
                return result;
            };

            match rest.as_bytes()[pos] {
                b'\\' => {
                    self.push_segment(&mut result, &mut buffer, &rest[..pos]);
                    rest = &rest[pos + 1..];
                }
                _ => {
                    buffer.push_str(&self.transform(&rest[..pos]));

                    rest = &rest[pos + 1..];
                    if let Some(end) = rest.find('}') {
                        let key = rest[..end].to_lowercase();
                        buffer.push_str(self.lookup(&key));
                        rest = &rest[end + 1..];
                    }
                    // An unterminated `{` is left in `rest` and re-scanned as plain text.
                }
            }
        }
    }

    fn push_segment(&self, result: &mut Utf8PathBuf, buffer: &mut String, segment: &str) {
        if buffer.is_empty() {
            result.push(self.transform(segment));
        } else {
            buffer.push_str(&self.transform(segment));
            result.push(std::mem::take(buffer));
        }
    }

    fn transform(&self, segment: &str) -> String {
        if self.lowercase {
            segment.to_lowercase()
        } else {
            segment.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FilenameMap;

    fn map() -> FilenameMap {
        let mut map = FilenameMap::new(false);
        map.insert("app", "C:/Program Files/Demo");
        map.insert("win", "C:/Windows");
        map
    }

    #[test]
    fn expands_known_placeholder() {
        assert_eq!(
            map().convert("{app}\\readme.txt"),
            "C:/Program Files/Demo/readme.txt"
        );
    }

    #[test]
    fn leaves_unknown_placeholder_unchanged() {
        assert_eq!(map().convert("{unknown}\\file.txt"), "unknown/file.txt");
    }

    #[test]
    fn drops_unterminated_brace() {
        assert_eq!(map().convert("foo{bar\\baz"), "foobar/baz");
    }

    #[test]
    fn lowercase_mode_affects_literal_text_only() {
        let mut map = FilenameMap::new(true);
        map.insert("app", "C:/Program Files/Demo");
        assert_eq!(
            map.convert("{app}\\README.TXT"),
            "C:/Program Files/Demo/readme.txt"
        );
    }

    #[test]
    fn plain_path_with_no_placeholders() {
        assert_eq!(map().convert("docs\\license.txt"), "docs/license.txt");
    }
}
