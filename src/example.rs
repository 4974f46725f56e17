//! Code for working with the bundled example cases
use anyhow::{Context, Result, bail};
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::Path;

/// The directory containing the example cases.
const EXAMPLES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// Get the names of all examples
pub fn get_example_names() -> impl Iterator<Item = &'static str> {
    EXAMPLES_DIR
        .dirs()
        .filter_map(|dir| dir.path().as_os_str().to_str())
}

/// A bundled example case
pub struct Example(Dir<'static>);

impl Example {
    /// Get the example with the specified name
    pub fn from_name(name: &str) -> Result<Self> {
        let dir = EXAMPLES_DIR
            .get_dir(name)
            .with_context(|| format!("Example '{name}' not found"))?;

        Ok(Self(dir.clone()))
    }

    /// Get the contents of the readme file for this example
    pub fn get_readme(&self) -> Result<&'static str> {
        self.0
            .get_file(self.0.path().join("README.txt"))
            .context("Missing file")?
            .contents_utf8()
            .context("File not UTF-8 encoded")
    }

    /// Extract this example to a specified destination
    pub fn extract(&self, new_path: &Path) -> Result<()> {
        fs::create_dir(new_path)
            .with_context(|| format!("Could not create {}", new_path.display()))?;
        for entry in self.0.entries() {
            match entry {
                DirEntry::Dir(dir) => {
                    bail!("Subdirectories in examples not supported: {}", dir.path().display())
                }
                DirEntry::File(f) => {
                    let file_name = f.path().file_name().context("Invalid file name")?;
                    fs::write(new_path.join(file_name), f.contents())?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::load_model;
    use tempfile::tempdir;

    #[test]
    fn all_examples_have_readme() {
        for example in get_example_names() {
            let readme = Example::from_name(example)
                .unwrap()
                .get_readme()
                .with_context(|| format!("Could not load readme for {example}"))
                .unwrap();

            assert!(!readme.trim().is_empty());
        }
    }

    #[test]
    fn all_examples_load() {
        for example in get_example_names() {
            let dir = tempdir().unwrap();
            let model_dir = dir.path().join(example);
            Example::from_name(example).unwrap().extract(&model_dir).unwrap();
            load_model(&model_dir)
                .with_context(|| format!("Could not load {example}"))
                .unwrap();
        }
    }
}
