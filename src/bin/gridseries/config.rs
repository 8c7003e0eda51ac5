use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use gridseries::MergeOptions;

/// TOML manifest describing one merge.
///
/// ```toml
/// output = "merged/vxyz_jxyz_p_f_duvw.npz"
///
/// [base]
/// name = "vxyz_jxyz_p_f"
/// path = "vxyz_jxyz_p_f.pkl"
///
/// [[deltas]]
/// path = "du.pkl"
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeManifest {
    /// Output path of the merged dataset.
    pub output: Option<PathBuf>,

    /// Compress `.npz` output.
    #[serde(default = "default_true")]
    pub compressed: bool,

    /// Coordinate comparison tolerances.
    #[serde(default)]
    pub tolerance: ToleranceToml,

    /// Check the base coordinates form a complete grid.
    #[serde(default)]
    pub verify_base_grid: bool,

    /// Dataset whose variables lead the merged dataset.
    pub base: SourceToml,

    /// Datasets whose non-coordinate variables are appended, in order.
    #[serde(default)]
    pub deltas: Vec<SourceToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceToml {
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
}

impl Default for ToleranceToml {
    fn default() -> Self {
        Self {
            rtol: default_rtol(),
            atol: default_atol(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceToml {
    /// Name used in errors, defaults to the file stem.
    pub name: Option<String>,
    pub path: PathBuf,
}

fn default_true() -> bool {
    true
}
fn default_rtol() -> f64 {
    MergeOptions::default().rtol
}
fn default_atol() -> f64 {
    MergeOptions::default().atol
}

impl MergeManifest {
    /// Read a manifest, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read merge manifest: {}", path.display()))?;
        let mut manifest: MergeManifest =
            toml::from_str(&text).context("failed to parse merge manifest TOML")?;

        if let Some(dir) = path.parent() {
            manifest.resolve_relative_to(dir);
        }

        Ok(manifest)
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        };

        if let Some(output) = self.output.as_mut() {
            resolve(output);
        }
        resolve(&mut self.base.path);
        self.deltas
            .iter_mut()
            .for_each(|delta| resolve(&mut delta.path));
    }

    pub fn options(&self) -> MergeOptions {
        MergeOptions::default()
            .with_tolerance(self.tolerance.rtol, self.tolerance.atol)
            .with_base_grid_check(self.verify_base_grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
output = "merged.npz"
verify_base_grid = true

[tolerance]
rtol = 1e-6

[base]
name = "vxyz_jxyz_p_f"
path = "base.pkl"

[[deltas]]
path = "du.pkl"

[[deltas]]
name = "dv"
path = "/abs/dv.pkl"
"#;

    #[test]
    fn parse_manifest() {
        let manifest: MergeManifest = toml::from_str(MANIFEST).unwrap();

        assert!(manifest.compressed);
        assert_eq!(manifest.tolerance.rtol, 1e-6);
        assert_eq!(manifest.tolerance.atol, 1e-8);
        assert_eq!(manifest.deltas.len(), 2);
        assert_eq!(manifest.deltas[0].name, None);

        let options = manifest.options();
        assert!(options.verify_base_grid);
        assert_eq!(options.rtol, 1e-6);
    }

    #[test]
    fn relative_paths() {
        let mut manifest: MergeManifest = toml::from_str(MANIFEST).unwrap();
        manifest.resolve_relative_to(Path::new("/runs/42"));

        assert_eq!(manifest.output, Some(PathBuf::from("/runs/42/merged.npz")));
        assert_eq!(manifest.base.path, PathBuf::from("/runs/42/base.pkl"));
        assert_eq!(manifest.deltas[1].path, PathBuf::from("/abs/dv.pkl"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let text = "output = \"a.npz\"\ncompresed = false\n[base]\npath = \"b\"\n";
        assert!(toml::from_str::<MergeManifest>(text).is_err());
    }
}
