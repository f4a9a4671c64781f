pub mod index;
pub mod inspect;
pub mod map;
pub mod search;

use anyhow::{Context, Result};
use std::path::Path;

use capmap::mapping::types::CodeArtifact;

/// Read artifacts from a JSON file holding an array of `{"id", "content"}`.
pub fn load_artifacts(path: &Path) -> Result<Vec<CodeArtifact>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read artifacts file {}", path.display()))?;
    let artifacts: Vec<CodeArtifact> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse artifacts file {}", path.display()))?;
    tracing::info!(path = %path.display(), count = artifacts.len(), "artifacts loaded");
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_artifacts_reads_json_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "a1", "content": "fn a() {{}}"}}, {{"id": "a2", "content": ""}}]"#
        )
        .unwrap();

        let artifacts = load_artifacts(file.path()).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0], CodeArtifact::new("a1", "fn a() {}"));
    }

    #[test]
    fn load_artifacts_rejects_missing_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "a1"}}]"#).unwrap();
        assert!(load_artifacts(file.path()).is_err());
    }
}
