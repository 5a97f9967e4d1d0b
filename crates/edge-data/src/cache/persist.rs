//! 스냅샷 JSON 파일 저장소.
//!
//! 재시작 후에도 마지막 스냅샷을 이전 값으로 쓸 수 있도록 파일에 미러링합니다.
//! 쓰기는 임시 파일에 먼저 쓰고 이름을 바꿉니다.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use edge_core::{EdgeError, EdgeResult, Snapshot, SCORING_RULE_VERSION};

/// 스냅샷 파일.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// 스냅샷을 읽습니다.
    ///
    /// 파일이 없으면 `Ok(None)`. 읽을 수 없거나, 종합 점수가 하위 점수와
    /// 맞지 않거나, 점수 규칙 버전이 다르면 에러입니다.
    pub async fn load(&self) -> EdgeResult<Option<Snapshot>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EdgeError::Storage(format!(
                    "{} 읽기 실패: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let snapshot: Snapshot = serde_json::from_str(&content)?;
        if snapshot.rule_version() != SCORING_RULE_VERSION {
            return Err(EdgeError::Storage(format!(
                "점수 규칙 버전 불일치: 파일 {}, 현재 {}",
                snapshot.rule_version(),
                SCORING_RULE_VERSION
            )));
        }

        debug!(path = %self.path.display(), computed_at = %snapshot.computed_at(), "스냅샷 파일 로드");
        Ok(Some(snapshot))
    }

    /// 스냅샷을 저장합니다.
    pub async fn save(&self, snapshot: &Snapshot) -> EdgeResult<()> {
        let json = serde_json::to_string_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EdgeError::Storage(format!("{} 생성 실패: {}", parent.display(), e)))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| EdgeError::Storage(format!("{} 쓰기 실패: {}", temp.display(), e)))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| EdgeError::Storage(format!("{} 교체 실패: {}", self.path.display(), e)))?;

        debug!(path = %self.path.display(), "스냅샷 파일 저장");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_sits_next_to_target() {
        let file = SnapshotFile::new("/var/lib/edge/snapshot.json");
        assert_eq!(
            file.temp_path(),
            PathBuf::from("/var/lib/edge/snapshot.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let path = std::env::temp_dir().join("edge-data-missing-snapshot-file.json");
        let _ = tokio::fs::remove_file(&path).await;

        let file = SnapshotFile::new(path);
        assert!(file.load().await.unwrap().is_none());
    }
}
