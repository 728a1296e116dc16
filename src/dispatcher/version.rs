//! "latest" 版本解析
//!
//! 默认按语义化版本比较（"10.0.0" > "9.0.0"）；合法 semver 排在非法版本串之前，
//! 两个非法版本串之间按字典序。配置为 lexicographic 时全部按字典序。

use std::cmp::Ordering;

use crate::config::VersionOrdering;

/// 表示"最新版本"的版本参数
pub const LATEST: &str = "latest";

pub fn compare_versions(a: &str, b: &str, ordering: VersionOrdering) -> Ordering {
    if ordering == VersionOrdering::Lexicographic {
        return a.cmp(b);
    }
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// 从候选版本中选出最新者
pub fn latest<'a, I>(versions: I, ordering: VersionOrdering) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .max_by(|a, b| compare_versions(a, b, ordering))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_ordering() {
        let versions = ["9.0.0", "10.0.0", "1.2.3"];
        assert_eq!(latest(versions, VersionOrdering::Semantic), Some("10.0.0"));
    }

    #[test]
    fn test_lexicographic_ordering() {
        let versions = ["9.0.0", "10.0.0", "1.2.3"];
        assert_eq!(latest(versions, VersionOrdering::Lexicographic), Some("9.0.0"));
    }

    #[test]
    fn test_prerelease_and_invalid() {
        assert_eq!(
            latest(["1.0.0-beta", "1.0.0"], VersionOrdering::Semantic),
            Some("1.0.0")
        );
        assert_eq!(latest(["v2", "1.0.0"], VersionOrdering::Semantic), Some("1.0.0"));
        assert_eq!(latest(["beta", "alpha"], VersionOrdering::Semantic), Some("beta"));
        assert_eq!(latest(Vec::<&str>::new(), VersionOrdering::Semantic), None);
    }
}
