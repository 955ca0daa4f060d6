// 履歴検証サービス
//
// 適用要求の base/target と、コード側の期待系列・DB側の適用履歴を突き合わせる。
// 読み取りのみで副作用はない。

use crate::core::error::{ApplyError, MigrationRole};
use crate::core::migration::{ApplyRequest, MigrationId};
use crate::services::context_registry::{ContextHandle, ContextRegistry};
use std::sync::Arc;
use tracing::debug;

/// 検証結果
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// 解決したコンテキスト
    pub context: Arc<ContextHandle>,
    /// 検証時点の最終適用ID（未適用の場合は "0"）
    pub last_applied: MigrationId,
}

/// 履歴検証サービス
#[derive(Debug, Clone)]
pub struct HistoryValidator {
    registry: Arc<ContextRegistry>,
}

impl HistoryValidator {
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    /// 適用要求を検証
    ///
    /// # Returns
    ///
    /// 成功時は解決したコンテキストと最終適用ID、失敗時は失敗段階を示すエラー
    pub async fn validate(&self, request: &ApplyRequest) -> Result<ValidationReport, ApplyError> {
        let context = self.registry.resolve(&request.context)?;
        let expected = context.provider().expected_sequence();

        let base = request.base_id();
        let target = request.target_id();
        check_request_ids(expected, &base, &target)?;

        let applied = context.target().read_applied_log().await?;
        debug!(
            "Context '{}': {} applied, {} expected",
            context.name(),
            applied.len(),
            expected.len()
        );

        let last_applied = check_history(expected, &applied, &base)?;

        Ok(ValidationReport {
            context,
            last_applied,
        })
    }
}

/// base/target が期待系列上で妥当か検証
///
/// base/target はいずれも期待系列に含まれている必要がある（未適用を表す "0" も不可）。
/// target は base より前に並んではならない（同一は可）。
pub fn check_request_ids(
    expected: &[MigrationId],
    base: &MigrationId,
    target: &MigrationId,
) -> Result<(), ApplyError> {
    if !expected.contains(base) {
        return Err(ApplyError::UnknownMigrationId {
            role: MigrationRole::Base,
            id: base.to_string(),
        });
    }

    if !expected.contains(target) {
        return Err(ApplyError::UnknownMigrationId {
            role: MigrationRole::Target,
            id: target.to_string(),
        });
    }

    if target < base {
        return Err(ApplyError::OutOfOrder {
            base: base.to_string(),
            target: target.to_string(),
        });
    }

    Ok(())
}

/// 適用履歴が期待系列の接頭辞であり、最終適用IDが base と一致するか検証
///
/// # Returns
///
/// 最終適用ID（履歴が空の場合は "0"）
pub fn check_history(
    expected: &[MigrationId],
    applied: &[MigrationId],
    base: &MigrationId,
) -> Result<MigrationId, ApplyError> {
    let last_applied = applied
        .last()
        .cloned()
        .unwrap_or_else(MigrationId::none_applied);

    if !expected.starts_with(applied) {
        return Err(ApplyError::HistoryDivergence {
            last_applied: last_applied.to_string(),
            applied: applied.to_vec(),
            expected: expected.to_vec(),
        });
    }

    if &last_applied != base {
        return Err(ApplyError::BaseMismatch {
            last_applied: last_applied.to_string(),
            base: base.to_string(),
            applied: applied.to_vec(),
            expected: expected.to_vec(),
        });
    }

    Ok(last_applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<MigrationId> {
        values.iter().map(|v| MigrationId::from(*v)).collect()
    }

    #[test]
    fn test_check_request_ids_accepts_forward_and_same_target() {
        let expected = ids(&["A", "B", "C"]);

        assert!(check_request_ids(&expected, &"A".into(), &"B".into()).is_ok());
        assert!(check_request_ids(&expected, &"A".into(), &"C".into()).is_ok());
        assert!(check_request_ids(&expected, &"B".into(), &"B".into()).is_ok());
    }

    #[test]
    fn test_check_request_ids_rejects_none_applied_base() {
        let expected = ids(&["A", "B", "C"]);

        let err =
            check_request_ids(&expected, &MigrationId::none_applied(), &"C".into()).unwrap_err();
        assert!(matches!(
            err,
            ApplyError::UnknownMigrationId {
                role: MigrationRole::Base,
                ..
            }
        ));
        assert_eq!(err.to_string(), "BaseMigrationId not found in code: 0");
    }

    #[test]
    fn test_check_request_ids_unknown_ids() {
        let expected = ids(&["A", "B", "C"]);

        let err = check_request_ids(&expected, &"X".into(), &"B".into()).unwrap_err();
        assert!(matches!(
            err,
            ApplyError::UnknownMigrationId {
                role: MigrationRole::Base,
                ..
            }
        ));

        let err = check_request_ids(&expected, &"A".into(), &"Y".into()).unwrap_err();
        assert!(matches!(
            err,
            ApplyError::UnknownMigrationId {
                role: MigrationRole::Target,
                ..
            }
        ));
    }

    #[test]
    fn test_check_request_ids_is_case_sensitive() {
        let expected = ids(&["20260101000000_Init"]);

        let err = check_request_ids(
            &expected,
            &"20260101000000_Init".into(),
            &"20260101000000_init".into(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ApplyError::UnknownMigrationId {
                role: MigrationRole::Target,
                ..
            }
        ));
    }

    #[test]
    fn test_check_request_ids_out_of_order() {
        let expected = ids(&["A", "B", "C"]);

        let err = check_request_ids(&expected, &"C".into(), &"A".into()).unwrap_err();
        assert_eq!(err.kind(), "OutOfOrder");
    }

    #[test]
    fn test_check_history_prefix_and_base() {
        let expected = ids(&["A", "B", "C"]);

        assert_eq!(
            check_history(&expected, &ids(&["A"]), &"A".into()).unwrap(),
            MigrationId::from("A")
        );
        assert!(check_history(&expected, &expected, &"C".into()).is_ok());
    }

    #[test]
    fn test_check_history_divergence() {
        let expected = ids(&["A", "B", "C"]);

        let err = check_history(&expected, &ids(&["A", "X"]), &"A".into()).unwrap_err();
        assert_eq!(err.kind(), "HistoryDivergence");
        let message = err.to_string();
        assert!(message.contains("last_applied='X'"));
        assert!(message.contains("applied=[A, X]"));
        assert!(message.contains("expected=[A, B, C]"));

        // 期待系列より長い履歴も接頭辞ではない
        let err = check_history(&ids(&["A"]), &ids(&["A", "B"]), &"A".into()).unwrap_err();
        assert_eq!(err.kind(), "HistoryDivergence");
    }

    #[test]
    fn test_check_history_base_mismatch() {
        let expected = ids(&["A", "B", "C"]);

        let err = check_history(&expected, &ids(&["A"]), &"B".into()).unwrap_err();
        assert_eq!(err.kind(), "BaseMismatch");
        assert!(err.to_string().contains("DB last applied is 'A'"));

        let err = check_history(&expected, &[], &"A".into()).unwrap_err();
        assert!(err.to_string().contains("DB last applied is '0'"));
    }

    #[test]
    fn test_resubmitting_applied_target_is_base_mismatch() {
        let expected = ids(&["A", "B", "C"]);
        let applied = ids(&["A", "B"]);

        assert!(check_request_ids(&expected, &"A".into(), &"B".into()).is_ok());
        let err = check_history(&expected, &applied, &"A".into()).unwrap_err();
        assert_eq!(err.kind(), "BaseMismatch");
    }
}
