// スクリプト整合性検証サービス
//
// 適用スクリプトのSHA-256ハッシュを計算し、呼び出し元の申告値と比較する。
// 生成から送信までの間の改ざん・欠落を検出する。

use crate::core::error::ApplyError;
use sha2::{Digest, Sha256};

/// スクリプト整合性検証サービス
#[derive(Debug, Clone, Default)]
pub struct ScriptIntegrityVerifier {}

impl ScriptIntegrityVerifier {
    /// 新しいScriptIntegrityVerifierを作成
    pub fn new() -> Self {
        Self {}
    }

    /// スクリプトのSHA-256を計算
    ///
    /// # Returns
    ///
    /// UTF-8バイト列に対するSHA-256（64文字の小文字16進数文字列）
    pub fn compute(&self, script: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(script.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// 申告されたハッシュと一致するか
    ///
    /// 16進数の大文字小文字は区別しない。申告値の前後の空白は無視する。
    pub fn verify(&self, script: &str, declared_hash: &str) -> bool {
        self.compute(script)
            .eq_ignore_ascii_case(declared_hash.trim())
    }

    /// 検証し、不一致の場合は IntegrityMismatch を返す
    pub fn check(&self, script: &str, declared_hash: &str) -> Result<(), ApplyError> {
        let actual = self.compute(script);
        if actual.eq_ignore_ascii_case(declared_hash.trim()) {
            Ok(())
        } else {
            Err(ApplyError::IntegrityMismatch {
                declared: declared_hash.trim().to_string(),
                actual,
            })
        }
    }
}
