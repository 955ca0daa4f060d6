// コンテキストレジストリ
//
// 論理コンテキスト名から「期待系列の提供元」と「適用先DB」の組を解決する。
// 登録は起動時に一度だけ行い、以後は読み取り専用として共有する。

use crate::adapters::database::TargetDatabase;
use crate::core::error::RegistryError;
use crate::services::sequence_provider::MigrationSequenceProvider;
use std::fmt;
use std::sync::Arc;

/// 登録済みコンテキスト
pub struct ContextHandle {
    provider: Arc<dyn MigrationSequenceProvider>,
    target: TargetDatabase,
}

impl ContextHandle {
    pub fn new(provider: Arc<dyn MigrationSequenceProvider>, target: TargetDatabase) -> Self {
        Self { provider, target }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn qualified_name(&self) -> &str {
        self.provider.qualified_name()
    }

    pub fn provider(&self) -> &dyn MigrationSequenceProvider {
        self.provider.as_ref()
    }

    pub fn target(&self) -> &TargetDatabase {
        &self.target
    }

    /// 短縮名または完全修飾名と一致するか（大文字小文字を区別しない）
    fn matches(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name) || self.qualified_name().eq_ignore_ascii_case(name)
    }
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("name", &self.name())
            .field("qualified_name", &self.qualified_name())
            .field("migrations", &self.provider.expected_sequence().len())
            .field("dialect", &self.target.dialect())
            .finish()
    }
}

/// コンテキストレジストリのビルダー
#[derive(Debug, Default)]
pub struct ContextRegistryBuilder {
    contexts: Vec<Arc<ContextHandle>>,
}

impl ContextRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// コンテキストを登録
    ///
    /// 既存コンテキストと短縮名・完全修飾名のいずれかが衝突する場合はエラー。
    pub fn register(
        mut self,
        provider: Arc<dyn MigrationSequenceProvider>,
        target: TargetDatabase,
    ) -> Result<Self, RegistryError> {
        let handle = ContextHandle::new(provider, target);

        if let Some(existing) = self
            .contexts
            .iter()
            .find(|c| c.matches(handle.name()) || c.matches(handle.qualified_name()))
        {
            return Err(RegistryError::DuplicateContext {
                name: handle.name().to_string(),
                existing: existing.qualified_name().to_string(),
            });
        }

        self.contexts.push(Arc::new(handle));
        Ok(self)
    }

    pub fn build(self) -> ContextRegistry {
        ContextRegistry {
            contexts: self.contexts,
        }
    }
}

/// コンテキストレジストリ
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: Vec<Arc<ContextHandle>>,
}

impl ContextRegistry {
    pub fn builder() -> ContextRegistryBuilder {
        ContextRegistryBuilder::new()
    }

    /// 名前からコンテキストを解決
    ///
    /// 前後の空白を除き、短縮名または完全修飾名と大文字小文字を区別せず照合する。
    pub fn resolve(&self, name: &str) -> Result<Arc<ContextHandle>, RegistryError> {
        let name = name.trim();

        self.contexts
            .iter()
            .find(|c| c.matches(name))
            .cloned()
            .ok_or_else(|| RegistryError::ContextNotFound {
                name: name.to_string(),
                candidates: self.candidates(),
            })
    }

    /// 登録済みコンテキストの完全修飾名（昇順）
    pub fn candidates(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .contexts
            .iter()
            .map(|c| c.qualified_name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Arc<ContextHandle>> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// 全コンテキストの接続プールを閉じる
    pub async fn close(&self) {
        for context in &self.contexts {
            context.target().close().await;
        }
    }
}
