//! Domain façades: key naming, TTL and tag conventions.
//!
//! These are thin layers over [`UnifiedCache`]: no separate storage,
//! just the conventions the rest of the platform agrees on for fiscal
//! calculations, AI answers and OCR results.

use crate::entry::Priority;
use crate::unified::{CacheWriteOptions, TierConfig, UnifiedCache};
use contaflux_core::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(86_400);
const WEEK: Duration = Duration::from_secs(7 * 86_400);

/// Fiscal results: DAS calculations (24h, long-lived and shared) and
/// company metadata (1h, session-local tiers).
#[derive(Debug, Clone)]
pub struct FiscalCache {
    cache: UnifiedCache,
}

impl FiscalCache {
    pub fn new(cache: UnifiedCache) -> Self {
        Self { cache }
    }

    pub fn das_key(empresa_id: &str, competencia: &str) -> String {
        format!("das:{empresa_id}:{competencia}")
    }

    pub fn empresa_key(empresa_id: &str) -> String {
        format!("empresa:{empresa_id}")
    }

    pub async fn get_das<T: DeserializeOwned>(
        &self,
        empresa_id: &str,
        competencia: &str,
    ) -> Result<Option<T>> {
        self.cache
            .get(&Self::das_key(empresa_id, competencia), TierConfig::all())
            .await
    }

    pub async fn set_das<T: Serialize>(
        &self,
        empresa_id: &str,
        competencia: &str,
        result: &T,
    ) -> Result<()> {
        let options = CacheWriteOptions::with_ttl(DAY)
            .tags(["das".to_string(), format!("empresa:{empresa_id}")])
            .priority(Priority::High);
        self.cache
            .set(
                &Self::das_key(empresa_id, competencia),
                result,
                options,
                TierConfig::all(),
            )
            .await
    }

    pub async fn get_empresa<T: DeserializeOwned>(&self, empresa_id: &str) -> Result<Option<T>> {
        self.cache
            .get(&Self::empresa_key(empresa_id), TierConfig::default())
            .await
    }

    pub async fn set_empresa<T: Serialize>(&self, empresa_id: &str, empresa: &T) -> Result<()> {
        let options =
            CacheWriteOptions::with_ttl(HOUR).tags([format!("empresa:{empresa_id}")]);
        self.cache
            .set(
                &Self::empresa_key(empresa_id),
                empresa,
                options,
                TierConfig::default(),
            )
            .await
    }

    /// Drop everything related to one company: its metadata and every
    /// fiscal result tagged with it.
    pub async fn invalidate_empresa(&self, empresa_id: &str) -> usize {
        self.cache
            .invalidate(&Self::empresa_key(empresa_id), TierConfig::default())
            .await;
        self.cache
            .invalidate_by_tag(&format!("empresa:{empresa_id}"), TierConfig::tag_default())
            .await
    }
}

/// AI answers, keyed by a hash of the question plus the asking user.
#[derive(Debug, Clone)]
pub struct AiCache {
    cache: UnifiedCache,
}

impl AiCache {
    pub fn new(cache: UnifiedCache) -> Self {
        Self { cache }
    }

    /// `ai:<sha256(question)[..16]>:<user_id>`; the hash keeps keys
    /// bounded regardless of question length.
    pub fn answer_key(question: &str, user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(question.as_bytes());
        let digest = hex::encode(&hasher.finalize()[..8]);
        format!("ai:{digest}:{user_id}")
    }

    pub async fn get_answer<T: DeserializeOwned>(
        &self,
        question: &str,
        user_id: &str,
    ) -> Result<Option<T>> {
        self.cache
            .get(&Self::answer_key(question, user_id), TierConfig::all())
            .await
    }

    pub async fn set_answer<T: Serialize>(
        &self,
        question: &str,
        user_id: &str,
        answer: &T,
    ) -> Result<()> {
        let options = CacheWriteOptions::with_ttl(DAY).tags(["ai"]);
        self.cache
            .set(
                &Self::answer_key(question, user_id),
                answer,
                options,
                TierConfig::all(),
            )
            .await
    }
}

/// OCR extraction results, keyed by document path. A week of lifetime:
/// re-running OCR over the same file is the most expensive miss we have.
#[derive(Debug, Clone)]
pub struct OcrCache {
    cache: UnifiedCache,
}

impl OcrCache {
    pub fn new(cache: UnifiedCache) -> Self {
        Self { cache }
    }

    pub fn document_key(file_path: &str) -> String {
        format!("ocr:{file_path}")
    }

    pub async fn get_document<T: DeserializeOwned>(&self, file_path: &str) -> Result<Option<T>> {
        self.cache
            .get(&Self::document_key(file_path), TierConfig::all())
            .await
    }

    pub async fn set_document<T: Serialize>(&self, file_path: &str, result: &T) -> Result<()> {
        let options = CacheWriteOptions::with_ttl(WEEK).tags(["ocr"]);
        self.cache
            .set(
                &Self::document_key(file_path),
                result,
                options,
                TierConfig::all(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::NoopLocalStore;
    use crate::memory::MemoryStore;
    use serde_json::json;

    fn memory_cache() -> UnifiedCache {
        UnifiedCache::from_parts(
            MemoryStore::new(100),
            Box::new(NoopLocalStore),
            None,
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_key_conventions() {
        assert_eq!(FiscalCache::das_key("42", "2024-01"), "das:42:2024-01");
        assert_eq!(FiscalCache::empresa_key("42"), "empresa:42");
        assert_eq!(OcrCache::document_key("docs/nf-1001.pdf"), "ocr:docs/nf-1001.pdf");
    }

    #[test]
    fn test_ai_key_is_stable_and_user_scoped() {
        let a = AiCache::answer_key("Qual o limite do Simples?", "user-1");
        let b = AiCache::answer_key("Qual o limite do Simples?", "user-1");
        let c = AiCache::answer_key("Qual o limite do Simples?", "user-2");
        let d = AiCache::answer_key("Outra pergunta", "user-1");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.starts_with("ai:"));
        assert!(a.ends_with(":user-1"));
    }

    #[tokio::test]
    async fn test_das_round_trip_and_company_invalidation() {
        let fiscal = FiscalCache::new(memory_cache());

        fiscal
            .set_das("42", "2024-01", &json!({"valor": 71.6}))
            .await
            .unwrap();
        let das: Option<serde_json::Value> = fiscal.get_das("42", "2024-01").await.unwrap();
        assert_eq!(das, Some(json!({"valor": 71.6})));

        let removed = fiscal.invalidate_empresa("42").await;
        assert_eq!(removed, 1);
        let das: Option<serde_json::Value> = fiscal.get_das("42", "2024-01").await.unwrap();
        assert_eq!(das, None);
    }
}
