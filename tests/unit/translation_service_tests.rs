/*!
 * Tests for translation service functionality
 */

use std::sync::Arc;
use yaptwai::errors::TranslationError;
use yaptwai::providers::mock::MockProvider;
use yaptwai::translation::cache::TranslationCache;
use yaptwai::translation::TranslationService;
use crate::common;

/// Test that a working provider answers with the translated input
#[tokio::test]
async fn test_translate_withWorkingProvider_shouldReturnTranslation() {
    let service = common::mock_service(MockProvider::working(), 3);
    let result = service.translate("Hello", "English", "Spanish", None).await.unwrap();
    assert_eq!(result, "[TRANSLATED] Hello");
    assert_eq!(service.stats().requests, 1);
}

/// Test that an always failing provider is tried retry_count + 1 times
#[tokio::test]
async fn test_translate_withFailingProvider_shouldRetryThenGiveUp() {
    let provider = MockProvider::failing();
    let service = common::mock_service(provider.clone(), 3);

    let result = service.translate("Hello", "English", "Spanish", None).await;

    match result {
        Err(TranslationError::RetriesExhausted { attempts, last_error }) => {
            assert_eq!(attempts, 4);
            assert!(last_error.contains("Simulated provider failure"));
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
    assert_eq!(provider.request_count(), 4);
    let stats = service.stats();
    assert_eq!(stats.retries, 3);
    assert_eq!(stats.failures, 1);
}

/// Test that an intermittent failure is absorbed by one retry
#[tokio::test]
async fn test_translate_withIntermittentProvider_shouldSucceedAfterRetry() {
    let service = common::mock_service(MockProvider::intermittent(2), 1);

    assert!(service.translate("first", "English", "German", None).await.is_ok());
    // Request #2 fails and request #3 succeeds
    let second = service.translate("second", "English", "German", None).await.unwrap();
    assert_eq!(second, "[TRANSLATED] second");
    assert_eq!(service.stats().retries, 1);
}

/// Test that empty answers count as failures
#[tokio::test]
async fn test_translate_withEmptyAnswers_shouldFail() {
    let service = common::mock_service(MockProvider::empty(), 1);
    let result = service.translate("Hello", "English", "Spanish", None).await;
    assert!(matches!(result, Err(TranslationError::RetriesExhausted { attempts: 2, .. })));
}

/// Test that blank input never reaches the provider
#[tokio::test]
async fn test_translate_withBlankInput_shouldSkipProvider() {
    let provider = MockProvider::working();
    let service = common::mock_service(provider.clone(), 0);
    assert_eq!(service.translate("  \n", "English", "Spanish", None).await.unwrap(), "  \n");
    assert_eq!(provider.request_count(), 0);
}

/// Test that repeated blocks are served from the cache
#[tokio::test]
async fn test_translate_withRepeatedText_shouldHitCache() {
    let provider = MockProvider::working();
    let service = common::mock_service(provider.clone(), 0);

    service.translate("Page footer", "English", "Spanish", None).await.unwrap();
    service.translate("Page footer", "English", "Spanish", None).await.unwrap();
    service.translate("Page footer", "English", "Spanish", Some("summary")).await.unwrap();

    assert_eq!(provider.request_count(), 2);
    assert_eq!(service.cache().stats().0, 1);
}

/// Test that a disabled cache always asks the provider
#[tokio::test]
async fn test_translate_withCacheDisabled_shouldAlwaysAsk() {
    let provider = MockProvider::working();
    let service = TranslationService::with_provider(Arc::new(provider.clone()))
        .with_cache(TranslationCache::new(false));

    service.translate("Same", "English", "Spanish", None).await.unwrap();
    service.translate("Same", "English", "Spanish", None).await.unwrap();
    assert_eq!(provider.request_count(), 2);
}

/// Test that the provider's code fences are stripped from answers
#[tokio::test]
async fn test_ask_withFencedAnswer_shouldCleanResponse() {
    let provider = MockProvider::working().with_custom_response(|_| "```\nHola\n```".to_string());
    let service = common::mock_service(provider, 0);
    assert_eq!(service.ask("anything").await.unwrap(), "Hola");
}
