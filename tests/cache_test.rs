// tests/cache_test.rs — Integration tests for the persistent result cache

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;

use recon_progressive::cache::{CacheKey, ResultCache};
use recon_progressive::infra::errors::ReconError;
use recon_progressive::modules::{
    ExecuteOptions, ExecutionResult, ModuleOutput, Profile, ReconModule,
};
use recon_progressive::registry::{CandidateUnit, ModuleLoader};
use recon_progressive::scheduler::{ExecutionRequest, ExecutionSettings, RunOptions, Scheduler};

// ---------- Mock module ----------

struct CountingModule {
    calls: Arc<AtomicUsize>,
    profiles: Vec<Profile>,
}

#[async_trait]
impl ReconModule for CountingModule {
    fn name(&self) -> &str {
        "dig"
    }

    fn description(&self) -> &str {
        "counting mock"
    }

    fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    async fn execute(
        &self,
        target: &str,
        profile: &str,
        _options: &ExecuteOptions,
    ) -> Result<ModuleOutput, ReconError> {
        self.require_profile(profile)?;
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ModuleOutput {
            stdout: format!("{profile} records for {target} (call {call})"),
            stderr: String::new(),
            exit_code: Some(0),
            parsed: serde_json::json!({ "records": [target], "count": 1 }),
        })
    }
}

fn scheduler(dir: &std::path::Path, calls: Arc<AtomicUsize>) -> Scheduler {
    scheduler_with_profiles(
        dir,
        calls,
        vec![
            Profile::new("a", &["A"], "A records"),
            Profile::new("mx", &["MX"], "Mail exchangers"),
        ],
    )
}

fn scheduler_with_profiles(
    dir: &std::path::Path,
    calls: Arc<AtomicUsize>,
    profiles: Vec<Profile>,
) -> Scheduler {
    let unit = CandidateUnit::single("recon/dig", move || {
        Ok(Box::new(CountingModule {
            calls: calls.clone(),
            profiles: profiles.clone(),
        }) as Box<dyn ReconModule>)
    });
    let registry = Arc::new(ModuleLoader::with_units(vec![unit]).discover());
    let cache = Arc::new(ResultCache::persistent(dir).unwrap());
    Scheduler::new(registry, cache, ExecutionSettings::default())
}

fn sample(target: &str, profile: &str) -> ExecutionResult {
    ExecutionResult {
        module: "dig".into(),
        profile: profile.into(),
        target: target.into(),
        timestamp: Utc::now(),
        elapsed_ms: 5,
        output: ModuleOutput {
            stdout: format!("{profile} for {target}"),
            ..Default::default()
        },
        from_cache: false,
    }
}

#[tokio::test]
async fn test_results_persist_across_processes() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let request = ExecutionRequest::new("example.com", "dig", "mx");

    let first = scheduler(dir.path(), calls.clone()).run(&request).await.unwrap();

    // A fresh scheduler and cache over the same directory
    let second = scheduler(dir.path(), calls.clone()).run(&request).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.output, first.output);
    assert_eq!(second.timestamp, first.timestamp);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_target_lookup_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let scheduler = scheduler(dir.path(), calls.clone());

    scheduler
        .run(&ExecutionRequest::new("Example.COM", "dig", "a"))
        .await
        .unwrap();
    let hit = scheduler
        .run(&ExecutionRequest::new("example.com", "dig", "a"))
        .await
        .unwrap();
    assert!(hit.from_cache);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_batch_writes_same_key() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let scheduler = scheduler(dir.path(), calls.clone());

    let pairs: Vec<(String, String)> = (0..8).map(|_| ("dig".into(), "a".into())).collect();
    let report = scheduler
        .run_batch("example.com", pairs, RunOptions::default())
        .await;
    assert_eq!(report.succeeded().count(), 8);

    // Whichever writer won, the stored entry is whole and readable
    let reopened = ResultCache::persistent(dir.path()).unwrap();
    let profile = Profile::new("a", &["A"], "A records");
    let key = CacheKey::for_profile("example.com", "dig", &profile, &[]);
    let hit = reopened.get(&key).unwrap();
    assert!(hit.output.stdout.starts_with("a records for example.com"));
    assert_eq!(reopened.len(), 1);
}

#[tokio::test]
async fn test_edited_profile_args_miss_the_persisted_entry() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let request = ExecutionRequest::new("example.com", "dig", "fast");

    let before = scheduler_with_profiles(
        dir.path(),
        calls.clone(),
        vec![Profile::new("fast", &["-p", "1-100"], "Narrow")],
    );
    let first = before.run(&request).await.unwrap();
    assert!(!first.from_cache);

    // Same profile name, different flags (a re-saved or overlaid profile)
    let after = scheduler_with_profiles(
        dir.path(),
        calls.clone(),
        vec![Profile::new("fast", &["-p", "1-65535"], "Wide")],
    );
    let second = after.run(&request).await.unwrap();
    assert!(!second.from_cache);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(after.run(&request).await.unwrap().from_cache);
    assert_eq!(after.cache().len(), 2);
}

#[test]
fn test_invalidate_target_spans_modules_and_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultCache::persistent(dir.path()).unwrap();
    let hour = Duration::from_secs(3600);

    for (target, profile) in [("example.com", "a"), ("example.com", "mx"), ("example.org", "a")] {
        let key = CacheKey::derive(target, "dig", profile, &[]);
        cache.put(&key, &sample(target, profile), hour).unwrap();
    }
    assert_eq!(cache.len(), 3);

    // Invalidation is visible to another instance over the same directory
    let other = ResultCache::persistent(dir.path()).unwrap();
    assert_eq!(other.invalidate_target("example.com"), 2);
    assert!(cache
        .get(&CacheKey::derive("example.org", "dig", "a", &[]))
        .is_some());
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_purge_and_clear_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultCache::persistent(dir.path()).unwrap();

    let live = CacheKey::derive("example.com", "dig", "a", &[]);
    let dead = CacheKey::derive("example.com", "dig", "mx", &[]);
    cache
        .put(&live, &sample("example.com", "a"), Duration::from_secs(3600))
        .unwrap();
    cache
        .put(&dead, &sample("example.com", "mx"), Duration::ZERO)
        .unwrap();

    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.clear().unwrap(), 1);
    assert!(cache.is_empty());
    assert!(cache.get(&live).is_none());
}
