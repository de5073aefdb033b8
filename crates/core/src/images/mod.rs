//! One illustration per conceptual segment.
//!
//! Every segment runs the same job: build a prompt with the language model,
//! submit it to the image provider, wait, then poll with backoff. Jobs run
//! concurrently up to a fixed limit and share one rate limiter. A job failure
//! only fails the batch when more than half of the jobs fail.

mod leonardo;
mod prompt;
mod rate_limiter;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::future::join_all;
use log::{debug, error, info, warn};
use tokio::{sync::Semaphore, time::sleep};

pub use leonardo::{IMAGE_HEIGHT, IMAGE_WIDTH, LeonardoClient};
pub use prompt::{MAX_PROMPT_LENGTH, PromptBuilder, STYLE_SUFFIX, finish_prompt};
pub use rate_limiter::RateLimiter;

use crate::{
    error::{BatchGenerationError, ImageJobError, JobFailure, ProviderError},
    llm::LanguageModel,
    types::{ConceptualSegment, GeneratedImage},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(pub String);

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub style_preset_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Complete { url: String },
    Failed { reason: String },
}

/// Asynchronous image generation: submit a job, then poll it by id.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn submit(&self, request: &ImageRequest) -> Result<JobId, ProviderError>;
    async fn poll(&self, job: &JobId) -> Result<JobStatus, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrency: usize,
    pub requests_per_minute: usize,
    /// Wait between submitting a job and its first poll.
    pub initial_delay: Duration,
    /// Wait before the second poll; doubles after every further attempt.
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            requests_per_minute: 100,
            initial_delay: Duration::from_secs(15),
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.completed * 100 / self.total) as u32
    }
}

pub struct ImageScheduler {
    generator: Arc<dyn ImageGenerator>,
    prompts: PromptBuilder,
    limiter: RateLimiter,
    config: SchedulerConfig,
}

impl ImageScheduler {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        llm: Arc<dyn LanguageModel>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            generator,
            prompts: PromptBuilder::new(llm),
            limiter: RateLimiter::per_minute(config.requests_per_minute),
            config,
        }
    }

    /// Generates one image per segment. The result is sorted by segment index;
    /// segments whose job failed are missing from it.
    pub async fn generate_all(
        &self,
        segments: &[ConceptualSegment],
        style_preset_id: &str,
        on_progress: &(dyn Fn(BatchProgress) + Send + Sync),
    ) -> Result<Vec<GeneratedImage>, BatchGenerationError> {
        let total = segments.len();
        info!("starting batch generation for {total} segments");

        let permits = Semaphore::new(self.config.max_concurrency.max(1));
        let completed = AtomicUsize::new(0);

        let jobs = segments.iter().map(|segment| {
            let permits = &permits;
            let completed = &completed;
            async move {
                let result = match permits.acquire().await {
                    Ok(_permit) => self.run_job(segment, style_preset_id).await,
                    Err(_) => Err(ImageJobError::PoolClosed),
                };
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                on_progress(BatchProgress {
                    completed: done,
                    total,
                });
                (segment, result)
            }
        });
        let results = join_all(jobs).await;

        let mut images = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (segment, result) in results {
            match result {
                Ok(image) => images.push(image),
                Err(error) => {
                    error!("image for segment {} failed: {error}", segment.index);
                    failures.push(JobFailure {
                        index: segment.index,
                        error,
                    });
                }
            }
        }

        if failures.len() * 2 > total {
            return Err(BatchGenerationError {
                failed: failures.len(),
                total,
                failures,
            });
        }
        if !failures.is_empty() {
            let indices: Vec<String> = failures.iter().map(|f| f.index.to_string()).collect();
            warn!(
                "continuing without images for segments {}",
                indices.join(", ")
            );
        }

        images.sort_by_key(|image| image.index);
        info!("completed batch generation: {} images", images.len());
        Ok(images)
    }

    async fn run_job(
        &self,
        segment: &ConceptualSegment,
        style_preset_id: &str,
    ) -> Result<GeneratedImage, ImageJobError> {
        let prompt = self.prompts.build(segment).await?;
        debug!(
            "segment {} prompt: {}",
            segment.index,
            prompt.chars().take(100).collect::<String>()
        );

        self.limiter.acquire().await;
        let job = self
            .generator
            .submit(&ImageRequest {
                prompt,
                style_preset_id: style_preset_id.to_string(),
            })
            .await?;

        sleep(self.config.initial_delay).await;

        let attempts = self.config.max_poll_attempts.max(1);
        let mut interval = self.config.poll_interval;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.generator.poll(&job).await {
                Ok(JobStatus::Complete { url }) => {
                    return Ok(GeneratedImage {
                        url,
                        concept_theme: segment.concept_theme.clone(),
                        index: segment.index,
                    });
                }
                Ok(JobStatus::Failed { reason }) => {
                    return Err(ImageJobError::Rejected { reason });
                }
                Ok(JobStatus::Pending) => last_error = None,
                Err(e) => {
                    warn!(
                        "poll {attempt}/{attempts} for segment {} failed: {e}",
                        segment.index
                    );
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                sleep(interval).await;
                interval *= 2;
            }
        }

        Err(match last_error {
            Some(e) => ImageJobError::Provider(e),
            None => ImageJobError::NotReady { attempts },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex};

    use tokio::time::Instant;

    use super::*;
    use crate::types::SegmentIndex;

    /// Returns nothing so prompts fall back to the segment theme.
    struct SilentLlm;

    #[async_trait]
    impl LanguageModel for SilentLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    /// Jobs whose prompt starts with "fail" are rejected; a job is ready after
    /// `pending_polls` pending answers.
    #[derive(Default)]
    struct FakeGenerator {
        pending_polls: usize,
        polls: Mutex<Vec<(String, Instant)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    fn segment_number(prompt: &str) -> u64 {
        prompt
            .split(',')
            .next()
            .and_then(|head| head.split('-').nth(1))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    #[async_trait]
    impl ImageGenerator for FakeGenerator {
        async fn submit(&self, request: &ImageRequest) -> Result<JobId, ProviderError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            // later segments are submitted faster so completion order differs
            sleep(Duration::from_millis(100 * (20 - segment_number(&request.prompt)))).await;
            Ok(JobId(request.prompt.clone()))
        }

        async fn poll(&self, job: &JobId) -> Result<JobStatus, ProviderError> {
            let seen = {
                let mut polls = self.polls.lock().unwrap();
                polls.push((job.0.clone(), Instant::now()));
                polls.iter().filter(|(id, _)| *id == job.0).count()
            };
            if job.0.starts_with("fail") {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Ok(JobStatus::Failed {
                    reason: "content policy".to_string(),
                });
            }
            if seen <= self.pending_polls {
                return Ok(JobStatus::Pending);
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(JobStatus::Complete {
                url: format!("https://img.example/{}.jpg", segment_number(&job.0)),
            })
        }
    }

    fn segments(count: usize, failing: &[usize]) -> Vec<ConceptualSegment> {
        (0..count)
            .map(|i| ConceptualSegment {
                index: SegmentIndex::from(i),
                concept_theme: if failing.contains(&i) {
                    format!("fail-{i}")
                } else {
                    format!("seg-{i}")
                },
                visual_description: None,
                content: format!("Segment {i} text."),
                timing: None,
            })
            .collect()
    }

    fn scheduler(generator: Arc<FakeGenerator>) -> ImageScheduler {
        ImageScheduler::new(generator, Arc::new(SilentLlm), SchedulerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn minority_failures_return_sorted_successes() {
        let generator = Arc::new(FakeGenerator::default());
        let progress = Mutex::new(Vec::new());

        let images = scheduler(Arc::clone(&generator))
            .generate_all(&segments(10, &[1, 4, 7]), "preset", &|p| {
                progress.lock().unwrap().push(p)
            })
            .await
            .unwrap();

        let indices: Vec<u32> = images.iter().map(|i| i.index.0).collect();
        assert_eq!(indices, vec![0, 2, 3, 5, 6, 8, 9]);
        assert_eq!(images[0].url, "https://img.example/0.jpg");
        assert_eq!(images[1].concept_theme, "seg-2");

        let progress = progress.into_inner().unwrap();
        assert_eq!(progress.len(), 10);
        assert_eq!(progress.last().unwrap().completed, 10);
        assert!(progress.windows(2).all(|w| w[0].completed < w[1].completed));
    }

    #[tokio::test(start_paused = true)]
    async fn majority_failures_fail_the_batch() {
        let generator = Arc::new(FakeGenerator::default());
        let err = scheduler(generator)
            .generate_all(&segments(10, &[0, 1, 2, 3, 4, 5]), "preset", &|_| {})
            .await
            .unwrap_err();

        assert_eq!(err.failed, 6);
        assert_eq!(err.total, 10);
        let failed: HashSet<u32> = err.failures.iter().map(|f| f.index.0).collect();
        assert_eq!(failed, (0..6).collect::<HashSet<u32>>());
        assert!(matches!(err.failures[0].error, ImageJobError::Rejected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn exactly_half_failing_still_succeeds() {
        let generator = Arc::new(FakeGenerator::default());
        let images = scheduler(generator)
            .generate_all(&segments(4, &[0, 3]), "preset", &|_| {})
            .await
            .unwrap();
        assert_eq!(images.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_backs_off_exponentially() {
        let generator = Arc::new(FakeGenerator {
            pending_polls: 2,
            ..Default::default()
        });
        let started = Instant::now();
        let images = scheduler(Arc::clone(&generator))
            .generate_all(&segments(1, &[]), "preset", &|_| {})
            .await
            .unwrap();
        assert_eq!(images.len(), 1);

        let polls = generator.polls.lock().unwrap();
        let millis: Vec<u128> = polls
            .iter()
            .map(|(_, t)| (*t - started).as_millis())
            .collect();
        // 2s submit latency from the fake, then 15s initial delay
        assert_eq!(millis, vec![17_000, 22_000, 32_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn job_gives_up_after_max_attempts() {
        let generator = Arc::new(FakeGenerator {
            pending_polls: 10,
            ..Default::default()
        });
        let err = scheduler(Arc::clone(&generator))
            .generate_all(&segments(1, &[]), "preset", &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err.failures[0].error,
            ImageJobError::NotReady { attempts: 3 }
        ));
        assert_eq!(generator.polls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let generator = Arc::new(FakeGenerator::default());
        let images = scheduler(Arc::clone(&generator))
            .generate_all(&segments(20, &[]), "preset", &|_| {})
            .await
            .unwrap();
        assert_eq!(images.len(), 20);
        let peak = generator.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 10, "peak in flight was {peak}");
    }

    #[test]
    fn progress_percent() {
        let p = BatchProgress {
            completed: 3,
            total: 10,
        };
        assert_eq!(p.percent(), 30);
    }
}
